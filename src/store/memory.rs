//! In-process memory store.

use super::{MemoryStore, matches_query};
use crate::models::{MemoryRecord, MemoryScope};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// A [`MemoryStore`] kept in a mutex-guarded map.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Mutex<HashMap<MemoryScope, Vec<MemoryRecord>>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `records` under `scope`.
    #[must_use]
    pub fn with_records(scope: MemoryScope, records: Vec<MemoryRecord>) -> Self {
        let store = Self::new();
        if let Ok(mut guard) = store.records.lock() {
            guard.insert(scope, records);
        }
        store
    }

    /// Returns every text stored under `scope`, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn texts(&self, scope: &MemoryScope) -> Result<Vec<String>> {
        Ok(self
            .lock()?
            .get(scope)
            .map(|records| records.iter().map(|r| r.text().to_string()).collect())
            .unwrap_or_default())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<MemoryScope, Vec<MemoryRecord>>>> {
        self.records
            .lock()
            .map_err(|e| Error::operation("lock_memory_store", e))
    }
}

impl MemoryStore for InMemoryStore {
    fn get_memories(&self, scope: &MemoryScope, limit: usize) -> Result<Vec<MemoryRecord>> {
        Ok(self
            .lock()?
            .get(scope)
            .map(|records| records.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn store_memory(&self, scope: &MemoryScope, text: &str) -> Result<bool> {
        if text.trim().is_empty() {
            return Ok(false);
        }
        let id = uuid::Uuid::now_v7().to_string();
        self.lock()?
            .entry(scope.clone())
            .or_default()
            .push(MemoryRecord::new(id, text));
        Ok(true)
    }

    fn search_memories(
        &self,
        scope: &MemoryScope,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>> {
        Ok(self
            .lock()?
            .get(scope)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| matches_query(r, query))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn clear_memories(&self, scope: &MemoryScope) -> Result<usize> {
        Ok(self.lock()?.remove(scope).map_or(0, |records| records.len()))
    }
}
