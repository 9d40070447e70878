//! JSON file memory store.
//!
//! The file is a JSON array of record objects, each carrying its `user_id`
//! and `family` next to the record fields. Entries are kept as raw JSON on
//! the write path and only normalized when read, so hand-edited files with
//! missing or unparseable fields load without being rewritten.
//!
//! Every write re-reads and rewrites the whole file, so importing N records
//! costs O(N^2) I/O. Use the in-memory or HTTP backend for large imports.

use super::{MemoryStore, matches_query};
use crate::io::RecordNormalizer;
use crate::models::{DEFAULT_FAMILY, MemoryRecord, MemoryScope};
use crate::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A [`MemoryStore`] persisted to a single JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    guard: Mutex<()>,
}

#[derive(Serialize)]
struct StoredMemory<'a> {
    user_id: &'a str,
    family: &'a str,
    #[serde(flatten)]
    record: &'a MemoryRecord,
}

impl FileStore {
    /// Creates a store backed by `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<Value>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| Error::operation("read_memory_file", e))?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        let value: Value =
            serde_json::from_str(&contents).map_err(|e| Error::MalformedJson(e.to_string()))?;
        match value {
            Value::Array(items) => Ok(items),
            _ => Err(Error::MalformedStructure(format!(
                "{} must contain a JSON array",
                self.path.display()
            ))),
        }
    }

    /// Normalized records of `scope`, in file order.
    fn read_scope(&self, scope: &MemoryScope) -> Result<Vec<MemoryRecord>> {
        Ok(self
            .load()?
            .iter()
            .filter(|entry| in_scope(entry, scope))
            .map(read_record)
            .collect())
    }

    fn save(&self, entries: &[Value]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::operation("create_data_dir", e))?;
            }
        }

        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| Error::operation("serialize_memory_file", e))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| Error::operation("write_memory_file", e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| Error::operation("write_memory_file", e))
    }

    fn with_lock<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let _guard = self
            .guard
            .lock()
            .map_err(|e| Error::operation("lock_memory_file", e))?;
        f()
    }
}

/// Returns true if a raw entry belongs to `scope`.
fn in_scope(entry: &Value, scope: &MemoryScope) -> bool {
    let field = |key: &str| entry.get(key).and_then(Value::as_str);
    field("user_id").unwrap_or_default() == scope.user_id
        && field("family").unwrap_or(DEFAULT_FAMILY) == scope.family
}

/// Normalizes a raw entry. Entries without an id get one derived from their
/// content so repeated reads agree.
fn read_record(entry: &Value) -> MemoryRecord {
    let mut record = RecordNormalizer::normalize_one(entry);
    let has_id = entry
        .get("id")
        .is_some_and(|id| id.is_number() || id.as_str().is_some_and(|s| !s.is_empty()));
    if !has_id {
        let digest = hex::encode(Sha256::digest(entry.to_string().as_bytes()));
        record.id = format!("file-{}", &digest[..16]);
    }
    record
}

impl MemoryStore for FileStore {
    fn get_memories(&self, scope: &MemoryScope, limit: usize) -> Result<Vec<MemoryRecord>> {
        self.with_lock(|| {
            let mut records = self.read_scope(scope)?;
            records.truncate(limit);
            Ok(records)
        })
    }

    fn store_memory(&self, scope: &MemoryScope, text: &str) -> Result<bool> {
        if text.trim().is_empty() {
            return Ok(false);
        }
        self.with_lock(|| {
            let mut entries = self.load()?;
            let record = MemoryRecord::new(uuid::Uuid::now_v7().to_string(), text);
            let entry = serde_json::to_value(StoredMemory {
                user_id: &scope.user_id,
                family: &scope.family,
                record: &record,
            })
            .map_err(|e| Error::operation("serialize_memory", e))?;
            entries.push(entry);
            self.save(&entries)?;
            Ok(true)
        })
    }

    fn search_memories(
        &self,
        scope: &MemoryScope,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>> {
        self.with_lock(|| {
            Ok(self
                .read_scope(scope)?
                .into_iter()
                .filter(|r| matches_query(r, query))
                .take(limit)
                .collect())
        })
    }

    fn clear_memories(&self, scope: &MemoryScope) -> Result<usize> {
        self.with_lock(|| {
            let entries = self.load()?;
            let before = entries.len();
            let kept: Vec<Value> = entries.into_iter().filter(|e| !in_scope(e, scope)).collect();
            let removed = before - kept.len();
            if removed > 0 {
                self.save(&kept)?;
            }
            Ok(removed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("memories.json"));
        assert!(
            store
                .get_memories(&MemoryScope::default(), 10)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("memories.json");
        let scope = MemoryScope::new("alice", "smith");

        FileStore::new(&path).store_memory(&scope, "likes tea").unwrap();

        let reopened = FileStore::new(&path);
        let records = reopened.get_memories(&scope, 10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].memory, "likes tea");
        assert!(
            reopened
                .get_memories(&MemoryScope::new("bob", "smith"), 10)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_hand_written_file_is_normalized() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memories.json");
        std::fs::write(&path, r#"[{"user_id": "u", "family": "f", "text": "raw"}]"#).unwrap();

        let records = FileStore::new(&path)
            .get_memories(&MemoryScope::new("u", "f"), 10)
            .unwrap();
        assert_eq!(records[0].content, "raw");
        assert!(records[0].id.starts_with("file-"));
    }

    #[test]
    fn test_ids_stable_across_reads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memories.json");
        std::fs::write(
            &path,
            r#"[{"user_id": "u", "family": "f", "memory": "a"}, {"user_id": "u", "family": "f", "memory": "b"}]"#,
        )
        .unwrap();
        let store = FileStore::new(&path);
        let scope = MemoryScope::new("u", "f");

        let ids = || -> Vec<String> {
            store
                .get_memories(&scope, 10)
                .unwrap()
                .into_iter()
                .map(|r| r.id)
                .collect()
        };
        let first = ids();
        let second = ids();
        assert_eq!(first, second);
        assert_ne!(first[0], first[1]);
    }

    #[test]
    fn test_store_leaves_existing_entries_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memories.json");
        std::fs::write(
            &path,
            r#"[{"user_id":"u","family":"f","memory":"x","created_at":"garbage"}]"#,
        )
        .unwrap();
        let store = FileStore::new(&path);
        let scope = MemoryScope::new("u", "f");

        assert_eq!(store.get_memories(&scope, 10).unwrap()[0].memory, "x");
        store.store_memory(&scope, "y").unwrap();

        let saved: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let entries = saved.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0],
            serde_json::json!({"user_id":"u","family":"f","memory":"x","created_at":"garbage"})
        );
        assert_eq!(entries[1]["memory"], "y");
        assert_eq!(entries[1]["user_id"], "u");

        let records = store.get_memories(&scope, 10).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].created_at_parsed().is_some());
    }

    #[test]
    fn test_clear_keeps_raw_entries_of_other_scopes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memories.json");
        std::fs::write(
            &path,
            r#"[{"user_id":"a","memory":"mine"},{"user_id":"b","text":"theirs","type":"bogus"}]"#,
        )
        .unwrap();
        let store = FileStore::new(&path);

        assert_eq!(store.clear_memories(&MemoryScope::new("a", DEFAULT_FAMILY)).unwrap(), 1);

        let saved: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            saved,
            serde_json::json!([{"user_id":"b","text":"theirs","type":"bogus"}])
        );
    }

    #[test]
    fn test_clear_only_touches_scope() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("memories.json"));
        let a = MemoryScope::new("a", "f");
        let b = MemoryScope::new("b", "f");
        store.store_memory(&a, "one").unwrap();
        store.store_memory(&a, "two").unwrap();
        store.store_memory(&b, "three").unwrap();

        assert_eq!(store.clear_memories(&a).unwrap(), 2);
        assert_eq!(store.get_memories(&b, 10).unwrap().len(), 1);
    }

    #[test]
    fn test_non_array_file_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memories.json");
        std::fs::write(&path, r#"{"memories": []}"#).unwrap();
        let err = FileStore::new(&path)
            .get_memories(&MemoryScope::default(), 10)
            .unwrap_err();
        assert!(matches!(err, Error::MalformedStructure(_)));
    }
}
