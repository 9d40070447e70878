//! Memory store backends.
//!
//! The import pipeline persists records one at a time through a
//! [`MemoryStore`]; the CLI also reads the existing collection from it before
//! importing or exporting.
//!
//! | Backend | Type | Use |
//! |---------|------|-----|
//! | `memory` | [`InMemoryStore`] | Tests, dry runs |
//! | `file` | [`FileStore`] | Local JSON file under the data directory |
//! | `http` | [`HttpMemoryStore`] | Remote `/api/mem0` endpoint |

mod file;
mod http;
mod memory;

pub use file::FileStore;
pub use http::HttpMemoryStore;
pub use memory::InMemoryStore;

use crate::Result;
use crate::config::{MemportConfig, StoreBackend};
use crate::models::{MemoryRecord, MemoryScope};
use std::sync::Arc;

/// A store of memory records partitioned by [`MemoryScope`].
///
/// Implementations must be safe to share across threads; the pipelines call
/// them sequentially.
pub trait MemoryStore: Send + Sync {
    /// Returns up to `limit` records for `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get_memories(&self, scope: &MemoryScope, limit: usize) -> Result<Vec<MemoryRecord>>;

    /// Persists one memory text.
    ///
    /// Returns `Ok(false)` when the backend declined the record without a
    /// transport-level failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or fails.
    fn store_memory(&self, scope: &MemoryScope, text: &str) -> Result<bool>;

    /// Returns up to `limit` records whose text matches `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn search_memories(
        &self,
        scope: &MemoryScope,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>>;

    /// Removes every record in `scope`, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn clear_memories(&self, scope: &MemoryScope) -> Result<usize>;
}

/// Builds the store selected in the configuration.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built.
pub fn build_store(config: &MemportConfig) -> Result<Arc<dyn MemoryStore>> {
    let store: Arc<dyn MemoryStore> = match config.store.backend {
        StoreBackend::Memory => Arc::new(InMemoryStore::new()),
        StoreBackend::File => Arc::new(FileStore::new(config.data_dir.join("memories.json"))),
        StoreBackend::Http => Arc::new(HttpMemoryStore::from_config(&config.store)?),
    };
    tracing::debug!(backend = config.store.backend.as_str(), "Memory store ready");
    Ok(store)
}

/// Case-insensitive substring match used by the local backends.
pub(crate) fn matches_query(record: &MemoryRecord, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    needle.is_empty() || record.text().to_lowercase().contains(&needle)
}
