//! # Memport
//!
//! Import, export and reconciliation of memory records for Mem0-style
//! memory stores.
//!
//! Memport serializes a collection of memory records to JSON or CSV, parses
//! untrusted JSON/CSV back into typed records, and reconciles an import
//! against an existing collection before persisting it through a memory store.
//!
//! ## Features
//!
//! - JSON export with a versioned metadata envelope (compact or pretty)
//! - CSV export/import with a fixed `id, memory, created_at, type` column set
//! - Merge, append and replace import modes with duplicate suppression
//! - Per-record success/failure accounting that never aborts a run
//! - Step/percent progress reporting for both pipelines
//!
//! ## Example
//!
//! ```rust,ignore
//! use memport::io::{ExportFormat, ExportService, ProgressReporter};
//! use memport::models::ExportFilter;
//!
//! let mut progress = ProgressReporter::new();
//! let artifact = ExportService::new("mem0-dashboard").export(
//!     &records,
//!     &ExportFilter::all(),
//!     ExportFormat::JsonPretty,
//!     &mut progress,
//! )?;
//! std::fs::write(artifact.file_name(chrono::Utc::now()), artifact.content)?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use std::fmt;
use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod io;
pub mod models;
pub mod observability;
pub mod store;

// Re-exports for convenience
pub use config::MemportConfig;
pub use models::{DateRange, ExportFilter, MemoryRecord, MemoryScope, MemoryType};
pub use store::MemoryStore;

/// Why an export had nothing to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyInputKind {
    /// The collection handed to the exporter was empty.
    NoMemories,
    /// The collection was non-empty but nothing matched the filter.
    NoMatches,
}

impl fmt::Display for EmptyInputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMemories => write!(f, "there are no memories to export; add data first"),
            Self::NoMatches => write!(
                f,
                "no memories match the selected filters; loosen the type or date filters"
            ),
        }
    }
}

/// Error type for memport operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `UnsupportedFormat` | Import file extension is not `json` or `csv` |
/// | `MalformedJson` | Import file is not valid JSON |
/// | `MalformedStructure` | JSON is valid but neither an array nor `{ "memories": [...] }` |
/// | `NoValidRecords` | Parsing produced zero records |
/// | `InvalidRecords` | Pre-import validation found records without content |
/// | `EmptyInput` | Export called on an empty collection or the filter removed everything |
/// | `Format` | CSV has no data rows, no `memory` column, or a ragged row |
/// | `InvalidInput` | Bad CLI/config values |
/// | `OperationFailed` | I/O, HTTP, serialization or store failures |
///
/// Every variant is fatal for the pipeline run that raised it. Per-record
/// import failures are never reported through this type.
#[derive(Debug, ThisError)]
pub enum Error {
    /// The import file has an extension other than `json` or `csv`.
    #[error("unsupported file format: {0} (expected .json or .csv)")]
    UnsupportedFormat(String),

    /// The import file is not valid JSON.
    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    /// The JSON document has an unexpected shape.
    #[error("malformed structure: {0}")]
    MalformedStructure(String),

    /// The import file contained no records.
    #[error("no valid memory records found in the import file")]
    NoValidRecords,

    /// Pre-import validation rejected the file.
    #[error("{count} memory record(s) have no content; nothing was imported")]
    InvalidRecords {
        /// Number of records without content.
        count: usize,
    },

    /// Nothing to export.
    #[error("nothing to export: {0}")]
    EmptyInput(EmptyInputKind),

    /// CSV structure is invalid.
    #[error("{}", format_csv_error(*.line, .message))]
    Format {
        /// 1-based line number, when the error is tied to a row.
        line: Option<usize>,
        /// Description of the problem.
        message: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - Filesystem I/O errors occur
    /// - The remote memory store is unreachable or returns an error status
    /// - Serialization fails
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

fn format_csv_error(line: Option<usize>, message: &str) -> String {
    match line {
        Some(line) => format!("CSV format error on line {line}: {message}"),
        None => format!("CSV format error: {message}"),
    }
}

impl Error {
    /// Builds an [`Error::OperationFailed`] from any displayable cause.
    pub fn operation(operation: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for memport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in milliseconds.
#[must_use]
pub fn current_timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
