//! Import/Export I/O subsystem.
//!
//! Moves memory records between a [`MemoryStore`](crate::store::MemoryStore)
//! and JSON or CSV files.
//!
//! # Architecture
//!
//! - **Normalizer** coerces raw JSON objects into [`MemoryRecord`](crate::models::MemoryRecord)s
//! - **Format adapters** encode and decode JSON envelopes and CSV rows
//! - **Validation layer** gates imports and detects duplicates
//! - **Services** orchestrate parsing, filtering, reconciliation and storage
//! - **Progress** reports step/percent/errors to an observer
//!
//! # Supported Formats
//!
//! | Format | Import | Export | Notes |
//! |--------|--------|--------|-------|
//! | JSON | ✓ | ✓ | Array or `{ "memories": [...] }`; exports carry a `1.0` envelope |
//! | CSV | ✓ | ✓ | `id, memory, created_at, type`; `memory` column required |
//!
//! # Examples
//!
//! ## Import memories from a file
//!
//! ```rust,ignore
//! use memport::io::{ImportOptions, ImportService, ProgressReporter};
//!
//! let service = ImportService::new(store, scope);
//! let mut progress = ProgressReporter::new();
//! let outcome = service.import_from_file(
//!     Path::new("memories.csv"),
//!     &existing,
//!     &ImportOptions::default(),
//!     &mut progress,
//! )?;
//! println!("{}", outcome.summary());
//! ```
//!
//! ## Export memories to CSV
//!
//! ```rust,ignore
//! use memport::io::{ExportFormat, ExportService, ProgressReporter};
//!
//! let result = ExportService::new("memport").export_to_dir(
//!     Path::new("exports"),
//!     &records,
//!     &ExportFilter::all(),
//!     ExportFormat::Csv,
//!     &mut ProgressReporter::new(),
//! )?;
//! println!("Exported {} memories", result.exported);
//! ```

pub mod formats;
pub mod imported;
pub mod normalizer;
pub mod progress;
pub mod services;
pub mod validation;

// Re-exports for convenience
pub use formats::csv::{CSV_FIELDS, CsvCodec, CsvRow};
pub use formats::{ExportFormat, Format};
pub use imported::ImportedMemory;
pub use normalizer::RecordNormalizer;
pub use progress::{CancellationFlag, ProgressCallback, ProgressReporter, ProgressSnapshot};
pub use services::export::{ExportArtifact, ExportResult, ExportService};
pub use services::import::{
    ImportMode, ImportOptions, ImportOutcome, ImportService, ImportStage,
};
pub use validation::{
    DuplicatePolicy, DuplicateSet, ImportValidator, ValidationIssue, ValidationResult,
    ValidationSeverity,
};
