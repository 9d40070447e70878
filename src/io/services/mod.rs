//! Import and export service implementations.
//!
//! Orchestrates format parsing, validation, and storage operations.

pub mod export;
pub mod import;

pub use export::{ExportArtifact, ExportResult, ExportService};
pub use import::{ImportMode, ImportOptions, ImportOutcome, ImportService, ImportStage};
