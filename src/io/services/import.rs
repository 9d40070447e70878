//! Memory import service.
//!
//! Parses an uploaded file, validates it, reconciles it against the existing
//! collection and persists each record through a [`MemoryStore`].
//!
//! Structural problems (bad extension, bad JSON, bad CSV, no records, failed
//! validation gate, failed clear) abort the run with an [`Error`] before any
//! record is persisted. Problems with individual records while persisting are
//! collected into the [`ImportOutcome`] and never abort the run.

use crate::io::formats::{Format, parse_import};
use crate::io::imported::ImportedMemory;
use crate::io::progress::{CancellationFlag, ProgressReporter};
use crate::io::validation::{DuplicatePolicy, DuplicateSet, ImportValidator};
use crate::models::{MemoryRecord, MemoryScope};
use crate::store::MemoryStore;
use crate::{Error, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Characters of a record's text quoted in per-record error messages.
const ERROR_PREVIEW_CHARS: usize = 30;

/// How imported records are reconciled with the existing collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImportMode {
    /// Add new records next to the existing ones.
    #[default]
    Merge,
    /// Add every record after the existing ones.
    Append,
    /// Clear the destination, then add the records.
    Replace,
}

impl ImportMode {
    /// Returns the mode name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Append => "append",
            Self::Replace => "replace",
        }
    }
}

impl FromStr for ImportMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "append" => Ok(Self::Append),
            "replace" => Ok(Self::Replace),
            _ => Err(Error::InvalidInput(format!("Unknown import mode: {s}"))),
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Options for memory import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    /// Skip records whose text is already present.
    pub skip_duplicates: bool,
    /// Reject the whole file if any record has no text.
    pub validate_before_import: bool,
    /// Reconciliation mode.
    pub mode: ImportMode,
    /// How texts are compared for duplicate skipping.
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            skip_duplicates: true,
            validate_before_import: true,
            mode: ImportMode::default(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

impl ImportOptions {
    /// Sets the import mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: ImportMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enables or disables duplicate skipping.
    #[must_use]
    pub const fn with_skip_duplicates(mut self, skip: bool) -> Self {
        self.skip_duplicates = skip;
        self
    }

    /// Enables or disables the all-or-nothing validation gate.
    #[must_use]
    pub const fn with_validation(mut self, validate: bool) -> Self {
        self.validate_before_import = validate;
        self
    }

    /// Sets the duplicate comparison policy.
    #[must_use]
    pub const fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }
}

/// Stages of an import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStage {
    /// Not started.
    Init,
    /// Checking the file extension.
    ValidatingFormat,
    /// Parsing the file content.
    Parsing,
    /// Running the validation gate.
    ValidatingRecords,
    /// Clearing the destination (replace mode).
    ClearingExisting,
    /// Persisting records one by one.
    Persisting,
    /// Building the outcome.
    Finalizing,
    /// Finished.
    Done,
    /// Aborted by a structural error.
    Failed,
}

impl ImportStage {
    /// Returns the stage name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::ValidatingFormat => "validating_format",
            Self::Parsing => "parsing",
            Self::ValidatingRecords => "validating_records",
            Self::ClearingExisting => "clearing_existing",
            Self::Persisting => "persisting",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Summary of a completed import run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    /// Records parsed from the file.
    pub total: usize,
    /// Records the store accepted.
    pub success_count: usize,
    /// Records that were not persisted, duplicates included.
    pub failed_count: usize,
    /// How many of `failed_count` were duplicate skips.
    pub skipped_duplicates: usize,
    /// Per-record error messages, in file order.
    pub errors: Vec<String>,
    /// Validation warnings (unknown types, unparseable timestamps).
    pub warnings: Vec<String>,
    /// Mode the run used.
    pub mode: ImportMode,
    /// True if the run stopped early on cancellation.
    pub cancelled: bool,
}

impl ImportOutcome {
    /// Records that were attempted, successfully or not.
    #[must_use]
    pub const fn processed(&self) -> usize {
        self.success_count + self.failed_count
    }

    /// Returns true if every record was persisted.
    #[must_use]
    pub const fn is_complete_success(&self) -> bool {
        self.failed_count == 0 && !self.cancelled && self.success_count == self.total
    }

    /// One-line summary for display.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut line = format!(
            "Imported {} of {}, {} failed",
            self.success_count, self.total, self.failed_count
        );
        if self.skipped_duplicates > 0 {
            line.push_str(&format!(" ({} duplicates skipped)", self.skipped_duplicates));
        }
        if self.cancelled {
            line.push_str(", cancelled");
        }
        line
    }
}

/// Service for importing memories into a [`MemoryStore`].
pub struct ImportService {
    store: Arc<dyn MemoryStore>,
    scope: MemoryScope,
    cancel: CancellationFlag,
}

impl ImportService {
    /// Creates an import service writing to `scope` in `store`.
    #[must_use]
    pub fn new(store: Arc<dyn MemoryStore>, scope: MemoryScope) -> Self {
        Self {
            store,
            scope,
            cancel: CancellationFlag::new(),
        }
    }

    /// Uses `cancel` to stop the persisting loop early.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Imports memories from a file on disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`] before reading if the extension
    /// is not `json` or `csv`, [`Error::OperationFailed`] if the file cannot
    /// be read, and otherwise the errors of [`Self::import`].
    pub fn import_from_file(
        &self,
        path: &Path,
        existing: &[MemoryRecord],
        options: &ImportOptions,
        progress: &mut ProgressReporter,
    ) -> Result<ImportOutcome> {
        let file_name = path.to_string_lossy();
        Format::from_file_name(&file_name)?;
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::operation("read_import_file", format!("{}: {e}", path.display()))
        })?;
        self.import(&file_name, &content, existing, options, progress)
    }

    /// Imports memories from file content.
    ///
    /// `existing` is the destination collection as the caller sees it; it
    /// seeds duplicate detection in merge and append modes.
    ///
    /// # Errors
    ///
    /// Returns the structural error that stopped the run. Per-record
    /// failures are reported in the outcome instead.
    #[tracing::instrument(
        skip(self, content, existing, options, progress),
        fields(scope = %self.scope, mode = %options.mode, existing = existing.len())
    )]
    pub fn import(
        &self,
        file_name: &str,
        content: &str,
        existing: &[MemoryRecord],
        options: &ImportOptions,
        progress: &mut ProgressReporter,
    ) -> Result<ImportOutcome> {
        let mut stage = ImportStage::Init;
        progress.reset();

        let result = self.run(&mut stage, file_name, content, existing, options, progress);
        match result {
            Ok(ref outcome) => {
                transition(&mut stage, ImportStage::Done);
                metrics::counter!("memport_import_runs_total", "status" => "completed")
                    .increment(1);
                tracing::info!(
                    total = outcome.total,
                    success = outcome.success_count,
                    failed = outcome.failed_count,
                    skipped_duplicates = outcome.skipped_duplicates,
                    cancelled = outcome.cancelled,
                    "Import finished"
                );
            },
            Err(ref e) => {
                metrics::counter!("memport_import_runs_total", "status" => "failed").increment(1);
                tracing::warn!(stage = %stage, error = %e, "Import failed");
                progress.add_error(e.to_string());
                transition(&mut stage, ImportStage::Failed);
            },
        }
        result
    }

    fn run(
        &self,
        stage: &mut ImportStage,
        file_name: &str,
        content: &str,
        existing: &[MemoryRecord],
        options: &ImportOptions,
        progress: &mut ProgressReporter,
    ) -> Result<ImportOutcome> {
        transition(stage, ImportStage::ValidatingFormat);
        progress.advance("Validating file format", 10);
        let format = Format::from_file_name(file_name)?;

        transition(stage, ImportStage::Parsing);
        progress.advance("Parsing data", 30);
        let records = parse_import(format, content)?;
        if records.is_empty() {
            return Err(Error::NoValidRecords);
        }
        tracing::debug!(format = %format, records = records.len(), "Parsed import file");

        transition(stage, ImportStage::ValidatingRecords);
        progress.advance("Validating records", 40);
        let validator = ImportValidator::new();
        if options.validate_before_import {
            validator.ensure_all_valid(&records)?;
        }

        let mut outcome = ImportOutcome {
            total: records.len(),
            mode: options.mode,
            warnings: collect_warnings(&validator, &records),
            ..ImportOutcome::default()
        };

        if self.cancel.is_cancelled() {
            outcome.cancelled = true;
            return Ok(outcome);
        }

        let mut seen = if options.mode == ImportMode::Replace {
            transition(stage, ImportStage::ClearingExisting);
            progress.advance("Clearing existing memories", 45);
            let removed = self.store.clear_memories(&self.scope)?;
            tracing::info!(removed, "Cleared destination before replace import");
            DuplicateSet::new(options.duplicate_policy)
        } else {
            DuplicateSet::seeded(options.duplicate_policy, existing)
        };

        transition(stage, ImportStage::Persisting);
        progress.advance("Importing memories", 50);
        self.persist(&records, options, &mut seen, &mut outcome, progress);

        transition(stage, ImportStage::Finalizing);
        progress.advance("Finalizing import", 95);
        progress.advance("Import complete", 100);
        Ok(outcome)
    }

    fn persist(
        &self,
        records: &[ImportedMemory],
        options: &ImportOptions,
        seen: &mut DuplicateSet,
        outcome: &mut ImportOutcome,
        progress: &mut ProgressReporter,
    ) {
        let total = records.len();

        for (index, record) in records.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::warn!(processed = index, total, "Import cancelled");
                outcome.cancelled = true;
                break;
            }

            match self.persist_one(index, record, options, seen) {
                Ok(()) => outcome.success_count += 1,
                Err(failure) => {
                    outcome.failed_count += 1;
                    if failure.duplicate {
                        outcome.skipped_duplicates += 1;
                    }
                    progress.add_error(failure.message.clone());
                    outcome.errors.push(failure.message);
                },
            }

            progress.set_percent(persist_percent(index + 1, total));
        }

        metrics::counter!("memport_import_records_total", "status" => "success")
            .increment(outcome.success_count as u64);
        metrics::counter!("memport_import_records_total", "status" => "failed")
            .increment(outcome.failed_count as u64);
    }

    fn persist_one(
        &self,
        index: usize,
        record: &ImportedMemory,
        options: &ImportOptions,
        seen: &mut DuplicateSet,
    ) -> std::result::Result<(), RecordFailure> {
        let Some(text) = record.resolved_text() else {
            return Err(RecordFailure::new(format!(
                "Memory at index {index} has no content"
            )));
        };

        if options.skip_duplicates && seen.contains(text) {
            tracing::debug!(index, "Skipping duplicate memory");
            return Err(RecordFailure {
                message: format!("Skipped duplicate memory: {}", preview(text)),
                duplicate: true,
            });
        }

        match self.store.store_memory(&self.scope, text) {
            Ok(true) => {
                if options.skip_duplicates {
                    seen.insert(text);
                }
                Ok(())
            },
            Ok(false) => Err(RecordFailure::new(format!(
                "Failed to import memory: {}",
                preview(text)
            ))),
            Err(e) => {
                tracing::debug!(index, error = %e, "Store rejected memory");
                Err(RecordFailure::new(format!(
                    "Error importing memory {}: {e}",
                    preview(text)
                )))
            },
        }
    }
}

struct RecordFailure {
    message: String,
    duplicate: bool,
}

impl RecordFailure {
    const fn new(message: String) -> Self {
        Self {
            message,
            duplicate: false,
        }
    }
}

fn transition(stage: &mut ImportStage, next: ImportStage) {
    tracing::debug!(from = %stage, to = %next, "Import stage");
    *stage = next;
}

fn collect_warnings(validator: &ImportValidator, records: &[ImportedMemory]) -> Vec<String> {
    records
        .iter()
        .enumerate()
        .flat_map(|(index, record)| {
            validator
                .validate(record)
                .warnings()
                .map(|issue| format!("Record {index}: {}: {}", issue.field, issue.message))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Maps records processed onto the 50..=90 percent band.
fn persist_percent(processed: usize, total: usize) -> u8 {
    let band = 40 * processed / total.max(1);
    u8::try_from(50 + band.min(40)).unwrap_or(90)
}

/// First 30 characters of `text`, quoted, followed by an ellipsis.
fn preview(text: &str) -> String {
    let head: String = text.chars().take(ERROR_PREVIEW_CHARS).collect();
    format!("\"{head}...\"")
}
