//! Memory export service.
//!
//! Filters a collection by type and date range and serializes the result to
//! an enveloped JSON document or to CSV rows.

use crate::io::formats::ExportFormat;
use crate::io::formats::csv::{CSV_FIELDS, CsvCodec};
use crate::io::formats::json::ExportEnvelope;
use crate::io::progress::ProgressReporter;
use crate::models::{ExportFilter, MemoryRecord};
use crate::{EmptyInputKind, Error, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Serialized export ready to be written somewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// File content.
    pub content: String,
    /// MIME type of `content`.
    pub mime_type: &'static str,
    /// File extension without the dot.
    pub extension: &'static str,
    /// Records included.
    pub record_count: usize,
}

impl ExportArtifact {
    /// Returns `mem0-export-<YYYY-MM-DD>.<extension>` for the given date.
    #[must_use]
    pub fn file_name(&self, now: DateTime<Utc>) -> String {
        format!("mem0-export-{}.{}", now.format("%Y-%m-%d"), self.extension)
    }
}

/// Result of an export written to disk.
#[derive(Debug, Clone)]
pub struct ExportResult {
    /// Number of memories exported.
    pub exported: usize,
    /// Size of the collection before filtering.
    pub total: usize,
    /// Format used for export.
    pub format: ExportFormat,
    /// Where the file was written.
    pub output_path: PathBuf,
}

/// Service for exporting memories to external formats.
#[derive(Debug, Clone)]
pub struct ExportService {
    /// Tag written to the envelope's `source` field.
    source: String,
}

impl ExportService {
    /// Creates an export service that tags envelopes with `source`.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Filters and serializes `records`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyInput`] with [`EmptyInputKind::NoMemories`] for
    /// an empty collection or [`EmptyInputKind::NoMatches`] when the filter
    /// removes everything, or an error if serialization fails.
    pub fn export(
        &self,
        records: &[MemoryRecord],
        filter: &ExportFilter,
        format: ExportFormat,
        progress: &mut ProgressReporter,
    ) -> Result<ExportArtifact> {
        self.export_at(records, filter, format, progress, Utc::now())
    }

    /// [`Self::export`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`Self::export`].
    #[tracing::instrument(
        skip(self, records, filter, progress, now),
        fields(source = %self.source, records = records.len())
    )]
    pub fn export_at(
        &self,
        records: &[MemoryRecord],
        filter: &ExportFilter,
        format: ExportFormat,
        progress: &mut ProgressReporter,
        now: DateTime<Utc>,
    ) -> Result<ExportArtifact> {
        progress.reset();
        progress.advance("Preparing export", 10);
        if records.is_empty() {
            return Err(fail(progress, Error::EmptyInput(EmptyInputKind::NoMemories)));
        }

        progress.advance("Filtering by type", 30);
        let mut selected: Vec<&MemoryRecord> = records.iter().collect();
        if !filter.covers_all_types() {
            selected.retain(|r| filter.matches_type(r));
        }

        progress.advance("Filtering by date range", 50);
        if !filter.date_range.is_unbounded() {
            selected.retain(|r| filter.matches_date(r, now));
        }

        if selected.is_empty() {
            return Err(fail(progress, Error::EmptyInput(EmptyInputKind::NoMatches)));
        }
        tracing::debug!(
            selected = selected.len(),
            filtered_out = records.len() - selected.len(),
            "Applied export filters"
        );

        progress.advance("Formatting export data", 70);
        let record_count = selected.len();
        let content = match format {
            ExportFormat::Csv => CsvCodec::encode(selected, &CSV_FIELDS),
            ExportFormat::Json | ExportFormat::JsonPretty => {
                ExportEnvelope::new(&self.source, filter, selected, now)
                    .to_json(format == ExportFormat::JsonPretty)
            },
        }
        .map_err(|e| fail(progress, e))?;

        progress.advance("Preparing file", 90);
        let artifact = ExportArtifact {
            content,
            mime_type: format.mime_type(),
            extension: format.extension(),
            record_count,
        };

        metrics::counter!("memport_export_records_total", "format" => format.as_str())
            .increment(record_count as u64);
        tracing::info!(format = %format, exported = record_count, "Export complete");
        progress.advance("Export complete", 100);
        Ok(artifact)
    }

    /// Exports to `dir/mem0-export-<date>.<ext>`, creating `dir` if needed.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::export`], or an error if the directory
    /// or file cannot be written.
    pub fn export_to_dir(
        &self,
        dir: &Path,
        records: &[MemoryRecord],
        filter: &ExportFilter,
        format: ExportFormat,
        progress: &mut ProgressReporter,
    ) -> Result<ExportResult> {
        let now = Utc::now();
        let artifact = self.export_at(records, filter, format, progress, now)?;

        std::fs::create_dir_all(dir).map_err(|e| Error::operation("create_export_dir", e))?;
        let output_path = dir.join(artifact.file_name(now));
        std::fs::write(&output_path, &artifact.content).map_err(|e| {
            Error::operation("write_export_file", format!("{}: {e}", output_path.display()))
        })?;

        Ok(ExportResult {
            exported: artifact.record_count,
            total: records.len(),
            format,
            output_path,
        })
    }
}

fn fail(progress: &mut ProgressReporter, error: Error) -> Error {
    tracing::warn!(error = %error, "Export failed");
    progress.add_error(error.to_string());
    error
}
