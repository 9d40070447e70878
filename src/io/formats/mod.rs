//! Format adapters for import/export.
//!
//! [`Format`] is the file type of an import; [`ExportFormat`] adds the
//! pretty-printed JSON variant offered on export.

pub mod csv;
pub mod json;

use crate::io::imported::ImportedMemory;
use crate::{Error, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// File types accepted for import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// JSON array or `{ "memories": [...] }` document.
    Json,
    /// CSV with a `memory` column.
    Csv,
}

impl Format {
    /// Returns the file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }

    /// Returns the MIME type for this format.
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Csv => "text/csv",
        }
    }

    /// Detects the format from a file name's extension (case-insensitive).
    ///
    /// The extension is whatever follows the last `.` of the final path
    /// component, so a bare `.json` counts as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`] for any extension other than
    /// `json` or `csv`, including a missing one.
    pub fn from_file_name(name: &str) -> Result<Self> {
        let ext = Path::new(name)
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.rsplit_once('.'))
            .map(|(_, ext)| ext.to_lowercase());

        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("csv") => Ok(Self::Csv),
            Some(ext) => Err(Error::UnsupportedFormat(format!(".{ext}"))),
            None => Err(Error::UnsupportedFormat(format!(
                "'{name}' has no file extension"
            ))),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Output formats offered on export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExportFormat {
    /// Compact JSON envelope.
    Json,
    /// JSON envelope with two-space indentation.
    #[default]
    JsonPretty,
    /// CSV rows without an envelope.
    Csv,
}

impl ExportFormat {
    /// Returns the underlying file format.
    #[must_use]
    pub const fn file_format(&self) -> Format {
        match self {
            Self::Json | Self::JsonPretty => Format::Json,
            Self::Csv => Format::Csv,
        }
    }

    /// Returns the file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        self.file_format().extension()
    }

    /// Returns the MIME type for this format.
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        self.file_format().mime_type()
    }

    /// Returns the CLI/config name of this format.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::JsonPretty => "json-pretty",
            Self::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "json-pretty" | "json_pretty" | "pretty" => Ok(Self::JsonPretty),
            "csv" => Ok(Self::Csv),
            _ => Err(Error::InvalidInput(format!("Unknown export format: {s}"))),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parses import file content into raw records.
///
/// CSV rows get their `id`, `created_at` and `type` defaults here; JSON
/// elements are kept as found.
///
/// # Errors
///
/// Returns the format-specific structural error (see [`json::parse_document`]
/// and [`csv::CsvCodec::decode`]).
pub fn parse_import(format: Format, content: &str) -> Result<Vec<ImportedMemory>> {
    match format {
        Format::Json => Ok(json::parse_document(content)?
            .iter()
            .map(ImportedMemory::from_value)
            .collect()),
        Format::Csv => {
            let timestamp = crate::current_timestamp_millis();
            Ok(csv::CsvCodec::decode(content)?
                .iter()
                .enumerate()
                .map(|(idx, row)| ImportedMemory::from_csv_row(row, idx, timestamp))
                .collect())
        },
    }
}
