//! JSON format adapter for import/export.
//!
//! Exports are wrapped in a versioned envelope. Imports accept either a bare
//! array of record objects or any object with a `memories` array (which
//! includes our own envelope).

use crate::models::{ExportFilter, MemoryRecord, MemoryType, to_iso};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Envelope format version. Changing it requires a version bump policy.
pub const ENVELOPE_VERSION: &str = "1.0";

/// Metadata wrapper around exported records.
#[derive(Debug, Serialize)]
pub struct ExportEnvelope<'a> {
    /// Envelope format version.
    pub version: &'static str,
    /// When the export was produced (ISO-8601).
    pub exported_at: String,
    /// Caller-supplied tag naming the producing application.
    pub source: &'a str,
    /// Number of records in `memories`.
    pub total_memories: usize,
    /// Filters that produced this export.
    pub filters: EnvelopeFilters,
    /// The exported records.
    pub memories: Vec<&'a MemoryRecord>,
}

/// The `filters` block of an export envelope.
#[derive(Debug, Serialize)]
pub struct EnvelopeFilters {
    /// Selected types.
    pub types: Vec<MemoryType>,
    /// Selected creation window.
    pub date_range: EnvelopeDateRange,
}

/// The `filters.date_range` block; open bounds serialize as `null`.
#[derive(Debug, Serialize)]
pub struct EnvelopeDateRange {
    /// Window start.
    pub start: Option<String>,
    /// Window end.
    pub end: Option<String>,
}

impl<'a> ExportEnvelope<'a> {
    /// Builds an envelope for already-filtered records.
    #[must_use]
    pub fn new(
        source: &'a str,
        filter: &ExportFilter,
        memories: Vec<&'a MemoryRecord>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            exported_at: to_iso(now),
            source,
            total_memories: memories.len(),
            filters: EnvelopeFilters {
                types: filter.types.iter().copied().collect(),
                date_range: EnvelopeDateRange {
                    start: filter.date_range.start.map(to_iso),
                    end: filter.date_range.end.map(to_iso),
                },
            },
            memories,
        }
    }

    /// Serializes the envelope, compact or with two-space indentation.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let out = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        out.map_err(|e| Error::operation("write_json", e))
    }
}

/// Parses an import document into its raw record values.
///
/// # Errors
///
/// Returns [`Error::MalformedJson`] if `text` is not JSON, or
/// [`Error::MalformedStructure`] if it is neither an array nor an object
/// with a `memories` array.
pub fn parse_document(text: &str) -> Result<Vec<Value>> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| Error::MalformedJson(e.to_string()))?;

    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut obj) => match obj.remove("memories") {
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(Error::MalformedStructure(
                "'memories' must be an array".to_string(),
            )),
            None => Err(Error::MalformedStructure(
                "expected an array of memories or an object with a 'memories' array".to_string(),
            )),
        },
        other => Err(Error::MalformedStructure(format!(
            "expected an array or object, found {}",
            json_kind(&other)
        ))),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
