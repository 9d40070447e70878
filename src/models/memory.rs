//! Memory record types.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Text used when a raw record carries no content at all.
pub const UNKNOWN_MEMORY: &str = "Unknown memory";

/// Category of a memory record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// A file was created, read, moved or deleted.
    FileOperation,
    /// A search query was issued.
    Search,
    /// A stated user preference.
    Preference,
    /// Free-form note (also the fallback for unknown types).
    #[default]
    Custom,
}

impl MemoryType {
    /// Returns all memory types.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::FileOperation,
            Self::Search,
            Self::Preference,
            Self::Custom,
        ]
    }

    /// Returns the type as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FileOperation => "file_operation",
            Self::Search => "search",
            Self::Preference => "preference",
            Self::Custom => "custom",
        }
    }

    /// Parses a memory type from a string.
    ///
    /// Returns `None` for unrecognized values; callers decide whether to fall
    /// back to [`MemoryType::Custom`].
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "file_operation" | "file-operation" => Some(Self::FileOperation),
            "search" => Some(Self::Search),
            "preference" => Some(Self::Preference),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }

    /// Parses a memory type, defaulting to [`MemoryType::Custom`].
    #[must_use]
    pub fn parse_or_default(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The canonical memory record.
///
/// `content` and `memory` carry the same text; both are kept because older
/// exports used one name or the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Identifier, unique within one collection snapshot.
    pub id: String,
    /// Displayed and searchable text.
    pub content: String,
    /// Same text as `content`.
    pub memory: String,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
    /// Record category.
    #[serde(rename = "type", default)]
    pub memory_type: MemoryType,
}

impl MemoryRecord {
    /// Creates a record with the same text in `content` and `memory`,
    /// stamped with the current time.
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id: id.into(),
            content: text.clone(),
            memory: text,
            created_at: now_iso(),
            memory_type: MemoryType::Custom,
        }
    }

    /// Sets the memory type.
    #[must_use]
    pub const fn with_type(mut self, memory_type: MemoryType) -> Self {
        self.memory_type = memory_type;
        self
    }

    /// Sets the creation timestamp.
    #[must_use]
    pub fn with_created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = created_at.into();
        self
    }

    /// Returns the record text, preferring `memory` over `content`.
    #[must_use]
    pub fn text(&self) -> &str {
        if self.memory.is_empty() {
            &self.content
        } else {
            &self.memory
        }
    }

    /// Returns the parsed creation time, if `created_at` is parseable.
    #[must_use]
    pub fn created_at_parsed(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_at)
    }

    /// Returns the creation time, substituting `now` for unparseable values.
    ///
    /// The stored string is left untouched.
    #[must_use]
    pub fn created_at_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.created_at_parsed().unwrap_or(now)
    }

    /// Returns the named field as a string, for column-oriented formats.
    ///
    /// Unknown field names yield `None`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "id" => Some(&self.id),
            "content" => Some(&self.content),
            "memory" => Some(&self.memory),
            "created_at" => Some(&self.created_at),
            "type" => Some(self.memory_type.as_str()),
            _ => None,
        }
    }
}

/// Formats a timestamp the way exports expect (`2024-01-01T00:00:00.000Z`).
#[must_use]
pub fn to_iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Returns the current time as an ISO-8601 string.
#[must_use]
pub fn now_iso() -> String {
    to_iso(Utc::now())
}

/// Parses the timestamp shapes found in memory exports.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` without an
/// offset (read as UTC) and bare dates (midnight UTC).
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
