//! Import-side view of a record before it reaches the store.
//!
//! Unlike [`MemoryRecord`](crate::models::MemoryRecord), every field is
//! optional: content is resolved at persist time so that missing text can be
//! reported per record instead of being papered over with a placeholder.

use super::formats::csv::CsvRow;
use super::normalizer::value_text;
use crate::models::{MemoryType, now_iso};
use serde_json::Value;

/// A record read from an import file.
///
/// # Field Mapping
///
/// | Field | JSON key | CSV column | CSV default |
/// |-------|----------|------------|-------------|
/// | `id` | `id` | `id` | `import-<timestamp>-<row>` |
/// | `memory` | `memory` | `memory` | - |
/// | `text` | `text` | `text` | - |
/// | `content` | `content` | `content` | - |
/// | `created_at` | `created_at` | `created_at` | now |
/// | `memory_type` | `type` | `type` | `custom` |
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportedMemory {
    /// Record identifier.
    pub id: Option<String>,
    /// Primary text field.
    pub memory: Option<String>,
    /// Alternate text field.
    pub text: Option<String>,
    /// Display text field.
    pub content: Option<String>,
    /// Creation timestamp as found in the file.
    pub created_at: Option<String>,
    /// Type name as found in the file.
    pub memory_type: Option<String>,
}

impl ImportedMemory {
    /// Creates an imported memory with just `memory` text.
    #[must_use]
    pub fn new(memory: impl Into<String>) -> Self {
        Self {
            memory: Some(memory.into()),
            ..Self::default()
        }
    }

    /// Sets the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the type name.
    #[must_use]
    pub fn with_type(mut self, memory_type: impl Into<String>) -> Self {
        self.memory_type = Some(memory_type.into());
        self
    }

    /// Reads a raw JSON element. Non-objects yield an empty record.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let get = |key: &str| value.get(key).and_then(value_text);
        Self {
            id: get("id"),
            memory: get("memory"),
            text: get("text"),
            content: get("content"),
            created_at: get("created_at"),
            memory_type: value.get("type").and_then(Value::as_str).map(String::from),
        }
    }

    /// Reads a decoded CSV row, filling `id`, `created_at` and `type` defaults.
    ///
    /// `row_index` is the 0-based data row index; `timestamp_ms` is shared by
    /// every row of one import so generated ids sort in file order.
    #[must_use]
    pub fn from_csv_row(row: &CsvRow, row_index: usize, timestamp_ms: i64) -> Self {
        let get = |key: &str| row.get(key).filter(|v| !v.is_empty()).map(String::from);
        Self {
            id: get("id").or_else(|| Some(format!("import-{timestamp_ms}-{row_index}"))),
            memory: get("memory"),
            text: get("text"),
            content: get("content"),
            created_at: get("created_at").or_else(|| Some(now_iso())),
            memory_type: Some(
                get("type")
                    .map_or(MemoryType::Custom, |t| MemoryType::parse_or_default(&t))
                    .as_str()
                    .to_string(),
            ),
        }
    }

    /// Returns the text to persist: the first of `memory`, `text`, `content`
    /// that is not blank.
    #[must_use]
    pub fn resolved_text(&self) -> Option<&str> {
        [&self.memory, &self.text, &self.content]
            .into_iter()
            .filter_map(Option::as_deref)
            .find(|s| !s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let mem = ImportedMemory::new("likes tea").with_id("m1").with_type("preference");
        assert_eq!(mem.resolved_text(), Some("likes tea"));
        assert_eq!(mem.id.as_deref(), Some("m1"));
        assert_eq!(mem.memory_type.as_deref(), Some("preference"));
    }

    #[test]
    fn test_resolved_text_priority() {
        let mem = ImportedMemory::from_value(&json!({"content": "c", "text": "t", "memory": "m"}));
        assert_eq!(mem.resolved_text(), Some("m"));

        let mem = ImportedMemory::from_value(&json!({"content": "c", "text": "t"}));
        assert_eq!(mem.resolved_text(), Some("t"));

        let mem = ImportedMemory::from_value(&json!({"content": "c", "memory": "   "}));
        assert_eq!(mem.resolved_text(), Some("c"));

        let mem = ImportedMemory::from_value(&json!({"id": "x"}));
        assert_eq!(mem.resolved_text(), None);
    }

    #[test]
    fn test_from_non_object() {
        assert_eq!(ImportedMemory::from_value(&json!(3)), ImportedMemory::default());
    }

    #[test]
    fn test_csv_row_defaults() {
        let row = CsvRow::new(vec![
            ("id".to_string(), String::new()),
            ("memory".to_string(), "hello".to_string()),
            ("created_at".to_string(), String::new()),
            ("type".to_string(), "nonsense".to_string()),
        ]);
        let mem = ImportedMemory::from_csv_row(&row, 4, 1_700_000_000_000);
        assert_eq!(mem.id.as_deref(), Some("import-1700000000000-4"));
        assert!(mem.created_at.is_some());
        assert_eq!(mem.memory_type.as_deref(), Some("custom"));
        assert_eq!(mem.resolved_text(), Some("hello"));
    }

    #[test]
    fn test_csv_row_keeps_values() {
        let row = CsvRow::new(vec![
            ("id".to_string(), "7".to_string()),
            ("memory".to_string(), "x".to_string()),
            ("created_at".to_string(), "2024-01-01T00:00:00.000Z".to_string()),
            ("type".to_string(), "search".to_string()),
        ]);
        let mem = ImportedMemory::from_csv_row(&row, 0, 0);
        assert_eq!(mem.id.as_deref(), Some("7"));
        assert_eq!(mem.created_at.as_deref(), Some("2024-01-01T00:00:00.000Z"));
        assert_eq!(mem.memory_type.as_deref(), Some("search"));
    }
}
