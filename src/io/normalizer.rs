//! Best-effort coercion of raw memory objects into [`MemoryRecord`]s.
//!
//! Raw objects come from older exports, the remote store and hand-written
//! files, so every field is optional and may have the wrong JSON type.
//!
//! # Field priority
//!
//! | Field | Derived from |
//! |-------|--------------|
//! | `content` | `content`, `memory`, `text`, then `"Unknown memory"` |
//! | `memory` | `memory`, `content`, `text`, then `"Unknown memory"` |
//! | `created_at` | `created_at` if parseable (strings or epoch millis), else now |
//! | `id` | `id` (string or number), else `mock-<timestamp>-<random>` |
//! | `type` | `type` if a known type, else `custom` |
//!
//! Empty strings count as missing, which makes [`RecordNormalizer::normalize`]
//! idempotent.

use crate::models::{MemoryRecord, MemoryType, UNKNOWN_MEMORY, now_iso, parse_timestamp, to_iso};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Converts raw JSON values into canonical memory records.
pub struct RecordNormalizer;

impl RecordNormalizer {
    /// Normalizes every element of `raw`. Never fails.
    #[must_use]
    pub fn normalize(raw: &[Value]) -> Vec<MemoryRecord> {
        raw.iter().map(Self::normalize_one).collect()
    }

    /// Normalizes a JSON array.
    ///
    /// Returns `None` for `null` or any other non-array value; the caller is
    /// responsible for substituting its own fallback set in that case.
    #[must_use]
    pub fn normalize_value(raw: &Value) -> Option<Vec<MemoryRecord>> {
        raw.as_array().map(|items| Self::normalize(items))
    }

    /// Normalizes a single raw object. Non-objects are treated as `{}`.
    #[must_use]
    pub fn normalize_one(raw: &Value) -> MemoryRecord {
        let empty = Map::new();
        let obj = raw.as_object().unwrap_or(&empty);

        let content = first_text(obj, &["content", "memory", "text"])
            .unwrap_or_else(|| UNKNOWN_MEMORY.to_string());
        let memory = first_text(obj, &["memory", "content", "text"])
            .unwrap_or_else(|| UNKNOWN_MEMORY.to_string());
        let created_at = obj
            .get("created_at")
            .and_then(coerce_timestamp)
            .unwrap_or_else(now_iso);
        let id = obj
            .get("id")
            .and_then(value_text)
            .unwrap_or_else(generate_mock_id);
        let memory_type = obj
            .get("type")
            .and_then(Value::as_str)
            .map(MemoryType::parse_or_default)
            .unwrap_or_default();

        MemoryRecord {
            id,
            content,
            memory,
            created_at,
            memory_type,
        }
    }
}

/// Returns a value as text: non-empty strings and numbers only.
pub(crate) fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Returns the first field in `keys` that holds usable text.
fn first_text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| obj.get(*k).and_then(value_text))
}

/// Keeps parseable timestamp strings verbatim and converts epoch millis.
fn coerce_timestamp(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => parse_timestamp(s).map(|_| s.clone()),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(to_iso),
        _ => None,
    }
}

/// Generates an id for a record that arrived without one.
fn generate_mock_id() -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "mock-{}-{}",
        crate::current_timestamp_millis(),
        &random[..9]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_record_kept() {
        let raw = json!({
            "id": "m1",
            "content": "likes tea",
            "memory": "likes tea",
            "created_at": "2024-01-01T00:00:00.000Z",
            "type": "preference"
        });
        let record = RecordNormalizer::normalize_one(&raw);
        assert_eq!(record.id, "m1");
        assert_eq!(record.content, "likes tea");
        assert_eq!(record.created_at, "2024-01-01T00:00:00.000Z");
        assert_eq!(record.memory_type, MemoryType::Preference);
    }

    #[test]
    fn test_text_fallbacks() {
        let record = RecordNormalizer::normalize_one(&json!({"text": "from text"}));
        assert_eq!(record.content, "from text");
        assert_eq!(record.memory, "from text");

        let record = RecordNormalizer::normalize_one(&json!({"memory": "from memory"}));
        assert_eq!(record.content, "from memory");

        let record = RecordNormalizer::normalize_one(&json!({"content": "", "memory": ""}));
        assert_eq!(record.content, UNKNOWN_MEMORY);
        assert_eq!(record.memory, UNKNOWN_MEMORY);
    }

    #[test]
    fn test_content_and_memory_keep_their_own_priority() {
        let record =
            RecordNormalizer::normalize_one(&json!({"content": "display", "memory": "raw"}));
        assert_eq!(record.content, "display");
        assert_eq!(record.memory, "raw");
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let record = RecordNormalizer::normalize_one(&json!({"memory": "x", "type": "weird"}));
        assert!(record.id.starts_with("mock-"));
        assert_eq!(record.memory_type, MemoryType::Custom);
        assert!(record.created_at_parsed().is_some());
    }

    #[test]
    fn test_invalid_created_at_replaced() {
        let record =
            RecordNormalizer::normalize_one(&json!({"memory": "x", "created_at": "yesterday-ish"}));
        assert_ne!(record.created_at, "yesterday-ish");
        assert!(record.created_at_parsed().is_some());
    }

    #[test]
    fn test_epoch_millis_created_at() {
        let record =
            RecordNormalizer::normalize_one(&json!({"memory": "x", "created_at": 1_704_067_200_000_i64}));
        assert_eq!(record.created_at, "2024-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_numeric_id() {
        let record = RecordNormalizer::normalize_one(&json!({"id": 42, "memory": "x"}));
        assert_eq!(record.id, "42");
    }

    #[test]
    fn test_non_object_element() {
        let records = RecordNormalizer::normalize(&[json!(5), json!(null)]);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.memory == UNKNOWN_MEMORY));
    }

    #[test]
    fn test_non_array_left_to_caller() {
        assert!(RecordNormalizer::normalize_value(&json!(null)).is_none());
        assert!(RecordNormalizer::normalize_value(&json!({"memories": []})).is_none());
        assert_eq!(
            RecordNormalizer::normalize_value(&json!([{"memory": "a"}])).map(|v| v.len()),
            Some(1)
        );
    }

    #[test]
    fn test_idempotent() {
        let raw = vec![
            json!({"text": "a"}),
            json!({"memory": "b", "created_at": "bad", "type": "search"}),
            json!(7),
        ];
        let once = RecordNormalizer::normalize(&raw);
        let again: Vec<Value> = once
            .iter()
            .map(|r| serde_json::to_value(r).unwrap())
            .collect();
        assert_eq!(RecordNormalizer::normalize(&again), once);
    }
}
