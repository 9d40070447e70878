//! CSV codec for memory records.
//!
//! Encoding quotes every field. Decoding is line oriented: the text is split
//! on `\r?\n`, line 1 is the header, and each later non-blank line is one
//! record. Quoted fields may contain commas and doubled quotes but not line
//! breaks.

use crate::models::MemoryRecord;
use crate::{Error, Result};

/// Column set used for export and expected on import, in order.
pub const CSV_FIELDS: [&str; 4] = ["id", "memory", "created_at", "type"];

/// The one column an imported CSV must have.
pub const REQUIRED_COLUMN: &str = "memory";

/// One decoded data row: header name to raw string value, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvRow {
    fields: Vec<(String, String)>,
}

impl CsvRow {
    /// Creates a row from `(header, value)` pairs.
    #[must_use]
    pub const fn new(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    /// Returns the value under `column` (case-insensitive).
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the row has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates `(header, value)` pairs in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Encoder/decoder for the memory CSV format.
pub struct CsvCodec;

impl CsvCodec {
    /// Encodes records as CSV, one column per entry in `fields`.
    ///
    /// The first line is the header. Every field is wrapped in double quotes
    /// and embedded quotes are doubled. Lines are joined with `\n` and there
    /// is no trailing newline. Unknown field names produce empty columns.
    ///
    /// # Errors
    ///
    /// Returns an error if the CSV writer fails.
    pub fn encode<'a, I>(records: I, fields: &[&str]) -> Result<String>
    where
        I: IntoIterator<Item = &'a MemoryRecord>,
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .quote_style(csv::QuoteStyle::Always)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        writer
            .write_record(fields)
            .map_err(|e| Error::operation("write_csv_headers", e))?;

        for record in records {
            writer
                .write_record(fields.iter().map(|f| record.field(f).unwrap_or("")))
                .map_err(|e| Error::operation("write_csv", e))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| Error::operation("flush_csv", e.error()))?;
        let mut out = String::from_utf8(bytes).map_err(|e| Error::operation("encode_csv", e))?;
        if out.ends_with('\n') {
            out.pop();
        }
        Ok(out)
    }

    /// Decodes CSV text into header-keyed rows.
    ///
    /// Values are returned as-is; no type coercion or defaulting happens here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] if there are fewer than two lines, the
    /// header has no `memory` column, or a data row's field count differs
    /// from the header's (the error names the 1-based line).
    pub fn decode(text: &str) -> Result<Vec<CsvRow>> {
        let lines: Vec<&str> = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();

        if lines.len() < 2 {
            return Err(Error::Format {
                line: None,
                message: "CSV must contain a header row and at least one data row".to_string(),
            });
        }

        let headers = parse_header(lines[0]);
        if !headers
            .iter()
            .any(|h| h.eq_ignore_ascii_case(REQUIRED_COLUMN))
        {
            return Err(Error::Format {
                line: Some(1),
                message: format!("header must contain a '{REQUIRED_COLUMN}' column"),
            });
        }

        let mut rows = Vec::with_capacity(lines.len() - 1);
        for (idx, line) in lines.iter().enumerate().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            let line_number = idx + 1;
            let values = split_fields(line);
            if values.len() != headers.len() {
                return Err(Error::Format {
                    line: Some(line_number),
                    message: format!(
                        "expected {} fields, found {}",
                        headers.len(),
                        values.len()
                    ),
                });
            }
            rows.push(CsvRow::new(headers.iter().cloned().zip(values).collect()));
        }

        tracing::debug!(rows = rows.len(), columns = headers.len(), "Decoded CSV");
        Ok(rows)
    }
}

/// Splits the header on commas and strips surrounding quotes.
///
/// Tolerates both `"id","memory"` and a whole header wrapped in one pair of
/// quotes (`"id,memory,created_at,type"`).
fn parse_header(line: &str) -> Vec<String> {
    line.split(',')
        .map(|h| h.trim().trim_matches('"').trim().to_string())
        .collect()
}

/// Scans one data line with quote handling.
///
/// A `"` outside quotes enters quote mode wherever it appears in a field,
/// `""` inside quotes is a literal `"`, a lone `"` leaves quote mode and
/// commas outside quotes separate fields. An unterminated quote runs to the
/// end of the line.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            },
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MemoryType;

    fn record(id: &str, text: &str) -> MemoryRecord {
        MemoryRecord::new(id, text).with_created_at("2024-01-01T00:00:00.000Z")
    }

    #[test]
    fn test_encode_quotes_everything() {
        let out = CsvCodec::encode(&[record("1", "hello")], &CSV_FIELDS).unwrap();
        assert_eq!(
            out,
            "\"id\",\"memory\",\"created_at\",\"type\"\n\"1\",\"hello\",\"2024-01-01T00:00:00.000Z\",\"custom\""
        );
    }

    #[test]
    fn test_encode_escapes_quotes() {
        let out = CsvCodec::encode(&[record("1", "a\"b,c")], &["memory"]).unwrap();
        assert_eq!(out, "\"memory\"\n\"a\"\"b,c\"");
    }

    #[test]
    fn test_encode_unknown_field_is_empty() {
        let out = CsvCodec::encode(&[record("1", "x")], &["id", "bogus"]).unwrap();
        assert_eq!(out.lines().nth(1), Some("\"1\",\"\""));
    }

    #[test]
    fn test_decode_basic() {
        let text = "id,memory,created_at,type\n1,hello,2024-01-01T00:00:00.000Z,custom";
        let rows = CsvCodec::decode(text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("memory"), Some("hello"));
        assert_eq!(rows[0].get("TYPE"), Some("custom"));
    }

    #[test]
    fn test_decode_whole_header_quoted() {
        let text = "\"id,memory,created_at,type\"\n\"1\",\"hello\",\"2024-01-01T00:00:00.000Z\",\"custom\"";
        let rows = CsvCodec::decode(text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("memory"), Some("hello"));
        assert_eq!(rows[0].get("id"), Some("1"));
    }

    #[test]
    fn test_decode_quoted_comma_and_quote() {
        let text = "memory,type\n\"a\"\"b,c\",search";
        let rows = CsvCodec::decode(text).unwrap();
        assert_eq!(rows[0].get("memory"), Some("a\"b,c"));
        assert_eq!(rows[0].get("type"), Some("search"));
    }

    #[test]
    fn test_decode_quote_opened_mid_field() {
        let text = "id,memory,type\n1,say \"hi, there\",custom";
        let rows = CsvCodec::decode(text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("memory"), Some("say hi, there"));
        assert_eq!(rows[0].get("type"), Some("custom"));
    }

    #[test]
    fn test_split_fields_quote_rules() {
        assert_eq!(split_fields("\"a\"b"), vec!["ab"]);
        assert_eq!(split_fields("\"x\"\"y\",z"), vec!["x\"y", "z"]);
        assert_eq!(split_fields("a,,b"), vec!["a", "", "b"]);
        assert_eq!(split_fields("\"open, never closed"), vec!["open, never closed"]);
        assert_eq!(split_fields(""), vec![""]);
    }

    #[test]
    fn test_decode_crlf_and_blank_lines() {
        let text = "memory\r\nfirst\r\n\r\n   \r\nsecond\r\n";
        let rows = CsvCodec::decode(text).unwrap();
        let values: Vec<_> = rows.iter().filter_map(|r| r.get("memory")).collect();
        assert_eq!(values, vec!["first", "second"]);
    }

    #[test]
    fn test_decode_requires_two_lines() {
        let err = CsvCodec::decode("id,memory").unwrap_err();
        assert!(matches!(err, Error::Format { line: None, .. }));
    }

    #[test]
    fn test_decode_requires_memory_column() {
        let err = CsvCodec::decode("id,content\n1,hello").unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
        assert!(err.to_string().contains("memory"));
    }

    #[test]
    fn test_decode_field_count_mismatch_names_line() {
        let text = "id,memory\n1,ok\n2\n3,also ok";
        let err = CsvCodec::decode(text).unwrap_err();
        assert!(matches!(err, Error::Format { line: Some(3), .. }));

        let text = "id,memory\n1,ok,extra";
        let err = CsvCodec::decode(text).unwrap_err();
        assert!(matches!(err, Error::Format { line: Some(2), .. }));
    }

    #[test]
    fn test_round_trip() {
        let records = vec![
            record("1", "plain"),
            record("2", "with, comma").with_type(MemoryType::Search),
            record("3", "with \"quotes\"").with_type(MemoryType::FileOperation),
        ];
        let text = CsvCodec::encode(&records, &CSV_FIELDS).unwrap();
        let rows = CsvCodec::decode(&text).unwrap();
        assert_eq!(rows.len(), records.len());
        for (row, rec) in rows.iter().zip(&records) {
            for field in CSV_FIELDS {
                assert_eq!(row.get(field), rec.field(field));
            }
        }
    }
}
