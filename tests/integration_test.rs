//! Integration tests for memport.
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::too_many_lines,
    clippy::doc_markdown
)]

use std::sync::{Arc, Mutex};

use memport::config::{MemportConfig, StoreBackend};
use memport::io::{
    CSV_FIELDS, CsvCodec, ExportFormat, ExportService, ImportMode, ImportOptions, ImportService,
    ProgressReporter,
};
use memport::models::{ExportFilter, MemoryRecord, MemoryScope, MemoryType};
use memport::store::{InMemoryStore, MemoryStore, build_store};
use memport::{Error, Result};
use serde_json::Value;
use tempfile::TempDir;

/// Store that records every `store_memory` call and accepts everything.
#[derive(Default)]
struct CountingStore {
    calls: Mutex<Vec<String>>,
}

impl CountingStore {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl MemoryStore for CountingStore {
    fn get_memories(&self, _: &MemoryScope, _: usize) -> Result<Vec<MemoryRecord>> {
        Ok(Vec::new())
    }

    fn store_memory(&self, _: &MemoryScope, text: &str) -> Result<bool> {
        self.calls.lock().unwrap().push(text.to_string());
        Ok(true)
    }

    fn search_memories(&self, _: &MemoryScope, _: &str, _: usize) -> Result<Vec<MemoryRecord>> {
        Ok(Vec::new())
    }

    fn clear_memories(&self, _: &MemoryScope) -> Result<usize> {
        Ok(0)
    }
}

fn import_with(
    store: Arc<dyn MemoryStore>,
    file_name: &str,
    content: &str,
    existing: &[MemoryRecord],
    options: &ImportOptions,
) -> Result<memport::io::ImportOutcome> {
    let mut progress = ProgressReporter::new();
    ImportService::new(store, MemoryScope::default()).import(
        file_name,
        content,
        existing,
        options,
        &mut progress,
    )
}

mod scenarios {
    use super::*;

    #[test]
    fn test_scenario_a_pretty_json_export() {
        let records: Vec<MemoryRecord> = (1..=3)
            .map(|i| MemoryRecord::new(i.to_string(), format!("note {i}")))
            .collect();
        let filter = ExportFilter::all().with_types([MemoryType::Custom]);
        let mut progress = ProgressReporter::new();

        let artifact = ExportService::new("memport")
            .export(&records, &filter, ExportFormat::JsonPretty, &mut progress)
            .unwrap();

        let doc: Value = serde_json::from_str(&artifact.content).unwrap();
        assert_eq!(doc["memories"].as_array().unwrap().len(), 3);
        assert_eq!(doc["total_memories"], 3);
        assert_eq!(progress.snapshot().percent, 100);
    }

    #[test]
    fn test_scenario_b_quoted_header_csv() {
        let text = "\"id,memory,created_at,type\"\n\"1\",\"hello\",\"2024-01-01T00:00:00.000Z\",\"custom\"";
        let rows = CsvCodec::decode(text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("memory"), Some("hello"));
    }

    #[test]
    fn test_scenario_c_empty_memories_array() {
        let err = import_with(
            Arc::new(CountingStore::default()),
            "backup.json",
            r#"{"memories": []}"#,
            &[],
            &ImportOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::NoValidRecords));
    }

    #[test]
    fn test_scenario_d_ten_csv_rows() {
        let mut text = String::from("id,memory,created_at,type");
        for i in 0..10 {
            text.push_str(&format!("\n{i},memory number {i},2024-01-01T00:00:00.000Z,custom"));
        }
        let store = Arc::new(CountingStore::default());

        let outcome = import_with(
            store.clone(),
            "rows.csv",
            &text,
            &[],
            &ImportOptions::default(),
        )
        .unwrap();

        assert_eq!(outcome.success_count, 10);
        assert_eq!(outcome.failed_count, 0);
        assert_eq!(store.calls().len(), 10);
    }
}

mod import_pipeline {
    use super::*;

    const FIVE_WITH_GAP: &str = r#"[
        {"memory": "first"},
        {"memory": "second"},
        {"memory": ""},
        {"memory": "fourth"},
        {"memory": "fifth"}
    ]"#;

    #[test]
    fn test_empty_record_is_non_fatal() {
        let store = Arc::new(CountingStore::default());
        let options = ImportOptions::default().with_validation(false);

        let outcome = import_with(store.clone(), "m.json", FIVE_WITH_GAP, &[], &options).unwrap();

        assert_eq!(outcome.total, 5);
        assert!(outcome.failed_count >= 1);
        assert_eq!(outcome.errors[0], "Memory at index 2 has no content");
        assert_eq!(store.calls(), vec!["first", "second", "fourth", "fifth"]);
    }

    #[test]
    fn test_validation_gate_is_all_or_nothing() {
        let store = Arc::new(CountingStore::default());

        let err = import_with(
            store.clone(),
            "m.json",
            FIVE_WITH_GAP,
            &[],
            &ImportOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(err, Error::InvalidRecords { count: 1 }));
        assert!(store.calls().is_empty());
    }

    #[test]
    fn test_duplicate_of_existing_skips_store() {
        let store = Arc::new(CountingStore::default());
        let existing = vec![MemoryRecord::new("e1", "likes tea")];

        let outcome = import_with(
            store.clone(),
            "m.json",
            r#"[{"memory": "likes tea"}, {"memory": "likes coffee"}]"#,
            &existing,
            &ImportOptions::default(),
        )
        .unwrap();

        assert_eq!(outcome.success_count, 1);
        assert_eq!(outcome.failed_count, 1);
        assert_eq!(outcome.skipped_duplicates, 1);
        assert_eq!(store.calls(), vec!["likes coffee"]);
    }

    #[test]
    fn test_append_also_skips_existing() {
        let store = Arc::new(CountingStore::default());
        let existing = vec![MemoryRecord::new("e1", "likes tea")];
        let options = ImportOptions::default().with_mode(ImportMode::Append);

        let outcome = import_with(
            store.clone(),
            "m.json",
            r#"[{"memory": "likes tea"}]"#,
            &existing,
            &options,
        )
        .unwrap();

        assert_eq!(outcome.skipped_duplicates, 1);
        assert!(store.calls().is_empty());
    }

    #[test]
    fn test_replace_clears_then_reimports() {
        let scope = MemoryScope::default();
        let existing = vec![
            MemoryRecord::new("e1", "likes tea"),
            MemoryRecord::new("e2", "stale"),
        ];
        let store = Arc::new(InMemoryStore::with_records(scope.clone(), existing.clone()));
        let options = ImportOptions::default().with_mode(ImportMode::Replace);

        let outcome = import_with(
            store.clone(),
            "m.json",
            r#"[{"memory": "likes tea"}, {"memory": "new"}]"#,
            &existing,
            &options,
        )
        .unwrap();

        assert_eq!(outcome.mode, ImportMode::Replace);
        assert_eq!(outcome.success_count, 2);
        assert_eq!(store.texts(&scope).unwrap(), vec!["likes tea", "new"]);
    }

    #[test]
    fn test_structural_errors() {
        let store: Arc<dyn MemoryStore> = Arc::new(CountingStore::default());
        let options = ImportOptions::default();

        let cases = [
            ("m.txt", "[]", "unsupported"),
            ("m.json", "{not json", "json"),
            ("m.json", r#"{"items": []}"#, "structure"),
            ("m.json", "42", "structure"),
            ("m.csv", "id,text\n1,hello", "format@1"),
            ("m.csv", "memory", "format"),
            ("m.csv", "id,memory\n1,a\n2", "format@3"),
        ];

        for (name, content, expected) in cases {
            let err = import_with(Arc::clone(&store), name, content, &[], &options).unwrap_err();
            assert_eq!(error_kind(&err), expected, "{name}: {err:?}");
        }
    }

    fn error_kind(err: &Error) -> String {
        match err {
            Error::UnsupportedFormat(_) => "unsupported".to_string(),
            Error::MalformedJson(_) => "json".to_string(),
            Error::MalformedStructure(_) => "structure".to_string(),
            Error::Format { line: Some(n), .. } => format!("format@{n}"),
            Error::Format { line: None, .. } => "format".to_string(),
            other => format!("{other:?}"),
        }
    }

    #[test]
    fn test_csv_quote_inside_field_imports() {
        let store = Arc::new(CountingStore::default());
        let outcome = import_with(
            store.clone(),
            "notes.csv",
            "id,memory,type\n1,say \"hi, there\",custom\n2,plain,search",
            &[],
            &ImportOptions::default(),
        )
        .unwrap();

        assert_eq!(outcome.success_count, 2);
        assert_eq!(store.calls(), vec!["say hi, there", "plain"]);
    }

    #[test]
    fn test_import_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Memories.JSON");
        std::fs::write(&path, r#"[{"text": "from disk"}]"#).unwrap();
        let store = Arc::new(CountingStore::default());
        let mut progress = ProgressReporter::new();

        let outcome = ImportService::new(store.clone(), MemoryScope::default())
            .import_from_file(&path, &[], &ImportOptions::default(), &mut progress)
            .unwrap();

        assert_eq!(outcome.success_count, 1);
        assert_eq!(store.calls(), vec!["from disk"]);
    }
}

mod file_store_round_trip {
    use super::*;

    #[test]
    fn test_csv_export_reimports_into_file_store() {
        let dir = TempDir::new().unwrap();
        let config = MemportConfig::default()
            .with_data_dir(dir.path())
            .with_backend(StoreBackend::File);
        let store = build_store(&config).unwrap();
        let scope = config.scope.clone();

        let source: Vec<MemoryRecord> = vec![
            MemoryRecord::new("a", "opened \"budget, 2024\".xlsx").with_type(MemoryType::FileOperation),
            MemoryRecord::new("b", "prefers dark mode").with_type(MemoryType::Preference),
        ];
        let mut progress = ProgressReporter::new();
        let artifact = ExportService::new("memport")
            .export(&source, &ExportFilter::all(), ExportFormat::Csv, &mut progress)
            .unwrap();
        assert!(artifact.content.starts_with(&format!("\"{}\"", CSV_FIELDS[0])));

        let outcome = ImportService::new(Arc::clone(&store), scope.clone())
            .import(
                "export.csv",
                &artifact.content,
                &[],
                &ImportOptions::default(),
                &mut progress,
            )
            .unwrap();
        assert_eq!(outcome.success_count, 2);

        let reopened = build_store(&config).unwrap();
        let texts: Vec<String> = reopened
            .get_memories(&scope, 10)
            .unwrap()
            .iter()
            .map(|r| r.text().to_string())
            .collect();
        assert_eq!(texts, vec!["opened \"budget, 2024\".xlsx", "prefers dark mode"]);

        // A second merge of the same file is all duplicates.
        let existing = reopened.get_memories(&scope, 10).unwrap();
        let again = ImportService::new(reopened, scope)
            .import(
                "export.csv",
                &artifact.content,
                &existing,
                &ImportOptions::default(),
                &mut progress,
            )
            .unwrap();
        assert_eq!(again.success_count, 0);
        assert_eq!(again.skipped_duplicates, 2);
    }
}
