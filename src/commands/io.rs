//! Import and export command handlers.

use std::io::Write;
use std::path::Path;

use memport::config::MemportConfig;
use memport::io::{
    CancellationFlag, ExportFormat, ExportService, ImportOptions, ImportService,
    ProgressReporter, ProgressSnapshot,
};
use memport::models::{DateRange, ExportFilter, MemoryType, parse_timestamp};
use memport::store::build_store;
use memport::{Error, Result};

use super::print_listing;

/// Progress reporter that redraws a single status line on stdout.
fn line_progress() -> ProgressReporter {
    ProgressReporter::with_observer(Box::new(|snapshot: &ProgressSnapshot| {
        if snapshot.step.is_empty() {
            return;
        }
        print!("\r\x1b[2K[{:>3}%] {}", snapshot.percent, snapshot.step);
        let _ = std::io::stdout().flush();
    }))
}

/// Executes the import command.
pub fn cmd_import(
    config: &MemportConfig,
    file: &Path,
    options: ImportOptions,
    cancel: CancellationFlag,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let store = build_store(config)?;
    let existing = store.get_memories(&config.scope, config.fetch_limit)?;
    tracing::debug!(existing = existing.len(), scope = %config.scope, "Loaded destination");

    let service = ImportService::new(store, config.scope.clone()).with_cancellation(cancel);
    let mut progress = line_progress();
    let result = service.import_from_file(file, &existing, &options, &mut progress);

    // Clear progress line before printing the summary or the error
    println!();
    let outcome = result?;

    println!();
    if outcome.cancelled {
        println!("Import cancelled:");
    } else {
        println!("Import completed ({} mode):", outcome.mode);
    }
    println!("  Imported:        {}", outcome.success_count);
    println!("  Failed:          {}", outcome.failed_count);
    println!("  Skipped (dupe):  {}", outcome.skipped_duplicates);
    println!("  Total:           {}", outcome.total);

    print_listing("Warnings", &outcome.warnings);
    print_listing("Errors", &outcome.errors);

    Ok(())
}

/// Executes the export command.
pub fn cmd_export(
    config: &MemportConfig,
    format: Option<String>,
    types: &[String],
    since: Option<String>,
    until: Option<String>,
    output: &Path,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let format = match format {
        Some(f) => f.parse::<ExportFormat>()?,
        None => config.export.format,
    };
    let filter = build_filter(types, since.as_deref(), until.as_deref())?;

    let store = build_store(config)?;
    let records = store.get_memories(&config.scope, config.fetch_limit)?;

    let service = ExportService::new(config.export.source.clone());
    let mut progress = line_progress();
    let result = service.export_to_dir(output, &records, &filter, format, &mut progress);

    println!();
    let result = result?;

    println!();
    println!("Export completed:");
    println!("  Exported:  {}", result.exported);
    println!("  Total:     {}", result.total);
    println!("  Format:    {}", result.format);
    println!("  Output:    {}", result.output_path.display());

    Ok(())
}

/// Builds an export filter from CLI arguments.
fn build_filter(types: &[String], since: Option<&str>, until: Option<&str>) -> Result<ExportFilter> {
    let mut filter = ExportFilter::all();

    if !types.is_empty() {
        let parsed = types
            .iter()
            .map(|t| {
                MemoryType::parse(t)
                    .ok_or_else(|| Error::InvalidInput(format!("Unknown memory type: {t}")))
            })
            .collect::<Result<Vec<_>>>()?;
        filter = filter.with_types(parsed);
    }

    let parse_bound = |value: Option<&str>| {
        value
            .map(|v| {
                parse_timestamp(v).ok_or_else(|| Error::InvalidInput(format!("Invalid date: {v}")))
            })
            .transpose()
    };
    let date_range = DateRange {
        start: parse_bound(since)?,
        end: parse_bound(until)?,
    };
    Ok(filter.with_date_range(date_range))
}
