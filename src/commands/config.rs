//! Config command handler.
//!
//! Prints the effective configuration after file loading and environment
//! overrides. The API key is never printed.

use memport::config::MemportConfig;

/// Config command.
pub fn cmd_config(config: &MemportConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("Current Configuration");
    println!("=====================");
    println!();

    println!("Data Directory: {}", config.data_dir.display());
    println!("Fetch Limit: {}", config.fetch_limit);
    println!();

    println!("Store:");
    println!("  Backend: {}", config.store.backend);
    println!(
        "  Base URL: {}",
        config.store.base_url.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  API Key: {}",
        if config.store.api_key.is_some() {
            "(set)"
        } else {
            "(not set)"
        }
    );
    println!("  Timeout: {}s", config.store.timeout_secs);
    println!();

    println!("Scope:");
    println!("  User ID: {}", config.scope.user_id);
    println!("  Family: {}", config.scope.family);
    println!();

    println!("Export:");
    println!("  Source: {}", config.export.source);
    println!("  Format: {}", config.export.format);
    println!();

    println!("Import:");
    println!("  Mode: {}", config.import.mode);
    println!("  Skip Duplicates: {}", config.import.skip_duplicates);
    println!(
        "  Validate Before Import: {}",
        config.import.validate_before_import
    );
    println!("  Duplicate Policy: {}", config.import.duplicate_policy);
    println!();

    println!("Logging:");
    println!("  Format: {}", config.logging.format);
    println!("  Level: {}", config.logging.level);
    if let Some(ref file) = config.logging.file {
        println!("  File: {}", file.display());
    }

    Ok(())
}
