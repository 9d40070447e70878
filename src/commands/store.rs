//! Store browsing command handlers.

use memport::config::MemportConfig;
use memport::models::MemoryRecord;
use memport::store::build_store;

/// Width of the text column before truncation.
const TEXT_WIDTH: usize = 80;

/// Executes the list command.
pub fn cmd_list(
    config: &MemportConfig,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = build_store(config)?;
    let records = store.get_memories(&config.scope, limit)?;

    if records.is_empty() {
        println!("No memories stored for {}", config.scope);
        return Ok(());
    }

    println!("Memories for {} ({}):", config.scope, records.len());
    print_records(&records);
    Ok(())
}

/// Executes the search command.
pub fn cmd_search(
    config: &MemportConfig,
    query: &str,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = build_store(config)?;
    let records = store.search_memories(&config.scope, query, limit)?;

    if records.is_empty() {
        println!("No memories found matching '{query}'");
        return Ok(());
    }

    println!("Found {} memories matching '{query}':", records.len());
    print_records(&records);
    Ok(())
}

fn print_records(records: &[MemoryRecord]) {
    println!();
    for (i, record) in records.iter().enumerate() {
        println!(
            "{}. [{}] {} ({})",
            i + 1,
            record.memory_type,
            truncate(record.text(), TEXT_WIDTH),
            record.created_at
        );
        println!("   id: {}", record.id);
    }
}

fn truncate(text: &str, width: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= width {
        return single_line;
    }
    let head: String = single_line.chars().take(width.saturating_sub(3)).collect();
    format!("{head}...")
}
