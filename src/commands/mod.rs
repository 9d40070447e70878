//! Command handlers module.
//!
//! This module organizes the CLI command implementations into separate files:
//! - `io.rs`: Import and export commands
//! - `store.rs`: Store browsing commands (list, search)
//! - `config.rs`: Configuration display command

mod config;
mod io;
mod store;

// Re-export command functions
pub use config::cmd_config;
pub use io::{cmd_export, cmd_import};
pub use store::{cmd_list, cmd_search};

/// Maximum itemized errors or warnings printed after an import.
const MAX_LISTED: usize = 10;

/// Prints up to [`MAX_LISTED`] items under a heading.
fn print_listing(heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!();
    println!("{heading} ({}):", items.len());
    for item in items.iter().take(MAX_LISTED) {
        println!("  - {item}");
    }
    if items.len() > MAX_LISTED {
        println!("  ... and {} more", items.len() - MAX_LISTED);
    }
}
