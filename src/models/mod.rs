//! Data models for memport.
//!
//! This module contains the record, filter and scope types shared by the
//! import/export pipelines and the memory store adapters.

mod filter;
mod memory;
mod scope;

pub use filter::{DateRange, ExportFilter};
pub use memory::{
    MemoryRecord, MemoryType, UNKNOWN_MEMORY, now_iso, parse_timestamp, to_iso,
};
pub use scope::{DEFAULT_FAMILY, MemoryScope};
