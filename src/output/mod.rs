//! Output module for aggregating and exporting survey results
//!
//! This module handles:
//! - The column-group schema of the exported table
//! - Collapsing per-page records into one row per requested domain
//! - Writing the CSV table and the JSON Lines record file
//! - Run statistics

mod aggregate;
mod records;
mod schema;
pub mod stats;
mod table;

pub use aggregate::{Aggregator, WebsiteAggregate};
pub use records::write_records;
pub use schema::{FieldGroups, SchemaError};
pub use stats::{print_statistics, CrawlStatistics};
pub use table::{write_table, write_table_to};
