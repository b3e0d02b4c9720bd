//! Survey statistics
//!
//! Counters gathered while the crawl drains, printed at the end of a run.

use crate::record::PageKind;
use crate::state::EntryState;
use std::collections::BTreeMap;

/// Survey statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Number of domains in the requested range
    pub domains_requested: usize,

    /// Domains whose entry-point leg resolved
    pub entry_points_resolved: usize,

    /// Domains whose candidates all returned 404 (or were unresolved up front)
    pub entry_points_missing: usize,

    /// Domains whose entry-point leg ended on a transport or HTTP error
    pub entry_points_aborted: usize,

    /// Emitted records by page type
    pub records_by_kind: BTreeMap<PageKind, usize>,

    /// Records dropped after a fatal reverse lookup error
    pub dropped_records: usize,

    /// Fetches abandoned on an HTTP or transport error
    pub failed_fetches: usize,

    /// Requests admitted by the scheduler
    pub requests_issued: usize,

    /// Rows written to the output table
    pub rows_written: usize,

    /// Rows with no record behind them
    pub empty_rows: usize,
}

impl CrawlStatistics {
    /// Counts the terminal state of one entry-point leg
    pub fn record_entry(&mut self, state: EntryState) {
        match state {
            EntryState::Resolved { .. } => self.entry_points_resolved += 1,
            EntryState::Exhausted => self.entry_points_missing += 1,
            EntryState::Aborted => self.entry_points_aborted += 1,
            EntryState::Start | EntryState::Pending { .. } => {}
        }
    }

    pub fn record_page(&mut self, kind: PageKind) {
        *self.records_by_kind.entry(kind).or_insert(0) += 1;
    }

    pub fn total_records(&self) -> usize {
        self.records_by_kind.values().sum()
    }

    /// Adds the counters of another partial tally
    pub fn merge(&mut self, other: &CrawlStatistics) {
        self.domains_requested += other.domains_requested;
        self.entry_points_resolved += other.entry_points_resolved;
        self.entry_points_missing += other.entry_points_missing;
        self.entry_points_aborted += other.entry_points_aborted;
        for (kind, count) in &other.records_by_kind {
            *self.records_by_kind.entry(*kind).or_insert(0) += count;
        }
        self.dropped_records += other.dropped_records;
        self.failed_fetches += other.failed_fetches;
        self.requests_issued += other.requests_issued;
        self.rows_written += other.rows_written;
        self.empty_rows += other.empty_rows;
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Survey Statistics ===\n");

    println!("Domains:");
    println!("  Requested: {}", stats.domains_requested);
    println!("  Entry point resolved: {}", stats.entry_points_resolved);
    println!("  No entry point: {}", stats.entry_points_missing);
    println!("  Entry point aborted: {}", stats.entry_points_aborted);
    println!();

    println!("Records by Type:");
    for (kind, count) in &stats.records_by_kind {
        println!("  {}: {}", kind, count);
    }
    println!("  Total: {}", stats.total_records());
    if stats.dropped_records > 0 {
        println!("  Dropped: {}", stats.dropped_records);
    }
    println!();

    println!("Requests: {} ({} abandoned)", stats.requests_issued, stats.failed_fetches);

    let coverage = if stats.rows_written > 0 {
        ((stats.rows_written - stats.empty_rows) as f64 / stats.rows_written as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Coverage: {:.1}% ({} / {} rows with data)",
        coverage,
        stats.rows_written - stats.empty_rows,
        stats.rows_written
    );
}
