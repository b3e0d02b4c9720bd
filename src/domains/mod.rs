//! Domain list loading
//!
//! The domain list is a plain text file with one domain per line. Lines 1-3
//! hold header metadata; domains start at line 4. Runs operate on a
//! `[start, end)` slice addressed by 1-based line numbers.

mod range;

pub use range::{DomainRange, FIRST_DOMAIN_LINE};

use std::path::Path;

/// A domain selected for a run, with its line number in the source list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedDomain {
    pub line: usize,
    pub domain: String,
}

/// The full, ordered domain list
#[derive(Debug, Clone, Default)]
pub struct DomainList {
    lines: Vec<String>,
}

impl DomainList {
    /// Reads the domain list from a file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_content(&content))
    }

    pub fn from_content(content: &str) -> Self {
        Self {
            lines: content.lines().map(|line| line.trim().to_string()).collect(),
        }
    }

    /// Total number of lines, header rows included
    pub fn total_lines(&self) -> usize {
        self.lines.len()
    }

    /// Parses and validates a range against this list
    pub fn range(&self, start: &str, end: &str) -> crate::ConfigResult<DomainRange> {
        DomainRange::from_args(start, end, self.total_lines())
    }

    /// Returns the domains on lines `[range.start, range.end)`
    ///
    /// Blank lines inside the range are skipped.
    pub fn slice(&self, range: DomainRange) -> Vec<RequestedDomain> {
        let first = range.start.saturating_sub(1).min(self.lines.len());
        let last = range.end.saturating_sub(1).min(self.lines.len());

        self.lines[first..last]
            .iter()
            .enumerate()
            .filter(|(_, domain)| !domain.is_empty())
            .map(|(offset, domain)| RequestedDomain {
                line: range.start + offset,
                domain: domain.clone(),
            })
            .collect()
    }
}
