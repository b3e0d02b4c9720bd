use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// First line of the domain list that holds a domain; lines 1-3 are header rows
pub const FIRST_DOMAIN_LINE: usize = 4;

/// A `[start, end)` slice of the domain list by 1-based line numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomainRange {
    pub start: usize,
    pub end: usize,
}

impl DomainRange {
    /// Creates a range without bounds checks
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Parses and validates the `cc_start`/`cc_end` command-line arguments
    ///
    /// # Arguments
    ///
    /// * `start` - Raw `cc_start` argument
    /// * `end` - Raw `cc_end` argument
    /// * `total_lines` - Number of lines in the domain list
    ///
    /// # Returns
    ///
    /// * `Ok(DomainRange)` - `4 <= start < end <= total_lines + 1`
    /// * `Err(ConfigError::Range)` - Any argument is malformed or out of bounds
    pub fn from_args(start: &str, end: &str, total_lines: usize) -> Result<Self, ConfigError> {
        let (start, end) = match (start.trim().parse::<usize>(), end.trim().parse::<usize>()) {
            (Ok(s), Ok(e)) => (s, e),
            _ => {
                return Err(ConfigError::Range(
                    "cc_start and cc_end must be integers".to_string(),
                ))
            }
        };

        if start >= end {
            return Err(ConfigError::Range(format!(
                "cc_start must be less than cc_end (got {} and {})",
                start, end
            )));
        }

        if start < FIRST_DOMAIN_LINE {
            return Err(ConfigError::Range(format!(
                "cc_start must be >= {} (lines 1-3 are headers), got {}",
                FIRST_DOMAIN_LINE, start
            )));
        }

        let max_end = total_lines + 1;
        if end > max_end {
            return Err(ConfigError::Range(format!(
                "cc_end out of bounds (must be <= {}), got {}",
                max_end, end
            )));
        }

        Ok(Self { start, end })
    }

    /// Number of lines covered by the range
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for DomainRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range_error(start: &str, end: &str, total: usize) -> String {
        match DomainRange::from_args(start, end, total) {
            Err(ConfigError::Range(msg)) => msg,
            other => panic!("expected range error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_range() {
        let range = DomainRange::from_args("4", "14", 20).unwrap();
        assert_eq!(range, DomainRange::new(4, 14));
        assert_eq!(range.len(), 10);
    }

    #[test]
    fn test_end_may_be_one_past_last_line() {
        assert!(DomainRange::from_args("4", "21", 20).is_ok());
        assert!(range_error("4", "22", 20).contains("out of bounds"));
    }

    #[test]
    fn test_non_integer_arguments() {
        assert!(range_error("four", "10", 20).contains("must be integers"));
        assert!(range_error("4", "1.5", 20).contains("must be integers"));
        assert!(range_error("-4", "10", 20).contains("must be integers"));
    }

    #[test]
    fn test_start_must_be_less_than_end() {
        assert!(range_error("10", "10", 20).contains("less than"));
        assert!(range_error("12", "10", 20).contains("less than"));
    }

    #[test]
    fn test_header_lines_excluded() {
        assert!(range_error("3", "10", 20).contains(">= 4"));
        assert!(range_error("1", "2", 20).contains(">= 4"));
    }

    #[test]
    fn test_display() {
        assert_eq!(DomainRange::new(4, 6).to_string(), "[4, 6)");
    }
}
