//! Page classifier
//!
//! Ordered `(regex, kind)` rules matched against the URL path; the first
//! match selects the handler.

use crate::config::PageRuleEntry;
use crate::record::PageKind;
use crate::ConfigError;
use regex::{Regex, RegexBuilder};
use url::Url;

/// Routes sitemap-listed URLs to page handlers
#[derive(Debug, Clone)]
pub struct PageClassifier {
    rules: Vec<(Regex, PageKind)>,
}

impl PageClassifier {
    /// Compiles the configured rules, case-insensitively
    pub fn new(rules: &[PageRuleEntry]) -> Result<Self, ConfigError> {
        let rules = rules
            .iter()
            .map(|rule| {
                RegexBuilder::new(&rule.pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|re| (re, rule.handler))
                    .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", rule.pattern, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rules })
    }

    /// Returns the kind of the first rule matching the URL path, or `Generic`
    pub fn classify(&self, url: &Url) -> PageKind {
        self.matching_rule(url).unwrap_or(PageKind::Generic)
    }

    /// Returns the kind of the first matching rule, if any
    ///
    /// Sitemap entries are only dispatched when a rule matches.
    pub fn matching_rule(&self, url: &Url) -> Option<PageKind> {
        let path = url.path();
        self.rules
            .iter()
            .find(|(re, _)| re.is_match(path))
            .map(|(_, kind)| *kind)
    }
}
