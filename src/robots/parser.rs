//! Robots.txt parser implementation
//!
//! This module provides functionality for parsing robots.txt content using the robotstxt crate.

use robotstxt::DefaultMatcher;
use url::Url;

/// Parsed robots.txt data
///
/// This is a wrapper around the robotstxt crate's matcher, providing a
/// simplified interface for checking if URLs are allowed and for listing the
/// sitemaps a site declares.
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty string means allow all)
    content: String,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `url` - The absolute URL to check
    /// * `user_agent` - The user agent string
    ///
    /// # Returns
    ///
    /// * `true` - If the URL is allowed
    /// * `false` - If the URL is disallowed
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Lists the sitemap URLs declared with `Sitemap:` directives
    ///
    /// Directive names are matched case-insensitively. Relative sitemap
    /// locations are resolved against `base` (the robots.txt URL); entries that
    /// do not resolve to an HTTP(S) URL are skipped.
    pub fn sitemaps(&self, base: &Url) -> Vec<Url> {
        let mut sitemaps = Vec::new();

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            if !key.trim().eq_ignore_ascii_case("sitemap") {
                continue;
            }

            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match base.join(value) {
                Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
                    if !sitemaps.contains(&url) {
                        sitemaps.push(url);
                    }
                }
                _ => tracing::debug!("Ignoring sitemap directive '{}' in {}", value, base),
            }
        }

        sitemaps
    }
}
