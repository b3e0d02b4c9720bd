//! Robots.txt handling module
//!
//! A robots.txt file is one of the entry points a domain can resolve to. It
//! is parsed for `Sitemap:` directives and, when robots compliance is
//! enabled, consulted before fetching sitemap-listed pages.

mod parser;

pub use parser::ParsedRobots;

/// Checks if a URL is allowed by robots.txt
///
/// A missing robots.txt (`None`) allows everything.
pub fn is_allowed(robots: Option<&ParsedRobots>, url: &str, user_agent: &str) -> bool {
    robots.map_or(true, |robots| robots.is_allowed(url, user_agent))
}

/// Returns true if the URL points at a robots.txt file
pub fn is_robots_url(url: &url::Url) -> bool {
    url.path().eq_ignore_ascii_case("/robots.txt")
}
