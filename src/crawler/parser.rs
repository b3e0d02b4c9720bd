//! Sitemap parser
//!
//! Extracts page locations from `<urlset>` documents and nested sitemap
//! locations from `<sitemapindex>` documents.

use sitemap::reader::{SiteMapEntity, SiteMapReader};
use std::io::Cursor;
use url::Url;

/// Locations listed by one sitemap document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSitemap {
    /// `<url><loc>` entries
    pub pages: Vec<Url>,

    /// `<sitemap><loc>` entries of a sitemap index
    pub sitemaps: Vec<Url>,
}

impl ParsedSitemap {
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty() && self.sitemaps.is_empty()
    }
}

/// Parses a sitemap document
///
/// Parsing stops at the first XML error, keeping what was read so far; a
/// document that is not a sitemap at all yields an empty result.
///
/// # Example
///
/// ```
/// use sitemap_survey::crawler::parse_sitemap;
///
/// let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
/// <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
///   <url><loc>https://x.nz/about-us</loc></url>
/// </urlset>"#;
/// let parsed = parse_sitemap(xml);
/// assert_eq!(parsed.pages[0].as_str(), "https://x.nz/about-us");
/// ```
pub fn parse_sitemap(xml: &str) -> ParsedSitemap {
    let mut parsed = ParsedSitemap::default();

    for entity in SiteMapReader::new(Cursor::new(xml.as_bytes())) {
        match entity {
            SiteMapEntity::Url(entry) => {
                if let Some(url) = entry.loc.get_url() {
                    push_unique(&mut parsed.pages, url);
                }
            }
            SiteMapEntity::SiteMap(entry) => {
                if let Some(url) = entry.loc.get_url() {
                    push_unique(&mut parsed.sitemaps, url);
                }
            }
            SiteMapEntity::Err(e) => {
                tracing::debug!("Sitemap parsing stopped: {:?}", e);
                break;
            }
        }
    }

    parsed
}

fn push_unique(urls: &mut Vec<Url>, url: Url) {
    if matches!(url.scheme(), "http" | "https") && !urls.contains(&url) {
        urls.push(url);
    }
}
