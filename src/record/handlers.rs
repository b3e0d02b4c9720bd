//! Page handlers
//!
//! A handler fills a record from a parsed page. Type-specific handlers set
//! their `PageDetails` variant and then delegate to `generic_handler` for the
//! fields every page shares.

use super::ecommerce::classify_document;
use super::{HomepageDetails, HostingInfo, PageDetails, PageKind, PageRecord, Provenance};
use crate::crawler::FetchedPage;
use crate::url::url_level;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Signature shared by all page handlers
pub type Handler = fn(&mut PageRecord, &PageContent<'_>, &HandlerContext<'_>);

/// A fetched page together with its parsed document
pub struct PageContent<'a> {
    pub page: &'a FetchedPage,
    pub document: &'a Html,
    /// URL of the sitemap or page that listed this one
    pub referer: Option<&'a str>,
}

/// Inputs handlers need beyond the page itself
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    /// Identity of the requested domain the page was reached from
    pub website: &'a str,
    pub social_platforms: &'a [String],
    /// Connection fields, already resolved under the field policy
    pub hosting: &'a HostingInfo,
}

/// Parses the page body and runs the handler for `kind`
pub fn build_record(
    kind: PageKind,
    page: &FetchedPage,
    referer: Option<&str>,
    context: &HandlerContext<'_>,
) -> PageRecord {
    let document = Html::parse_document(&page.body);
    let content = PageContent {
        page,
        document: &document,
        referer,
    };

    let mut record = PageRecord::new(kind);
    (kind.handler())(&mut record, &content, context);
    record
}

/// Fields every page carries: identity, level, status, hosting, phones, social links
///
/// `website` comes from the requested domain, not the final URL, so a
/// redirect to another host still joins to the requested row.
pub(super) fn generic_handler(
    record: &mut PageRecord,
    content: &PageContent<'_>,
    context: &HandlerContext<'_>,
) {
    let url = content.page.url.as_str();

    record.url = url.to_string();
    record.level = url_level(url);
    record.referer = content.referer.map(str::to_string);
    record.website = context.website.to_string();
    record.status_code = content.page.status_code;
    record.hosting = context.hosting.clone();
    record.provenance = content
        .page
        .wayback_url
        .as_deref()
        .map(Provenance::from_wayback_url);

    let Ok(anchors) = Selector::parse("a[href]") else {
        return;
    };

    for anchor in content.document.select(&anchors) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };

        if let Some(number) = phone_number(href, &anchor) {
            record.phone_numbers.insert(number);
        }

        if context
            .social_platforms
            .iter()
            .any(|platform| href.contains(platform.as_str()))
        {
            record.social_links.insert(href.to_string());
        }
    }
}

/// About-us and contact pages carry no fields of their own
pub(super) fn about_us_handler(
    record: &mut PageRecord,
    content: &PageContent<'_>,
    context: &HandlerContext<'_>,
) {
    record.details = PageDetails::AboutUs;
    generic_handler(record, content, context);
}

/// Homepage metadata and commerce detection
pub(super) fn homepage_handler(
    record: &mut PageRecord,
    content: &PageContent<'_>,
    context: &HandlerContext<'_>,
) {
    let document = content.document;
    let profile = classify_document(document, &content.page.body);

    record.details = PageDetails::Homepage(HomepageDetails {
        title: first_text(document, "title"),
        description: meta_content(document, "description"),
        author: meta_content(document, "author"),
        copyright: copyright_lines(document),
        cart_software: profile.cart_software,
        has_card: profile.has_card,
        payment_systems: profile.payment_systems,
    });

    generic_handler(record, content, context);
}

/// Number from a `tel:` link, falling back to the link text
fn phone_number(href: &str, anchor: &ElementRef<'_>) -> Option<String> {
    let scheme = href.get(..4)?;
    if !scheme.eq_ignore_ascii_case("tel:") {
        return None;
    }

    let number = href[4..].trim();
    let number = if number.is_empty() {
        anchor.text().collect::<String>().trim().to_string()
    } else {
        number.to_string()
    };

    (!number.is_empty()).then_some(number)
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let text = document
        .select(&selector)
        .next()?
        .text()
        .collect::<String>()
        .trim()
        .to_string();
    (!text.is_empty()).then_some(text)
}

fn meta_content(document: &Html, name: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"meta[name="{}"][content]"#, name)).ok()?;
    let content = document
        .select(&selector)
        .next()?
        .value()
        .attr("content")?
        .trim()
        .to_string();
    (!content.is_empty()).then_some(content)
}

/// Footer lines mentioning a copyright
fn copyright_lines(document: &Html) -> Vec<String> {
    static COPYRIGHT: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(copyright) = COPYRIGHT
        .get_or_init(|| Regex::new(r"(?i)(©|copyright)").ok())
        .as_ref()
    else {
        return Vec::new();
    };

    let Ok(footer) = Selector::parse("footer") else {
        return Vec::new();
    };
    let Some(footer) = document.select(&footer).next() else {
        return Vec::new();
    };

    let text = footer.text().collect::<String>();
    let mut lines: Vec<String> = Vec::new();
    for line in text.split(['\n', '\t', '\r']) {
        let line = line.trim();
        if !line.is_empty() && copyright.is_match(line) && !lines.iter().any(|l| l == line) {
            lines.push(line.to_string());
        }
    }
    lines
}
