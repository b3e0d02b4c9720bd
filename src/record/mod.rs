//! Page records
//!
//! One `PageRecord` is built per fetched page. Fields every page shares live
//! on the record itself (connection fields included); type-specific fields
//! live in the `PageDetails`
//! variant selected by the page's handler, and Wayback replay metadata in the
//! optional `Provenance`.

mod ecommerce;
mod handlers;
mod policy;

pub use ecommerce::{classify_content, ContentProfile};
pub use handlers::{build_record, Handler, HandlerContext, PageContent};
pub use policy::{
    LookupError, NetworkFieldPolicy, ReverseDns, SystemReverseDns, CACHED_COPY, UNKNOWN_HOST,
};

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

/// Fields every record carries
pub const GENERIC_FIELDS: &[&str] = &[
    "url",
    "level",
    "referer",
    "status_code",
    "page_type",
    "phone_numbers",
    "social_links",
];

/// Fields only homepage records populate
pub const HOMEPAGE_FIELDS: &[&str] = &[
    "title",
    "description",
    "author",
    "copyright",
    "cart_software",
    "has_card",
    "payment_systems",
];

/// Connection fields every record carries, resolved under the field policy
pub const HOSTING_FIELDS: &[&str] = &[
    "ip_address",
    "ssl_certificate",
    "protocol",
    "reverse_dns_lookup",
];

/// Fields populated when pages are replayed from the Wayback Machine
pub const PROVENANCE_FIELDS: &[&str] = &["wayback_url", "wayback_timestamp"];

/// Every field any record type can populate, in catalogue order
///
/// `website` is not listed: it is the row key of the aggregated table.
pub fn known_fields() -> Vec<&'static str> {
    GENERIC_FIELDS
        .iter()
        .chain(HOMEPAGE_FIELDS)
        .chain(HOSTING_FIELDS)
        .chain(PROVENANCE_FIELDS)
        .copied()
        .collect()
}

/// Page type tag; selects the handler that builds a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageKind {
    Homepage,
    AboutUs,
    Generic,
}

impl PageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Homepage => "homepage",
            Self::AboutUs => "about-us",
            Self::Generic => "generic",
        }
    }

    /// Returns the handler function for this page type
    pub fn handler(self) -> Handler {
        match self {
            Self::Homepage => handlers::homepage_handler,
            Self::AboutUs => handlers::about_us_handler,
            Self::Generic => handlers::generic_handler,
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Connection-derived fields, already passed through the field policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HostingInfo {
    pub ip_address: String,
    pub ssl_certificate: String,
    pub protocol: String,
    pub reverse_dns_lookup: String,
}

/// Homepage-only fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HomepageDetails {
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub copyright: Vec<String>,
    pub cart_software: Vec<String>,
    pub has_card: bool,
    pub payment_systems: Vec<String>,
}

/// Type-specific part of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "page_type", rename_all = "kebab-case")]
pub enum PageDetails {
    Homepage(HomepageDetails),
    AboutUs,
    Generic,
}

impl PageDetails {
    fn for_kind(kind: PageKind) -> Self {
        match kind {
            PageKind::Homepage => Self::Homepage(HomepageDetails::default()),
            PageKind::AboutUs => Self::AboutUs,
            PageKind::Generic => Self::Generic,
        }
    }

    pub fn kind(&self) -> PageKind {
        match self {
            Self::Homepage(_) => PageKind::Homepage,
            Self::AboutUs => PageKind::AboutUs,
            Self::Generic => PageKind::Generic,
        }
    }
}

/// Where a replayed page came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    /// Archive URL the page was served from
    pub wayback_url: String,

    /// 14-digit capture timestamp (`YYYYMMDDhhmmss`), if the URL carries a valid one
    pub wayback_timestamp: Option<String>,
}

impl Provenance {
    /// Extracts the capture timestamp from a Wayback Machine URL
    ///
    /// ```
    /// use sitemap_survey::record::Provenance;
    ///
    /// let p = Provenance::from_wayback_url("https://web.archive.org/web/20200115083000id_/https://x.nz/");
    /// assert_eq!(p.wayback_timestamp.as_deref(), Some("20200115083000"));
    /// ```
    pub fn from_wayback_url(wayback_url: &str) -> Self {
        static STAMP: OnceLock<Option<Regex>> = OnceLock::new();
        let stamp = STAMP
            .get_or_init(|| Regex::new(r"^https?://web\.archive\.org/web/(\d{14})(?:[a-z]{2}_)?/").ok())
            .as_ref();

        let wayback_timestamp = stamp
            .and_then(|re| re.captures(wayback_url))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|ts| NaiveDateTime::parse_from_str(ts, "%Y%m%d%H%M%S").is_ok())
            .map(str::to_string);

        Self {
            wayback_url: wayback_url.to_string(),
            wayback_timestamp,
        }
    }
}

/// One fetched page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRecord {
    pub url: String,
    pub level: u32,
    pub referer: Option<String>,
    /// Website identity; the aggregation join key
    pub website: String,
    pub status_code: u16,
    pub phone_numbers: BTreeSet<String>,
    pub social_links: BTreeSet<String>,
    #[serde(flatten)]
    pub hosting: HostingInfo,
    #[serde(flatten)]
    pub details: PageDetails,
    #[serde(flatten)]
    pub provenance: Option<Provenance>,
}

impl PageRecord {
    /// Creates an empty record of the given type
    pub fn new(kind: PageKind) -> Self {
        Self {
            url: String::new(),
            level: 0,
            referer: None,
            website: String::new(),
            status_code: 0,
            phone_numbers: BTreeSet::new(),
            social_links: BTreeSet::new(),
            hosting: HostingInfo::default(),
            details: PageDetails::for_kind(kind),
            provenance: None,
        }
    }

    pub fn kind(&self) -> PageKind {
        self.details.kind()
    }

    pub fn homepage(&self) -> Option<&HomepageDetails> {
        match &self.details {
            PageDetails::Homepage(details) => Some(details),
            _ => None,
        }
    }

    /// Returns every catalogue field with its non-empty string values
    ///
    /// Fields the record's type does not populate come back empty, so the
    /// result always has one entry per `known_fields()` name.
    pub fn field_values(&self) -> Vec<(&'static str, Vec<String>)> {
        let mut fields = vec![
            ("url", one(&self.url)),
            ("level", vec![self.level.to_string()]),
            ("referer", opt(self.referer.as_ref())),
            ("status_code", vec![self.status_code.to_string()]),
            ("page_type", vec![self.kind().as_str().to_string()]),
            ("phone_numbers", many(&self.phone_numbers)),
            ("social_links", many(&self.social_links)),
        ];

        let empty = HomepageDetails::default();
        let (home, is_homepage) = match self.homepage() {
            Some(details) => (details, true),
            None => (&empty, false),
        };
        fields.extend([
            ("title", opt(home.title.as_ref())),
            ("description", opt(home.description.as_ref())),
            ("author", opt(home.author.as_ref())),
            ("copyright", many(&home.copyright)),
            ("cart_software", many(&home.cart_software)),
            (
                "has_card",
                if is_homepage {
                    vec![home.has_card.to_string()]
                } else {
                    Vec::new()
                },
            ),
            ("payment_systems", many(&home.payment_systems)),
            ("ip_address", one(&self.hosting.ip_address)),
            ("ssl_certificate", one(&self.hosting.ssl_certificate)),
            ("protocol", one(&self.hosting.protocol)),
            ("reverse_dns_lookup", one(&self.hosting.reverse_dns_lookup)),
        ]);

        let provenance = self.provenance.as_ref();
        fields.extend([
            ("wayback_url", opt(provenance.map(|p| &p.wayback_url))),
            (
                "wayback_timestamp",
                opt(provenance.and_then(|p| p.wayback_timestamp.as_ref())),
            ),
        ]);

        fields
    }
}

fn one(value: &str) -> Vec<String> {
    let value = value.trim();
    if value.is_empty() {
        Vec::new()
    } else {
        vec![value.to_string()]
    }
}

fn opt(value: Option<&String>) -> Vec<String> {
    value.map(|v| one(v)).unwrap_or_default()
}

fn many<'a>(values: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    values.into_iter().flat_map(|v| one(v)).collect()
}
