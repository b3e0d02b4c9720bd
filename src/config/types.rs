use crate::record::PageKind;
use serde::Deserialize;

/// Main configuration structure for Sitemap-Survey
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(rename = "http-cache", default)]
    pub http_cache: HttpCacheConfig,
    #[serde(default)]
    pub wayback: WaybackConfig,
    /// Column groups of the exported table; empty means the built-in grouping
    #[serde(rename = "field-groups", default)]
    pub field_groups: Vec<FieldGroupEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Path to the domain list (one domain per line, data from line 4)
    #[serde(rename = "domain-list")]
    pub domain_list: String,

    /// Scheme used to build homepage and candidate URLs
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Entry-point paths tried in order
    #[serde(rename = "candidate-paths", default = "default_candidate_paths")]
    pub candidate_paths: Vec<String>,

    /// Probe candidates before dispatch (and cache the result)
    #[serde(rename = "resolve-entry-points", default = "default_true")]
    pub resolve_entry_points: bool,

    /// Regexes a sitemap-index child must match to be followed (empty = all)
    #[serde(rename = "sitemap-follow", default = "default_sitemap_follow")]
    pub sitemap_follow: Vec<String>,

    /// Skip sitemap-listed pages disallowed by the domain's robots.txt
    #[serde(rename = "obey-robots", default = "default_true")]
    pub obey_robots: bool,

    /// Maximum number of requests in flight
    #[serde(rename = "max-concurrent-requests", default = "default_max_concurrent")]
    pub max_concurrent_requests: u32,

    /// Maximum number of requests in flight to a single IP address
    #[serde(
        rename = "max-concurrent-requests-per-ip",
        default = "default_max_concurrent_per_ip"
    )]
    pub max_concurrent_requests_per_ip: u32,

    /// Per-request timeout in seconds
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    #[serde(rename = "contact-url")]
    pub contact_url: String,

    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the user agent string: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// JSON Lines file receiving every emitted page record
    #[serde(rename = "records-path")]
    pub records_path: String,

    /// CSV file receiving one aggregated row per requested domain
    #[serde(rename = "table-path")]
    pub table_path: String,

    /// Directory holding the entry-point resolution cache file
    #[serde(rename = "resolution-cache-dir")]
    pub resolution_cache_dir: String,
}

/// Field extraction configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Domain fragments identifying social-media links
    #[serde(rename = "social-platforms", default = "default_social_platforms")]
    pub social_platforms: Vec<String>,

    /// Ordered URL-path rules selecting a page handler; first match wins
    #[serde(rename = "page-rules", default = "default_page_rules")]
    pub page_rules: Vec<PageRuleEntry>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            social_platforms: default_social_platforms(),
            page_rules: default_page_rules(),
        }
    }
}

/// One classifier rule
#[derive(Debug, Clone, Deserialize)]
pub struct PageRuleEntry {
    /// Regex matched case-insensitively against the URL path
    pub pattern: String,

    /// Handler applied to matching pages
    pub handler: PageKind,
}

/// Local HTTP response cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpCacheConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_http_cache_dir")]
    pub directory: String,

    /// Age after which a cached response is fetched again
    #[serde(rename = "expiration-secs", default = "default_http_cache_expiration")]
    pub expiration_secs: u64,
}

impl Default for HttpCacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: default_http_cache_dir(),
            expiration_secs: default_http_cache_expiration(),
        }
    }
}

/// Wayback Machine replay configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WaybackConfig {
    #[serde(default)]
    pub enabled: bool,

    /// 14-digit snapshot timestamp (`YYYYMMDDhhmmss`); the archive serves the nearest capture
    #[serde(default)]
    pub timestamp: String,
}

/// A named column group of the exported table
#[derive(Debug, Clone, Deserialize)]
pub struct FieldGroupEntry {
    pub name: String,
    pub fields: Vec<String>,
}

fn default_scheme() -> String {
    "https".to_string()
}

fn default_candidate_paths() -> Vec<String> {
    vec!["/robots.txt".to_string(), "/sitemap.xml".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_sitemap_follow() -> Vec<String> {
    vec![r"\.nz/".to_string()]
}

fn default_max_concurrent() -> u32 {
    16
}

fn default_max_concurrent_per_ip() -> u32 {
    4
}

fn default_request_timeout() -> u64 {
    30
}

fn default_social_platforms() -> Vec<String> {
    ["facebook", "instagram", "twitter", "youtube", "linkedin"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_page_rules() -> Vec<PageRuleEntry> {
    vec![
        PageRuleEntry {
            pattern: "/about-?us".to_string(),
            handler: PageKind::AboutUs,
        },
        PageRuleEntry {
            pattern: "/(contact-?us|contact)".to_string(),
            handler: PageKind::AboutUs,
        },
    ]
}

fn default_http_cache_dir() -> String {
    "httpcache".to_string()
}

fn default_http_cache_expiration() -> u64 {
    86_400
}
