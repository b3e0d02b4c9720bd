//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the survey, including:
//! - Building the HTTP client with the configured user agent
//! - HEAD probes for entry-point resolution
//! - GET requests, optionally served from the local response cache
//! - Rewriting requests through the Wayback Machine
//! - Error classification

use crate::cache::{CachedResponse, ResponseCache};
use crate::config::{Config, CrawlerConfig, UserAgentConfig};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::net::IpAddr;
use std::time::Duration;
use url::Url;

/// Facts about the connection a live response arrived on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Address of the peer
    pub remote_ip: Option<IpAddr>,

    /// True if the server presented a TLS certificate
    pub has_certificate: bool,

    /// HTTP version, e.g. `HTTP/1.1`
    pub protocol: Option<String>,
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL the page is recorded under: the final URL of a live fetch, or the
    /// requested URL when replayed from the Wayback Machine
    pub url: Url,

    pub status_code: u16,

    pub body: String,

    /// Empty for cached responses
    pub connection: ConnectionInfo,

    pub from_cache: bool,

    /// Final archive URL when the page came from the Wayback Machine
    pub wayback_url: Option<String>,
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchOutcome {
    /// 2xx response
    Success(FetchedPage),

    /// Any non-2xx response after redirects
    HttpError { status_code: u16 },

    /// The connection could not be established
    ConnectionRefused { error: String },

    /// Timeout, TLS failure, body read failure and everything else
    NetworkError { error: String },
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `crawler` - Supplies the request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(crawler.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .tls_info(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Issues GET requests with caching and Wayback rewriting applied
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    cache: Option<ResponseCache>,
    wayback_timestamp: Option<String>,
}

impl Fetcher {
    /// Builds a fetcher from the full configuration
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.user_agent, &config.crawler)?;

        let cache = config
            .http_cache
            .enabled
            .then(|| ResponseCache::new(&config.http_cache.directory, config.http_cache.expiration_secs));

        let wayback_timestamp = config
            .wayback
            .enabled
            .then(|| config.wayback.timestamp.clone());

        Ok(Self::from_parts(client, cache, wayback_timestamp))
    }

    pub fn from_parts(
        client: Client,
        cache: Option<ResponseCache>,
        wayback_timestamp: Option<String>,
    ) -> Self {
        Self {
            client,
            cache,
            wayback_timestamp,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// True when responses may be served from the local cache
    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// The URL actually requested for `url`
    ///
    /// ```
    /// use sitemap_survey::crawler::Fetcher;
    /// use url::Url;
    ///
    /// let fetcher = Fetcher::from_parts(reqwest::Client::new(), None, Some("2020".to_string()));
    /// let url = Url::parse("https://x.nz/about-us").unwrap();
    /// assert_eq!(
    ///     fetcher.request_url(&url),
    ///     "https://web.archive.org/web/2020id_/https://x.nz/about-us"
    /// );
    /// ```
    pub fn request_url(&self, url: &Url) -> String {
        match &self.wayback_timestamp {
            Some(timestamp) => format!("https://web.archive.org/web/{}id_/{}", timestamp, url),
            None => url.to_string(),
        }
    }

    /// Sends a HEAD probe; true if the resource exists (status < 400)
    ///
    /// Probe errors count as "does not exist". Probes always go to the live
    /// site and bypass the response cache.
    pub async fn probe(&self, url: &Url) -> bool {
        match self.client.head(url.clone()).send().await {
            Ok(response) => {
                let exists = response.status().as_u16() < 400;
                tracing::debug!("Probe {} -> {}", url, response.status());
                exists
            }
            Err(e) => {
                tracing::debug!("Probe {} failed: {}", url, e);
                false
            }
        }
    }

    /// Fetches a URL
    ///
    /// # Request Flow
    ///
    /// 1. Rewrite through the Wayback Machine if enabled
    /// 2. Serve a fresh cached response if the cache is enabled
    /// 3. Otherwise GET, following up to 10 redirects, and cache the result
    /// 4. Classify the response
    ///
    /// | Condition | Outcome |
    /// |-----------|---------|
    /// | HTTP 2xx | Success |
    /// | Other HTTP status | HttpError |
    /// | Connect failure | ConnectionRefused |
    /// | Timeout, TLS, body error | NetworkError |
    pub async fn fetch(&self, url: &Url) -> FetchOutcome {
        let target = self.request_url(url);

        if let Some(cached) = self.cache.as_ref().and_then(|cache| cache.get(&target)) {
            tracing::debug!("Cache hit for {} (age {}s)", target, cached.age().num_seconds());
            return self.outcome_from_cache(url, cached);
        }

        let response = match self.client.get(&target).send().await {
            Ok(response) => response,
            Err(e) if e.is_connect() => {
                return FetchOutcome::ConnectionRefused {
                    error: e.to_string(),
                }
            }
            Err(e) if e.is_timeout() => {
                return FetchOutcome::NetworkError {
                    error: "Request timeout".to_string(),
                }
            }
            Err(e) => {
                return FetchOutcome::NetworkError {
                    error: e.to_string(),
                }
            }
        };

        let status = response.status();
        let final_url = response.url().clone();
        let connection = ConnectionInfo {
            remote_ip: response.remote_addr().map(|addr| addr.ip()),
            has_certificate: response
                .extensions()
                .get::<reqwest::tls::TlsInfo>()
                .and_then(|info| info.peer_certificate())
                .is_some(),
            protocol: Some(format!("{:?}", response.version())),
        };

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return FetchOutcome::NetworkError {
                    error: e.to_string(),
                }
            }
        };

        if let Some(cache) = &self.cache {
            let entry = CachedResponse::new(&target, final_url.as_str(), status.as_u16(), body.clone());
            if let Err(e) = cache.put(&entry) {
                tracing::warn!("Failed to cache response for {}: {}", target, e);
            }
        }

        self.classify(url, status, final_url, body, connection, false)
    }

    fn outcome_from_cache(&self, url: &Url, cached: CachedResponse) -> FetchOutcome {
        let status = StatusCode::from_u16(cached.status_code).unwrap_or(StatusCode::OK);
        let final_url = Url::parse(&cached.final_url).unwrap_or_else(|_| url.clone());
        self.classify(
            url,
            status,
            final_url,
            cached.body,
            ConnectionInfo::default(),
            true,
        )
    }

    fn classify(
        &self,
        url: &Url,
        status: StatusCode,
        final_url: Url,
        body: String,
        connection: ConnectionInfo,
        from_cache: bool,
    ) -> FetchOutcome {
        if !status.is_success() {
            return FetchOutcome::HttpError {
                status_code: status.as_u16(),
            };
        }

        let (page_url, wayback_url) = match self.wayback_timestamp {
            Some(_) => (url.clone(), Some(final_url.to_string())),
            None => (final_url, None),
        };

        FetchOutcome::Success(FetchedPage {
            url: page_url,
            status_code: status.as_u16(),
            body,
            connection,
            from_cache,
            wayback_url,
        })
    }
}
