//! Connection-derived fields and the cache sentinel policy
//!
//! Connection facts (remote address, certificate, protocol) and reverse DNS
//! only mean something for a live network fetch. When the response cache is
//! enabled, every such field is replaced by a sentinel instead of being
//! computed, so cached and live runs never mix stale connection data.

use super::HostingInfo;
use crate::crawler::ConnectionInfo;
use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::TokioAsyncResolver;
use std::net::IpAddr;
use thiserror::Error;

/// Value of every network-derived field when the response cache is enabled
pub const CACHED_COPY: &str = "*cached copy*";

/// Reverse DNS value when the address has no PTR record
pub const UNKNOWN_HOST: &str = "Unknown";

/// Reverse DNS failure other than "no such record"
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("reverse lookup of {ip} failed: {message}")]
    Resolve { ip: IpAddr, message: String },
}

/// Reverse DNS lookup
#[async_trait]
pub trait ReverseDns: Send + Sync {
    /// Returns the host name for `ip`, or `None` when no record exists
    async fn lookup(&self, ip: IpAddr) -> Result<Option<String>, LookupError>;
}

/// Reverse DNS through the system resolver configuration
pub struct SystemReverseDns {
    resolver: TokioAsyncResolver,
}

impl SystemReverseDns {
    /// Builds a resolver from `/etc/resolv.conf`, falling back to the default upstreams
    pub fn from_system_conf() -> Self {
        let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
            tracing::warn!("System resolver configuration unavailable ({}), using defaults", e);
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });
        Self { resolver }
    }
}

#[async_trait]
impl ReverseDns for SystemReverseDns {
    async fn lookup(&self, ip: IpAddr) -> Result<Option<String>, LookupError> {
        match self.resolver.reverse_lookup(ip).await {
            Ok(names) => Ok(names
                .iter()
                .next()
                .map(|name| name.to_string().trim_end_matches('.').to_string())),
            Err(e) => match e.kind() {
                ResolveErrorKind::NoRecordsFound { .. } => Ok(None),
                _ => Err(LookupError::Resolve {
                    ip,
                    message: e.to_string(),
                }),
            },
        }
    }
}

/// Decides whether network-derived fields are computed or replaced by the sentinel
#[derive(Debug, Clone, Copy)]
pub struct NetworkFieldPolicy {
    cache_enabled: bool,
}

impl NetworkFieldPolicy {
    pub fn new(cache_enabled: bool) -> Self {
        Self { cache_enabled }
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    /// Returns [`CACHED_COPY`] without calling `value_fn` when the cache is enabled
    ///
    /// ```
    /// use sitemap_survey::record::{NetworkFieldPolicy, CACHED_COPY};
    ///
    /// let cached = NetworkFieldPolicy::new(true);
    /// assert_eq!(cached.materialize(|| unreachable!()), CACHED_COPY);
    ///
    /// let live = NetworkFieldPolicy::new(false);
    /// assert_eq!(live.materialize(|| "10.0.0.1".to_string()), "10.0.0.1");
    /// ```
    pub fn materialize<F: FnOnce() -> String>(&self, value_fn: F) -> String {
        if self.cache_enabled {
            CACHED_COPY.to_string()
        } else {
            value_fn()
        }
    }

    /// Resolves the hosting fields for one response
    ///
    /// # Arguments
    ///
    /// * `connection` - Facts captured from the live response
    /// * `dns` - Reverse lookup used for `reverse_dns_lookup`
    ///
    /// # Returns
    ///
    /// * `Ok(HostingInfo)` - All four fields, sentinel-valued under the cache
    /// * `Err(LookupError)` - The reverse lookup failed for a reason other than a missing record
    pub async fn hosting(
        &self,
        connection: &ConnectionInfo,
        dns: &dyn ReverseDns,
    ) -> Result<HostingInfo, LookupError> {
        let ip_address = self.materialize(|| {
            connection
                .remote_ip
                .map(|ip| ip.to_string())
                .unwrap_or_default()
        });
        let ssl_certificate = self.materialize(|| connection.has_certificate.to_string());
        let protocol = self.materialize(|| connection.protocol.clone().unwrap_or_default());

        let reverse_dns_lookup = if self.cache_enabled {
            CACHED_COPY.to_string()
        } else {
            match connection.remote_ip {
                Some(ip) => dns
                    .lookup(ip)
                    .await?
                    .unwrap_or_else(|| UNKNOWN_HOST.to_string()),
                None => UNKNOWN_HOST.to_string(),
            }
        };

        Ok(HostingInfo {
            ip_address,
            ssl_certificate,
            protocol,
            reverse_dns_lookup,
        })
    }
}
