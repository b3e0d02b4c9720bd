//! Entry-point resolution
//!
//! Probes each domain's candidate paths in order and remembers the first
//! that exists. Resolution for a whole range runs as one barrier phase before
//! dispatch starts.

use super::fetcher::Fetcher;
use super::scheduler::Scheduler;
use crate::cache::EntryPointMap;
use crate::domains::RequestedDomain;
use crate::url::homepage_url;
use std::sync::Arc;
use tokio::task::JoinSet;
use url::Url;

/// Finds a domain's structured-content entry point
#[derive(Clone)]
pub struct EntryPointResolver {
    fetcher: Arc<Fetcher>,
    scheduler: Scheduler,
    scheme: String,
    candidate_paths: Arc<Vec<String>>,
}

impl EntryPointResolver {
    pub fn new(
        fetcher: Arc<Fetcher>,
        scheduler: Scheduler,
        scheme: &str,
        candidate_paths: &[String],
    ) -> Self {
        Self {
            fetcher,
            scheduler,
            scheme: scheme.to_string(),
            candidate_paths: Arc::new(candidate_paths.to_vec()),
        }
    }

    /// Candidate URLs for a domain, in probe order
    pub fn candidates(&self, domain: &str) -> Vec<Url> {
        let Ok(home) = homepage_url(&self.scheme, domain) else {
            return Vec::new();
        };
        self.candidate_paths
            .iter()
            .filter_map(|path| home.join(path).ok())
            .collect()
    }

    /// Returns the first candidate whose probe reports status < 400
    ///
    /// # Arguments
    ///
    /// * `domain` - Bare domain, without scheme
    ///
    /// # Returns
    ///
    /// * `Some(Url)` - The entry point
    /// * `None` - Every candidate was missing or its probe failed
    pub async fn resolve(&self, domain: &str) -> Option<Url> {
        for candidate in self.candidates(domain) {
            let _permit = self.scheduler.acquire(&candidate).await?;
            if self.fetcher.probe(&candidate).await {
                tracing::debug!("Resolved {} -> {}", domain, candidate);
                return Some(candidate);
            }
        }

        tracing::debug!("No entry point found for {}", domain);
        None
    }

    /// Resolves every domain concurrently and waits for all of them
    ///
    /// The map is keyed by `{scheme}://{domain}` and holds every requested
    /// domain; those whose homepage URL cannot be built map to `None`.
    pub async fn resolve_all(&self, domains: &[RequestedDomain]) -> EntryPointMap {
        let mut tasks = JoinSet::new();
        for requested in domains {
            let resolver = self.clone();
            let domain = requested.domain.clone();
            tasks.spawn(async move {
                let entry_point = resolver.resolve(&domain).await;
                (resolver.homepage_key(&domain), entry_point)
            });
        }

        let mut entries = EntryPointMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((key, entry_point)) => {
                    entries.insert(key, entry_point);
                }
                Err(e) => tracing::error!("Resolution task failed: {}", e),
            }
        }

        let found = entries.values().filter(|e| e.is_some()).count();
        tracing::info!(
            "Resolved entry points for {}/{} domains",
            found,
            entries.len()
        );
        entries
    }

    /// Resolution map key for a domain
    pub fn homepage_key(&self, domain: &str) -> String {
        format!("{}://{}", self.scheme, domain.trim())
    }
}
