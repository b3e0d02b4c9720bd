//! Request admission control
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - Per-target concurrency limiting, keyed by the resolved IP address
//! - Counting issued requests for the run statistics

use crate::config::CrawlerConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

/// Permits held for the duration of one request
pub struct FetchPermit {
    /// Key the per-target permit was taken for
    pub target: String,

    _target_permit: OwnedSemaphorePermit,
    _global_permit: OwnedSemaphorePermit,
}

/// Scheduler caps in-flight requests
///
/// The scheduler coordinates:
/// - A global cap on requests in flight
/// - A per-IP cap, so many domains on one shared host are not hit at once
///
/// Cloning is cheap and shares all limits.
#[derive(Clone)]
pub struct Scheduler {
    /// Global semaphore for limiting concurrent fetches
    global_semaphore: Arc<Semaphore>,

    /// One semaphore per target IP (or host name when lookup fails)
    target_semaphores: Arc<Mutex<HashMap<String, Arc<Semaphore>>>>,

    per_target_limit: usize,

    requests: Arc<AtomicUsize>,
}

impl Scheduler {
    /// Creates a new scheduler from the crawler configuration
    pub fn new(config: &CrawlerConfig) -> Self {
        Self::with_limits(
            config.max_concurrent_requests as usize,
            config.max_concurrent_requests_per_ip as usize,
        )
    }

    pub fn with_limits(global: usize, per_target: usize) -> Self {
        Self {
            global_semaphore: Arc::new(Semaphore::new(global.max(1))),
            target_semaphores: Arc::new(Mutex::new(HashMap::new())),
            per_target_limit: per_target.max(1),
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Waits until a request to `url` may be sent
    ///
    /// The per-target permit is taken first so a busy host does not hold
    /// global capacity while it waits.
    ///
    /// # Returns
    ///
    /// * `Some(FetchPermit)` - Hold it until the response has been read
    /// * `None` - The scheduler was shut down
    pub async fn acquire(&self, url: &Url) -> Option<FetchPermit> {
        let target = target_key(url).await;
        let semaphore = self.target_semaphore(&target);

        let target_permit = semaphore.acquire_owned().await.ok()?;
        let global_permit = self.global_semaphore.clone().acquire_owned().await.ok()?;

        self.requests.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("Admitted request to {} (target {})", url, target);

        Some(FetchPermit {
            target,
            _target_permit: target_permit,
            _global_permit: global_permit,
        })
    }

    /// Total number of requests admitted so far
    pub fn requests_issued(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    /// Number of distinct targets seen so far
    pub fn target_count(&self) -> usize {
        self.target_semaphores
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    fn target_semaphore(&self, target: &str) -> Arc<Semaphore> {
        let mut semaphores = self
            .target_semaphores
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        semaphores
            .entry(target.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_target_limit)))
            .clone()
    }
}

/// Resolves the per-target key for a URL: its IP address, or the host name
async fn target_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_string();
    let port = url.port_or_known_default().unwrap_or(80);

    let resolved = match tokio::net::lookup_host((host.as_str(), port)).await {
        Ok(mut addrs) => addrs.next().map(|addr| addr.ip().to_string()),
        Err(e) => {
            tracing::trace!("Lookup of {} failed, keying by host name: {}", host, e);
            None
        }
    };
    resolved.unwrap_or(host)
}
