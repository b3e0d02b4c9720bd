//! HTTP response caching implementation
//!
//! Responses are stored one JSON file per URL, named by the SHA-256 of the
//! URL, and expire after a configurable age.

use crate::cache::CacheError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// A cached HTTP response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// The URL that was requested
    pub url: String,

    /// Final URL after redirects
    pub final_url: String,

    pub status_code: u16,

    pub body: String,

    /// When the response was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedResponse {
    /// Creates a new CachedResponse stamped with the current time
    pub fn new(url: &str, final_url: &str, status_code: u16, body: String) -> Self {
        Self {
            url: url.to_string(),
            final_url: final_url.to_string(),
            status_code,
            body,
            fetched_at: Utc::now(),
        }
    }

    /// Checks if the response is older than `max_age`
    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.age() > max_age
    }

    /// Returns the age of the cached response
    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }
}

/// Filesystem response cache
#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
    max_age: Duration,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>, expiration_secs: u64) -> Self {
        Self {
            dir: dir.into(),
            max_age: Duration::seconds(expiration_secs.min(i64::MAX as u64) as i64),
        }
    }

    fn path_for(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }

    /// Returns the fresh cached response for a URL
    ///
    /// Stale or unreadable entries count as misses.
    pub fn get(&self, url: &str) -> Option<CachedResponse> {
        let path = self.path_for(url);
        let content = std::fs::read_to_string(&path).ok()?;

        let cached: CachedResponse = match serde_json::from_str(&content) {
            Ok(cached) => cached,
            Err(e) => {
                tracing::debug!("Ignoring unreadable cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        if cached.url != url || cached.is_stale(self.max_age) {
            return None;
        }
        Some(cached)
    }

    /// Stores a response, replacing any previous entry for its URL
    pub fn put(&self, response: &CachedResponse) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;

        let path = self.path_for(&response.url);
        let json = serde_json::to_string(response).map_err(|source| CacheError::Corrupt {
            path: path.display().to_string(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|e| CacheError::io(&path, e))
    }
}
