//! On-disk caches
//!
//! - `ResolutionCache`: the domain → entry-point mapping of one requested range
//! - `ResponseCache`: fetched HTTP responses keyed by URL, with expiration

mod resolution;
mod response;

pub use resolution::{EntryPointMap, ResolutionCache};
pub use response::{CachedResponse, ResponseCache};

use thiserror::Error;

/// Errors raised while reading or writing cache files
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache IO error at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Corrupt cache file {path}: {source}")]
    Corrupt {
        path: String,
        source: serde_json::Error,
    },
}

impl CacheError {
    fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
