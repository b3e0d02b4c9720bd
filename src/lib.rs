//! Sitemap-Survey: a per-domain structured-content surveyor
//!
//! This crate resolves each domain's sitemap entry point (robots.txt or
//! sitemap.xml), fetches the homepage plus a shallow set of sitemap-listed
//! pages (about-us, contact), builds one record per fetched page and
//! aggregates those records into one exported row per requested domain.

pub mod cache;
pub mod config;
pub mod crawler;
pub mod domains;
pub mod output;
pub mod record;
pub mod robots;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Sitemap-Survey operations
#[derive(Debug, Error)]
pub enum SurveyError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Output schema error: {0}")]
    Schema(#[from] output::SchemaError),

    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid entry-point transition: {event:?} in state {state:?}")]
    InvalidTransition {
        state: state::EntryState,
        event: state::EntryEvent,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid domain range: {0}")]
    Range(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Sitemap-Survey operations
pub type Result<T> = std::result::Result<T, SurveyError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use domains::{DomainList, DomainRange, RequestedDomain};
pub use record::{PageKind, PageRecord};
pub use state::EntryState;
pub use crate::url::{url_level, website_identity};
