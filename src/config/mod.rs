//! Configuration module for Sitemap-Survey
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sitemap_survey::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("survey.toml")).unwrap();
//! println!("Candidate paths: {:?}", config.crawler.candidate_paths);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, ExtractionConfig, FieldGroupEntry, HttpCacheConfig, OutputConfig,
    PageRuleEntry, UserAgentConfig, WaybackConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
