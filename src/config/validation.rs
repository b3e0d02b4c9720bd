use crate::config::types::{
    Config, CrawlerConfig, ExtractionConfig, FieldGroupEntry, HttpCacheConfig, OutputConfig,
    UserAgentConfig, WaybackConfig,
};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_extraction_config(&config.extraction)?;
    validate_http_cache_config(&config.http_cache)?;
    validate_wayback_config(&config.wayback)?;
    validate_field_groups(&config.field_groups)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.domain_list.is_empty() {
        return Err(ConfigError::Validation(
            "domain_list cannot be empty".to_string(),
        ));
    }

    if config.scheme != "https" && config.scheme != "http" {
        return Err(ConfigError::Validation(format!(
            "scheme must be 'https' or 'http', got '{}'",
            config.scheme
        )));
    }

    if config.candidate_paths.is_empty() {
        return Err(ConfigError::Validation(
            "candidate_paths must list at least one path".to_string(),
        ));
    }

    for path in &config.candidate_paths {
        if !path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "candidate path '{}' must start with '/'",
                path
            )));
        }
    }

    for pattern in &config.sitemap_follow {
        compile_pattern(pattern)?;
    }

    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.max_concurrent_requests_per_ip < 1
        || config.max_concurrent_requests_per_ip > config.max_concurrent_requests
    {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_requests_per_ip must be between 1 and max_concurrent_requests ({}), got {}",
            config.max_concurrent_requests, config.max_concurrent_requests_per_ip
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.records_path.is_empty() {
        return Err(ConfigError::Validation(
            "records_path cannot be empty".to_string(),
        ));
    }

    if config.table_path.is_empty() {
        return Err(ConfigError::Validation(
            "table_path cannot be empty".to_string(),
        ));
    }

    if config.resolution_cache_dir.is_empty() {
        return Err(ConfigError::Validation(
            "resolution_cache_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    if config.social_platforms.iter().any(|p| p.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "social_platforms cannot contain empty entries".to_string(),
        ));
    }

    for rule in &config.page_rules {
        compile_pattern(&rule.pattern)?;
    }

    Ok(())
}

fn validate_http_cache_config(config: &HttpCacheConfig) -> Result<(), ConfigError> {
    if config.enabled && config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "http-cache directory cannot be empty when the cache is enabled".to_string(),
        ));
    }
    Ok(())
}

fn validate_wayback_config(config: &WaybackConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }

    let ts = &config.timestamp;
    if ts.is_empty() || ts.len() > 14 || !ts.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConfigError::Validation(format!(
            "wayback timestamp must be 1-14 digits (YYYYMMDDhhmmss), got '{}'",
            ts
        )));
    }
    Ok(())
}

/// Group names must be unique; completeness against the record fields is
/// checked when the aggregator is built.
fn validate_field_groups(groups: &[FieldGroupEntry]) -> Result<(), ConfigError> {
    let mut seen = std::collections::HashSet::new();
    for group in groups {
        if group.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "field group name cannot be empty".to_string(),
            ));
        }
        if !seen.insert(group.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "field group '{}' is defined twice",
                group.name
            )));
        }
    }
    Ok(())
}

fn compile_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern)
        .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
