//! Crawler module for entry-point resolution and page dispatch
//!
//! This module contains the core survey logic, including:
//! - HTTP fetching with response caching and Wayback rewriting
//! - Request admission with global and per-IP limits
//! - Entry-point resolution with a persistent cache
//! - Sitemap parsing and page classification
//! - Overall dispatch coordination

mod classifier;
mod coordinator;
mod fetcher;
mod parser;
mod resolver;
mod scheduler;

pub use classifier::PageClassifier;
pub use coordinator::{CrawlContext, CrawlReport, CrawlTask, Coordinator, TaskOutcome};
pub use fetcher::{build_http_client, ConnectionInfo, FetchOutcome, FetchedPage, Fetcher};
pub use parser::{parse_sitemap, ParsedSitemap};
pub use resolver::EntryPointResolver;
pub use scheduler::{FetchPermit, Scheduler};

use crate::cache::{EntryPointMap, ResolutionCache};
use crate::config::Config;
use crate::domains::{DomainRange, RequestedDomain};
use crate::output::{write_records, write_table, Aggregator, CrawlStatistics, FieldGroups};
use crate::record::{NetworkFieldPolicy, ReverseDns};
use crate::url::homepage_url;
use crate::{ConfigError, SurveyError};
use regex::Regex;
use std::path::Path;
use std::sync::Arc;

/// Run-level switches that do not belong in the config file
#[derive(Debug, Clone, Copy, Default)]
pub struct SurveyOptions {
    /// Ignore and delete any resolution cache
    pub fresh: bool,
}

/// Runs a complete survey
///
/// This is the main entry point for a survey run. It will:
/// 1. Validate the output schema, before any network activity
/// 2. Resolve entry points (or load them from the resolution cache)
/// 3. Dispatch homepage and entry-point legs until the crawl drains
/// 4. Write every record as JSON Lines
/// 5. Aggregate records into one row per requested domain and write the table
///
/// # Arguments
///
/// * `config` - The survey configuration
/// * `range` - The requested line range
/// * `domains` - The domains on those lines
/// * `options` - Run-level switches
/// * `dns` - Reverse lookup for homepage hosting fields
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Survey completed and output was written
/// * `Err(SurveyError)` - Survey failed
pub async fn run_survey(
    config: &Config,
    range: DomainRange,
    domains: &[RequestedDomain],
    options: SurveyOptions,
    dns: Arc<dyn ReverseDns>,
) -> Result<CrawlStatistics, SurveyError> {
    let aggregator = Aggregator::new(FieldGroups::from_config(&config.field_groups))?;

    let report = crawl(config, range, domains, options, dns).await?;
    let mut stats = report.stats;

    write_records(Path::new(&config.output.records_path), &report.records)?;
    tracing::info!(
        "Wrote {} records to {}",
        report.records.len(),
        config.output.records_path
    );

    let rows = aggregator.aggregate(&report.records, domains)?;
    write_table(Path::new(&config.output.table_path), aggregator.groups(), &rows)?;
    tracing::info!("Wrote {} rows to {}", rows.len(), config.output.table_path);

    stats.rows_written = rows.len();
    stats.empty_rows = rows.iter().filter(|row| row.is_empty()).count();
    Ok(stats)
}

/// Resolves entry points and dispatches every domain until the crawl drains
pub async fn crawl(
    config: &Config,
    range: DomainRange,
    domains: &[RequestedDomain],
    options: SurveyOptions,
    dns: Arc<dyn ReverseDns>,
) -> Result<CrawlReport, SurveyError> {
    let fetcher = Arc::new(Fetcher::new(config)?);
    let scheduler = Scheduler::new(&config.crawler);
    let resolver = EntryPointResolver::new(
        Arc::clone(&fetcher),
        scheduler.clone(),
        &config.crawler.scheme,
        &config.crawler.candidate_paths,
    );

    let entry_points = if config.crawler.resolve_entry_points {
        Some(load_or_resolve(config, range, domains, options, &resolver).await?)
    } else {
        None
    };

    let mut stats = CrawlStatistics {
        domains_requested: domains.len(),
        ..Default::default()
    };
    let mut seeds = Vec::new();

    for requested in domains {
        let homepage = match homepage_url(&config.crawler.scheme, &requested.domain) {
            Ok(homepage) => homepage,
            Err(e) => {
                tracing::warn!("Skipping line {} ({}): {}", requested.line, requested.domain, e);
                continue;
            }
        };
        seeds.push(CrawlTask::homepage(&requested.domain, homepage));

        let candidates = resolver.candidates(&requested.domain);
        let resolved = entry_points
            .as_ref()
            .and_then(|map| map.get(&resolver.homepage_key(&requested.domain)));

        let task = match resolved {
            // Resolution ran and found nothing: no entry leg
            Some(None) => {
                stats.entry_points_missing += 1;
                continue;
            }
            Some(Some(entry)) => match candidates.iter().position(|c| c == entry) {
                Some(first) => CrawlTask::entry_point(&requested.domain, candidates, first)?,
                None => CrawlTask::entry_point(&requested.domain, vec![entry.clone()], 0)?,
            },
            None => CrawlTask::entry_point(&requested.domain, candidates, 0)?,
        };
        seeds.push(task);
    }

    tracing::info!("Dispatching {} seed tasks for {} domains", seeds.len(), domains.len());

    let context = CrawlContext {
        classifier: PageClassifier::new(&config.extraction.page_rules)?,
        sitemap_follow: compile_follow_patterns(&config.crawler.sitemap_follow)?,
        policy: NetworkFieldPolicy::new(fetcher.cache_enabled()),
        fetcher,
        scheduler,
        dns,
        social_platforms: config.extraction.social_platforms.clone(),
        obey_robots: config.crawler.obey_robots,
        robots_agent: config.user_agent.crawler_name.clone(),
    };

    let mut report = Coordinator::new(context).run(seeds).await;
    report.stats.merge(&stats);
    Ok(report)
}

/// Loads the resolution map for `range`, resolving and caching it on a miss
async fn load_or_resolve(
    config: &Config,
    range: DomainRange,
    domains: &[RequestedDomain],
    options: SurveyOptions,
    resolver: &EntryPointResolver,
) -> Result<EntryPointMap, SurveyError> {
    let cache = ResolutionCache::new(&config.output.resolution_cache_dir);

    if options.fresh {
        tracing::info!("Fresh run: discarding resolution cache");
        cache.clear()?;
    } else if let Some(entries) = cache.load(range)? {
        tracing::info!(
            "Using cached entry points for {} ({} domains)",
            range,
            entries.len()
        );
        return Ok(entries);
    }

    tracing::info!("Resolving entry points for {} domains", domains.len());
    let entries = resolver.resolve_all(domains).await;

    if let Err(e) = cache.store(range, &entries) {
        tracing::warn!("Failed to write resolution cache: {}", e);
    }
    Ok(entries)
}

fn compile_follow_patterns(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", p, e)))
        })
        .collect()
}
