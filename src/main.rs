//! Sitemap-Survey main entry point
//!
//! This is the command-line interface for the Sitemap-Survey domain surveyor.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sitemap_survey::config::{load_config_with_hash, Config};
use sitemap_survey::crawler::{run_survey, SurveyOptions};
use sitemap_survey::output::{print_statistics, Aggregator, FieldGroups};
use sitemap_survey::record::SystemReverseDns;
use sitemap_survey::{DomainList, DomainRange, RequestedDomain};
use tracing_subscriber::EnvFilter;

/// Sitemap-Survey: a per-domain structured-content surveyor
///
/// Resolves each domain's sitemap entry point, fetches the homepage and the
/// about-us and contact pages its sitemap lists, and writes one aggregated
/// row per domain.
#[derive(Parser, Debug)]
#[command(name = "sitemap-survey")]
#[command(version = "1.0.0")]
#[command(about = "A per-domain structured-content surveyor", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// First domain-list line to survey (1-based, inclusive, >= 4)
    #[arg(value_name = "CC_START", allow_hyphen_values = true)]
    cc_start: String,

    /// Line after the last one to survey (exclusive)
    #[arg(value_name = "CC_END", allow_hyphen_values = true)]
    cc_end: String,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Ignore and delete any cached entry-point resolution
    #[arg(long)]
    fresh: bool,

    /// Validate config and range and show what would be surveyed
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    if let Err(e) = run(cli).await {
        tracing::error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    let list = DomainList::load(Path::new(&config.crawler.domain_list))
        .with_context(|| format!("failed to read domain list {}", config.crawler.domain_list))?;
    let range = list.range(&cli.cc_start, &cli.cc_end)?;
    let domains = list.slice(range);

    // Schema problems must surface before any request is sent
    Aggregator::new(FieldGroups::from_config(&config.field_groups))
        .context("invalid field groups")?;

    if cli.dry_run {
        handle_dry_run(&config, range, &domains);
        return Ok(());
    }

    tracing::info!(
        "Surveying lines {} ({} domains){}",
        range,
        domains.len(),
        if cli.fresh { ", fresh" } else { "" }
    );

    let options = SurveyOptions { fresh: cli.fresh };
    let dns = Arc::new(SystemReverseDns::from_system_conf());
    let stats = run_survey(&config, range, &domains, options, dns)
        .await
        .context("survey failed")?;

    tracing::info!("Survey completed successfully");
    print_statistics(&stats);
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitemap_survey=info,warn"),
            1 => EnvFilter::new("sitemap_survey=debug,info"),
            2 => EnvFilter::new("sitemap_survey=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows what would be surveyed
fn handle_dry_run(config: &Config, range: DomainRange, domains: &[RequestedDomain]) {
    println!("=== Sitemap-Survey Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Domain list: {}", config.crawler.domain_list);
    println!("  Scheme: {}", config.crawler.scheme);
    println!("  Candidate paths: {}", config.crawler.candidate_paths.join(", "));
    println!("  Resolve entry points: {}", config.crawler.resolve_entry_points);
    println!("  Obey robots.txt: {}", config.crawler.obey_robots);
    println!(
        "  Max concurrent requests: {} ({} per IP)",
        config.crawler.max_concurrent_requests, config.crawler.max_concurrent_requests_per_ip
    );

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nPage Rules ({}):", config.extraction.page_rules.len());
    for rule in &config.extraction.page_rules {
        println!("  - {} -> {}", rule.pattern, rule.handler);
    }

    println!("\nOutput:");
    println!("  Records: {}", config.output.records_path);
    println!("  Table: {}", config.output.table_path);
    println!("  Resolution cache: {}", config.output.resolution_cache_dir);
    if config.http_cache.enabled {
        println!("  HTTP cache: {}", config.http_cache.directory);
    }
    if config.wayback.enabled {
        println!("  Wayback snapshot: {}", config.wayback.timestamp);
    }

    println!("\nDomains {} ({}):", range, domains.len());
    for requested in domains {
        println!("  {:>6}  {}", requested.line, requested.domain);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would survey {} domains", domains.len());
}
