//! Job Harvester main entry point
//!
//! This is the command-line interface for the Job Harvester crawl engine.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use job_harvester::config::{load_config_with_hash, Config};
use job_harvester::storage::open_storage;
use job_harvester::{Coordinator, SiteTarget};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Job Harvester: a polite job-board aggregator
///
/// Job Harvester crawls the configured job boards while respecting rate
/// limits, caches results, and stores normalized listings in SQLite.
#[derive(Parser, Debug)]
#[command(name = "job-harvester")]
#[command(version = "1.0.0")]
#[command(about = "A polite job-board aggregator", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl one configured site and print the result as JSON
    Crawl {
        /// Site name as configured
        #[arg(long)]
        site: String,

        /// Search keyword; omit to list all postings
        #[arg(long)]
        keyword: Option<String>,

        #[arg(long, default_value_t = 10)]
        max_results: usize,

        /// Ignore cached results
        #[arg(long)]
        force_refresh: bool,

        /// Stop issuing requests after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Crawl every configured site and print the combined result as JSON
    CrawlAll {
        #[arg(long)]
        keyword: Option<String>,

        #[arg(long, default_value_t = 5)]
        max_results_per_site: usize,

        #[arg(long)]
        force_refresh: bool,
    },

    /// List configured sites
    Sites,

    /// Show stored listing counts per site
    Stats,

    /// Validate the configuration without crawling
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    match cli.command {
        Command::Crawl {
            site,
            keyword,
            max_results,
            force_refresh,
            timeout_secs,
        } => {
            handle_crawl(
                &config,
                &site,
                keyword.as_deref(),
                max_results,
                force_refresh,
                timeout_secs,
            )
            .await
        }
        Command::CrawlAll {
            keyword,
            max_results_per_site,
            force_refresh,
        } => handle_crawl_all(&config, keyword.as_deref(), max_results_per_site, force_refresh).await,
        Command::Sites => {
            handle_sites(&config);
            Ok(())
        }
        Command::Stats => handle_stats(&config),
        Command::Check => {
            handle_check(&config, &config_hash);
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("job_harvester=info,warn"),
            1 => EnvFilter::new("job_harvester=debug,info"),
            2 => EnvFilter::new("job_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Crawls one site and prints the `CrawlResult`
async fn handle_crawl(
    config: &Config,
    site: &str,
    keyword: Option<&str>,
    max_results: usize,
    force_refresh: bool,
    timeout_secs: Option<u64>,
) -> anyhow::Result<()> {
    let site_config = match config.site(site) {
        Some(site_config) => site_config,
        None => bail!("site '{}' is not configured", site),
    };

    let coordinator = Coordinator::new(config)?;
    let result = match timeout_secs {
        Some(secs) => {
            coordinator
                .crawl_site_with_timeout(
                    &site_config.name,
                    &site_config.url,
                    keyword,
                    max_results,
                    force_refresh,
                    Duration::from_secs(secs),
                )
                .await
        }
        None => {
            coordinator
                .crawl_site(
                    &site_config.name,
                    &site_config.url,
                    keyword,
                    max_results,
                    force_refresh,
                )
                .await
        }
    };

    coordinator.wait_for_enrichment().await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.success {
        tracing::error!("Crawl of {} failed", result.site);
    }
    Ok(())
}

/// Crawls every configured site and prints the `MultiCrawlResult`
async fn handle_crawl_all(
    config: &Config,
    keyword: Option<&str>,
    max_results_per_site: usize,
    force_refresh: bool,
) -> anyhow::Result<()> {
    if config.sites.is_empty() {
        bail!("no sites configured");
    }

    let targets = config
        .sites
        .iter()
        .map(|site| SiteTarget::new(&site.name, &site.url))
        .collect();

    let coordinator = Coordinator::new(config)?;
    let result = coordinator
        .crawl_multiple(targets, keyword, max_results_per_site, force_refresh)
        .await;

    coordinator.wait_for_enrichment().await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Lists configured sites
fn handle_sites(config: &Config) {
    println!("Configured sites ({}):", config.sites.len());
    for site in &config.sites {
        println!("  - {} [{:?}] {}", site.name, site.kind, site.url);
    }
}

/// Prints stored listing counts from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path), 1)?;
    let total = storage.count_listings(None)?;

    println!("Stored listings: {}", total);
    for site in &config.sites {
        println!("  {}: {}", site.name, storage.count_listings(Some(&site.name))?);
    }

    Ok(())
}

/// Validates the config and shows what would be crawled
fn handle_check(config: &Config, config_hash: &str) {
    println!("=== Job Harvester Config Check ===\n");

    println!("Crawler:");
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!(
        "  Retries: {} (base backoff {}ms)",
        config.crawler.max_retries, config.crawler.retry_backoff_ms
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Max concurrent sites: {}", config.crawler.max_concurrent_sites);
    println!("  Rate limit scope: {:?}", config.crawler.rate_limit_scope);
    println!("  Detail enrichment: {}", config.crawler.enrich_details);

    println!("\nCache:");
    println!("  TTL: {}s", config.cache.ttl_seconds);
    println!("  Max entries: {}", config.cache.max_entries);

    println!("\nUser Agent: {}", config.user_agent.header_value());
    println!("Database: {}", config.output.database_path);

    println!("\nSites ({}):", config.sites.len());
    for site in &config.sites {
        println!("  - {} [{:?}] {}{}", site.name, site.kind, site.url, site.search_path);
    }

    println!("\n✓ Configuration is valid (hash: {})", config_hash);
}
