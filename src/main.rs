//! Job-Harvest main entry point
//!
//! This is the command-line interface for the Job-Harvest listing harvester.

use anyhow::Context;
use clap::Parser;
use job_harvest::config::{load_config_with_hash, Config};
use job_harvest::crawler::crawl;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Job-Harvest: a polite job-listing harvester
///
/// Pages through a job-listing site, stores every listing it has not seen
/// before, and can serve the harvested listings over HTTP.
#[derive(Parser, Debug)]
#[command(name = "job-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A polite job-listing harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (HARVEST_* variables alone are enough without one)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "serve"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "serve"])]
    stats: bool,

    /// Serve the HTTP API instead of crawling once
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    serve: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Values in .env count as environment overrides
    dotenvy::dotenv().ok();

    match &cli.config {
        Some(path) => tracing::info!("Loading configuration from: {}", path.display()),
        None => tracing::info!("Loading configuration from the environment"),
    }
    let (config, config_hash) =
        load_config_with_hash(cli.config.as_deref()).context("Failed to load configuration")?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.serve {
        job_harvest::server::serve(config, config_hash)
            .await
            .context("HTTP server stopped")
    } else {
        handle_crawl(&config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("job_harvest=info,warn"),
            1 => EnvFilter::new("job_harvest=debug,info"),
            2 => EnvFilter::new("job_harvest=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let first_page = job_harvest::url::site_root(&config.site.base_url).and_then(|root| {
        job_harvest::url::listing_page_url(
            &root,
            &config.site.listing_path,
            &config.site.page_param,
            1,
        )
    })?;

    println!("=== Job-Harvest Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  First listing page: {}", first_page);
    println!("  Job group: {}", config.site.job_group);

    println!("\nCrawler Configuration:");
    println!("  Max jobs per run: {}", config.crawler.max_jobs);
    println!("  Max pages per run: {}", config.crawler.max_pages);
    println!(
        "  Attempts per page: {} ({}ms apart)",
        config.crawler.max_retries, config.crawler.retry_delay_ms
    );
    println!("  Delay between pages: {}ms", config.crawler.page_delay_ms);
    println!(
        "  Timeouts: {}s request, {}s connect",
        config.crawler.request_timeout_secs, config.crawler.connect_timeout_secs
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    if let Some(json_path) = &config.output.json_path {
        println!("  JSON dump: {}", json_path);
    }

    println!("\nSelectors:");
    println!("  Card: {}", config.selectors.card);
    println!("  Title link: {}", config.selectors.title_link);
    println!("  Description: {}", config.selectors.description);

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use job_harvest::output::{load_statistics, print_statistics};
    use job_harvest::storage::open_storage;
    use std::path::Path;

    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))
        .context("Failed to open database")?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config) -> anyhow::Result<()> {
    tracing::info!(
        "Harvesting {} (up to {} jobs, {} pages)",
        config.site.base_url,
        config.crawler.max_jobs,
        config.crawler.max_pages
    );

    let report = crawl(config).await.context("Crawl failed")?;

    println!(
        "Crawled {} jobs successfully (stopped: {})",
        report.saved_count(),
        report.reason
    );

    Ok(())
}
