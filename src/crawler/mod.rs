//! Crawler module for harvesting job listings
//!
//! This module contains the core crawling logic, including:
//! - Listing page fetching with an explicit retry policy
//! - Job-card parsing into [`JobListing`](crate::JobListing) records
//! - Detail page descriptions
//! - URL deduplication against storage
//! - The crawl driver state machine

mod dedup;
mod detail;
mod driver;
mod fetcher;
mod parser;

pub use dedup::DedupIndex;
pub use detail::{extract_description, DetailFetcher};
pub use driver::{CrawlDriver, CrawlLimits, CrawlReport};
pub use fetcher::{
    build_http_client, fetch_text, FetchError, FetchFailed, PageFetcher, RetryExhausted,
    RetryPolicy, Transient,
};
pub use parser::{parse_deadline, ListingParser, ParseSkipped};

use crate::config::{compute_config_hash, Config};
use crate::output::write_json_dump;
use crate::storage::{open_storage, Storage};
use crate::url::site_root;
use crate::HarvestError;
use std::path::Path;

/// Runs one crawl against `store`, recording it in the run ledger
///
/// The run is created before any fetch and closed as completed (with its
/// stop reason and counters) or failed. Page and card failures end up in the
/// report; configuration and storage failures are returned.
pub async fn run_crawl<S: Storage>(
    config: &Config,
    config_hash: &str,
    store: &mut S,
) -> crate::Result<CrawlReport> {
    let run_id = store.create_run(config_hash)?;
    tracing::info!("Starting crawl run {}", run_id);

    match drive(config, store).await {
        Ok(report) => {
            store.complete_run(run_id, report.reason, &report.totals)?;

            if let Some(path) = &config.output.json_path {
                match write_json_dump(&report.saved, Path::new(path)) {
                    Ok(()) => tracing::info!("Wrote {} listing(s) to {}", report.saved.len(), path),
                    Err(e) => tracing::error!("Failed to write JSON dump to {}: {}", path, e),
                }
            }

            Ok(report)
        }
        Err(e) => {
            tracing::error!("Crawl run {} failed: {}", run_id, e);
            if let Err(ledger) = store.fail_run(run_id, &e.to_string()) {
                tracing::error!("Could not mark run {} as failed: {}", run_id, ledger);
            }
            Err(e)
        }
    }
}

async fn drive<S: Storage>(config: &Config, store: &mut S) -> Result<CrawlReport, HarvestError> {
    let root = site_root(&config.site.base_url)?;
    let client = build_http_client(config)?;

    let pages = PageFetcher::new(client.clone(), root, config);
    let parser = ListingParser::new(config)?;
    let details = DetailFetcher::new(client, config)?;
    let dedup = DedupIndex::load(&*store)?;

    CrawlDriver::new(pages, parser, details, dedup, store, CrawlLimits::from_config(config))
        .run()
        .await
}

/// Opens the configured database and runs one crawl
///
/// This is the main entry point for starting a crawl from the CLI.
pub async fn crawl(config: &Config) -> crate::Result<CrawlReport> {
    let config_hash = compute_config_hash(config)?;
    let mut store = open_storage(Path::new(&config.output.database_path))?;
    run_crawl(config, &config_hash, &mut store).await
}
