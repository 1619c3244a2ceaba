//! Statistics generation from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! harvest statistics from the storage layer.

use crate::storage::{RunRecord, Storage, StorageResult};

/// Number of regions listed in the statistics
const TOP_REGIONS: u32 = 10;

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Total number of stored listings
    pub total_jobs: u64,

    /// Listing counts per region, most frequent first
    pub jobs_by_region: Vec<(String, u64)>,

    /// Number of crawl runs recorded
    pub total_runs: u64,

    /// Listings saved across completed runs
    pub jobs_saved_by_runs: u64,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<HarvestStatistics> {
    let total_jobs = storage.count_jobs()?;
    let jobs_by_region = storage.count_jobs_by_region(TOP_REGIONS)?;
    let (total_runs, jobs_saved_by_runs) = storage.run_overview()?;
    let latest_run = storage.get_latest_run()?;

    Ok(HarvestStatistics {
        total_jobs,
        jobs_by_region,
        total_runs,
        jobs_saved_by_runs,
        latest_run,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Stored listings: {}", stats.total_jobs);
    println!("  Crawl runs: {}", stats.total_runs);
    println!("  Listings saved by completed runs: {}", stats.jobs_saved_by_runs);
    println!();

    if !stats.jobs_by_region.is_empty() {
        println!("Listings by Region:");
        for (region, count) in &stats.jobs_by_region {
            let percentage = if stats.total_jobs > 0 {
                (*count as f64 / stats.total_jobs as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", region, count, percentage);
        }
        println!();
    }

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run (#{}):", run.id);
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!("  Status: {}", run.status.to_db_string());
            if let Some(reason) = run.stop_reason {
                println!("  Stop reason: {}", reason);
            }
            if let Some(message) = &run.error_message {
                println!("  Error: {}", message);
            }
            println!("  Pages fetched: {}", run.totals.pages_fetched);
            println!("  Saved: {}", run.totals.jobs_saved);
            println!("  Duplicates skipped: {}", run.totals.duplicates_skipped);
            println!("  Cards skipped: {}", run.totals.cards_skipped);
            println!("  Insert failures: {}", run.totals.insert_failures);
        }
        None => println!("No crawl runs recorded yet."),
    }
}
