//! Output module for crawl artifacts and reports
//!
//! This module handles:
//! - Writing the listings saved by a run to a JSON file
//! - Loading and printing database statistics

mod json;
pub mod stats;

pub use json::write_json_dump;
pub use stats::{load_statistics, print_statistics, HarvestStatistics};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
