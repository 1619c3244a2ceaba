//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: where the crawl driver is (paging, per-card, done)
//! - `DoneReason`: why a run stopped

mod crawl_state;

pub use crawl_state::{CrawlState, DoneReason};
