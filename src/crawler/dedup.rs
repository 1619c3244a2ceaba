//! In-memory deduplication index
//!
//! Holds every listing URL already in storage. Loaded once when a run starts
//! and grown as the run saves new listings.

use crate::storage::{Storage, StorageResult};
use std::collections::HashSet;

#[derive(Debug, Default, Clone)]
pub struct DedupIndex {
    urls: HashSet<String>,
}

impl DedupIndex {
    /// Reads all stored URLs
    pub fn load<S: Storage>(store: &S) -> StorageResult<Self> {
        let urls = store.load_job_urls()?;
        tracing::info!("Loaded {} known listing URLs", urls.len());
        Ok(Self { urls })
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Records a URL; returns false if it was already known
    pub fn add(&mut self, url: impl Into<String>) -> bool {
        self.urls.insert(url.into())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
