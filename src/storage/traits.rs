//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::listing::{JobListing, JobSummary, RecentJob, StoredJob};
use crate::storage::{
    Application, ApplicationStatus, Bookmark, JobQuery, RunRecord, RunTotals, SortOrder,
};
use crate::state::DoneReason;
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Why a single listing could not be inserted
///
/// Never fatal to a crawl: the driver logs it and moves to the next card.
#[derive(Debug, Error)]
pub enum InsertError {
    #[error("Listing already stored: {url}")]
    Duplicate { url: String },

    #[error("Insert failed: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Everything the crawler and the HTTP API need from the database.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run in the `running` state and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run as completed with its stop reason and counters
    fn complete_run(&mut self, run_id: i64, reason: DoneReason, totals: &RunTotals)
        -> StorageResult<()>;

    /// Marks a run as failed
    fn fail_run(&mut self, run_id: i64, message: &str) -> StorageResult<()>;

    /// Counts runs and sums saved jobs across completed runs
    fn run_overview(&self) -> StorageResult<(u64, u64)>;

    // ===== Jobs =====

    /// Loads every stored listing URL
    fn load_job_urls(&self) -> StorageResult<HashSet<String>>;

    /// Inserts one listing as its own unit of work, returning the new row ID
    fn insert_job(&mut self, listing: &JobListing) -> Result<i64, InsertError>;

    /// Gets a listing by ID
    fn get_job(&self, id: i64) -> StorageResult<Option<StoredJob>>;

    /// Lists listings matching `query`, returning the page and the total match count
    fn list_jobs(&self, query: &JobQuery) -> StorageResult<(Vec<StoredJob>, u64)>;

    /// Other listings whose tech stack contains `tech_stack`
    fn related_jobs(&self, id: i64, tech_stack: &str, limit: u32) -> StorageResult<Vec<JobSummary>>;

    /// The `limit` most recently created listings, newest first
    fn recent_jobs(&self, limit: u32) -> StorageResult<Vec<RecentJob>>;

    /// Deletes a listing together with its bookmarks and applications
    ///
    /// Returns false if there was no such listing.
    fn delete_job(&mut self, id: i64) -> StorageResult<bool>;

    /// Gets the total listing count
    fn count_jobs(&self) -> StorageResult<u64>;

    /// Listing counts grouped by `address_main`, most frequent first
    fn count_jobs_by_region(&self, limit: u32) -> StorageResult<Vec<(String, u64)>>;

    // ===== Bookmarks =====

    /// Adds the bookmark if absent and removes it if present
    ///
    /// Returns whether the listing is bookmarked afterwards.
    fn toggle_bookmark(&mut self, user_id: i64, job_id: i64) -> StorageResult<bool>;

    /// One page of a user's bookmarks, newest first, and the user's total
    fn list_bookmarks(
        &self,
        user_id: i64,
        page: u32,
        size: u32,
    ) -> StorageResult<(Vec<Bookmark>, u64)>;

    // ===== Applications =====

    /// Records an `applied` application, or `None` if the user already applied
    fn create_application(
        &mut self,
        user_id: i64,
        job_id: i64,
        resume_url: Option<&str>,
    ) -> StorageResult<Option<i64>>;

    /// Gets one of the user's applications
    fn get_application(&self, user_id: i64, id: i64) -> StorageResult<Option<Application>>;

    /// A user's applications ordered by application time
    fn list_applications(
        &self,
        user_id: i64,
        status: Option<ApplicationStatus>,
        order: SortOrder,
    ) -> StorageResult<Vec<Application>>;

    /// Moves an `applied` application to `canceled`
    ///
    /// Returns false if the application is missing or not `applied`.
    fn cancel_application(&mut self, user_id: i64, id: i64) -> StorageResult<bool>;

    // ===== Health =====

    /// Cheap connectivity check
    fn ping(&self) -> StorageResult<()>;
}
