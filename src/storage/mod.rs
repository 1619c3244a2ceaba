//! Storage module for persisting harvested listings
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Listing inserts guarded by a UNIQUE url constraint
//! - Filtered, paginated listing queries for the HTTP API
//! - The crawl run ledger
//! - Per-user bookmarks and applications

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{InsertError, Storage, StorageError, StorageResult};

use crate::state::DoneReason;
use crate::HarvestError;
use serde::Serialize;

use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, HarvestError> {
    SqliteStorage::new(path)
}

/// Represents a crawl run
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub stop_reason: Option<DoneReason>,
    pub error_message: Option<String>,
    pub totals: RunTotals,
}

/// Per-run counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    pub pages_fetched: u32,
    pub jobs_saved: u32,
    pub duplicates_skipped: u32,
    pub cards_skipped: u32,
    pub insert_failures: u32,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A user's bookmark joined with the listing it points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bookmark {
    pub bookmark_id: i64,
    pub bookmarked_at: String,
    pub job_id: i64,
    pub title: Option<String>,
    pub company_name: Option<String>,
    pub address_main: Option<String>,
}

/// Status of a job application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Canceled,
}

impl ApplicationStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Canceled => "canceled",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "applied" => Some(Self::Applied),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }
}

/// A user's application to one listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Application {
    pub id: i64,
    pub job_id: i64,
    pub title: Option<String>,
    pub company_name: Option<String>,
    pub resume_url: Option<String>,
    pub status: ApplicationStatus,
    pub applied_at: String,
    pub canceled_at: Option<String>,
}

/// Column a listing query is ordered by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    CreatedAt,
    Title,
    CompanyName,
    Salary,
}

impl SortField {
    /// Parses a user-supplied sort key, falling back to `created_at`
    pub fn parse_or_default(s: Option<&str>) -> Self {
        match s {
            Some("title") => Self::Title,
            Some("company_name") => Self::CompanyName,
            Some("salary") => Self::Salary,
            _ => Self::CreatedAt,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::Title => "title",
            Self::CompanyName => "company_name",
            Self::Salary => "salary",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Parses a user-supplied direction, falling back to `desc`
    pub fn parse_or_default(s: Option<&str>) -> Self {
        match s.map(str::to_ascii_lowercase).as_deref() {
            Some("asc") => Self::Asc,
            _ => Self::Desc,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Filters and pagination for listing queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobQuery {
    /// 1-based page number
    pub page: u32,
    pub size: u32,
    pub sort: SortField,
    pub order: SortOrder,
    /// Exact match on `address_main`
    pub region: Option<String>,
    /// Exact match on `experience`
    pub career: Option<String>,
    /// Exact match on `salary`
    pub salary: Option<String>,
    /// Substring match on `tech_stack`
    pub tech_stack: Option<String>,
    /// Substring match on `title` or `company_name`
    pub keyword: Option<String>,
}

impl JobQuery {
    pub const DEFAULT_SIZE: u32 = 20;
    pub const MAX_SIZE: u32 = 100;

    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.size)
    }
}

impl Default for JobQuery {
    fn default() -> Self {
        Self {
            page: 1,
            size: Self::DEFAULT_SIZE,
            sort: SortField::default(),
            order: SortOrder::default(),
            region: None,
            career: None,
            salary: None,
            tech_stack: None,
            keyword: None,
        }
    }
}
