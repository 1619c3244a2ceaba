//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Job-Harvest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Harvested job listings; url is the natural key
CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_group TEXT NOT NULL,
    badge TEXT,
    company_name TEXT,
    title TEXT,
    deadline TEXT,
    address_main TEXT,
    address_total TEXT,
    experience TEXT,
    education TEXT,
    employment_type TEXT,
    salary TEXT,
    tech_stack TEXT,
    created_at TEXT NOT NULL,
    crawled_at TEXT NOT NULL,
    url TEXT UNIQUE,
    description TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_jobs_created_at ON jobs(created_at);
CREATE INDEX IF NOT EXISTS idx_jobs_address_main ON jobs(address_main);

-- Track crawl runs
CREATE TABLE IF NOT EXISTS crawl_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    stop_reason TEXT,
    error_message TEXT,
    pages_fetched INTEGER NOT NULL DEFAULT 0,
    jobs_saved INTEGER NOT NULL DEFAULT 0,
    duplicates_skipped INTEGER NOT NULL DEFAULT 0,
    cards_skipped INTEGER NOT NULL DEFAULT 0,
    insert_failures INTEGER NOT NULL DEFAULT 0
);

-- Listings a user saved; users are identified upstream
CREATE TABLE IF NOT EXISTS bookmarks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    job_id INTEGER NOT NULL,
    bookmarked_at TEXT NOT NULL,
    UNIQUE (user_id, job_id)
);

-- One application per user and listing, canceled in place
CREATE TABLE IF NOT EXISTS applications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    job_id INTEGER NOT NULL,
    resume_url TEXT,
    status TEXT NOT NULL,
    applied_at TEXT NOT NULL,
    canceled_at TEXT,
    UNIQUE (user_id, job_id)
);

CREATE INDEX IF NOT EXISTS idx_bookmarks_user ON bookmarks(user_id);
CREATE INDEX IF NOT EXISTS idx_applications_user ON applications(user_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
