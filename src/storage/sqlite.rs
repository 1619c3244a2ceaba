//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::listing::{
    JobListing, JobSummary, RecentJob, StoredJob, DATE_FORMAT, TIMESTAMP_FORMAT,
};
use crate::state::DoneReason;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{InsertError, Storage, StorageError, StorageResult};
use crate::storage::{
    Application, ApplicationStatus, Bookmark, JobQuery, RunRecord, RunStatus, RunTotals,
    SortOrder,
};
use crate::HarvestError;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::Path;

const JOB_COLUMNS: &str = "id, job_group, badge, company_name, title, deadline, address_main,
     address_total, experience, education, employment_type, salary, tech_stack,
     created_at, crawled_at, url, description";

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, stop_reason,
     error_message, pages_fetched, jobs_saved, duplicates_skipped, cards_skipped, insert_failures";

const APPLICATION_COLUMNS: &str = "a.id, a.job_id, j.title, j.company_name, a.resume_url,
     a.status, a.applied_at, a.canceled_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database file and initializes the schema
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn now_timestamp() -> String {
    Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

fn conversion_error(idx: usize, err: chrono::ParseError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn row_to_job(row: &Row<'_>) -> rusqlite::Result<StoredJob> {
    let deadline: Option<String> = row.get(5)?;
    let created_at: String = row.get(13)?;
    let crawled_at: String = row.get(14)?;

    Ok(StoredJob {
        id: row.get(0)?,
        listing: JobListing {
            job_group: row.get(1)?,
            badge: row.get(2)?,
            company_name: row.get(3)?,
            title: row.get(4)?,
            deadline: deadline
                .as_deref()
                .map(|d| NaiveDate::parse_from_str(d, DATE_FORMAT))
                .transpose()
                .map_err(|e| conversion_error(5, e))?,
            address_main: row.get(6)?,
            address_total: row.get(7)?,
            experience: row.get(8)?,
            education: row.get(9)?,
            employment_type: row.get(10)?,
            salary: row.get(11)?,
            tech_stack: row.get(12)?,
            created_at: NaiveDateTime::parse_from_str(&created_at, TIMESTAMP_FORMAT)
                .map_err(|e| conversion_error(13, e))?,
            crawled_at: NaiveDateTime::parse_from_str(&crawled_at, TIMESTAMP_FORMAT)
                .map_err(|e| conversion_error(14, e))?,
            url: row.get(15)?,
            description: row.get(16)?,
        },
    })
}

fn row_to_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    let status: String = row.get(4)?;
    let stop_reason: Option<String> = row.get(5)?;

    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&status).unwrap_or(RunStatus::Failed),
        stop_reason: stop_reason.as_deref().and_then(DoneReason::from_db_string),
        error_message: row.get(6)?,
        totals: RunTotals {
            pages_fetched: row.get(7)?,
            jobs_saved: row.get(8)?,
            duplicates_skipped: row.get(9)?,
            cards_skipped: row.get(10)?,
            insert_failures: row.get(11)?,
        },
    })
}

fn row_to_application(row: &Row<'_>) -> rusqlite::Result<Application> {
    let status: String = row.get(5)?;

    Ok(Application {
        id: row.get(0)?,
        job_id: row.get(1)?,
        title: row.get(2)?,
        company_name: row.get(3)?,
        resume_url: row.get(4)?,
        status: ApplicationStatus::from_db_string(&status).unwrap_or(ApplicationStatus::Canceled),
        applied_at: row.get(6)?,
        canceled_at: row.get(7)?,
    })
}

fn page_offset(page: u32, size: u32) -> i64 {
    (u64::from(page.max(1) - 1) * u64::from(size)) as i64
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Builds the WHERE clause and bound values for a listing query
fn filter_clause(query: &JobQuery) -> (String, Vec<Value>) {
    let mut filters = Vec::new();
    let mut values = Vec::new();

    if let Some(region) = &query.region {
        filters.push("address_main = ?");
        values.push(Value::Text(region.clone()));
    }
    if let Some(career) = &query.career {
        filters.push("experience = ?");
        values.push(Value::Text(career.clone()));
    }
    if let Some(salary) = &query.salary {
        filters.push("salary = ?");
        values.push(Value::Text(salary.clone()));
    }
    if let Some(tech_stack) = &query.tech_stack {
        filters.push("tech_stack LIKE ?");
        values.push(Value::Text(format!("%{}%", tech_stack)));
    }
    if let Some(keyword) = &query.keyword {
        filters.push("(title LIKE ? OR company_name LIKE ?)");
        values.push(Value::Text(format!("%{}%", keyword)));
        values.push(Value::Text(format!("%{}%", keyword)));
    }

    if filters.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", filters.join(" AND ")), values)
    }
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO crawl_runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now_timestamp(), config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM crawl_runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                row_to_run,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM crawl_runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                row_to_run,
            )
            .optional()?;
        Ok(run)
    }

    fn complete_run(
        &mut self,
        run_id: i64,
        reason: DoneReason,
        totals: &RunTotals,
    ) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE crawl_runs SET status = ?1, finished_at = ?2, stop_reason = ?3,
             pages_fetched = ?4, jobs_saved = ?5, duplicates_skipped = ?6,
             cards_skipped = ?7, insert_failures = ?8
             WHERE id = ?9",
            params![
                RunStatus::Completed.to_db_string(),
                now_timestamp(),
                reason.to_db_string(),
                totals.pages_fetched,
                totals.jobs_saved,
                totals.duplicates_skipped,
                totals.cards_skipped,
                totals.insert_failures,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn fail_run(&mut self, run_id: i64, message: &str) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE crawl_runs SET status = ?1, finished_at = ?2, error_message = ?3 WHERE id = ?4",
            params![RunStatus::Failed.to_db_string(), now_timestamp(), message, run_id],
        )?;
        Ok(())
    }

    fn run_overview(&self) -> StorageResult<(u64, u64)> {
        let (runs, saved): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(jobs_saved), 0) FROM crawl_runs",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok((runs as u64, saved as u64))
    }

    // ===== Jobs =====

    fn load_job_urls(&self) -> StorageResult<HashSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url FROM jobs WHERE url IS NOT NULL")?;
        let urls = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(urls)
    }

    fn insert_job(&mut self, listing: &JobListing) -> Result<i64, InsertError> {
        let result = self.conn.execute(
            "INSERT INTO jobs (job_group, badge, company_name, title, deadline, address_main,
             address_total, experience, education, employment_type, salary, tech_stack,
             created_at, crawled_at, url, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                listing.job_group,
                listing.badge,
                listing.company_name,
                listing.title,
                listing
                    .deadline
                    .map(|d| d.format(DATE_FORMAT).to_string()),
                listing.address_main,
                listing.address_total,
                listing.experience,
                listing.education,
                listing.employment_type,
                listing.salary,
                listing.tech_stack,
                listing.created_at.format(TIMESTAMP_FORMAT).to_string(),
                listing.crawled_at.format(TIMESTAMP_FORMAT).to_string(),
                listing.url,
                listing.description,
            ],
        );

        match result {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(e) if is_unique_violation(&e) => Err(InsertError::Duplicate {
                url: listing.url.clone().unwrap_or_default(),
            }),
            Err(e) => Err(InsertError::Storage(e)),
        }
    }

    fn get_job(&self, id: i64) -> StorageResult<Option<StoredJob>> {
        let job = self
            .conn
            .query_row(
                &format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS),
                params![id],
                row_to_job,
            )
            .optional()?;
        Ok(job)
    }

    fn list_jobs(&self, query: &JobQuery) -> StorageResult<(Vec<StoredJob>, u64)> {
        let (where_clause, mut values) = filter_clause(query);

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM jobs{}", where_clause),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        // id breaks ties so paging is stable
        let sql = format!(
            "SELECT {} FROM jobs{} ORDER BY {} {}, id {} LIMIT ? OFFSET ?",
            JOB_COLUMNS,
            where_clause,
            query.sort.column(),
            query.order.keyword(),
            query.order.keyword(),
        );
        values.push(Value::Integer(i64::from(query.size)));
        values.push(Value::Integer(query.offset() as i64));

        let mut stmt = self.conn.prepare(&sql)?;
        let jobs = stmt
            .query_map(params_from_iter(values.iter()), row_to_job)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((jobs, total as u64))
    }

    fn related_jobs(&self, id: i64, tech_stack: &str, limit: u32) -> StorageResult<Vec<JobSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, company_name, address_main FROM jobs
             WHERE tech_stack LIKE ?1 AND id != ?2
             ORDER BY id DESC LIMIT ?3",
        )?;

        let related = stmt
            .query_map(params![format!("%{}%", tech_stack), id, limit], |row| {
                Ok(JobSummary {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    company_name: row.get(2)?,
                    address_main: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(related)
    }

    fn recent_jobs(&self, limit: u32) -> StorageResult<Vec<RecentJob>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, company_name, created_at FROM jobs
             ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;

        let recent = stmt
            .query_map(params![limit], |row| {
                let created_at: String = row.get(3)?;
                Ok(RecentJob {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    company_name: row.get(2)?,
                    created_at: NaiveDateTime::parse_from_str(&created_at, TIMESTAMP_FORMAT)
                        .map_err(|e| conversion_error(3, e))?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(recent)
    }

    fn delete_job(&mut self, id: i64) -> StorageResult<bool> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM bookmarks WHERE job_id = ?1", params![id])?;
        tx.execute("DELETE FROM applications WHERE job_id = ?1", params![id])?;
        let deleted = tx.execute("DELETE FROM jobs WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    fn count_jobs(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_jobs_by_region(&self, limit: u32) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT COALESCE(address_main, '(unknown)') AS region, COUNT(*) AS n
             FROM jobs GROUP BY region ORDER BY n DESC, region ASC LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(params![limit], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    // ===== Bookmarks =====

    fn toggle_bookmark(&mut self, user_id: i64, job_id: i64) -> StorageResult<bool> {
        let removed = self.conn.execute(
            "DELETE FROM bookmarks WHERE user_id = ?1 AND job_id = ?2",
            params![user_id, job_id],
        )?;
        if removed > 0 {
            return Ok(false);
        }

        self.conn.execute(
            "INSERT INTO bookmarks (user_id, job_id, bookmarked_at) VALUES (?1, ?2, ?3)",
            params![user_id, job_id, now_timestamp()],
        )?;
        Ok(true)
    }

    fn list_bookmarks(
        &self,
        user_id: i64,
        page: u32,
        size: u32,
    ) -> StorageResult<(Vec<Bookmark>, u64)> {
        let total: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM bookmarks b JOIN jobs j ON j.id = b.job_id WHERE b.user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(
            "SELECT b.id, b.bookmarked_at, j.id, j.title, j.company_name, j.address_main
             FROM bookmarks b JOIN jobs j ON j.id = b.job_id
             WHERE b.user_id = ?1
             ORDER BY b.bookmarked_at DESC, b.id DESC
             LIMIT ?2 OFFSET ?3",
        )?;
        let bookmarks = stmt
            .query_map(params![user_id, size, page_offset(page, size)], |row| {
                Ok(Bookmark {
                    bookmark_id: row.get(0)?,
                    bookmarked_at: row.get(1)?,
                    job_id: row.get(2)?,
                    title: row.get(3)?,
                    company_name: row.get(4)?,
                    address_main: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((bookmarks, total as u64))
    }

    // ===== Applications =====

    fn create_application(
        &mut self,
        user_id: i64,
        job_id: i64,
        resume_url: Option<&str>,
    ) -> StorageResult<Option<i64>> {
        let result = self.conn.execute(
            "INSERT INTO applications (user_id, job_id, resume_url, status, applied_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user_id,
                job_id,
                resume_url,
                ApplicationStatus::Applied.to_db_string(),
                now_timestamp()
            ],
        );

        match result {
            Ok(_) => Ok(Some(self.conn.last_insert_rowid())),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_application(&self, user_id: i64, id: i64) -> StorageResult<Option<Application>> {
        let application = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM applications a LEFT JOIN jobs j ON j.id = a.job_id
                     WHERE a.id = ?1 AND a.user_id = ?2",
                    APPLICATION_COLUMNS
                ),
                params![id, user_id],
                row_to_application,
            )
            .optional()?;
        Ok(application)
    }

    fn list_applications(
        &self,
        user_id: i64,
        status: Option<ApplicationStatus>,
        order: SortOrder,
    ) -> StorageResult<Vec<Application>> {
        let mut values = vec![Value::Integer(user_id)];
        let mut sql = format!(
            "SELECT {} FROM applications a LEFT JOIN jobs j ON j.id = a.job_id WHERE a.user_id = ?",
            APPLICATION_COLUMNS
        );
        if let Some(status) = status {
            sql.push_str(" AND a.status = ?");
            values.push(Value::Text(status.to_db_string().to_string()));
        }
        sql.push_str(&format!(
            " ORDER BY a.applied_at {}, a.id {}",
            order.keyword(),
            order.keyword()
        ));

        let mut stmt = self.conn.prepare(&sql)?;
        let applications = stmt
            .query_map(params_from_iter(values.iter()), row_to_application)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(applications)
    }

    fn cancel_application(&mut self, user_id: i64, id: i64) -> StorageResult<bool> {
        let updated = self.conn.execute(
            "UPDATE applications SET status = ?1, canceled_at = ?2
             WHERE id = ?3 AND user_id = ?4 AND status = ?5",
            params![
                ApplicationStatus::Canceled.to_db_string(),
                now_timestamp(),
                id,
                user_id,
                ApplicationStatus::Applied.to_db_string()
            ],
        )?;
        Ok(updated > 0)
    }

    // ===== Health =====

    fn ping(&self) -> StorageResult<()> {
        self.conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}
