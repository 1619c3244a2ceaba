//! Crawl, job and health handlers
//!
//! Every success body uses the `{"status":"success","data":...}` envelope;
//! failures go through [`ApiError`].

use crate::crawler::{parse_deadline, run_crawl};
use crate::listing::JobListing;
use crate::server::error::ApiError;
use crate::server::AppState;
use crate::storage::{InsertError, JobQuery, SortField, SortOrder, Storage};
use crate::url::{resolve_detail_url, site_root};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Local, NaiveDateTime};
use serde::Deserialize;
use serde_json::{json, Value};

/// Related listings returned with a job detail
const RELATED_LIMIT: u32 = 5;

/// Listings returned by `GET /jobs/notifications`
const NOTIFICATION_LIMIT: u32 = 5;

/// Query string of `GET /jobs`
///
/// Numbers are taken as strings so malformed values fall back to defaults
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct JobsParams {
    pub page: Option<String>,
    pub size: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub region: Option<String>,
    pub career: Option<String>,
    pub salary: Option<String>,
    pub tech_stack: Option<String>,
    pub keyword: Option<String>,
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 1-based page number, 1 when absent or malformed
pub(crate) fn page_or_default(page: Option<String>) -> u32 {
    page.and_then(|p| p.trim().parse::<u32>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1)
}

/// Page size clamped to `1..=JobQuery::MAX_SIZE`, `default` when absent or malformed
pub(crate) fn size_or_default(size: Option<String>, default: u32) -> u32 {
    size.and_then(|s| s.trim().parse::<u32>().ok())
        .unwrap_or(default)
        .clamp(1, JobQuery::MAX_SIZE)
}

/// Maps a malformed JSON body onto the error envelope
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))
}

impl JobsParams {
    pub fn into_query(self) -> JobQuery {
        JobQuery {
            page: page_or_default(self.page),
            size: size_or_default(self.size, JobQuery::DEFAULT_SIZE),
            sort: SortField::parse_or_default(self.sort.as_deref()),
            order: SortOrder::parse_or_default(self.order.as_deref()),
            region: non_empty(self.region),
            career: non_empty(self.career),
            salary: non_empty(self.salary),
            tech_stack: non_empty(self.tech_stack),
            keyword: non_empty(self.keyword),
        }
    }
}

/// Body of `POST /jobs`
///
/// `title`, `company_name` and `url` are required; `url` may be relative to
/// the site root and is stored in canonical form.
#[derive(Debug, Default, Deserialize)]
pub struct NewJobRequest {
    pub title: Option<String>,
    pub company_name: Option<String>,
    pub url: Option<String>,
    pub badge: Option<String>,
    pub deadline: Option<String>,
    pub address_main: Option<String>,
    pub address_total: Option<String>,
    pub experience: Option<String>,
    pub education: Option<String>,
    pub employment_type: Option<String>,
    pub salary: Option<String>,
    pub tech_stack: Option<String>,
    pub description: Option<String>,
}

impl NewJobRequest {
    pub fn into_listing(
        self,
        state: &AppState,
        now: NaiveDateTime,
    ) -> Result<JobListing, ApiError> {
        let title = non_empty(self.title);
        let company_name = non_empty(self.company_name);
        let url = non_empty(self.url);

        let missing: Vec<&'static str> = [
            ("title", title.is_none()),
            ("company_name", company_name.is_none()),
            ("url", url.is_none()),
        ]
        .into_iter()
        .filter_map(|(field, absent)| absent.then_some(field))
        .collect();

        let Some(raw_url) = url.filter(|_| missing.is_empty()) else {
            return Err(ApiError::MissingFields(missing));
        };

        let site = &state.config().site;
        let root = site_root(&site.base_url).map_err(|e| ApiError::JobSaveFailed(e.to_string()))?;
        let url = resolve_detail_url(&root, &raw_url)
            .map_err(|e| ApiError::InvalidRequest(format!("url '{}': {}", raw_url, e)))?;

        let deadline = match non_empty(self.deadline) {
            Some(raw) => Some(parse_deadline(&raw, now.date()).ok_or_else(|| {
                ApiError::InvalidRequest(format!("unrecognized deadline '{}'", raw))
            })?),
            None => None,
        };

        let address_main = non_empty(self.address_main);
        Ok(JobListing {
            job_group: site.job_group.clone(),
            badge: non_empty(self.badge),
            company_name,
            title,
            deadline,
            address_total: non_empty(self.address_total).or_else(|| address_main.clone()),
            address_main,
            experience: non_empty(self.experience),
            education: non_empty(self.education),
            employment_type: non_empty(self.employment_type),
            salary: non_empty(self.salary),
            tech_stack: non_empty(self.tech_stack),
            created_at: now,
            crawled_at: now,
            url: Some(url.to_string()),
            description: self.description.map(|d| d.trim().to_string()).unwrap_or_default(),
        })
    }
}

/// `GET /crawl`: runs one crawl, waiting for any crawl already in progress
pub async fn trigger_crawl(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let _running = state.crawl_lock.lock().await;
    tracing::info!("Crawl triggered over HTTP");

    let mut store = state.open_store()?;
    let report = run_crawl(&state.config, &state.config_hash, &mut store).await?;
    let saved = report.saved_count();

    Ok(Json(json!({
        "status": "success",
        "data": {
            "message": format!("Crawled {} jobs successfully", saved),
            "saved": saved,
            "stop_reason": report.reason,
            "totals": report.totals,
        }
    })))
}

/// `GET /jobs`: filtered, paginated listings
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobsParams>,
) -> Result<Json<Value>, ApiError> {
    let query = params.into_query();
    let store = state.open_store()?;
    let (jobs, total) = store.list_jobs(&query)?;

    Ok(Json(json!({
        "status": "success",
        "data": jobs,
        "pagination": {
            "currentPage": query.page,
            "pageSize": query.size,
            "totalItems": total,
        }
    })))
}

/// `GET /jobs/{id}`: one listing plus listings sharing its tech stack
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let store = state.open_store()?;
    let job = store.get_job(id)?.ok_or(ApiError::JobNotFound(id))?;

    let related = match job.listing.tech_stack.as_deref() {
        Some(stack) if !stack.is_empty() => store.related_jobs(id, stack, RELATED_LIMIT)?,
        _ => Vec::new(),
    };

    Ok(Json(json!({
        "status": "success",
        "data": {
            "job": job,
            "related_jobs": related,
        }
    })))
}

/// `GET /jobs/notifications`: the newest listings
pub async fn notifications(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let store = state.open_store()?;
    let recent = store.recent_jobs(NOTIFICATION_LIMIT)?;

    Ok(Json(json!({
        "status": "success",
        "data": { "recent_jobs": recent }
    })))
}

/// `POST /jobs`: stores a listing submitted by hand
pub async fn create_job(
    State(state): State<AppState>,
    payload: Result<Json<NewJobRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let listing = json_body(payload)?.into_listing(&state, Local::now().naive_local())?;

    let mut store = state.open_store()?;
    let id = match store.insert_job(&listing) {
        Ok(id) => id,
        Err(InsertError::Duplicate { url }) => return Err(ApiError::DuplicateJob(url)),
        Err(InsertError::Storage(e)) => return Err(ApiError::JobSaveFailed(e.to_string())),
    };
    tracing::info!("Created job {}: {}", id, listing.label());

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "data": {
                "message": "Job created successfully",
                "id": id,
            }
        })),
    ))
}

/// `DELETE /jobs/{id}`: removes a listing with its bookmarks and applications
pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let mut store = state.open_store()?;
    if !store.delete_job(id)? {
        return Err(ApiError::JobNotFound(id));
    }
    tracing::info!("Deleted job {}", id);

    Ok(Json(json!({
        "status": "success",
        "data": { "message": "Job deleted successfully" }
    })))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let store = state.open_store()?;
    store
        .ping()
        .map_err(|e| ApiError::DatabaseUnavailable(e.to_string()))?;

    Ok(Json(json!({ "status": "ok" })))
}
