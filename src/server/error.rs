//! Error envelope for the HTTP API

use crate::storage::StorageError;
use crate::HarvestError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum ApiError {
    JobNotFound(i64),
    JobsFetchFailed(String),
    JobSaveFailed(String),
    CrawlFailed(String),
    DatabaseUnavailable(String),
    /// Names of the required body fields that were absent or blank
    MissingFields(Vec<&'static str>),
    InvalidRequest(String),
    DuplicateJob(String),
    Unauthorized,
    JobIdRequired,
    DuplicateApplication(i64),
    ApplicationNotFound(i64),
    InvalidApplicationStatus(i64),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::JobNotFound(_) => "JOB_NOT_FOUND",
            ApiError::JobsFetchFailed(_) => "JOBS_FETCH_FAILED",
            ApiError::JobSaveFailed(_) => "JOB_SAVE_FAILED",
            ApiError::CrawlFailed(_) => "CRAWL_FAILED",
            ApiError::DatabaseUnavailable(_) => "DATABASE_UNAVAILABLE",
            ApiError::MissingFields(_) => "MISSING_FIELDS",
            ApiError::InvalidRequest(_) => "INVALID_REQUEST",
            ApiError::DuplicateJob(_) => "DUPLICATE_JOB",
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::JobIdRequired => "JOB_ID_REQUIRED",
            ApiError::DuplicateApplication(_) => "DUPLICATE_APPLICATION",
            ApiError::ApplicationNotFound(_) => "APPLICATION_NOT_FOUND",
            ApiError::InvalidApplicationStatus(_) => "INVALID_APPLICATION_STATUS",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::JobNotFound(_) | ApiError::ApplicationNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MissingFields(_)
            | ApiError::InvalidRequest(_)
            | ApiError::JobIdRequired
            | ApiError::InvalidApplicationStatus(_) => StatusCode::BAD_REQUEST,
            ApiError::DuplicateJob(_) | ApiError::DuplicateApplication(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::DatabaseUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::JobsFetchFailed(_) | ApiError::JobSaveFailed(_) | ApiError::CrawlFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::JobNotFound(id) => write!(f, "Job {} not found", id),
            ApiError::JobsFetchFailed(msg) => write!(f, "Failed to fetch jobs: {}", msg),
            ApiError::JobSaveFailed(msg) => write!(f, "Failed to save job: {}", msg),
            ApiError::CrawlFailed(msg) => write!(f, "Crawl failed: {}", msg),
            ApiError::DatabaseUnavailable(msg) => write!(f, "Database unavailable: {}", msg),
            ApiError::MissingFields(fields) => {
                write!(f, "Missing required fields: {}", fields.join(", "))
            }
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::DuplicateJob(url) => write!(f, "A job with url {} already exists", url),
            ApiError::Unauthorized => write!(f, "Missing or invalid user id"),
            ApiError::JobIdRequired => write!(f, "Job ID is required"),
            ApiError::DuplicateApplication(job_id) => {
                write!(f, "You have already applied for job {}", job_id)
            }
            ApiError::ApplicationNotFound(id) => write!(f, "Application {} not found", id),
            ApiError::InvalidApplicationStatus(id) => {
                write!(f, "Application {} can no longer be canceled", id)
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::JobsFetchFailed(err.to_string())
    }
}

impl From<HarvestError> for ApiError {
    fn from(err: HarvestError) -> Self {
        ApiError::CrawlFailed(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }

        let body = Json(json!({
            "status": "error",
            "message": self.to_string(),
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}
