//! Job application handlers
//!
//! A user applies to a listing once. Cancelling keeps the row with status
//! `canceled`, so a canceled application still blocks a second one.

use crate::server::error::ApiError;
use crate::server::handlers::{json_body, non_empty};
use crate::server::user::UserId;
use crate::server::AppState;
use crate::storage::{ApplicationStatus, SortOrder, Storage};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Default, Deserialize)]
pub struct ApplicationRequest {
    pub job_id: Option<i64>,
    pub resume_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApplicationsParams {
    pub status: Option<String>,
    pub order: Option<String>,
}

/// `POST /applications`: applies to a listing
pub async fn create_application(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    payload: Result<Json<ApplicationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let request = json_body(payload)?;
    let job_id = request
        .job_id
        .filter(|id| *id > 0)
        .ok_or(ApiError::JobIdRequired)?;
    let resume_url = non_empty(request.resume_url);

    let mut store = state.open_store()?;
    if store.get_job(job_id)?.is_none() {
        return Err(ApiError::JobNotFound(job_id));
    }

    let id = store
        .create_application(user_id, job_id, resume_url.as_deref())?
        .ok_or(ApiError::DuplicateApplication(job_id))?;
    tracing::info!("User {} applied to job {} (application {})", user_id, job_id, id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "data": {
                "message": "Application submitted successfully",
                "id": id,
            }
        })),
    ))
}

/// `GET /applications`: the caller's applications by application time
pub async fn list_applications(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Query(params): Query<ApplicationsParams>,
) -> Result<Json<Value>, ApiError> {
    let status = match non_empty(params.status) {
        Some(raw) => Some(ApplicationStatus::from_db_string(&raw).ok_or_else(|| {
            ApiError::InvalidRequest(format!("unknown application status '{}'", raw))
        })?),
        None => None,
    };
    let order = SortOrder::parse_or_default(params.order.as_deref());

    let store = state.open_store()?;
    let applications = store.list_applications(user_id, status, order)?;

    Ok(Json(json!({
        "status": "success",
        "data": { "applications": applications }
    })))
}

/// `DELETE /applications/{id}`: cancels an application still in `applied`
pub async fn cancel_application(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let mut store = state.open_store()?;
    let application = store
        .get_application(user_id, id)?
        .ok_or(ApiError::ApplicationNotFound(id))?;

    if application.status != ApplicationStatus::Applied || !store.cancel_application(user_id, id)? {
        return Err(ApiError::InvalidApplicationStatus(id));
    }
    tracing::info!("User {} canceled application {}", user_id, id);

    Ok(Json(json!({
        "status": "success",
        "data": { "message": "Application canceled successfully" }
    })))
}
