//! Bookmark handlers

use crate::server::error::ApiError;
use crate::server::handlers::{json_body, page_or_default, size_or_default};
use crate::server::user::UserId;
use crate::server::AppState;
use crate::storage::Storage;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Default, Deserialize)]
pub struct BookmarkRequest {
    pub job_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BookmarksParams {
    pub page: Option<String>,
    pub size: Option<String>,
}

/// `POST /bookmarks`: bookmarks a listing, or removes an existing bookmark
pub async fn toggle_bookmark(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    payload: Result<Json<BookmarkRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let job_id = json_body(payload)?
        .job_id
        .filter(|id| *id > 0)
        .ok_or(ApiError::JobIdRequired)?;

    let mut store = state.open_store()?;
    if store.get_job(job_id)?.is_none() {
        return Err(ApiError::JobNotFound(job_id));
    }

    let bookmarked = store.toggle_bookmark(user_id, job_id)?;
    let (status, message) = if bookmarked {
        (StatusCode::CREATED, "Bookmark added successfully")
    } else {
        (StatusCode::OK, "Bookmark removed successfully")
    };
    tracing::debug!("User {} bookmark on job {}: {}", user_id, job_id, bookmarked);

    Ok((
        status,
        Json(json!({
            "status": "success",
            "data": {
                "message": message,
                "job_id": job_id,
                "bookmarked": bookmarked,
            }
        })),
    ))
}

/// `GET /bookmarks`: the caller's bookmarks, newest first
pub async fn list_bookmarks(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Query(params): Query<BookmarksParams>,
) -> Result<Json<Value>, ApiError> {
    let page = page_or_default(params.page);
    let size = size_or_default(params.size, DEFAULT_PAGE_SIZE);

    let store = state.open_store()?;
    let (bookmarks, total) = store.list_bookmarks(user_id, page, size)?;

    Ok(Json(json!({
        "status": "success",
        "data": bookmarks,
        "pagination": {
            "currentPage": page,
            "pageSize": size,
            "totalItems": total,
        }
    })))
}
