//! Caller identity
//!
//! Tokens are issued and checked by the gateway in front of this service,
//! which forwards the authenticated user's id in a header.

use crate::server::error::ApiError;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Header carrying the authenticated user's id
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user a bookmark or application request acts for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub i64);

impl<S: Send + Sync> FromRequestParts<S> for UserId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .map(UserId)
            .ok_or(ApiError::Unauthorized)
    }
}
