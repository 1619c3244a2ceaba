//! HTTP surface
//!
//! - `GET /crawl` runs one crawl
//! - `GET /jobs`, `GET /jobs/{id}` and `GET /jobs/notifications` read listings
//! - `POST /jobs` and `DELETE /jobs/{id}` manage them by hand
//! - `/bookmarks` and `/applications` act for the user named by `X-User-Id`
//! - `GET /health` checks the database

mod applications;
mod bookmarks;
mod error;
mod handlers;
mod user;

pub use error::ApiError;
pub use handlers::{JobsParams, NewJobRequest};
pub use user::{UserId, USER_ID_HEADER};

use crate::config::Config;
use crate::storage::{open_storage, SqliteStorage};
use crate::HarvestError;
use axum::{
    routing::{delete, get},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared state of the HTTP server
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    config_hash: Arc<str>,
    /// Held for the duration of a crawl so runs never overlap
    crawl_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: Config, config_hash: impl Into<Arc<str>>) -> Self {
        Self {
            config: Arc::new(config),
            config_hash: config_hash.into(),
            crawl_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn open_store(&self) -> Result<SqliteStorage, ApiError> {
        open_storage(Path::new(&self.config.output.database_path))
            .map_err(|e| ApiError::DatabaseUnavailable(e.to_string()))
    }
}

/// Builds the router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/crawl", get(handlers::trigger_crawl))
        .route("/jobs", get(handlers::list_jobs).post(handlers::create_job))
        .route("/jobs/notifications", get(handlers::notifications))
        .route("/jobs/{id}", get(handlers::get_job).delete(handlers::delete_job))
        .route(
            "/bookmarks",
            get(bookmarks::list_bookmarks).post(bookmarks::toggle_bookmark),
        )
        .route(
            "/applications",
            get(applications::list_applications).post(applications::create_application),
        )
        .route("/applications/{id}", delete(applications::cancel_application))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Serves the API on `config.server.bind` until the process stops
pub async fn serve(config: Config, config_hash: String) -> Result<(), HarvestError> {
    let bind = config.server.bind.clone();
    let app = create_app(AppState::new(config, config_hash));

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
