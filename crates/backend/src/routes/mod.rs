//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                   - Liveness check
//! GET  /health/ready             - Readiness check (catalog cache populated)
//!
//! GET  /api/catalog              - Cached catalog, 503 until first generation
//! POST /api/pay                  - Initiate a payment for a cart
//! GET  /api/download-site-files  - Authenticated zip of the site files
//! ```

pub mod catalog;
pub mod download;
pub mod pay;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Build the API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/api/catalog", get(catalog::get_catalog))
        .route("/api/pay", post(pay::pay))
        .route("/api/download-site-files", get(download::download_site_files))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable until the catalog cache has been
/// populated by the first successful feed generation.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.catalog().is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
