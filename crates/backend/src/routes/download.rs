//! Site files archive route handler.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::Response;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::services::archive;
use crate::state::AppState;

/// Query parameters for the archive download.
#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    #[serde(default)]
    pub key: Option<String>,
}

/// Stream a zip of the generated site files.
///
/// The provided key is checked in constant time before any filesystem
/// access. An unset download key disables the export entirely.
#[instrument(skip_all)]
pub async fn download_site_files(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response> {
    let Some(download) = state.config().download.as_ref() else {
        tracing::warn!("download key not configured; refusing site files export");
        return Err(AppError::Forbidden);
    };

    let provided = query.key.unwrap_or_default();
    if !archive::constant_time_compare(&provided, download.secret_key.expose_secret()) {
        return Err(AppError::Forbidden);
    }

    let source_dir = download.source_dir.clone();
    let is_dir = tokio::fs::metadata(&source_dir)
        .await
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(AppError::NotFound("site files directory".to_string()));
    }

    let walk_root = source_dir.clone();
    let entries = tokio::task::spawn_blocking(move || archive::collect_entries(&walk_root))
        .await
        .map_err(|error| AppError::Internal(error.to_string()))?
        .map_err(|error| AppError::Internal(error.to_string()))?;

    let body = archive::zip_stream(source_dir, entries);

    Response::builder()
        .header(header::CONTENT_TYPE, "application/zip")
        .header(
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"site_files.zip\"",
        )
        .body(body)
        .map_err(|error| AppError::Internal(error.to_string()))
}
