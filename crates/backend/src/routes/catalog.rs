//! Catalog route handler.

use axum::Json;
use axum::extract::State;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Serve the cached catalog verbatim.
///
/// Returns 503 until the first successful feed generation has published a
/// snapshot. Reading never triggers regeneration.
pub async fn get_catalog(State(state): State<AppState>) -> Result<Json<Value>> {
    let snapshot = state
        .catalog()
        .get()
        .ok_or(AppError::CatalogUnavailable)?;

    let value = serde_json::to_value(snapshot.as_ref())
        .map_err(|error| AppError::Internal(error.to_string()))?;
    Ok(Json(value))
}
