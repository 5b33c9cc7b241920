//! Reference dataset sampling endpoint.

use std::sync::Arc;

use axum::{extract::State, Json};
use polyprop_core::{DatasetError, SAMPLE_SIZE};
use serde_json::{Map, Value};
use tracing::error;

use crate::types::{ApiError, AppState};

/// Handler for GET /random-sample
///
/// Returns `SAMPLE_SIZE` distinct rows as `{column: [values...]}`.
pub async fn random_sample_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Map<String, Value>>, ApiError> {
    let sample = state
        .dataset
        .as_ref()
        .ok_or(DatasetError::NotLoaded)
        .and_then(|dataset| dataset.sample(SAMPLE_SIZE));

    match sample {
        Ok(columns) => Ok(Json(columns)),
        Err(e) => {
            error!(error = %e, "random_sample_failed");
            Err(e.into())
        }
    }
}
