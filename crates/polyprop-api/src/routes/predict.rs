//! Property prediction endpoint.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use polyprop_core::PropertySet;
use serde_json::Value;
use tracing::{info, warn};

use super::{json_object, string_field};
use crate::types::{ApiError, AppState};

/// Handler for POST /predict
pub async fn predict_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PropertySet>, ApiError> {
    let body = json_object(payload)?;
    let smiles = string_field(&body, "smiles")?
        .ok_or_else(|| ApiError::bad_request("Missing 'smiles' key in request body"))?;

    // Parsing and descriptor extraction are CPU-bound.
    let predictor = state.predictor.clone();
    let input = smiles.to_string();
    let outcome = tokio::task::spawn_blocking(move || predictor.predict(&input))
        .await
        .map_err(|e| {
            warn!(smiles, error = %e, "prediction_task_failed");
            ApiError::internal("INTERNAL_ERROR", format!("Prediction task failed: {e}"))
        })?;

    match outcome {
        Ok(properties) => {
            info!(smiles, "prediction_served");
            Ok(Json(properties))
        }
        Err(e) => {
            warn!(smiles, code = e.code(), error = %e, "prediction_failed");
            Err(e.into())
        }
    }
}
