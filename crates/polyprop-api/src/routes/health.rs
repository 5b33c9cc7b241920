//! Health check endpoint.

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::types::{ApiError, ApiResponse, AppState, HealthResponse};

/// Handler for GET /health
pub async fn health_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<HealthResponse>>, ApiError> {
    let cached_descriptions = state
        .describer
        .cache()
        .len()
        .await
        .map_err(|e| ApiError::internal("CACHE_ERROR", e.to_string()))?;

    let response = HealthResponse {
        status: "ok".to_string(),
        model_version: state.predictor.model_version().to_string(),
        descriptor_columns: state.predictor.artifacts().columns().len(),
        cached_descriptions,
        in_flight: state.describer.in_flight(),
        dataset_rows: state.dataset.as_ref().map(|d| d.len()),
    };
    Ok(Json(ApiResponse::new(response)))
}
