//! API types and DTOs.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use polyprop_core::{DatasetError, PredictError, PredictionService, ReferenceDataset};
use polyprop_describe::{DescribeError, DescriptionService};
use serde::{Deserialize, Serialize};

/// Shared application state for the API.
#[derive(Clone)]
pub struct AppState {
    /// Descriptor extraction and property prediction.
    pub predictor: PredictionService,
    /// Cache-then-generate descriptions.
    pub describer: DescriptionService,
    /// Reference rows for `/random-sample`, if one was loaded.
    pub dataset: Option<Arc<ReferenceDataset>>,
}

impl AppState {
    pub fn new(predictor: PredictionService, describer: DescriptionService) -> Self {
        Self {
            predictor,
            describer,
            dataset: None,
        }
    }

    pub fn with_dataset(mut self, dataset: ReferenceDataset) -> Self {
        self.dataset = Some(Arc::new(dataset));
        self
    }
}

/// Response wrapper with timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Response data.
    pub data: T,
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
}

impl<T> ApiResponse<T> {
    /// Create a new API response with current timestamp.
    pub fn new(data: T) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self { data, timestamp }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Version stamp of the loaded model artifacts.
    pub model_version: String,
    /// Number of descriptor columns the model consumes.
    pub descriptor_columns: usize,
    /// Number of stored descriptions.
    pub cached_descriptions: usize,
    /// Generations currently streaming.
    pub in_flight: usize,
    /// Rows in the reference dataset, if loaded.
    pub dataset_rows: Option<usize>,
}

/// Error body: `{"error": message, "code": CODE}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// An error rendered as a JSON response.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "BAD_REQUEST",
            message: message.into(),
        }
    }

    pub fn internal(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code,
            message: message.into(),
        }
    }
}

fn status_for(client_error: bool) -> StatusCode {
    if client_error {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl From<PredictError> for ApiError {
    fn from(e: PredictError) -> Self {
        Self {
            status: status_for(e.is_client_error()),
            code: e.code(),
            message: e.to_string(),
        }
    }
}

impl From<DescribeError> for ApiError {
    fn from(e: DescribeError) -> Self {
        Self {
            status: status_for(e.is_client_error()),
            code: e.code(),
            message: e.to_string(),
        }
    }
}

impl From<DatasetError> for ApiError {
    fn from(e: DatasetError) -> Self {
        Self::internal(
            "DATASET_ERROR",
            format!("Error fetching random sample: {e}"),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message,
            code: self.code.to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}
