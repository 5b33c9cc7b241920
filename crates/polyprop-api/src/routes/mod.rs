//! API route handlers.

mod describe;
mod health;
mod predict;
mod sample;

use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    routing::{get, post},
    Json, Router,
};
use serde_json::{Map, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::types::{ApiError, AppState};

pub use describe::SOURCE_HEADER;

/// Create the router with all endpoints.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/predict", post(predict::predict_handler))
        .route("/describe", post(describe::describe_handler))
        .route("/random-sample", get(sample::random_sample_handler))
        // Request tracing (enable with RUST_LOG=tower_http=info or higher)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// Unwrap a JSON body that must be an object.
///
/// Bodies are taken as loose JSON so that missing keys get the service's own
/// messages instead of the extractor's.
fn json_object(payload: Result<Json<Value>, JsonRejection>) -> Result<Map<String, Value>, ApiError> {
    match payload {
        Ok(Json(Value::Object(map))) => Ok(map),
        Ok(Json(_)) => Err(ApiError::bad_request("Request body must be a JSON object")),
        Err(rejection) => Err(ApiError::bad_request(format!(
            "Invalid JSON body: {}",
            rejection.body_text()
        ))),
    }
}

/// Read a string field, treating a non-string value as a bad request.
fn string_field<'a>(body: &'a Map<String, Value>, key: &str) -> Result<Option<&'a str>, ApiError> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(ApiError::bad_request(format!("'{key}' must be a string"))),
    }
}
