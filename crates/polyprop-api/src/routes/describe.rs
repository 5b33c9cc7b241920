//! Streaming description endpoint.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures_util::StreamExt;
use polyprop_core::PropertySet;
use polyprop_describe::{DescribeError, DescriptionSource};
use serde_json::Value;
use tracing::warn;

use super::{json_object, string_field};
use crate::types::{ApiError, AppState};

/// Response header naming where the streamed text comes from.
pub const SOURCE_HEADER: &str = "x-description-source";

const MISSING_KEYS: &str = "Missing 'smiles' or 'properties' key in request body";

/// Handler for POST /describe
///
/// Streams `text/plain` chunks. A generation failure after the first chunk
/// aborts the body; the client sees a truncated response.
pub async fn describe_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let body = json_object(payload)?;
    let smiles = string_field(&body, "smiles")?;
    let properties = body.get("properties").filter(|v| !v.is_null());
    let (Some(smiles), Some(properties)) = (smiles, properties) else {
        return Err(ApiError::bad_request(MISSING_KEYS));
    };
    // Validated only on a cache miss; stored descriptions replay regardless.
    let properties = properties.clone();
    let stream = state
        .describer
        .describe_with(smiles, move || {
            serde_json::from_value::<PropertySet>(properties)
                .map(Some)
                .map_err(|e| DescribeError::bad_request(format!("Invalid 'properties': {e}")))
        })
        .await?;
    let source = match stream.source() {
        DescriptionSource::Cache => "cache",
        DescriptionSource::Generated => "generated",
    };

    let smiles = smiles.to_string();
    let chunks = stream.map(move |chunk| {
        chunk.inspect_err(|e| warn!(smiles = %smiles, error = %e, "description_stream_aborted"))
    });

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            ),
            (
                header::HeaderName::from_static(SOURCE_HEADER),
                HeaderValue::from_static(source),
            ),
        ],
        Body::from_stream(chunks),
    )
        .into_response())
}
