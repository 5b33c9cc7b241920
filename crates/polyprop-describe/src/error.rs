//! Error types for the description pipeline.

use std::path::PathBuf;

use polyprop_core::PredictError;
use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors raised by a description cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode cache entry: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CacheError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for text generation.
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Errors raised by the streaming text generator.
///
/// Cloneable so one failure can be delivered to every subscriber of a flight.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Failed to build generator client: {0}")]
    Client(String),

    #[error("Generator request failed: {0}")]
    Transport(String),

    #[error("Generator returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Generator reported an error: {0}")]
    Upstream(String),

    #[error("Malformed generator frame: {0}")]
    Malformed(String),

    #[error("Generator stream ended before completion")]
    Incomplete,

    #[error("Generator produced no text")]
    Empty,

    #[error("Generation cancelled")]
    Cancelled,
}

/// Result type for description requests.
pub type DescribeResult<T> = Result<T, DescribeError>;

/// Errors surfaced by the description service.
#[derive(Debug, Error)]
pub enum DescribeError {
    /// The request lacks something the service needs.
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Prediction(#[from] PredictError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl DescribeError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Whether the failure is caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::BadRequest(_) => true,
            Self::Prediction(e) => e.is_client_error(),
            Self::Cache(_) | Self::Generation(_) => false,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Prediction(e) => e.code(),
            Self::Cache(_) => "CACHE_ERROR",
            Self::Generation(_) => "GENERATION_ERROR",
        }
    }
}
