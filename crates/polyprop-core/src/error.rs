//! Error types for the prediction pipeline, artifact loading and the reference dataset.

use std::path::PathBuf;
use thiserror::Error;

use crate::smiles::SmilesError;

/// Result type for prediction operations.
pub type PredictResult<T> = Result<T, PredictError>;

/// Errors raised while turning a SMILES string into a property prediction.
#[derive(Debug, Error)]
pub enum PredictError {
    /// The structural string did not parse into a valid molecular graph.
    #[error("Invalid SMILES string: {smiles} ({source})")]
    InvalidMolecule {
        smiles: String,
        #[source]
        source: SmilesError,
    },

    /// A training-time descriptor column was absent from the extraction.
    #[error("Descriptor columns missing from extraction: {}", missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    /// A vector did not match the fitted scaler's dimensionality.
    #[error("Scaling error ({stage}): expected {expected} values, got {actual}")]
    Scaling {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The regression model failed to produce a prediction.
    #[error("Inference error: {0}")]
    Inference(String),
}

impl PredictError {
    pub fn invalid_molecule(smiles: impl Into<String>, source: SmilesError) -> Self {
        Self::InvalidMolecule {
            smiles: smiles.into(),
            source,
        }
    }

    /// Whether the failure is caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidMolecule { .. } | Self::SchemaMismatch { .. })
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidMolecule { .. } => "INVALID_MOLECULE",
            Self::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            Self::Scaling { .. } => "SCALING_ERROR",
            Self::Inference(_) => "INFERENCE_ERROR",
        }
    }
}

/// Result type for artifact loading.
pub type ArtifactResult<T> = Result<T, ArtifactError>;

/// Errors raised while loading the model directory. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse artifact {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid artifact {artifact}: {message}")]
    Invalid {
        artifact: &'static str,
        message: String,
    },
}

impl ArtifactError {
    pub fn invalid(artifact: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            artifact,
            message: message.into(),
        }
    }
}

/// Result type for reference dataset operations.
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Errors raised by the reference dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse dataset {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read CSV dataset {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The file parsed but does not hold tabular rows.
    #[error("Malformed dataset: {0}")]
    Shape(String),

    /// No dataset was configured or it failed to load.
    #[error("Reference dataset is not loaded")]
    NotLoaded,

    #[error("Cannot sample {requested} rows from a dataset of {available}")]
    TooFewRows { requested: usize, available: usize },
}
