//! HTTP service for polyprop.
//!
//! ## Endpoints
//!
//! - `GET /health` - Model version, descriptor count, cache and in-flight sizes
//! - `POST /predict` - `{smiles}` → the four predicted properties
//! - `POST /describe` - `{smiles, properties}` → streamed `text/plain` description
//! - `GET /random-sample` - 10 random reference rows, column-oriented
//!
//! Errors are `{"error": message, "code": CODE}` with 400 for caller mistakes
//! (missing keys, invalid SMILES, schema mismatch) and 500 otherwise.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use polyprop_api::{create_router, AppState};
//! use polyprop_core::PredictionService;
//! use polyprop_describe::{build_generator, DescriptionService, GeneratorConfig, MemoryDescriptionCache};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let predictor = PredictionService::load("models")?;
//! let describer = DescriptionService::new(
//!     Arc::new(MemoryDescriptionCache::new()),
//!     build_generator(GeneratorConfig::default())?,
//!     predictor.model_version(),
//! );
//! let router = create_router(Arc::new(AppState::new(predictor, describer)));
//! # Ok(())
//! # }
//! ```

mod routes;
mod types;

pub use routes::{create_router, SOURCE_HEADER};
pub use types::{ApiError, ApiResponse, AppState, ErrorResponse, HealthResponse};
