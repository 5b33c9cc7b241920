//! polyprop description service
//!
//! Natural-language descriptions of polymers under a cache-then-generate
//! policy:
//!
//! - **Hit**: the stored text is replayed as paced `". "`-separated chunks
//! - **Miss**: a prompt is built from the predicted properties, the
//!   generator's chunks are relayed as they arrive, and the full text is
//!   persisted once the generator finishes successfully
//!
//! Concurrent misses for the same SMILES share one generation.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use futures_util::StreamExt;
//! use polyprop_core::PropertySet;
//! use polyprop_describe::{build_generator, DescriptionService, GeneratorConfig, MemoryDescriptionCache};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let generator = build_generator(GeneratorConfig::default())?;
//!     let service = DescriptionService::new(Arc::new(MemoryDescriptionCache::new()), generator, "v1");
//!
//!     let properties = PropertySet {
//!         density: 1.05,
//!         refractive_index: 1.59,
//!         dielectric_const_dc: 2.6,
//!         thermal_conductivity: 0.14,
//!     };
//!     let mut stream = service.describe("*CC(*)c1ccccc1", Some(properties)).await?;
//!     while let Some(chunk) = stream.next().await {
//!         print!("{}", chunk?);
//!     }
//!     Ok(())
//! }
//! ```

mod cache;
mod error;
mod flight;
mod generator;
mod prompt;
mod service;
pub mod testing;

pub use cache::{
    CachedEntry, DescriptionCache, FileDescriptionCache, InsertOutcome, MemoryDescriptionCache,
};
pub use error::{
    CacheError, CacheResult, DescribeError, DescribeResult, GenerationError, GenerationResult,
};
pub use generator::{
    build_generator, Backend, ChunkStream, GeneratorConfig, HttpGenerator, TextGenerator,
    DEFAULT_BASE_URL, DEFAULT_MODEL,
};
pub use prompt::build_prompt;
pub use service::{
    DescriptionService, DescriptionSource, DescriptionStream, DEFAULT_REPLAY_DELAY,
};
