//! Describe command implementation.
//!
//! Streams a description to stdout through the same cache-then-generate
//! service the HTTP API uses.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use polyprop_core::PredictionService;
use polyprop_describe::{
    build_generator, DescriptionCache, DescriptionService, DescriptionSource,
    FileDescriptionCache, MemoryDescriptionCache,
};
use tracing::info;

use crate::config::Config;

pub async fn execute(config: &Config, smiles: &str, no_cache: bool) -> Result<()> {
    let predictor = PredictionService::load(&config.model_dir).with_context(|| {
        format!(
            "Failed to load model artifacts from {}",
            config.model_dir.display()
        )
    })?;

    let cache: Arc<dyn DescriptionCache> = if no_cache {
        Arc::new(MemoryDescriptionCache::new())
    } else {
        let cache = FileDescriptionCache::open(&config.cache_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to open description cache {}",
                    config.cache_path.display()
                )
            })?;
        Arc::new(cache)
    };
    let generator = build_generator(config.generator_config())
        .context("Failed to build description generator")?;

    let service = DescriptionService::new(cache, generator, predictor.model_version())
        .with_replay_delay(config.replay_delay())
        .with_predictor(predictor);

    let mut stream = service.describe(smiles, None).await?;
    if stream.source() == DescriptionSource::Cache {
        info!(smiles, "description_from_cache");
    }

    let mut stdout = std::io::stdout();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("Description stream failed")?;
        stdout.write_all(chunk.as_bytes())?;
        stdout.flush()?;
    }
    writeln!(stdout)?;
    Ok(())
}
