//! Cache-then-generate description service.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::stream::{self, BoxStream, Stream};
use futures_util::StreamExt;
use polyprop_core::{PredictionService, PropertySet};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{CachedEntry, DescriptionCache, InsertOutcome};
use crate::error::{DescribeError, DescribeResult, GenerationError, GenerationResult};
use crate::flight::{Flight, FlightArena, Join, Subscription};
use crate::generator::TextGenerator;
use crate::prompt::build_prompt;

/// Default pause between replayed cache chunks.
pub const DEFAULT_REPLAY_DELAY: Duration = Duration::from_millis(100);

/// Separator used to chunk stored descriptions on replay.
const REPLAY_SEPARATOR: &str = ". ";

/// Where a description stream's text comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionSource {
    Cache,
    Generated,
}

/// Ordered description chunks.
///
/// A generation failure after streaming began is yielded as a final `Err`;
/// chunks already yielded stand.
pub struct DescriptionStream {
    source: DescriptionSource,
    inner: BoxStream<'static, DescribeResult<String>>,
}

impl DescriptionStream {
    pub fn source(&self) -> DescriptionSource {
        self.source
    }
}

impl Stream for DescriptionStream {
    type Item = DescribeResult<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for DescriptionStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptionStream")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Serves descriptions from the cache, or generates and persists them.
#[derive(Clone)]
pub struct DescriptionService {
    cache: Arc<dyn DescriptionCache>,
    generator: Arc<dyn TextGenerator>,
    flights: Arc<FlightArena>,
    predictor: Option<PredictionService>,
    model_version: String,
    replay_delay: Duration,
}

impl DescriptionService {
    pub fn new(
        cache: Arc<dyn DescriptionCache>,
        generator: Arc<dyn TextGenerator>,
        model_version: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            generator,
            flights: Arc::new(FlightArena::default()),
            predictor: None,
            model_version: model_version.into(),
            replay_delay: DEFAULT_REPLAY_DELAY,
        }
    }

    /// Pause between replayed chunks; zero disables pacing.
    pub fn with_replay_delay(mut self, delay: Duration) -> Self {
        self.replay_delay = delay;
        self
    }

    /// Predict properties for uncached molecules that arrive without them.
    pub fn with_predictor(mut self, predictor: PredictionService) -> Self {
        self.model_version = predictor.model_version().to_string();
        self.predictor = Some(predictor);
        self
    }

    pub fn cache(&self) -> &Arc<dyn DescriptionCache> {
        &self.cache
    }

    /// Number of generations currently running.
    pub fn in_flight(&self) -> usize {
        self.flights.len()
    }

    /// Start a description stream for `smiles`.
    ///
    /// `properties` is only consulted on a cache miss.
    pub async fn describe(
        &self,
        smiles: &str,
        properties: Option<PropertySet>,
    ) -> DescribeResult<DescriptionStream> {
        self.describe_with(smiles, || Ok(properties)).await
    }

    /// Like [`describe`](Self::describe), but `properties` is only evaluated
    /// on a cache miss, so a stored description replays even when the
    /// caller's properties would not validate.
    pub async fn describe_with<F>(
        &self,
        smiles: &str,
        properties: F,
    ) -> DescribeResult<DescriptionStream>
    where
        F: FnOnce() -> DescribeResult<Option<PropertySet>>,
    {
        if smiles.trim().is_empty() {
            return Err(DescribeError::bad_request("'smiles' must not be empty"));
        }

        if let Some(entry) = self.cache.lookup(smiles).await? {
            info!(smiles, "description_cache_hit");
            return Ok(DescriptionStream {
                source: DescriptionSource::Cache,
                inner: replay(entry.description, self.replay_delay),
            });
        }

        let properties = match (properties()?, &self.predictor) {
            (Some(properties), _) => properties,
            (None, Some(predictor)) => predictor.predict(smiles)?,
            (None, None) => {
                return Err(DescribeError::bad_request(
                    "Missing 'properties' for a molecule with no stored description",
                ))
            }
        };

        let subscription = match self.flights.join(smiles) {
            Join::Leader(flight, subscription) => {
                info!(smiles, model = self.generator.model(), "description_generation_started");
                let task = GenerationTask {
                    smiles: smiles.to_string(),
                    properties,
                    flight,
                    flights: self.flights.clone(),
                    cache: self.cache.clone(),
                    generator: self.generator.clone(),
                    model_version: self.model_version.clone(),
                };
                tokio::spawn(task.run());
                subscription
            }
            Join::Follower(subscription) => {
                debug!(smiles, "description_generation_joined");
                subscription
            }
        };

        Ok(DescriptionStream {
            source: DescriptionSource::Generated,
            inner: follow(subscription),
        })
    }
}

/// Split stored text on `". "` and emit each piece with the separator restored.
fn replay(text: String, delay: Duration) -> BoxStream<'static, DescribeResult<String>> {
    let pieces: Vec<String> = text
        .split(REPLAY_SEPARATOR)
        .map(|piece| format!("{piece}{REPLAY_SEPARATOR}"))
        .collect();
    stream::iter(pieces.into_iter().enumerate())
        .then(move |(index, piece)| async move {
            if index > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok(piece)
        })
        .boxed()
}

fn follow(subscription: Subscription) -> BoxStream<'static, DescribeResult<String>> {
    stream::unfold(subscription, |mut subscription| async move {
        subscription
            .next()
            .await
            .map(|item| (item.map_err(DescribeError::from), subscription))
    })
    .boxed()
}

struct GenerationTask {
    smiles: String,
    properties: PropertySet,
    flight: Arc<Flight>,
    flights: Arc<FlightArena>,
    cache: Arc<dyn DescriptionCache>,
    generator: Arc<dyn TextGenerator>,
    model_version: String,
}

impl GenerationTask {
    async fn run(self) {
        let prompt = build_prompt(&self.properties);
        let cancel = self.flight.cancellation();

        let result = tokio::select! {
            _ = cancel.cancelled() => Err(GenerationError::Cancelled),
            result = self.relay(&prompt) => result,
        };

        match result {
            Ok(text) => {
                let entry = CachedEntry::new(
                    self.smiles.clone(),
                    text.trim(),
                    self.properties,
                    self.model_version.clone(),
                );
                match self.cache.insert(entry).await {
                    Ok(InsertOutcome::Committed) => {
                        info!(smiles = %self.smiles, chars = text.len(), "description_cached")
                    }
                    Ok(InsertOutcome::AlreadyPresent) => {
                        debug!(smiles = %self.smiles, "description_already_cached")
                    }
                    Err(e) => {
                        warn!(smiles = %self.smiles, error = %e, "description_cache_insert_failed")
                    }
                }
                self.flights.remove(&self.smiles, &self.flight);
                self.flight.finish(Ok(()));
            }
            Err(GenerationError::Cancelled) => {
                info!(smiles = %self.smiles, "description_generation_cancelled");
                self.flights.remove(&self.smiles, &self.flight);
                self.flight.finish(Err(GenerationError::Cancelled));
            }
            Err(e) => {
                warn!(smiles = %self.smiles, error = %e, "description_generation_failed");
                self.flights.remove(&self.smiles, &self.flight);
                self.flight.finish(Err(e));
            }
        }
    }

    /// Forward generator chunks into the flight log while accumulating the text.
    async fn relay(&self, prompt: &str) -> GenerationResult<String> {
        let mut chunks = self.generator.generate(prompt).await?;
        let mut text = String::new();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            text.push_str(&chunk);
            self.flight.push(chunk);
        }
        if text.trim().is_empty() {
            return Err(GenerationError::Empty);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(stream: BoxStream<'static, DescribeResult<String>>) -> Vec<String> {
        stream.map(|c| c.unwrap()).collect().await
    }

    #[tokio::test]
    async fn replay_restores_separators() {
        let chunks = collect(replay(
            "Rigid polymer. Used in packaging.".to_string(),
            Duration::ZERO,
        ))
        .await;
        assert_eq!(chunks, vec!["Rigid polymer. ", "Used in packaging.. "]);
    }

    #[tokio::test]
    async fn replay_of_text_without_separator_is_one_chunk() {
        let chunks = collect(replay("Flexible".to_string(), Duration::ZERO)).await;
        assert_eq!(chunks, vec!["Flexible. "]);
    }

    #[tokio::test]
    async fn replay_is_paced() {
        let delay = Duration::from_millis(15);
        let started = std::time::Instant::now();
        let chunks = collect(replay("a. b. c".to_string(), delay)).await;
        assert_eq!(chunks.len(), 3);
        assert!(started.elapsed() >= delay * 2);
    }
}
