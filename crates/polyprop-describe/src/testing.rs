//! Scripted in-process generator for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};

use crate::error::{GenerationError, GenerationResult};
use crate::generator::{ChunkStream, TextGenerator};

#[derive(Debug, Clone)]
enum Ending {
    Complete,
    Fail(GenerationError),
    Hang,
}

/// Replays a fixed list of chunks for every prompt.
#[derive(Debug)]
pub struct ScriptedGenerator {
    chunks: Vec<String>,
    ending: Ending,
    chunk_delay: Duration,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            ending: Ending::Complete,
            chunk_delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Fail with `error` after the scripted chunks.
    pub fn failing_with(mut self, error: GenerationError) -> Self {
        self.ending = Ending::Fail(error);
        self
    }

    /// Never finish after the scripted chunks.
    pub fn hanging(mut self) -> Self {
        self.ending = Ending::Hang;
        self
    }

    /// Sleep before each chunk.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Number of `generate` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> GenerationResult<ChunkStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let delay = self.chunk_delay;
        let body = stream::iter(self.chunks.clone()).then(move |chunk| async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok(chunk)
        });
        let tail: ChunkStream = match self.ending.clone() {
            Ending::Complete => stream::empty().boxed(),
            Ending::Fail(error) => stream::once(async move { Err(error) }).boxed(),
            Ending::Hang => stream::pending().boxed(),
        };
        Ok(body.chain(tail).boxed())
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
