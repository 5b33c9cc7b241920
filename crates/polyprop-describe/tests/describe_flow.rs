//! Description service behavior against in-process caches and scripted generators.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use polyprop_core::{fixtures, PredictionService, PropertySet};
use polyprop_describe::testing::ScriptedGenerator;
use polyprop_describe::{
    CachedEntry, DescribeError, DescriptionCache, DescriptionService, DescriptionSource,
    DescriptionStream, FileDescriptionCache, GenerationError, MemoryDescriptionCache,
};
use tempfile::TempDir;

const POLYSTYRENE: &str = "*CC(*)c1ccccc1";

fn props() -> PropertySet {
    PropertySet {
        density: 1.05,
        refractive_index: 1.59,
        dielectric_const_dc: 2.6,
        thermal_conductivity: 0.14,
    }
}

fn service(
    cache: Arc<dyn DescriptionCache>,
    generator: Arc<ScriptedGenerator>,
) -> DescriptionService {
    DescriptionService::new(cache, generator, "test-model").with_replay_delay(Duration::ZERO)
}

/// Drain a stream, returning the successful chunks and the first error if any.
async fn drain(mut stream: DescriptionStream) -> (Vec<String>, Option<DescribeError>) {
    let mut chunks = Vec::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => chunks.push(chunk),
            Err(e) => return (chunks, Some(e)),
        }
    }
    (chunks, None)
}

async fn wait_until_idle(service: &DescriptionService) {
    for _ in 0..100 {
        if service.in_flight() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("generation did not finish");
}

// =============================================================================
// Cache miss → generate and persist
// =============================================================================

#[tokio::test]
async fn miss_relays_chunks_and_persists_trimmed_text() {
    let cache = Arc::new(MemoryDescriptionCache::new());
    let generator = Arc::new(ScriptedGenerator::new([" Polystyrene is rigid", ". Used in foams. "]));
    let service = service(cache.clone(), generator.clone());

    let stream = service.describe(POLYSTYRENE, Some(props())).await.unwrap();
    assert_eq!(stream.source(), DescriptionSource::Generated);
    let (chunks, error) = drain(stream).await;

    assert!(error.is_none());
    assert_eq!(chunks, vec![" Polystyrene is rigid", ". Used in foams. "]);

    let entry = cache.lookup(POLYSTYRENE).await.unwrap().unwrap();
    assert_eq!(entry.description, "Polystyrene is rigid. Used in foams.");
    assert_eq!(entry.properties, props());
    assert_eq!(entry.model_version, "test-model");
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn prompt_is_built_from_properties() {
    let generator = Arc::new(ScriptedGenerator::new(["ok"]));
    let service = service(Arc::new(MemoryDescriptionCache::new()), generator.clone());

    drain(service.describe("CCO", Some(props())).await.unwrap()).await;

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("- **Density**: 1.0500 g/cm³"));
}

#[tokio::test]
async fn miss_without_properties_is_bad_request() {
    let generator = Arc::new(ScriptedGenerator::new(["unused"]));
    let service = service(Arc::new(MemoryDescriptionCache::new()), generator.clone());

    let err = service.describe("CCO", None).await.unwrap_err();
    assert!(matches!(err, DescribeError::BadRequest(_)));
    assert!(err.is_client_error());
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn predictor_fills_missing_properties() {
    let generator = Arc::new(ScriptedGenerator::new(["Predicted."]));
    let predictor = PredictionService::new(Arc::new(fixtures::linear_artifacts()));
    let cache = Arc::new(MemoryDescriptionCache::new());
    let service = service(cache.clone(), generator).with_predictor(predictor.clone());

    drain(service.describe(POLYSTYRENE, None).await.unwrap()).await;

    let entry = cache.lookup(POLYSTYRENE).await.unwrap().unwrap();
    assert_eq!(entry.properties, predictor.predict(POLYSTYRENE).unwrap());
    assert_eq!(entry.model_version, fixtures::FIXTURE_VERSION);
}

#[tokio::test]
async fn invalid_smiles_with_predictor_is_client_error() {
    let generator = Arc::new(ScriptedGenerator::new(["unused"]));
    let predictor = PredictionService::new(Arc::new(fixtures::linear_artifacts()));
    let service = service(Arc::new(MemoryDescriptionCache::new()), generator)
        .with_predictor(predictor);

    let err = service.describe("not_a_molecule", None).await.unwrap_err();
    assert!(matches!(err, DescribeError::Prediction(_)));
    assert!(err.is_client_error());
}

// =============================================================================
// Cache hit → replay
// =============================================================================

#[tokio::test]
async fn second_request_replays_without_generating() {
    let cache = Arc::new(MemoryDescriptionCache::new());
    let generator = Arc::new(ScriptedGenerator::new(["A clear polymer. ", "Used in lenses."]));
    let service = service(cache, generator.clone());

    drain(service.describe(POLYSTYRENE, Some(props())).await.unwrap()).await;

    let other = PropertySet {
        density: 9.9,
        ..props()
    };
    let stream = service.describe(POLYSTYRENE, Some(other)).await.unwrap();
    assert_eq!(stream.source(), DescriptionSource::Cache);
    let (chunks, _) = drain(stream).await;

    assert_eq!(chunks, vec!["A clear polymer. ", "Used in lenses.. "]);
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn hit_does_not_need_properties() {
    let cache = Arc::new(MemoryDescriptionCache::new());
    cache
        .insert(CachedEntry::new("CCO", "Stored", props(), "v0"))
        .await
        .unwrap();
    let generator = Arc::new(ScriptedGenerator::new(["unused"]));
    let service = service(cache, generator.clone());

    let (chunks, error) = drain(service.describe("CCO", None).await.unwrap()).await;
    assert!(error.is_none());
    assert_eq!(chunks.concat(), "Stored. ");
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn lazy_properties_are_skipped_on_a_hit() {
    let cache = Arc::new(MemoryDescriptionCache::new());
    cache
        .insert(CachedEntry::new("CCO", "Stored", props(), "v0"))
        .await
        .unwrap();
    let generator = Arc::new(ScriptedGenerator::new(["Fresh."]));
    let service = service(cache, generator.clone());

    let stream = service
        .describe_with("CCO", || Err(DescribeError::bad_request("invalid")))
        .await
        .unwrap();
    assert_eq!(stream.source(), DescriptionSource::Cache);

    let err = service
        .describe_with("CCC", || Err(DescribeError::bad_request("invalid")))
        .await
        .unwrap_err();
    assert!(matches!(err, DescribeError::BadRequest(_)));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn file_cache_replays_after_restart() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("descriptions.jsonl");

    {
        let cache = Arc::new(FileDescriptionCache::open(&path).await.unwrap());
        let generator = Arc::new(ScriptedGenerator::new(["Tough. ", "Durable."]));
        let service = service(cache, generator);
        drain(service.describe(POLYSTYRENE, Some(props())).await.unwrap()).await;
    }

    let cache = Arc::new(FileDescriptionCache::open(&path).await.unwrap());
    let generator = Arc::new(ScriptedGenerator::new(["unused"]));
    let service = service(cache, generator.clone());
    let stream = service.describe(POLYSTYRENE, None).await.unwrap();
    assert_eq!(stream.source(), DescriptionSource::Cache);
    assert_eq!(generator.calls(), 0);
}

// =============================================================================
// Failures and cancellation
// =============================================================================

#[tokio::test]
async fn mid_stream_failure_truncates_and_skips_insert() {
    let cache = Arc::new(MemoryDescriptionCache::new());
    let generator = Arc::new(
        ScriptedGenerator::new(["Partial ", "text"])
            .failing_with(GenerationError::Transport("connection reset".to_string())),
    );
    let service = service(cache.clone(), generator);

    let (chunks, error) = drain(service.describe("CCO", Some(props())).await.unwrap()).await;

    assert_eq!(chunks, vec!["Partial ", "text"]);
    assert!(matches!(error, Some(DescribeError::Generation(_))));
    wait_until_idle(&service).await;
    assert!(cache.lookup("CCO").await.unwrap().is_none());
}

#[tokio::test]
async fn failed_generation_can_be_retried_by_a_later_request() {
    let cache = Arc::new(MemoryDescriptionCache::new());
    let failing = Arc::new(
        ScriptedGenerator::new(Vec::<String>::new()).failing_with(GenerationError::Incomplete),
    );
    let service_a = service(cache.clone(), failing);
    drain(service_a.describe("CCO", Some(props())).await.unwrap()).await;
    wait_until_idle(&service_a).await;

    let working = Arc::new(ScriptedGenerator::new(["Second try."]));
    let service_b = service(cache.clone(), working);
    let (_, error) = drain(service_b.describe("CCO", Some(props())).await.unwrap()).await;
    assert!(error.is_none());
    assert!(cache.lookup("CCO").await.unwrap().is_some());
}

#[tokio::test]
async fn empty_generation_is_not_persisted() {
    let cache = Arc::new(MemoryDescriptionCache::new());
    let generator = Arc::new(ScriptedGenerator::new(["  "]));
    let service = service(cache.clone(), generator);

    let (_, error) = drain(service.describe("CCO", Some(props())).await.unwrap()).await;
    assert!(matches!(
        error,
        Some(DescribeError::Generation(GenerationError::Empty))
    ));
    assert!(cache.lookup("CCO").await.unwrap().is_none());
}

#[tokio::test]
async fn disconnect_cancels_generation_without_insert() {
    let cache = Arc::new(MemoryDescriptionCache::new());
    let generator = Arc::new(ScriptedGenerator::new(["First chunk. "]).hanging());
    let service = service(cache.clone(), generator);

    let mut stream = service.describe("CCO", Some(props())).await.unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap(), "First chunk. ");
    assert_eq!(service.in_flight(), 1);
    drop(stream);

    wait_until_idle(&service).await;
    assert!(cache.lookup("CCO").await.unwrap().is_none());
}

// =============================================================================
// Single-flight
// =============================================================================

#[tokio::test]
async fn concurrent_misses_share_one_generation() {
    let cache = Arc::new(MemoryDescriptionCache::new());
    let generator = Arc::new(
        ScriptedGenerator::new(["Shared ", "description."])
            .with_chunk_delay(Duration::from_millis(30)),
    );
    let service = service(cache.clone(), generator.clone());

    let first = service.describe(POLYSTYRENE, Some(props())).await.unwrap();
    let second = service.describe(POLYSTYRENE, Some(props())).await.unwrap();
    assert_eq!(second.source(), DescriptionSource::Generated);

    let ((a, ea), (b, eb)) = tokio::join!(drain(first), drain(second));
    assert!(ea.is_none() && eb.is_none());
    assert_eq!(a, vec!["Shared ", "description."]);
    assert_eq!(a, b);
    assert_eq!(generator.calls(), 1);
    assert_eq!(cache.len().await.unwrap(), 1);
}

#[tokio::test]
async fn follower_keeps_generation_alive_after_leader_disconnects() {
    let cache = Arc::new(MemoryDescriptionCache::new());
    let generator = Arc::new(
        ScriptedGenerator::new(["One. ", "Two."]).with_chunk_delay(Duration::from_millis(20)),
    );
    let service = service(cache.clone(), generator.clone());

    let leader = service.describe("CCO", Some(props())).await.unwrap();
    let follower = service.describe("CCO", Some(props())).await.unwrap();
    drop(leader);

    let (chunks, error) = drain(follower).await;
    assert!(error.is_none());
    assert_eq!(chunks.concat(), "One. Two.");
    wait_until_idle(&service).await;
    assert!(cache.lookup("CCO").await.unwrap().is_some());
    assert_eq!(generator.calls(), 1);
}
