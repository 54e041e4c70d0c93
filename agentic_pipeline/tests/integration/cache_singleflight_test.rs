//! # Cache Integration Tests
//!
//! Single-flight semantics under concurrency and engine-level node-output
//! caching: replaying a pipeline with warm fingerprints re-runs nothing.

use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use agentic_pipeline::{primary_input, CallableStep, Fingerprint, PipelineBuilder, ResultCache};

#[tokio::test]
async fn test_concurrent_requests_share_one_producer() {
    let cache = Arc::new(ResultCache::with_policy(60.0, 10));
    let producer_runs = Arc::new(AtomicUsize::new(0));
    let key = Fingerprint::for_prompt("openai:gpt-4o", "summarise the report");

    let mut handles = Vec::new();
    for _ in 0..2 {
        let cache = Arc::clone(&cache);
        let producer_runs = Arc::clone(&producer_runs);
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            cache
                .get_or_compute(&key, || async {
                    producer_runs.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(40)).await;
                    Ok(json!("the summary"))
                })
                .await
                .unwrap()
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), json!("the summary"));
    }

    assert_eq!(producer_runs.load(Ordering::SeqCst), 1, "producer must run exactly once");
    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.size, 1);
}

#[tokio::test]
async fn test_rerun_with_warm_cache_recomputes_nothing() {
    let cache = Arc::new(ResultCache::with_policy(60.0, 64));
    let executions = Arc::new(AtomicUsize::new(0));

    let build = |executions: Arc<AtomicUsize>, cache: Arc<ResultCache>| {
        let counting = move |name: &str| {
            let executions = Arc::clone(&executions);
            let prefix = format!("{}:", name);
            Arc::new(CallableStep::from_sync(name.to_string(), move |_ctx, inputs| {
                executions.fetch_add(1, Ordering::SeqCst);
                Ok(json!(format!("{}{}", prefix, primary_input(inputs).as_str().unwrap_or(""))))
            }))
        };
        PipelineBuilder::new("cached-run")
            .add_step("a", counting("a"))
            .add_step("b", counting("b"))
            .chain(&["a", "b"])
            .build()
            .unwrap()
            .with_cache(cache)
    };

    let engine = build(Arc::clone(&executions), Arc::clone(&cache));
    let first = engine.run(json!("x")).await;
    assert!(first.success);
    assert_eq!(first.final_output, json!("b:a:x"));
    assert_eq!(executions.load(Ordering::SeqCst), 2);
    let first_misses = cache.stats().misses;

    let second = engine.run(json!("x")).await;
    assert!(second.success);
    assert_eq!(second.final_output, first.final_output);
    assert_eq!(executions.load(Ordering::SeqCst), 2, "warm fingerprints re-run nothing");
    assert_eq!(cache.stats().misses, first_misses, "no additional misses on replay");
}

#[tokio::test]
async fn test_different_inputs_have_distinct_fingerprints() {
    let cache = Arc::new(ResultCache::with_policy(60.0, 64));
    let executions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&executions);

    let engine = PipelineBuilder::new("keyed-by-inputs")
        .add_step(
            "a",
            Arc::new(CallableStep::from_sync("echo", move |_ctx, inputs| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(primary_input(inputs))
            })),
        )
        .build()
        .unwrap()
        .with_cache(cache);

    assert_eq!(engine.run(json!("one")).await.final_output, json!("one"));
    assert_eq!(engine.run(json!("two")).await.final_output, json!("two"));
    assert_eq!(engine.run(json!("one")).await.final_output, json!("one"));
    assert_eq!(executions.load(Ordering::SeqCst), 2, "only distinct inputs execute");
}

#[tokio::test]
async fn test_cached_node_reports_zero_retries() {
    let cache = Arc::new(ResultCache::with_policy(60.0, 64));
    let engine = PipelineBuilder::new("cached-retries")
        .add_step(
            "a",
            Arc::new(CallableStep::from_sync("stable", |_ctx, _inputs| Ok(json!("v")))),
        )
        .build()
        .unwrap()
        .with_cache(cache);

    engine.run(json!("x")).await;
    let replay = engine.run(json!("x")).await;
    assert_eq!(replay.outputs["a"].retries, 0);
    assert!(replay.outputs["a"].success);
}
