//! # Cancellation Tests
//!
//! Caller-driven cancellation and the distinction between cancellation
//! (never retried) and ordinary failures (retried up to the budget).

use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use agentic_pipeline::{CallableStep, DagNode, PipelineBuilder, PipelineContext, PipelineError};

#[tokio::test]
async fn test_caller_cancel_returns_error_not_result() {
    let sleeper = Arc::new(CallableStep::named("sleeper", |_ctx, _inputs| {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(json!("never"))
        })
    }));
    let engine = PipelineBuilder::new("cancel-run")
        .add_step("slow", sleeper)
        .build()
        .unwrap();

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let error = engine
        .run_cancellable(PipelineContext::new(json!("x")), token)
        .await
        .unwrap_err();
    assert!(error.is_cancellation());
}

#[tokio::test]
async fn test_cancellation_is_not_retried() {
    // The step cancels the run token mid-attempt (standing in for a
    // cooperative step that observes cancellation during I/O); the retry
    // loop must stop at the first cancelled attempt despite the budget.
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let observing = Arc::new(CallableStep::named("observing", move |ctx, _inputs| {
        let counter = Arc::clone(&counter);
        let token = ctx.cancellation().clone();
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            token.cancel();
            Err(PipelineError::Cancelled("step observed the run token".to_string()))
        })
    }));

    let engine = PipelineBuilder::new("cancel-no-retry")
        .add_node(DagNode::new("a", observing).with_retry_max(5))
        .build()
        .unwrap();

    let result = engine.run_with_context(PipelineContext::new(json!("x"))).await;

    assert!(!result.success);
    let node = &result.outputs["a"];
    assert!(!node.success);
    assert_eq!(node.retries, 0, "cancellation must not consume the retry budget");
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert!(node.error.as_deref().unwrap().contains("cancelled"));
}

#[tokio::test]
async fn test_fail_pipeline_cancels_sibling_in_flight() {
    let boom = Arc::new(CallableStep::named("boom", |_ctx, _inputs| {
        Box::pin(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Err(PipelineError::step("fatal"))
        })
    }));
    let sleeper = Arc::new(CallableStep::named("sleeper", |_ctx, _inputs| {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(json!("never"))
        })
    }));

    let engine = PipelineBuilder::new("abort-siblings")
        .add_node(
            DagNode::new("fatal", boom)
                .with_failure_strategy(agentic_pipeline::FailureStrategy::FailPipeline),
        )
        .add_step("slow", sleeper)
        .build()
        .unwrap();

    let started = std::time::Instant::now();
    let result = engine.run(json!("x")).await;
    assert!(started.elapsed() < Duration::from_secs(5), "abort must not wait for the sleeper");
    assert!(!result.success);
    assert!(!result.outputs["fatal"].success);
    let slow = &result.outputs["slow"];
    assert!(!slow.skipped, "in-flight sibling is cancelled, not skipped");
    assert!(!slow.success);
    assert!(slow.error.as_deref().unwrap().contains("cancelled"));
}
