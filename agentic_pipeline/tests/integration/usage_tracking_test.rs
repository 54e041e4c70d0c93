//! # Usage Tracking Tests
//!
//! Tracker rollups, FIFO eviction with cumulative cost survival, and the
//! engine's per-run usage attachment keyed by correlation id.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use agentic_pipeline::{
    Agent, AgentRequest, AgentResponse, AgentStep, CorrelationId, PipelineBuilder, PipelineContext,
    PipelineError, UsageRecord, UsageTracker,
};

fn record(agent: &str, correlation: &str, total_tokens: u64, cost: f64) -> UsageRecord {
    UsageRecord::new(agent, "test:model", CorrelationId::parse(correlation).unwrap())
        .with_tokens(total_tokens / 2, total_tokens - total_tokens / 2)
        .with_cost(cost)
        .with_latency(1.0)
}

#[test]
fn test_correlation_rollup_then_eviction() {
    let tracker = UsageTracker::with_max_records(3);
    for tokens in [100u64, 200, 300] {
        tracker.record(record("agent", "run-1", tokens, 0.01));
    }
    let run1 = CorrelationId::parse("run-1").unwrap();
    let summary = tracker.get_summary_for_correlation(&run1);
    assert_eq!(summary.total_tokens, 600);
    assert_eq!(summary.record_count, 3);

    for i in 0..4u64 {
        tracker.record(record("agent", &format!("run-{}", i + 2), 50, 0.02));
    }
    let evicted = tracker.get_summary_for_correlation(&run1);
    assert_eq!(evicted.total_tokens, 0);
    assert_eq!(evicted.record_count, 0);
    // All seven records' costs survive in the cumulative counter.
    let expected = 3.0 * 0.01 + 4.0 * 0.02;
    assert!(tracker.cumulative_cost_usd() >= expected - 1e-9);
    assert!(tracker.cumulative_cost_usd() >= tracker.get_summary().total_cost_usd);
}

struct FixedUsageAgent {
    tokens: (u64, u64),
}

#[async_trait]
impl Agent for FixedUsageAgent {
    fn name(&self) -> &str {
        "fixed-usage"
    }

    fn model(&self) -> &str {
        "openai:gpt-4o-mini"
    }

    async fn run(&self, request: AgentRequest) -> Result<AgentResponse, PipelineError> {
        Ok(AgentResponse {
            output: json!(format!("answered:{}", request.prompt.as_str().unwrap_or(""))),
            model: self.model().to_string(),
            input_tokens: self.tokens.0,
            output_tokens: self.tokens.1,
        })
    }
}

#[tokio::test]
async fn test_pipeline_result_carries_correlated_usage() {
    let tracker = Arc::new(UsageTracker::new());
    let agent = Arc::new(FixedUsageAgent { tokens: (400, 100) });
    let engine = PipelineBuilder::new("usage-run")
        .add_step("ask", Arc::new(AgentStep::new(agent).with_tracker(Arc::clone(&tracker))))
        .build()
        .unwrap()
        .with_usage_tracker(Arc::clone(&tracker));

    let context = PipelineContext::new(json!("question"))
        .with_correlation_id(CorrelationId::parse("usage-corr-1").unwrap());
    let result = engine.run_with_context(context).await;

    assert!(result.success);
    let usage = result.usage.expect("usage rollup attached");
    assert_eq!(usage.record_count, 1);
    assert_eq!(usage.total_tokens, 500);
    assert!(usage.total_cost_usd > 0.0);

    // The node-level attribution matches the run-level rollup here.
    let node_usage = result.outputs["ask"].usage.as_ref().expect("node usage");
    assert_eq!(node_usage.total_tokens, 500);
}

#[tokio::test]
async fn test_pipeline_result_usage_none_without_records() {
    let tracker = Arc::new(UsageTracker::new());
    let engine = PipelineBuilder::new("no-usage")
        .add_step(
            "plain",
            Arc::new(agentic_pipeline::CallableStep::from_sync("plain", |_ctx, _inputs| {
                Ok(json!("no tokens spent"))
            })),
        )
        .build()
        .unwrap()
        .with_usage_tracker(tracker);

    let result = engine.run(json!("x")).await;
    assert!(result.success);
    assert!(result.usage.is_none());
    assert!(result.outputs["plain"].usage.is_none());
}

#[tokio::test]
async fn test_two_runs_roll_up_independently() {
    let tracker = Arc::new(UsageTracker::new());
    let agent = Arc::new(FixedUsageAgent { tokens: (100, 50) });
    let engine = PipelineBuilder::new("multi-run")
        .add_step(
            "ask",
            Arc::new(AgentStep::new(agent).with_tracker(Arc::clone(&tracker))),
        )
        .build()
        .unwrap()
        .with_usage_tracker(Arc::clone(&tracker));

    let first = engine
        .run_with_context(
            PipelineContext::new(json!("q1")).with_correlation_id(CorrelationId::parse("corr-a").unwrap()),
        )
        .await;
    let second = engine
        .run_with_context(
            PipelineContext::new(json!("q2")).with_correlation_id(CorrelationId::parse("corr-b").unwrap()),
        )
        .await;

    assert_eq!(first.usage.unwrap().record_count, 1);
    assert_eq!(second.usage.unwrap().record_count, 1);
    assert_eq!(tracker.get_summary().record_count, 2);
    assert_eq!(
        tracker
            .get_summary_for_correlation(&CorrelationId::parse("corr-a").unwrap())
            .record_count,
        1
    );
}
