//! # Engine Scenario Tests
//!
//! End-to-end scheduler behavior: linear flows, skip propagation, retry,
//! timeout with pipeline abort, fan-out/fan-in, branching, and the node
//! state coverage invariants.

use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use agentic_pipeline::{
    primary_input, BranchStep, CallableStep, DagNode, FailureStrategy, FanInStep, FanOutStep, PipelineBuilder,
    PipelineError, UsageTracker,
};

fn prefix_step(prefix: &str) -> Arc<CallableStep> {
    let prefix = format!("{}:", prefix);
    let identity = format!("prefix_{}", prefix);
    Arc::new(CallableStep::from_sync(identity, move |_ctx, inputs| {
        let input = primary_input(inputs);
        Ok(json!(format!("{}{}", prefix, input.as_str().unwrap_or(""))))
    }))
}

fn quiet_tracker() -> Arc<UsageTracker> {
    Arc::new(UsageTracker::new())
}

#[tokio::test]
async fn test_linear_success_pipes_through() {
    let engine = PipelineBuilder::new("linear")
        .add_step("a", prefix_step("A"))
        .add_step("b", prefix_step("B"))
        .add_step("c", prefix_step("C"))
        .chain(&["a", "b", "c"])
        .build()
        .unwrap();

    let result = engine.run(json!("x")).await;
    assert!(result.success);
    assert_eq!(result.final_output, json!("C:B:A:x"));
    assert_eq!(result.outputs.len(), 3);
    assert!(result.outputs.values().all(|r| r.success && !r.skipped));
    assert_eq!(result.execution_trace.len(), 3);
    assert!(result.total_duration_ms >= 0.0);
}

#[tokio::test]
async fn test_identity_chain_round_trip() {
    // Identity steps compose to the identity: the original input passes
    // through to the final output unchanged.
    let identity = |name: &str| {
        Arc::new(CallableStep::from_sync(name.to_string(), |_ctx, inputs| {
            Ok(primary_input(inputs))
        }))
    };
    let engine = PipelineBuilder::new("identity")
        .add_step("one", identity("one"))
        .add_step("two", identity("two"))
        .add_step("three", identity("three"))
        .chain(&["one", "two", "three"])
        .build()
        .unwrap();

    let input = json!({"nested": {"payload": [1, 2, 3]}, "flag": true});
    let result = engine.run(input.clone()).await;
    assert!(result.success);
    assert_eq!(result.final_output, input);
}

#[tokio::test]
async fn test_condition_skip_does_not_fail_run() {
    let engine = PipelineBuilder::new("skip")
        .add_node(DagNode::new(
            "a",
            Arc::new(CallableStep::from_sync("produce42", |_ctx, _inputs| Ok(json!(42)))),
        ))
        .add_node(DagNode::new("b", prefix_step("B")).with_condition(|_ctx| false))
        .add_step("c", prefix_step("C"))
        .add_edge("a", "b")
        .add_edge("a", "c")
        .build()
        .unwrap();

    let result = engine.run(json!("in")).await;
    assert!(result.success);
    assert!(result.outputs["a"].success && !result.outputs["a"].skipped);
    assert!(result.outputs["b"].skipped);
    assert!(result.outputs["c"].success && !result.outputs["c"].skipped);
    assert_eq!(result.outputs["a"].output, json!(42));
}

#[tokio::test]
async fn test_fully_skipped_upstream_skips_downstream() {
    // a -> b(skip by condition) -> d, and d has no other live parent, so d
    // skips too; c keeps the run alive.
    let engine = PipelineBuilder::new("skip-cascade")
        .add_step("a", prefix_step("A"))
        .add_node(DagNode::new("b", prefix_step("B")).with_condition(|_ctx| false))
        .add_step("c", prefix_step("C"))
        .add_step("d", prefix_step("D"))
        .add_edge("a", "b")
        .add_edge("a", "c")
        .add_edge("b", "d")
        .build()
        .unwrap();

    let result = engine.run(json!("x")).await;
    assert!(result.success);
    assert!(result.outputs["b"].skipped);
    assert!(result.outputs["d"].skipped);
    assert_eq!(result.final_output, json!("C:A:x"));
}

#[tokio::test]
async fn test_retry_then_succeed() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let flaky = Arc::new(CallableStep::from_sync("flaky", move |_ctx, _inputs| {
        let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt < 3 {
            Err(PipelineError::step(format!("transient failure on attempt {}", attempt)))
        } else {
            Ok(json!("ok"))
        }
    }));

    let engine = PipelineBuilder::new("retry")
        .add_node(DagNode::new("a", flaky).with_retry_max(2))
        .build()
        .unwrap();

    let result = engine.run(json!("in")).await;
    assert!(result.success);
    let node = &result.outputs["a"];
    assert!(node.success);
    assert_eq!(node.retries, 2);
    assert_eq!(node.output, json!("ok"));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_budget_exhaustion_fails_node() {
    let always_fails = Arc::new(CallableStep::from_sync("alwaysfails", |_ctx, _inputs| {
        Err(PipelineError::step("permanent failure"))
    }));
    let engine = PipelineBuilder::new("exhausted")
        .add_node(DagNode::new("a", always_fails).with_retry_max(2))
        .build()
        .unwrap();

    let result = engine.run(json!("in")).await;
    assert!(!result.success);
    let node = &result.outputs["a"];
    assert!(!node.success && !node.skipped);
    assert_eq!(node.retries, 2);
    assert!(node.error.as_deref().unwrap().contains("permanent failure"));
}

#[tokio::test]
async fn test_timeout_fail_pipeline_skips_dependents() {
    let sleeper = Arc::new(CallableStep::named("sleeper", |_ctx, _inputs| {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(json!("never"))
        })
    }));
    let engine = PipelineBuilder::new("timeout-abort")
        .add_node(
            DagNode::new("a", sleeper)
                .with_timeout_secs(0.05)
                .with_failure_strategy(FailureStrategy::FailPipeline),
        )
        .add_step("b", prefix_step("B"))
        .add_edge("a", "b")
        .build()
        .unwrap();

    let result = engine.run(json!("x")).await;
    assert!(!result.success);
    let a = &result.outputs["a"];
    assert!(!a.success);
    assert!(a.error.as_deref().unwrap().contains("timeout"));
    assert!(result.outputs["b"].skipped);
    assert_eq!(result.failed_nodes(), vec!["a"]);
}

#[tokio::test]
async fn test_timeout_counts_toward_retry_budget() {
    let slow = Arc::new(CallableStep::named("slow", |_ctx, _inputs| {
        Box::pin(async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(json!("late"))
        })
    }));
    let engine = PipelineBuilder::new("timeout-retries")
        .add_node(DagNode::new("a", slow).with_timeout_secs(0.05).with_retry_max(1))
        .build()
        .unwrap();

    let result = engine.run(json!("x")).await;
    let node = &result.outputs["a"];
    assert!(!node.success);
    assert_eq!(node.retries, 1);
    assert!(node.error.as_deref().unwrap().contains("timeout"));
}

#[tokio::test]
async fn test_skip_downstream_strategy_marks_descendants() {
    let boom = Arc::new(CallableStep::from_sync("boom", |_ctx, _inputs| {
        Err(PipelineError::step("boom"))
    }));
    let engine = PipelineBuilder::new("skip-downstream")
        .add_node(DagNode::new("a", boom))
        .add_step("b", prefix_step("B"))
        .add_step("c", prefix_step("C"))
        .chain(&["a", "b", "c"])
        .build()
        .unwrap();

    let result = engine.run(json!("x")).await;
    assert!(!result.success);
    assert!(!result.outputs["a"].success);
    assert!(result.outputs["b"].skipped);
    assert!(result.outputs["c"].skipped);
}

#[tokio::test]
async fn test_continue_strategy_feeds_null_downstream() {
    let boom = Arc::new(CallableStep::from_sync("boom", |_ctx, _inputs| {
        Err(PipelineError::step("boom"))
    }));
    let null_check = Arc::new(CallableStep::from_sync("nullcheck", |_ctx, inputs| {
        Ok(json!(primary_input(inputs).is_null()))
    }));
    let engine = PipelineBuilder::new("continue")
        .add_node(DagNode::new("a", boom).with_failure_strategy(FailureStrategy::Continue))
        .add_node(DagNode::new("b", null_check))
        .add_edge("a", "b")
        .build()
        .unwrap();

    let result = engine.run(json!("x")).await;
    assert!(!result.success, "failed node still fails the run");
    assert!(result.outputs["b"].success);
    assert_eq!(result.outputs["b"].output, json!(true));
}

#[tokio::test]
async fn test_fan_out_fan_in_joins_elements() {
    let split = Arc::new(FanOutStep::new(|value| {
        value
            .as_str()
            .unwrap_or("")
            .split(',')
            .map(|part| json!(part))
            .collect()
    }));
    let upper = Arc::new(CallableStep::from_sync("upper_each", |_ctx, inputs| {
        let items = match primary_input(inputs) {
            Value::Array(items) => items,
            other => vec![other],
        };
        Ok(Value::Array(
            items
                .iter()
                .map(|item| json!(item.as_str().unwrap_or("").to_uppercase()))
                .collect(),
        ))
    }));
    let join = Arc::new(FanInStep::with_merge(|values| {
        Ok(json!(values
            .iter()
            .map(|value| value.as_str().unwrap_or("").to_string())
            .collect::<Vec<_>>()
            .join(",")))
    }));

    let engine = PipelineBuilder::new("fan")
        .add_step("split", split)
        .add_step("upper", upper)
        .add_step("join", join)
        .chain(&["split", "upper", "join"])
        .build()
        .unwrap();

    let result = engine.run(json!("a,b,c")).await;
    assert!(result.success);
    assert_eq!(result.final_output, json!("A,B,C"));
}

#[tokio::test]
async fn test_branch_routes_one_side() {
    let engine = PipelineBuilder::new("branch")
        .add_step(
            "route",
            Arc::new(BranchStep::new(|inputs| {
                if primary_input(inputs).as_str().unwrap_or("").contains("left") {
                    "left".to_string()
                } else {
                    "right".to_string()
                }
            })),
        )
        .add_node(
            DagNode::new("left_node", prefix_step("L")).with_condition(|ctx| {
                ctx.get_node_output("route", "output") == Some(json!("left"))
            }),
        )
        .add_node(
            DagNode::new("right_node", prefix_step("R")).with_condition(|ctx| {
                ctx.get_node_output("route", "output") == Some(json!("right"))
            }),
        )
        .add_edge("route", "left_node")
        .add_edge("route", "right_node")
        .build()
        .unwrap();

    let result = engine.run(json!("go left")).await;
    assert!(result.success);
    assert!(result.outputs["left_node"].success && !result.outputs["left_node"].skipped);
    assert!(result.outputs["right_node"].skipped);
    assert_eq!(result.final_output, json!("L:left"));
}

#[tokio::test]
async fn test_every_declared_node_reaches_one_terminal_state() {
    let boom = Arc::new(CallableStep::from_sync("boom", |_ctx, _inputs| {
        Err(PipelineError::step("boom"))
    }));
    let engine = PipelineBuilder::new("coverage")
        .add_step("a", prefix_step("A"))
        .add_node(DagNode::new("fails", boom))
        .add_node(DagNode::new("gated", prefix_step("G")).with_condition(|_ctx| false))
        .add_step("after_fail", prefix_step("AF"))
        .add_step("after_a", prefix_step("AA"))
        .add_edge("a", "after_a")
        .add_edge("fails", "after_fail")
        .build()
        .unwrap();

    let result = engine.run(json!("x")).await;
    let declared: HashSet<&str> = ["a", "fails", "gated", "after_fail", "after_a"].into_iter().collect();
    let reached: HashSet<&str> = result.outputs.keys().map(String::as_str).collect();
    assert_eq!(declared, reached);
    for (id, node) in &result.outputs {
        let states = [node.success && !node.skipped, !node.success && !node.skipped, node.skipped];
        assert_eq!(states.iter().filter(|s| **s).count(), 1, "node '{}' in one state", id);
    }
    assert_eq!(result.execution_trace.len(), 5);
}

#[tokio::test]
async fn test_diamond_runs_parallel_branches() {
    let engine = PipelineBuilder::new("diamond")
        .add_step("src", prefix_step("S"))
        .add_step("left", prefix_step("L"))
        .add_step("right", prefix_step("R"))
        .add_step("sink", Arc::new(FanInStep::new()))
        .add_edge("src", "left")
        .add_edge("src", "right")
        .add_edge_keyed("left", "sink", "output", "left")
        .add_edge_keyed("right", "sink", "output", "right")
        .build()
        .unwrap();

    let result = engine.run(json!("x")).await;
    assert!(result.success);
    // Keyed inputs collect in sorted key order: left before right.
    assert_eq!(result.final_output, json!(["L:S:x", "R:S:x"]));
}

#[tokio::test]
async fn test_edge_output_key_extracts_field() {
    let produce = Arc::new(CallableStep::from_sync("produce", |_ctx, _inputs| {
        Ok(json!({"label": "spam", "score": 0.93}))
    }));
    let engine = PipelineBuilder::new("keyed")
        .add_step("classify", produce)
        .add_step("format", prefix_step("F"))
        .add_edge_keyed("classify", "format", "label", "input")
        .build()
        .unwrap();

    let result = engine.run(json!("msg")).await;
    assert!(result.success);
    assert_eq!(result.final_output, json!("F:spam"));
}

#[tokio::test]
async fn test_max_parallelism_cap_still_completes() {
    let make_sleep = |name: &str| {
        Arc::new(CallableStep::named(name.to_string(), |_ctx, _inputs| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(json!("done"))
            })
        }))
    };
    let engine = PipelineBuilder::new("capped")
        .add_step("a", make_sleep("a"))
        .add_step("b", make_sleep("b"))
        .add_step("c", make_sleep("c"))
        .add_step("d", make_sleep("d"))
        .build()
        .unwrap()
        .with_max_parallelism(2)
        .with_usage_tracker(quiet_tracker());

    let result = engine.run(json!("x")).await;
    assert!(result.success);
    assert_eq!(result.outputs.len(), 4);
}
