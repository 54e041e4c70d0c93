//! # Event Handler Tests
//!
//! Observer notifications: delivery on success, failure, and skip; the
//! happens-before ordering between a node's completion and its dependents'
//! starts; and containment of handler failures.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

use agentic_pipeline::{
    primary_input, CallableStep, DagNode, PipelineBuilder, PipelineError, PipelineEventHandler,
};

/// Collects every notification as an ordered log line.
#[derive(Default)]
struct RecordingHandler {
    log: Mutex<Vec<String>>,
}

impl RecordingHandler {
    fn entries(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|line| line == entry)
    }
}

#[async_trait]
impl PipelineEventHandler for RecordingHandler {
    async fn on_node_start(&self, node_id: &str, _pipeline_name: &str) -> Result<(), PipelineError> {
        self.log.lock().push(format!("start:{}", node_id));
        Ok(())
    }

    async fn on_node_complete(
        &self,
        node_id: &str,
        _pipeline_name: &str,
        latency_ms: f64,
    ) -> Result<(), PipelineError> {
        assert!(latency_ms >= 0.0);
        self.log.lock().push(format!("complete:{}", node_id));
        Ok(())
    }

    async fn on_node_error(&self, node_id: &str, _pipeline_name: &str, _error: &str) -> Result<(), PipelineError> {
        self.log.lock().push(format!("error:{}", node_id));
        Ok(())
    }

    async fn on_node_skip(&self, node_id: &str, _pipeline_name: &str, reason: &str) -> Result<(), PipelineError> {
        self.log.lock().push(format!("skip:{}:{}", node_id, reason));
        Ok(())
    }

    async fn on_pipeline_complete(
        &self,
        pipeline_name: &str,
        success: bool,
        _duration_ms: f64,
    ) -> Result<(), PipelineError> {
        self.log.lock().push(format!("pipeline:{}:{}", pipeline_name, success));
        Ok(())
    }
}

fn echo(name: &str) -> Arc<CallableStep> {
    Arc::new(CallableStep::from_sync(name.to_string(), |_ctx, inputs| {
        Ok(primary_input(inputs))
    }))
}

#[tokio::test]
async fn test_events_on_success() {
    let handler = Arc::new(RecordingHandler::default());
    let engine = PipelineBuilder::new("evt-test")
        .add_step("a", echo("a"))
        .add_step("b", echo("b"))
        .add_edge("a", "b")
        .build()
        .unwrap()
        .with_event_handler(Arc::clone(&handler) as Arc<dyn PipelineEventHandler>);

    let result = engine.run(json!("hello")).await;
    assert!(result.success);

    let entries = handler.entries();
    for expected in ["start:a", "complete:a", "start:b", "complete:b", "pipeline:evt-test:true"] {
        assert!(entries.iter().any(|line| line == expected), "missing {}", expected);
    }
}

#[tokio::test]
async fn test_completion_ordered_before_dependent_start() {
    let handler = Arc::new(RecordingHandler::default());
    let engine = PipelineBuilder::new("ordering")
        .add_step("parent", echo("parent"))
        .add_step("child", echo("child"))
        .add_edge("parent", "child")
        .build()
        .unwrap()
        .with_event_handler(Arc::clone(&handler) as Arc<dyn PipelineEventHandler>);

    engine.run(json!("x")).await;

    let complete_parent = handler.position("complete:parent").unwrap();
    let start_child = handler.position("start:child").unwrap();
    assert!(
        complete_parent < start_child,
        "parent completion must be observable before the child starts"
    );
    // The pipeline-level event is last.
    let entries = handler.entries();
    assert!(entries.last().unwrap().starts_with("pipeline:"));
}

#[tokio::test]
async fn test_events_on_failure() {
    let handler = Arc::new(RecordingHandler::default());
    let engine = PipelineBuilder::new("fail-evt")
        .add_node(DagNode::new(
            "fail",
            Arc::new(CallableStep::from_sync("fail", |_ctx, _inputs| {
                Err(PipelineError::step("boom"))
            })),
        ))
        .build()
        .unwrap()
        .with_event_handler(Arc::clone(&handler) as Arc<dyn PipelineEventHandler>);

    let result = engine.run(json!("test")).await;
    assert!(!result.success);
    let entries = handler.entries();
    assert!(entries.iter().any(|line| line == "error:fail"));
    assert!(entries.iter().any(|line| line == "pipeline:fail-evt:false"));
}

#[tokio::test]
async fn test_events_on_skip_carry_reason() {
    let handler = Arc::new(RecordingHandler::default());
    let engine = PipelineBuilder::new("skip-evt")
        .add_node(DagNode::new("gated", echo("gated")).with_condition(|_ctx| false))
        .build()
        .unwrap()
        .with_event_handler(Arc::clone(&handler) as Arc<dyn PipelineEventHandler>);

    engine.run(json!("test")).await;
    let entries = handler.entries();
    assert!(entries
        .iter()
        .any(|line| line.starts_with("skip:gated:") && line.contains("condition")));
    // Condition skips never start the node.
    assert!(!entries.iter().any(|line| line == "start:gated"));
}

#[tokio::test]
async fn test_no_handler_still_works() {
    let engine = PipelineBuilder::new("no-handler")
        .add_step("a", echo("a"))
        .build()
        .unwrap();
    let result = engine.run(json!("test")).await;
    assert!(result.success);
}

#[tokio::test]
async fn test_handler_failure_does_not_affect_pipeline() {
    struct BrokenHandler;

    #[async_trait]
    impl PipelineEventHandler for BrokenHandler {
        async fn on_node_start(&self, _node_id: &str, _pipeline_name: &str) -> Result<(), PipelineError> {
            Err(PipelineError::step("handler boom"))
        }

        async fn on_node_complete(
            &self,
            _node_id: &str,
            _pipeline_name: &str,
            _latency_ms: f64,
        ) -> Result<(), PipelineError> {
            Err(PipelineError::step("handler boom"))
        }

        async fn on_pipeline_complete(
            &self,
            _pipeline_name: &str,
            _success: bool,
            _duration_ms: f64,
        ) -> Result<(), PipelineError> {
            Err(PipelineError::step("handler boom"))
        }
    }

    let engine = PipelineBuilder::new("broken-handler")
        .add_step("a", echo("a"))
        .build()
        .unwrap()
        .with_event_handler(Arc::new(BrokenHandler));

    let result = engine.run(json!("test")).await;
    assert!(result.success, "handler failures must not affect execution");
    assert_eq!(result.outputs["a"].output, json!("test"));
}

#[tokio::test]
async fn test_multiple_handlers_all_notified() {
    let first = Arc::new(RecordingHandler::default());
    let second = Arc::new(RecordingHandler::default());
    let engine = PipelineBuilder::new("multi")
        .add_step("a", echo("a"))
        .build()
        .unwrap()
        .with_event_handler(Arc::clone(&first) as Arc<dyn PipelineEventHandler>)
        .with_event_handler(Arc::clone(&second) as Arc<dyn PipelineEventHandler>);

    engine.run(json!("x")).await;
    assert!(first.position("complete:a").is_some());
    assert!(second.position("complete:a").is_some());
}
