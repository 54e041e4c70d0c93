// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Context Entity
//!
//! This module contains the per-run blackboard that flows through the
//! DAG: the shared data bus every step reads its upstream values from and
//! the engine writes completed results into.
//!
//! ## Overview
//!
//! The context carries:
//!
//! - **Inputs**: The original caller input, which may be multimodal
//! - **Correlation Id**: The run-scoped identifier that flows to usage
//!   records and event emissions
//! - **Metadata**: A free-form key/value bag supplied by the caller
//! - **Memory Handle**: An optional external store shared across nodes
//! - **Results**: One result per completed node, written exactly once
//! - **Cancellation Token**: The run-scoped signal steps observe at I/O
//!   suspension points
//!
//! ## Usage Examples
//!
//! ### Reading Upstream Results from a Step
//!
//! ```rust,ignore
//! // Whole output of a completed node
//! let label = context.get_node_output("classify", "output");
//! // A keyed sub-value when the output is an object
//! let score = context.get_node_output("classify", "score");
//! ```
//!
//! ### Supplying a Correlated Context
//!
//! ```rust,ignore
//! let context = PipelineContext::new(serde_json::json!("question"))
//!     .with_correlation_id(CorrelationId::parse("trace-7f3a")?)
//!     .with_memory(memory_handle);
//! let result = engine.run_with_context(context).await;
//! ```
//!
//! ## Ownership and Concurrency
//!
//! Each context belongs to exactly one run. The engine guarantees at most
//! one writer per node (every node writes its result exactly once); the
//! results map is guarded so concurrent readers always observe a fully
//! initialized result. Steps receive the context by shared reference and
//! read upstream results through it.
//!
//! ## Cancellation
//!
//! The context carries the run-scoped cancellation token. Steps
//! performing long I/O can observe it at suspension points; the engine
//! cancels it when a `FailPipeline` strategy fires or the caller requests
//! cancellation.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;

use crate::entities::node_result::NodeResult;
use crate::services::memory_service::MemoryService;
use crate::value_objects::correlation_id::CorrelationId;

/// Per-run blackboard carrying inputs, metadata, and node results.
///
/// Construction is builder-style; the results map is interior-mutable so a
/// shared context can collect results from concurrently running nodes.
pub struct PipelineContext {
    inputs: Value,
    correlation_id: CorrelationId,
    metadata: HashMap<String, Value>,
    memory: Option<Arc<dyn MemoryService>>,
    results: RwLock<HashMap<String, NodeResult>>,
    cancellation: CancellationToken,
}

impl PipelineContext {
    /// Creates a context carrying the given caller input
    ///
    /// A fresh correlation id is generated; callers correlating with an
    /// external trace can override it with [`with_correlation_id`].
    ///
    /// [`with_correlation_id`]: PipelineContext::with_correlation_id
    pub fn new(inputs: Value) -> Self {
        Self {
            inputs,
            correlation_id: CorrelationId::new(),
            metadata: HashMap::new(),
            memory: None,
            results: RwLock::new(HashMap::new()),
            cancellation: CancellationToken::new(),
        }
    }

    /// Sets the correlation id
    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    /// Sets caller metadata
    pub fn with_metadata(mut self, metadata: HashMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Attaches an external memory handle shared across nodes
    pub fn with_memory(mut self, memory: Arc<dyn MemoryService>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Sets the run-scoped cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Gets the original caller input
    pub fn inputs(&self) -> &Value {
        &self.inputs
    }

    /// Gets the correlation id for this run
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// Gets the caller metadata bag
    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    /// Looks up one metadata value
    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Gets the external memory handle, when one was attached
    ///
    /// The engine passes this through to steps unchanged; its semantics are
    /// the collaborator's.
    pub fn memory(&self) -> Option<&Arc<dyn MemoryService>> {
        self.memory.as_ref()
    }

    /// Gets the run-scoped cancellation token
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Stores the result for a completed node.
    ///
    /// The engine calls this exactly once per node. A second write for the
    /// same node indicates a scheduler defect and is rejected.
    pub fn set_node_result(&self, node_id: &str, result: NodeResult) -> bool {
        let mut results = self.results.write().unwrap_or_else(|e| e.into_inner());
        if results.contains_key(node_id) {
            return false;
        }
        results.insert(node_id.to_string(), result);
        true
    }

    /// Retrieves the result of a completed node
    pub fn get_node_result(&self, node_id: &str) -> Option<NodeResult> {
        let results = self.results.read().unwrap_or_else(|e| e.into_inner());
        results.get(node_id).cloned()
    }

    /// Retrieves a specific output key from a completed node's result.
    ///
    /// The key `"output"` yields the whole output value; any other key
    /// indexes into the output when it is an object, and yields `None`
    /// otherwise.
    pub fn get_node_output(&self, node_id: &str, key: &str) -> Option<Value> {
        let results = self.results.read().unwrap_or_else(|e| e.into_inner());
        let result = results.get(node_id)?;
        if key == crate::entities::dag_node::DEFAULT_OUTPUT_KEY {
            return Some(result.output.clone());
        }
        match &result.output {
            Value::Object(map) => map.get(key).cloned(),
            _ => None,
        }
    }

    /// Snapshot of all node results collected so far
    pub fn results(&self) -> HashMap<String, NodeResult> {
        let results = self.results.read().unwrap_or_else(|e| e.into_inner());
        results.clone()
    }

    /// Node ids that have reached a terminal state so far
    pub fn completed_node_ids(&self) -> Vec<String> {
        let results = self.results.read().unwrap_or_else(|e| e.into_inner());
        results.keys().cloned().collect()
    }
}

impl fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineContext")
            .field("correlation_id", &self.correlation_id)
            .field("completed_nodes", &self.completed_node_ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_results_written_exactly_once() {
        let ctx = PipelineContext::new(json!("in"));
        assert!(ctx.set_node_result("a", NodeResult::completed("a", json!(1))));
        assert!(!ctx.set_node_result("a", NodeResult::completed("a", json!(2))));
        assert_eq!(ctx.get_node_result("a").unwrap().output, json!(1));
    }

    #[test]
    fn test_get_node_output_whole_value() {
        let ctx = PipelineContext::new(Value::Null);
        ctx.set_node_result("a", NodeResult::completed("a", json!({"score": 0.9})));
        assert_eq!(ctx.get_node_output("a", "output"), Some(json!({"score": 0.9})));
    }

    #[test]
    fn test_get_node_output_keyed_sub_value() {
        let ctx = PipelineContext::new(Value::Null);
        ctx.set_node_result("a", NodeResult::completed("a", json!({"score": 0.9, "label": "spam"})));
        assert_eq!(ctx.get_node_output("a", "label"), Some(json!("spam")));
        assert_eq!(ctx.get_node_output("a", "missing"), None);
    }

    #[test]
    fn test_keyed_lookup_on_scalar_output_is_none() {
        let ctx = PipelineContext::new(Value::Null);
        ctx.set_node_result("a", NodeResult::completed("a", json!("plain")));
        assert_eq!(ctx.get_node_output("a", "field"), None);
        assert_eq!(ctx.get_node_output("a", "output"), Some(json!("plain")));
    }

    #[test]
    fn test_unknown_node_is_none() {
        let ctx = PipelineContext::new(Value::Null);
        assert!(ctx.get_node_result("ghost").is_none());
        assert!(ctx.get_node_output("ghost", "output").is_none());
    }
}
