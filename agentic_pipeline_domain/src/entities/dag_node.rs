// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # DAG Node and Edge Entities
//!
//! This module contains the building blocks of a pipeline graph: the node
//! (a unit of work plus its execution policy) and the directed edge (a
//! dependency that optionally remaps output and input keys).
//!
//! ## Node Policy
//!
//! Beyond its step, every node carries the policy the engine applies when
//! running it:
//!
//! - **Condition**: optional predicate over the run context; when present
//!   and false the node is skipped without executing
//! - **Retry budget**: number of retries beyond the first attempt
//! - **Timeout**: wall-clock budget per attempt; absent means unbounded
//! - **Failure strategy**: what a terminal failure does to the rest of the
//!   run (skip downstream, fail the pipeline, or continue)
//!
//! ## Edge Keys
//!
//! An edge extracts `output_key` from the source node's result and delivers
//! it to the target under `input_key`. The defaults (`output` → `input`)
//! pass the whole output of the source as the target's primary input.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::entities::pipeline_context::PipelineContext;
use crate::services::step_executor::StepExecutor;

/// Default edge output key: the source node's whole output value.
pub const DEFAULT_OUTPUT_KEY: &str = "output";

/// Default edge input key: the target's primary input slot.
pub const DEFAULT_INPUT_KEY: &str = "input";

/// Predicate over the run context that gates a node's execution.
pub type NodeCondition = Arc<dyn Fn(&PipelineContext) -> bool + Send + Sync>;

/// Policy applied when a node fails terminally (after its retry budget).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStrategy {
    /// Mark the node failed and transitively skip its downstream nodes
    #[default]
    SkipDownstream,
    /// Cancel everything in flight and mark the pipeline failed
    FailPipeline,
    /// Mark the node failed but let downstream run with null for this input
    Continue,
}

/// A unit of work in the graph: identity, behavior, and execution policy.
///
/// The step is shared behind an `Arc` so the engine can hand it to a
/// spawned task without cloning the executor itself. Nodes are built with
/// `with_*` methods and are immutable once the graph is constructed.
#[derive(Clone)]
pub struct DagNode {
    node_id: String,
    step: Arc<dyn StepExecutor>,
    condition: Option<NodeCondition>,
    retry_max: u32,
    timeout: Option<Duration>,
    failure_strategy: FailureStrategy,
}

impl DagNode {
    /// Creates a node with default policy: no condition, no retries, no
    /// timeout, `SkipDownstream` on failure.
    pub fn new(node_id: impl Into<String>, step: Arc<dyn StepExecutor>) -> Self {
        Self {
            node_id: node_id.into(),
            step,
            condition: None,
            retry_max: 0,
            timeout: None,
            failure_strategy: FailureStrategy::default(),
        }
    }

    /// Sets the skip condition
    pub fn with_condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&PipelineContext) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    /// Sets the number of retries beyond the first attempt
    pub fn with_retry_max(mut self, retry_max: u32) -> Self {
        self.retry_max = retry_max;
        self
    }

    /// Sets the per-attempt timeout from seconds; zero or negative disables
    pub fn with_timeout_secs(mut self, timeout_seconds: f64) -> Self {
        self.timeout = if timeout_seconds > 0.0 {
            Some(Duration::from_secs_f64(timeout_seconds))
        } else {
            None
        };
        self
    }

    /// Sets the failure strategy
    pub fn with_failure_strategy(mut self, strategy: FailureStrategy) -> Self {
        self.failure_strategy = strategy;
        self
    }

    /// Gets the node id
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Gets the step executor
    pub fn step(&self) -> &Arc<dyn StepExecutor> {
        &self.step
    }

    /// Gets the skip condition, when present
    pub fn condition(&self) -> Option<&NodeCondition> {
        self.condition.as_ref()
    }

    /// Gets the retry budget (retries beyond the first attempt)
    pub fn retry_max(&self) -> u32 {
        self.retry_max
    }

    /// Gets the per-attempt timeout, when one is set
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Gets the failure strategy
    pub fn failure_strategy(&self) -> FailureStrategy {
        self.failure_strategy
    }
}

impl fmt::Debug for DagNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DagNode")
            .field("node_id", &self.node_id)
            .field("step", &self.step.identity())
            .field("has_condition", &self.condition.is_some())
            .field("retry_max", &self.retry_max)
            .field("timeout", &self.timeout)
            .field("failure_strategy", &self.failure_strategy)
            .finish()
    }
}

/// Directed dependency between two nodes with optional key remapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagEdge {
    source: String,
    target: String,
    output_key: String,
    input_key: String,
}

impl DagEdge {
    /// Creates an edge with default keys (`output` → `input`)
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            output_key: DEFAULT_OUTPUT_KEY.to_string(),
            input_key: DEFAULT_INPUT_KEY.to_string(),
        }
    }

    /// Sets the field extracted from the source node's output
    pub fn with_output_key(mut self, output_key: impl Into<String>) -> Self {
        self.output_key = output_key.into();
        self
    }

    /// Sets the key the target receives the value under
    pub fn with_input_key(mut self, input_key: impl Into<String>) -> Self {
        self.input_key = input_key.into();
        self
    }

    /// Gets the source node id
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Gets the target node id
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Gets the output extraction key
    pub fn output_key(&self) -> &str {
        &self.output_key
    }

    /// Gets the input delivery key
    pub fn input_key(&self) -> &str {
        &self.input_key
    }
}
