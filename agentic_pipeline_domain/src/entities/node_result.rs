// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Execution Result Entities
//!
//! This module contains the outcome models produced by a pipeline run:
//! the per-node [`NodeResult`], the ordered [`ExecutionTraceEntry`]
//! records, and the aggregate [`PipelineResult`].
//!
//! ## Overview
//!
//! The result models provide:
//!
//! - **Per-Node Outcomes**: Output, success flag, error text, measured
//!   latency, retries performed, skip flag, and an optional usage rollup
//! - **Terminal Statuses**: Every declared node ends a run in exactly one
//!   of completed, failed, or skipped
//! - **Chronological Trace**: One entry per node with start and
//!   completion timestamps and the terminal status
//! - **Aggregate Result**: Every node's outcome, the terminal output, the
//!   trace, the total duration, the run's success flag, and the usage
//!   rollup for its correlation id
//! - **Serialization**: All result models serialize to JSON for external
//!   observers
//!
//! ## Status Semantics
//!
//! ### Completed
//!
//! The step ran and produced an output; `success` is true.
//!
//! ### Failed
//!
//! The step exhausted its retry budget or was cancelled; `error` carries
//! the terminal cause text.
//!
//! ### Skipped
//!
//! A condition gate or upstream failure prevented execution. Skips are
//! not failures: a run where every non-skipped node succeeded is a
//! successful run.
//!
//! ## Usage Examples
//!
//! ### Inspecting a Run
//!
//! ```rust,ignore
//! let result = engine.run(inputs).await;
//! if !result.success {
//!     for node_id in result.failed_nodes() {
//!         eprintln!("{}: {:?}", node_id, result.outputs[node_id].error);
//!     }
//! }
//! let encoded = serde_json::to_string(&result)?;
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::entities::usage::UsageSummary;

/// Terminal status of a node within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// The step executed and produced an output
    Success,
    /// The step failed terminally after its retry budget
    Failed,
    /// The node was skipped without executing its step
    Skipped,
}

impl NodeStatus {
    /// Returns the lowercase string form used in traces and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Success => "success",
            NodeStatus::Failed => "failed",
            NodeStatus::Skipped => "skipped",
        }
    }
}

/// Result of executing a single DAG node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeResult {
    /// The node that produced this result
    pub node_id: String,
    /// The node's output value (`null` for failed or skipped nodes)
    pub output: Value,
    /// Whether execution succeeded
    pub success: bool,
    /// Error message when execution failed
    pub error: Option<String>,
    /// Wall-clock execution time in milliseconds
    pub latency_ms: f64,
    /// Number of retries actually performed (attempts - 1)
    pub retries: u32,
    /// Whether the node was skipped without executing
    pub skipped: bool,
    /// Usage rollup attributed to this node, when usage was recorded
    pub usage: Option<UsageSummary>,
}

impl NodeResult {
    /// Creates a successful result carrying the given output
    pub fn completed(node_id: impl Into<String>, output: Value) -> Self {
        Self {
            node_id: node_id.into(),
            output,
            success: true,
            error: None,
            latency_ms: 0.0,
            retries: 0,
            skipped: false,
            usage: None,
        }
    }

    /// Creates a failed result carrying the terminal error text
    pub fn failed(node_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            output: Value::Null,
            success: false,
            error: Some(error.into()),
            latency_ms: 0.0,
            retries: 0,
            skipped: false,
            usage: None,
        }
    }

    /// Creates a skipped result
    ///
    /// Skipped nodes are not failures: a run where every non-skipped node
    /// succeeded is a successful run.
    pub fn skipped(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            output: Value::Null,
            success: true,
            error: None,
            latency_ms: 0.0,
            retries: 0,
            skipped: true,
            usage: None,
        }
    }

    /// Sets the measured latency
    pub fn with_latency(mut self, latency_ms: f64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Sets the number of retries performed
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Attaches a usage rollup
    pub fn with_usage(mut self, usage: Option<UsageSummary>) -> Self {
        self.usage = usage;
        self
    }

    /// Returns the terminal status of this result
    pub fn status(&self) -> NodeStatus {
        if self.skipped {
            NodeStatus::Skipped
        } else if self.success {
            NodeStatus::Success
        } else {
            NodeStatus::Failed
        }
    }
}

/// A single entry in the chronological execution trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionTraceEntry {
    /// The node the entry describes
    pub node_id: String,
    /// When the node was dispatched (or observed terminal, for skips)
    pub started_at: DateTime<Utc>,
    /// When the node reached its terminal state
    pub completed_at: DateTime<Utc>,
    /// Terminal status string: `success`, `failed`, or `skipped`
    pub status: NodeStatus,
}

/// Aggregate result of an entire pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Name of the pipeline that ran
    pub pipeline_name: String,
    /// Per-node outcomes for every declared node
    pub outputs: HashMap<String, NodeResult>,
    /// Output of the terminal node, or a list when several are terminal
    pub final_output: Value,
    /// Ordered record of node terminal transitions
    pub execution_trace: Vec<ExecutionTraceEntry>,
    /// End-to-end run duration in milliseconds
    pub total_duration_ms: f64,
    /// True when every non-skipped node succeeded
    pub success: bool,
    /// Usage rollup for the run's correlation id, when records exist
    pub usage: Option<UsageSummary>,
}

impl PipelineResult {
    /// Creates an empty result shell for the named pipeline
    pub fn new(pipeline_name: impl Into<String>) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
            outputs: HashMap::new(),
            final_output: Value::Null,
            execution_trace: Vec::new(),
            total_duration_ms: 0.0,
            success: true,
            usage: None,
        }
    }

    /// Node ids that failed terminally (skips excluded)
    pub fn failed_nodes(&self) -> Vec<&str> {
        self.outputs
            .values()
            .filter(|r| !r.success && !r.skipped)
            .map(|r| r.node_id.as_str())
            .collect()
    }

    /// Node ids that were skipped
    pub fn skipped_nodes(&self) -> Vec<&str> {
        self.outputs
            .values()
            .filter(|r| r.skipped)
            .map(|r| r.node_id.as_str())
            .collect()
    }
}
