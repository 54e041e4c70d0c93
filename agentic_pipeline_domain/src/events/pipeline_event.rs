// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Structured Pipeline Events
//!
//! Serializable event records for the pipeline lifecycle. Each engine
//! notification can be rendered as one [`PipelineEvent`], a flat JSON-ready
//! record that integrates with any log aggregation backend. The engine
//! crate's tracing event handler emits these; external observers can
//! serialize them directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A structured event emitted at a pipeline lifecycle boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// Dotted event type, e.g. `node.completed`
    pub event_type: String,
    /// Name of the owning pipeline
    pub pipeline_name: String,
    /// The node the event describes; empty for pipeline-level events
    pub node_id: String,
    /// When the event was emitted
    pub timestamp: DateTime<Utc>,
    /// Event-specific detail fields
    pub detail: HashMap<String, Value>,
}

impl PipelineEvent {
    fn new(event_type: &str, pipeline_name: &str, node_id: &str) -> Self {
        Self {
            event_type: event_type.to_string(),
            pipeline_name: pipeline_name.to_string(),
            node_id: node_id.to_string(),
            timestamp: Utc::now(),
            detail: HashMap::new(),
        }
    }

    fn with_detail(mut self, key: &str, value: Value) -> Self {
        self.detail.insert(key.to_string(), value);
        self
    }

    /// A node started executing
    pub fn node_started(pipeline_name: &str, node_id: &str) -> Self {
        Self::new("node.started", pipeline_name, node_id)
    }

    /// A node completed successfully
    pub fn node_completed(pipeline_name: &str, node_id: &str, latency_ms: f64) -> Self {
        Self::new("node.completed", pipeline_name, node_id).with_detail("latency_ms", latency_ms.into())
    }

    /// A node failed terminally
    pub fn node_failed(pipeline_name: &str, node_id: &str, error: &str) -> Self {
        Self::new("node.failed", pipeline_name, node_id).with_detail("error", error.into())
    }

    /// A node was skipped
    pub fn node_skipped(pipeline_name: &str, node_id: &str, reason: &str) -> Self {
        Self::new("node.skipped", pipeline_name, node_id).with_detail("reason", reason.into())
    }

    /// The run reached its terminal state
    pub fn pipeline_completed(pipeline_name: &str, success: bool, duration_ms: f64) -> Self {
        Self::new("pipeline.completed", pipeline_name, "")
            .with_detail("success", success.into())
            .with_detail("duration_ms", duration_ms.into())
    }
}
