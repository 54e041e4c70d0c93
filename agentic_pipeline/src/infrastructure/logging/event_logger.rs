// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Tracing Event Handler
//!
//! Event-handler implementation that renders every pipeline notification as
//! a structured [`PipelineEvent`] and forwards it into `tracing`. Attaching
//! it to an engine gives any subscriber the full lifecycle as JSON-shaped
//! log records without custom observer code.

use async_trait::async_trait;

use agentic_pipeline_domain::{PipelineError, PipelineEvent, PipelineEventHandler};

/// Forwards pipeline lifecycle events into `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventHandler;

impl TracingEventHandler {
    /// Creates the handler
    pub fn new() -> Self {
        Self
    }

    fn emit(&self, event: &PipelineEvent, error: bool) {
        let payload = serde_json::to_string(event).unwrap_or_else(|_| event.event_type.clone());
        if error {
            tracing::warn!(event_type = %event.event_type, event = %payload, "pipeline event");
        } else {
            tracing::info!(event_type = %event.event_type, event = %payload, "pipeline event");
        }
    }
}

#[async_trait]
impl PipelineEventHandler for TracingEventHandler {
    async fn on_node_start(&self, node_id: &str, pipeline_name: &str) -> Result<(), PipelineError> {
        self.emit(&PipelineEvent::node_started(pipeline_name, node_id), false);
        Ok(())
    }

    async fn on_node_complete(
        &self,
        node_id: &str,
        pipeline_name: &str,
        latency_ms: f64,
    ) -> Result<(), PipelineError> {
        self.emit(&PipelineEvent::node_completed(pipeline_name, node_id, latency_ms), false);
        Ok(())
    }

    async fn on_node_error(&self, node_id: &str, pipeline_name: &str, error: &str) -> Result<(), PipelineError> {
        self.emit(&PipelineEvent::node_failed(pipeline_name, node_id, error), true);
        Ok(())
    }

    async fn on_node_skip(&self, node_id: &str, pipeline_name: &str, reason: &str) -> Result<(), PipelineError> {
        self.emit(&PipelineEvent::node_skipped(pipeline_name, node_id, reason), false);
        Ok(())
    }

    async fn on_pipeline_complete(
        &self,
        pipeline_name: &str,
        success: bool,
        duration_ms: f64,
    ) -> Result<(), PipelineError> {
        self.emit(&PipelineEvent::pipeline_completed(pipeline_name, success, duration_ms), !success);
        Ok(())
    }
}
