// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Event Handler Interface
//!
//! This module defines the observer trait the engine notifies at node and
//! pipeline boundaries. Every method has a no-op default, so implementers
//! only override the notifications they care about.
//!
//! ## Overview
//!
//! The event handler interface provides:
//!
//! - **Node Lifecycle**: Start, completion with latency, terminal error,
//!   and skip-with-reason notifications
//! - **Run Lifecycle**: A single completion notification carrying the
//!   run's success flag and duration
//! - **Failure Containment**: An `Err` returned by a handler is logged at
//!   warning level and never affects pipeline execution
//! - **Multiplicity**: Several handlers may observe one engine; each is
//!   isolated from the others
//!
//! ## Delivery Guarantees
//!
//! - Notifications are delivered in happens-before order with the state
//!   change they describe: a node's result is observable before its
//!   `on_node_complete` fires, and before any dependent node's
//!   `on_node_start`
//! - Per-node callbacks are serialized with respect to that node's own
//!   transitions; callbacks for different nodes may interleave
//! - Condition skips never start the node, so a skipped node produces an
//!   `on_node_skip` and nothing else
//!
//! ## Usage Examples
//!
//! ### Collecting Completions
//!
//! ```rust,ignore
//! use agentic_pipeline_domain::{PipelineError, PipelineEventHandler};
//! use async_trait::async_trait;
//!
//! #[derive(Default)]
//! struct LatencyLog {
//!     entries: parking_lot::Mutex<Vec<(String, f64)>>,
//! }
//!
//! #[async_trait]
//! impl PipelineEventHandler for LatencyLog {
//!     async fn on_node_complete(
//!         &self,
//!         node_id: &str,
//!         _pipeline_name: &str,
//!         latency_ms: f64,
//!     ) -> Result<(), PipelineError> {
//!         self.entries.lock().push((node_id.to_string(), latency_ms));
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::PipelineError;

/// Observer of pipeline lifecycle notifications.
///
/// All methods are optional; defaults do nothing.
#[async_trait]
pub trait PipelineEventHandler: Send + Sync {
    /// Called when a node starts executing (after its condition passed)
    async fn on_node_start(&self, node_id: &str, pipeline_name: &str) -> Result<(), PipelineError> {
        let _ = (node_id, pipeline_name);
        Ok(())
    }

    /// Called when a node completes successfully
    async fn on_node_complete(
        &self,
        node_id: &str,
        pipeline_name: &str,
        latency_ms: f64,
    ) -> Result<(), PipelineError> {
        let _ = (node_id, pipeline_name, latency_ms);
        Ok(())
    }

    /// Called when a node fails terminally
    async fn on_node_error(
        &self,
        node_id: &str,
        pipeline_name: &str,
        error: &str,
    ) -> Result<(), PipelineError> {
        let _ = (node_id, pipeline_name, error);
        Ok(())
    }

    /// Called when a node is skipped without executing
    async fn on_node_skip(&self, node_id: &str, pipeline_name: &str, reason: &str) -> Result<(), PipelineError> {
        let _ = (node_id, pipeline_name, reason);
        Ok(())
    }

    /// Called once when the run reaches its terminal state
    async fn on_pipeline_complete(
        &self,
        pipeline_name: &str,
        success: bool,
        duration_ms: f64,
    ) -> Result<(), PipelineError> {
        let _ = (pipeline_name, success, duration_ms);
        Ok(())
    }
}
