// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Error Types
//!
//! This module defines the unified error type used throughout the pipeline
//! system. All fallible domain and engine operations return
//! [`PipelineError`], keeping error handling consistent across crate
//! boundaries.
//!
//! ## Error Categories
//!
//! - **Validation**: Graph construction failures (duplicate nodes, unknown
//!   edge endpoints, cycles). Raised at build time, never during a run.
//! - **Step / StepTimeout**: Failures produced while executing a node's
//!   step. Timeouts are a distinct variant for classification but count
//!   identically against a node's retry budget.
//! - **Cancelled**: Cooperative cancellation. Never retried; a cancelled
//!   node short-circuits to a failed result.
//! - **Aborted**: A `FailPipeline` failure strategy terminated the run.
//!
//! ## Propagation Policy
//!
//! Inside a node, step errors are absorbed by the retry loop and recorded on
//! the node's result once the budget is exhausted. The engine boundary
//! returns a `PipelineResult` rather than an error, except for validation at
//! construction and caller-driven cancellation.

use thiserror::Error;

/// Unified error type for pipeline operations.
///
/// Variants carry a human-readable message describing the underlying cause.
/// Classification helpers (`is_timeout`, `is_cancellation`) let the retry
/// loop treat timeout and cancellation specially without matching variants
/// at every call site.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    /// Graph construction failed: duplicate node, unknown endpoint, or cycle
    #[error("validation error: {0}")]
    Validation(String),

    /// A step executor failed while processing a node
    #[error("step error: {0}")]
    Step(String),

    /// A step exceeded its per-node timeout budget
    #[error("step timeout: {0}")]
    StepTimeout(String),

    /// Execution was cancelled before the step could complete
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// The run was aborted by a FailPipeline failure strategy
    #[error("pipeline aborted: {0}")]
    Aborted(String),

    /// An agent collaborator reported a failure
    #[error("agent error: {0}")]
    Agent(String),

    /// The external memory collaborator reported a failure
    #[error("memory error: {0}")]
    Memory(String),

    /// A value could not be serialized or deserialized
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl PipelineError {
    /// Creates a validation error with the given message
    pub fn validation(message: impl Into<String>) -> Self {
        PipelineError::Validation(message.into())
    }

    /// Creates a step error with the given message
    pub fn step(message: impl Into<String>) -> Self {
        PipelineError::Step(message.into())
    }

    /// Returns true when this error is a step timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, PipelineError::StepTimeout(_))
    }

    /// Returns true when this error represents cancellation
    ///
    /// Cancellation is not a retryable failure category: the retry loop
    /// stops immediately when it observes a cancelled attempt.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, PipelineError::Cancelled(_))
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}
