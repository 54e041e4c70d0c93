// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Step Executor Interface
//!
//! This module defines the interface every unit of work in a pipeline
//! satisfies. The engine treats all stage kinds uniformly through this
//! trait: agent invocations, arbitrary async functions, fan-out
//! splitters, fan-in mergers, branch routers, reasoning loops, and any
//! custom executor a caller supplies.
//!
//! ## Overview
//!
//! The `StepExecutor` trait provides a standardized interface for:
//!
//! - **Uniform Execution**: One async entry point for every stage kind
//! - **Input Delivery**: A keyed inputs map assembled by the engine from
//!   the node's incoming edges
//! - **Context Access**: Upstream results, the correlation id, the shared
//!   memory handle, and the run's cancellation token
//! - **Identity**: A stable name used for cache fingerprints and usage
//!   attribution
//!
//! ## Execution Contract
//!
//! ### Inputs
//!
//! `inputs` is the map the engine gathered for the node: each incoming
//! edge's extracted value under its input key. Source nodes receive the
//! original pipeline input under the default `input` key, read with
//! [`primary_input`].
//!
//! ### Errors
//!
//! Any error other than cancellation counts as a failed attempt against
//! the node's retry budget. Cancellation is observably distinct
//! (`PipelineError::is_cancellation`) so the engine can classify it and
//! stop retrying immediately.
//!
//! ### Cancellation
//!
//! Steps that perform long I/O should observe the context's cancellation
//! token at suspension points. The engine additionally drops a step's
//! future on timeout or run abort, so every `.await` is a cancellation
//! point even for steps that never check the token.
//!
//! ## Implementation Guidelines
//!
//! ### Custom Step Executor
//!
//! ```rust,ignore
//! use agentic_pipeline_domain::{
//!     primary_input, PipelineContext, PipelineError, StepExecutor, StepInputs,
//! };
//! use async_trait::async_trait;
//! use serde_json::Value;
//!
//! struct WordCount;
//!
//! #[async_trait]
//! impl StepExecutor for WordCount {
//!     async fn execute(
//!         &self,
//!         _context: &PipelineContext,
//!         inputs: &StepInputs,
//!     ) -> Result<Value, PipelineError> {
//!         let text = primary_input(inputs);
//!         let words = text.as_str().unwrap_or("").split_whitespace().count();
//!         Ok(Value::from(words))
//!     }
//!
//!     fn identity(&self) -> &str {
//!         "word_count"
//!     }
//! }
//! ```
//!
//! ## Thread Safety
//!
//! Implementations must be `Send + Sync`: the engine executes independent
//! nodes concurrently and may share one executor across nodes. Executors
//! holding mutable state must guard it themselves.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::entities::pipeline_context::PipelineContext;
use crate::PipelineError;

/// Inputs assembled for one node execution, keyed by edge input keys.
///
/// Source nodes (no incoming edges) receive the original pipeline input
/// under the default `input` key.
pub type StepInputs = HashMap<String, Value>;

/// Uniform interface for any unit of work the engine can schedule.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Executes the step with the gathered inputs.
    ///
    /// The context exposes upstream results, the correlation id for usage
    /// attribution, the shared memory handle, and the run's cancellation
    /// token.
    async fn execute(&self, context: &PipelineContext, inputs: &StepInputs) -> Result<Value, PipelineError>;

    /// Stable identity of this executor.
    ///
    /// Used for cache fingerprints and usage attribution. Distinct
    /// executors sharing one cache should report distinct identities.
    fn identity(&self) -> &str {
        "step"
    }
}

/// Returns the primary input value, the one delivered under the default
/// `input` key. Missing input reads as JSON null.
pub fn primary_input(inputs: &StepInputs) -> Value {
    inputs
        .get(crate::entities::dag_node::DEFAULT_INPUT_KEY)
        .cloned()
        .unwrap_or(Value::Null)
}
