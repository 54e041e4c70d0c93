// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Reasoning Pattern Interface
//!
//! This module defines the port for iterative reasoning loops
//! (chain-of-thought, ReAct, plan-and-execute, and similar) that drive an
//! agent through multiple invocations before producing a final answer.
//!
//! ## Overview
//!
//! The reasoning interface provides:
//!
//! - **Loop Abstraction**: One async entry point regardless of the
//!   pattern's internal shape
//! - **Traced Outcomes**: Every execution returns the final output
//!   together with an ordered trace of the steps taken
//! - **Attribution**: The context supplies the correlation id so every
//!   agent invocation inside the loop is accounted to the owning run
//! - **Cooperative Cancellation**: Long loops observe the run token
//!   between iterations
//!
//! ## Integration
//!
//! A reasoning step wraps a pattern together with an agent and surfaces
//! the loop's output and trace on the owning node's result:
//!
//! ```rust,ignore
//! let pattern: Arc<dyn ReasoningPattern> = Arc::new(ChainOfThought::new());
//! let step = ReasoningStep::new(pattern, agent);
//! // Node output: {"output": ..., "steps_taken": n, "trace": [...]}
//! ```
//!
//! Downstream edges extract the answer with `output_key = "output"`.

use async_trait::async_trait;
use serde_json::Value;

use crate::entities::pipeline_context::PipelineContext;
use crate::entities::reasoning_trace::ReasoningOutcome;
use crate::services::agent_service::Agent;
use crate::PipelineError;

/// An iterative reasoning loop that drives an agent to a final answer.
#[async_trait]
pub trait ReasoningPattern: Send + Sync {
    /// The pattern's name, recorded on its traces
    fn name(&self) -> &str;

    /// Runs the loop against the given agent and input.
    ///
    /// The context provides the correlation id for usage attribution and
    /// the run's cancellation token; long loops should observe the token
    /// between iterations.
    async fn execute(
        &self,
        agent: &dyn Agent,
        input: &Value,
        context: &PipelineContext,
    ) -> Result<ReasoningOutcome, PipelineError>;
}
