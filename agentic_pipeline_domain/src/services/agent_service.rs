// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Agent Collaborator Interface
//!
//! This module defines the port for the LLM-driven collaborators that
//! agent steps wrap. The core never talks to a provider directly: it
//! hands the agent a request carrying the gathered prompt and the run's
//! correlation id, and receives back the output plus token accounting.
//!
//! ## Overview
//!
//! The agent interface provides:
//!
//! - **Provider Abstraction**: Implementations wrap whatever client the
//!   embedding application uses; the core depends only on this trait
//! - **Usage Attribution**: Every request carries the correlation id, and
//!   every response carries the serving model and token counts
//! - **Model Override**: Fallback chains re-invoke the agent with a
//!   backup model without reconfiguring it
//! - **Cost Estimation**: The [`CostCalculator`] port turns token counts
//!   into an estimated USD cost; a static-price implementation lives in
//!   the engine crate
//!
//! ## Usage Examples
//!
//! ### Implementing an Agent
//!
//! ```rust,ignore
//! struct EchoAgent;
//!
//! #[async_trait]
//! impl Agent for EchoAgent {
//!     fn name(&self) -> &str { "echo" }
//!     fn model(&self) -> &str { "test:echo" }
//!
//!     async fn run(&self, request: AgentRequest) -> Result<AgentResponse, PipelineError> {
//!         Ok(AgentResponse {
//!             output: request.prompt,
//!             model: self.model().to_string(),
//!             input_tokens: 0,
//!             output_tokens: 0,
//!         })
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde_json::Value;

use crate::value_objects::correlation_id::CorrelationId;
use crate::PipelineError;

/// One agent invocation: the prompt plus run attribution.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    /// The gathered prompt value (may be multimodal)
    pub prompt: Value,
    /// Correlation id of the owning run, for usage attribution
    pub correlation_id: CorrelationId,
    /// Overrides the agent's configured model, used by fallback chains
    pub model_override: Option<String>,
}

impl AgentRequest {
    /// Creates a request with no model override
    pub fn new(prompt: Value, correlation_id: CorrelationId) -> Self {
        Self {
            prompt,
            correlation_id,
            model_override: None,
        }
    }

    /// Sets the model override
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_override = Some(model.into());
        self
    }
}

/// Result of one agent invocation with token accounting.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The agent's output value
    pub output: Value,
    /// The model that actually served the request
    pub model: String,
    /// Prompt-side token count
    pub input_tokens: u64,
    /// Completion-side token count
    pub output_tokens: u64,
}

impl AgentResponse {
    /// Total tokens consumed by the invocation
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// An LLM-driven collaborator the pipeline can invoke.
///
/// Implementations wrap whatever provider client the embedding application
/// uses; the core only depends on this trait.
#[async_trait]
pub trait Agent: Send + Sync {
    /// The agent's name, used for usage attribution and logging
    fn name(&self) -> &str;

    /// The agent's configured (primary) model identifier
    fn model(&self) -> &str;

    /// Runs the agent with the given request
    async fn run(&self, request: AgentRequest) -> Result<AgentResponse, PipelineError>;
}

/// Estimates the cost of a model invocation from its token counts.
pub trait CostCalculator: Send + Sync {
    /// Returns the estimated cost in USD; unknown models cost zero
    fn estimate(&self, model: &str, input_tokens: u64, output_tokens: u64) -> f64;
}
