// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Step Executor Implementations
//!
//! This module provides the concrete implementations of the step executor
//! port, one per stage kind the engine schedules. Anything else
//! satisfying the same trait is accepted by the engine on equal footing.
//!
//! ## Overview
//!
//! The step implementations provide:
//!
//! - **Function Stages**: [`CallableStep`] wraps an arbitrary async
//!   function as a pipeline step
//! - **Agent Stages**: [`AgentStep`] wraps an LLM-driven agent, records
//!   usage priced by a cost calculator, and optionally walks a model
//!   fallback chain on errors
//! - **Fan-Out**: [`FanOutStep`] splits the incoming value into an
//!   ordered sequence for list-wise downstream processing
//! - **Fan-In**: [`FanInStep`] collects upstream values and applies an
//!   optional merge function
//! - **Branching**: [`BranchStep`] emits a routing label that downstream
//!   condition gates match against
//! - **Reasoning**: [`ReasoningStep`] drives an iterative reasoning
//!   pattern and surfaces its output and trace
//!
//! ## Step Execution Model
//!
//! ### Input Delivery
//!
//! Every step receives the inputs map the engine assembled from the
//! node's incoming edges. Steps that operate on a single value read the
//! default `input` key; fan-in collects every delivered value.
//!
//! ### Identity
//!
//! Each step reports a stable identity used for cache fingerprints and
//! usage attribution. Distinct side-effecting callables sharing one
//! cache should carry distinct identities (`CallableStep::named`).
//!
//! ## Usage Examples
//!
//! ### Wrapping a Function
//!
//! ```rust,ignore
//! use agentic_pipeline::{CallableStep, primary_input};
//!
//! let upper = CallableStep::from_sync("upper", |_ctx, inputs| {
//!     let text = primary_input(inputs);
//!     Ok(serde_json::json!(text.as_str().unwrap_or("").to_uppercase()))
//! });
//! ```
//!
//! ### Wrapping an Agent with Fallback
//!
//! ```rust,ignore
//! use agentic_pipeline::{AgentStep, FallbackChain};
//!
//! let chain = FallbackChain::new(vec![
//!     "openai:gpt-4o".to_string(),
//!     "openai:gpt-4o-mini".to_string(),
//! ])?;
//! let step = AgentStep::new(agent).with_fallback(chain);
//! ```
//!
//! ### Splitting and Merging
//!
//! ```rust,ignore
//! use agentic_pipeline::{FanInStep, FanOutStep};
//!
//! let split = FanOutStep::new(|value| {
//!     value.as_str().unwrap_or("").split(',').map(Into::into).collect()
//! });
//! let join = FanInStep::with_merge(|values| {
//!     Ok(serde_json::json!(values.len()))
//! });
//! ```
//!
//! ## Error Handling
//!
//! Step errors propagate to the engine's retry loop; any error other
//! than cancellation counts as a failed attempt. Agent steps classify
//! cancellation before consulting the fallback chain, so a cancelled
//! invocation never fails over to a backup model.
//!
//! ## Thread Safety
//!
//! All implementations are `Send + Sync`:
//!
//! - **Shared Functions**: closures are held behind `Arc` and shared
//!   across concurrent nodes
//! - **Shared Collaborators**: agents, trackers, and cost calculators
//!   are `Arc`-shared and safe under concurrent callers
//! - **Per-Invocation State**: fallback walks are created per invocation
//!   and never shared between nodes

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

use agentic_pipeline_domain::{
    primary_input, Agent, AgentRequest, CostCalculator, PipelineContext, PipelineError, ReasoningPattern,
    StepExecutor, StepInputs, UsageRecord,
};

use crate::infrastructure::metrics::cost::StaticPriceCostCalculator;
use crate::infrastructure::metrics::usage_tracker::{default_usage_tracker, UsageTracker};
use crate::infrastructure::runtime::fallback::FallbackChain;

type CallableFn =
    dyn for<'a> Fn(&'a PipelineContext, &'a StepInputs) -> BoxFuture<'a, Result<Value, PipelineError>> + Send + Sync;

/// Wraps an arbitrary async function as a pipeline step.
pub struct CallableStep {
    identity: String,
    function: Arc<CallableFn>,
}

impl CallableStep {
    /// Wraps an async function under the default `callable` identity
    pub fn new<F>(function: F) -> Self
    where
        F: for<'a> Fn(&'a PipelineContext, &'a StepInputs) -> BoxFuture<'a, Result<Value, PipelineError>>
            + Send
            + Sync
            + 'static,
    {
        Self::named("callable", function)
    }

    /// Wraps an async function under an explicit identity.
    ///
    /// Distinct callables sharing a result cache need distinct identities,
    /// since the identity is half of the cache fingerprint.
    pub fn named<F>(identity: impl Into<String>, function: F) -> Self
    where
        F: for<'a> Fn(&'a PipelineContext, &'a StepInputs) -> BoxFuture<'a, Result<Value, PipelineError>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            identity: identity.into(),
            function: Arc::new(function),
        }
    }

    /// Wraps a synchronous function, lifting it into the async contract
    pub fn from_sync<F>(identity: impl Into<String>, function: F) -> Self
    where
        F: Fn(&PipelineContext, &StepInputs) -> Result<Value, PipelineError> + Send + Sync + 'static,
    {
        let function = Arc::new(function);
        Self::named(identity, move |context, inputs| {
            let result = function(context, inputs);
            Box::pin(std::future::ready(result))
        })
    }
}

#[async_trait]
impl StepExecutor for CallableStep {
    async fn execute(&self, context: &PipelineContext, inputs: &StepInputs) -> Result<Value, PipelineError> {
        (self.function)(context, inputs).await
    }

    fn identity(&self) -> &str {
        &self.identity
    }
}

/// Wraps an LLM-driven agent as a pipeline step.
///
/// The gathered prompt (the node's primary input) is handed to the agent
/// together with the run's correlation id. Every invocation records one
/// usage record, priced by the configured cost calculator. With a fallback
/// chain configured, the step advances through backup models on error
/// before reporting failure.
pub struct AgentStep {
    identity: String,
    agent: Arc<dyn Agent>,
    tracker: Arc<UsageTracker>,
    cost: Arc<dyn CostCalculator>,
    fallback: Option<FallbackChain>,
}

impl AgentStep {
    /// Wraps an agent with default usage tracking and static pricing
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self {
            identity: agent.name().to_string(),
            agent,
            tracker: default_usage_tracker(),
            cost: Arc::new(StaticPriceCostCalculator::new()),
            fallback: None,
        }
    }

    /// Records usage into a specific tracker instead of the default
    pub fn with_tracker(mut self, tracker: Arc<UsageTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    /// Prices usage with a specific cost calculator
    pub fn with_cost_calculator(mut self, cost: Arc<dyn CostCalculator>) -> Self {
        self.cost = cost;
        self
    }

    /// Configures a model fallback chain walked on agent errors
    pub fn with_fallback(mut self, fallback: FallbackChain) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

#[async_trait]
impl StepExecutor for AgentStep {
    async fn execute(&self, context: &PipelineContext, inputs: &StepInputs) -> Result<Value, PipelineError> {
        let prompt = primary_input(inputs);
        let mut walk = self.fallback.as_ref().map(|chain| chain.walk());
        let mut model_override: Option<String> = None;

        loop {
            let started = Instant::now();
            let mut request = AgentRequest::new(prompt.clone(), context.correlation_id().clone());
            if let Some(model) = &model_override {
                request = request.with_model(model.clone());
            }

            match self.agent.run(request).await {
                Ok(response) => {
                    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                    let cost_usd =
                        self.cost
                            .estimate(&response.model, response.input_tokens, response.output_tokens);
                    self.tracker.record(
                        UsageRecord::new(self.agent.name(), &response.model, context.correlation_id().clone())
                            .with_tokens(response.input_tokens, response.output_tokens)
                            .with_cost(cost_usd)
                            .with_latency(latency_ms),
                    );
                    return Ok(response.output);
                }
                Err(error) if error.is_cancellation() => return Err(error),
                Err(error) => {
                    let next = walk
                        .as_mut()
                        .and_then(|walk| walk.advance().map(str::to_string));
                    match next {
                        Some(model) => {
                            tracing::warn!(
                                agent = self.agent.name(),
                                error = %error,
                                fallback_model = %model,
                                "agent invocation failed, retrying with fallback model"
                            );
                            model_override = Some(model);
                        }
                        None => return Err(error),
                    }
                }
            }
        }
    }

    fn identity(&self) -> &str {
        &self.identity
    }
}

type SplitterFn = dyn Fn(&Value) -> Vec<Value> + Send + Sync;

/// Splits the incoming value into a finite ordered sequence.
///
/// The step emits the sequence as one list value; downstream nodes operate
/// on the whole list and a [`FanInStep`] merges it back.
pub struct FanOutStep {
    splitter: Arc<SplitterFn>,
}

impl FanOutStep {
    /// Creates a fan-out around the given splitter function
    pub fn new<F>(splitter: F) -> Self
    where
        F: Fn(&Value) -> Vec<Value> + Send + Sync + 'static,
    {
        Self {
            splitter: Arc::new(splitter),
        }
    }
}

#[async_trait]
impl StepExecutor for FanOutStep {
    async fn execute(&self, _context: &PipelineContext, inputs: &StepInputs) -> Result<Value, PipelineError> {
        let input = primary_input(inputs);
        Ok(Value::Array((self.splitter)(&input)))
    }

    fn identity(&self) -> &str {
        "fan_out"
    }
}

type MergeFn = dyn Fn(Vec<Value>) -> Result<Value, PipelineError> + Send + Sync;

/// Collects upstream values and applies an optional merge function.
///
/// A single list input merges element-wise; multiple keyed inputs are
/// collected in sorted key order for determinism. Without a merge function
/// the collected list is returned as-is.
pub struct FanInStep {
    merge: Option<Arc<MergeFn>>,
}

impl FanInStep {
    /// Creates a fan-in that returns the collected list unchanged
    pub fn new() -> Self {
        Self { merge: None }
    }

    /// Creates a fan-in applying the given merge function
    pub fn with_merge<F>(merge: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, PipelineError> + Send + Sync + 'static,
    {
        Self {
            merge: Some(Arc::new(merge)),
        }
    }

    fn collect(inputs: &StepInputs) -> Vec<Value> {
        if inputs.len() == 1 {
            let value = inputs.values().next().cloned().unwrap_or(Value::Null);
            return match value {
                Value::Array(items) => items,
                Value::Null => Vec::new(),
                other => vec![other],
            };
        }
        let mut keys: Vec<&String> = inputs.keys().collect();
        keys.sort();
        keys.into_iter().map(|key| inputs[key].clone()).collect()
    }
}

impl Default for FanInStep {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StepExecutor for FanInStep {
    async fn execute(&self, _context: &PipelineContext, inputs: &StepInputs) -> Result<Value, PipelineError> {
        let values = Self::collect(inputs);
        match &self.merge {
            Some(merge) => merge(values),
            None => Ok(Value::Array(values)),
        }
    }

    fn identity(&self) -> &str {
        "fan_in"
    }
}

type RouterFn = dyn Fn(&StepInputs) -> String + Send + Sync;

/// Routes by emitting a label string as the node's output.
///
/// Downstream nodes gate themselves with `condition` predicates against
/// the emitted label.
pub struct BranchStep {
    router: Arc<RouterFn>,
}

impl BranchStep {
    /// Creates a branch around the given router function
    pub fn new<F>(router: F) -> Self
    where
        F: Fn(&StepInputs) -> String + Send + Sync + 'static,
    {
        Self {
            router: Arc::new(router),
        }
    }
}

#[async_trait]
impl StepExecutor for BranchStep {
    async fn execute(&self, _context: &PipelineContext, inputs: &StepInputs) -> Result<Value, PipelineError> {
        Ok(Value::String((self.router)(inputs)))
    }

    fn identity(&self) -> &str {
        "branch"
    }
}

/// Drives an iterative reasoning loop and surfaces its result.
///
/// The node output is an object carrying the loop's final `output`, the
/// number of `steps_taken`, and the full `trace`; downstream edges extract
/// the answer with `output_key = "output"`.
pub struct ReasoningStep {
    identity: String,
    pattern: Arc<dyn ReasoningPattern>,
    agent: Arc<dyn Agent>,
}

impl ReasoningStep {
    /// Wraps a reasoning pattern driving the given agent
    pub fn new(pattern: Arc<dyn ReasoningPattern>, agent: Arc<dyn Agent>) -> Self {
        Self {
            identity: format!("reasoning:{}", pattern.name()),
            pattern,
            agent,
        }
    }
}

#[async_trait]
impl StepExecutor for ReasoningStep {
    async fn execute(&self, context: &PipelineContext, inputs: &StepInputs) -> Result<Value, PipelineError> {
        let input = primary_input(inputs);
        let outcome = self.pattern.execute(self.agent.as_ref(), &input, context).await?;
        Ok(json!({
            "output": outcome.output,
            "steps_taken": outcome.steps_taken,
            "trace": serde_json::to_value(&outcome.trace)?,
        }))
    }

    fn identity(&self) -> &str {
        &self.identity
    }
}
