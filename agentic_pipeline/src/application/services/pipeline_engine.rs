// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Engine
//!
//! This module provides the scheduler at the heart of the execution core.
//! The engine releases nodes topologically with maximum safe concurrency,
//! applies per-node policy, notifies observers, and assembles the
//! aggregate run result.
//!
//! ## Overview
//!
//! The pipeline engine provides:
//!
//! - **Topological Scheduling**: Nodes run as soon as every dependency is
//!   terminal, concurrently with their peers
//! - **Per-Node Policy**: Condition gates, retry budgets, per-attempt
//!   timeouts, and failure-containment strategies
//! - **Observation**: Best-effort lifecycle notifications at node and
//!   pipeline boundaries
//! - **Result Assembly**: Per-node outcomes, the terminal output, a
//!   chronological trace, and the run's usage rollup
//! - **Cancellation**: Cooperative teardown of in-flight work on abort or
//!   caller request
//!
//! ## Execution Algorithm
//!
//! ### 1. Initialize
//!
//! Wrap or create the run context, record the start time, and compute the
//! initial ready set (the graph's sources). No pipeline-level start event
//! is emitted; nodes emit events as they transition.
//!
//! ### 2. Wave Loop
//!
//! While any node is ready or in flight:
//!
//! - Dispatch every ready node concurrently onto a task set, scanning in
//!   declaration order
//! - Finalize skip decisions synchronously in the dispatch pass
//!   (condition gates, forced downstream skips, fully-skipped upstream),
//!   so dependents release immediately
//! - Await the next completion (any-of), write its result, notify
//!   observers, and apply its failure strategy
//! - Release any node whose predecessors are now all terminal
//!
//! ### 3. Finalize
//!
//! Compute the total duration, assemble the terminal output (one scalar
//! for a single terminal node, a list for several), attach the usage
//! rollup for the run's correlation id, and emit `on_pipeline_complete`.
//!
//! ## Failure Strategies
//!
//! A node that fails terminally (after its retry budget) is handled by
//! its declared strategy:
//!
//! - **SkipDownstream**: transitive successors are marked for skipping
//!   and never execute
//! - **FailPipeline**: the run token is cancelled, in-flight tasks are
//!   aborted and drained, and the run finishes failed
//! - **Continue**: downstream nodes run and receive null for edges drawn
//!   from the failed node
//!
//! ## Usage Examples
//!
//! ### Basic Run
//!
//! ```rust,ignore
//! use agentic_pipeline::{CallableStep, PipelineBuilder, primary_input};
//! use std::sync::Arc;
//!
//! let engine = PipelineBuilder::new("summarize")
//!     .add_step("fetch", fetch_step)
//!     .add_step("summarize", summarize_step)
//!     .chain(&["fetch", "summarize"])
//!     .build()?;
//!
//! let result = engine.run(serde_json::json!("https://example.com")).await;
//! assert!(result.success);
//! println!("{}", result.final_output);
//! ```
//!
//! ### Run with Observation, Caching, and a Parallelism Cap
//!
//! ```rust,ignore
//! use agentic_pipeline::{ResultCache, TracingEventHandler};
//!
//! let engine = builder.build()?
//!     .with_event_handler(Arc::new(TracingEventHandler::new()))
//!     .with_cache(Arc::new(ResultCache::with_policy(300.0, 256)))
//!     .with_max_parallelism(8);
//! let result = engine.run(inputs).await;
//! ```
//!
//! ### Caller-Driven Cancellation
//!
//! ```rust,ignore
//! use tokio_util::sync::CancellationToken;
//!
//! let token = CancellationToken::new();
//! let run = engine.run_cancellable(context, token.clone());
//! token.cancel();
//! assert!(run.await.unwrap_err().is_cancellation());
//! ```
//!
//! ## Ordering Guarantees
//!
//! - A node's step is never entered before all its predecessors are
//!   terminal
//! - A node's result is written to the context, and its completion event
//!   delivered, before any dependent node is dispatched
//! - Within a wave, independent nodes are unordered; dispatch scans in
//!   declaration order, which makes test runs deterministic
//! - Per-node callbacks are serialized with that node's own transitions;
//!   callbacks for different nodes may interleave
//!
//! ## Cancellation
//!
//! The context's cancellation token is the run token. A `FailPipeline`
//! failure cancels it and aborts every in-flight task; caller-driven
//! cancellation (see [`PipelineEngine::run_cancellable`]) does the same
//! but surfaces as an error instead of a result. Steps observe the token
//! at I/O suspension points, and dropped futures make every `.await` a
//! cancellation point regardless.
//!
//! ## Thread Safety
//!
//! The engine is immutable during a run and may be shared and reused:
//!
//! - **Shared Graph**: the graph is held behind an `Arc` and read-only
//! - **Per-Run State**: each run owns its context, state map, and trace
//! - **Shared Infrastructure**: the cache and tracker are concurrency-safe
//!   process-wide collaborators

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use agentic_pipeline_domain::{
    Dag, DagNode, ExecutionTraceEntry, FailureStrategy, Fingerprint, NodeResult, NodeStatus, PipelineContext,
    PipelineError, PipelineEventHandler, PipelineResult, StepInputs, UsageSummary,
};

use crate::infrastructure::cache::result_cache::ResultCache;
use crate::infrastructure::metrics::usage_tracker::{default_usage_tracker, UsageTracker};

/// Scheduler that runs a validated graph to completion.
///
/// The engine holds the graph immutably and may be reused for any number
/// of runs; each run owns its own context and result.
pub struct PipelineEngine {
    dag: Arc<Dag>,
    handlers: Vec<Arc<dyn PipelineEventHandler>>,
    tracker: Arc<UsageTracker>,
    cache: Option<Arc<ResultCache>>,
    max_parallelism: Option<usize>,
}

impl PipelineEngine {
    /// Creates an engine around a validated graph
    pub fn new(dag: Dag) -> Self {
        Self {
            dag: Arc::new(dag),
            handlers: Vec::new(),
            tracker: default_usage_tracker(),
            cache: None,
            max_parallelism: None,
        }
    }

    /// Registers a lifecycle observer; several may be attached
    pub fn with_event_handler(mut self, handler: Arc<dyn PipelineEventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Uses a specific usage tracker instead of the process-wide default
    pub fn with_usage_tracker(mut self, tracker: Arc<UsageTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    /// Caches node outputs under (step identity, canonical inputs)
    /// fingerprints with single-flight protection
    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Caps how many nodes may run concurrently
    pub fn with_max_parallelism(mut self, max_parallelism: usize) -> Self {
        self.max_parallelism = Some(max_parallelism.max(1));
        self
    }

    /// The graph this engine runs
    pub fn dag(&self) -> &Dag {
        &self.dag
    }

    /// Runs the pipeline with the given input in a fresh context
    pub async fn run(&self, inputs: Value) -> PipelineResult {
        self.run_with_context(PipelineContext::new(inputs)).await
    }

    /// Runs the pipeline with a caller-supplied context
    pub async fn run_with_context(&self, context: PipelineContext) -> PipelineResult {
        match self.run_internal(context, None).await {
            Ok(result) => result,
            // Unreachable without an external token; kept total instead of
            // panicking in library code.
            Err(error) => {
                let mut result = PipelineResult::new(self.dag.name());
                result.success = false;
                result.final_output = Value::Null;
                tracing::error!(error = %error, "pipeline run failed without producing a result");
                result
            }
        }
    }

    /// Runs the pipeline under a caller-held cancellation token.
    ///
    /// Cancelling the token aborts every in-flight node and returns
    /// `PipelineError::Cancelled` instead of a result. This is the only
    /// entry point that does not return a `PipelineResult`.
    pub async fn run_cancellable(
        &self,
        context: PipelineContext,
        cancel: CancellationToken,
    ) -> Result<PipelineResult, PipelineError> {
        self.run_internal(context, Some(cancel)).await
    }

    async fn run_internal(
        &self,
        context: PipelineContext,
        external: Option<CancellationToken>,
    ) -> Result<PipelineResult, PipelineError> {
        let pipeline_name = self.dag.name().to_string();
        let context = Arc::new(context);
        let run_token = context.cancellation().clone();
        let started = Instant::now();

        let mut states: HashMap<String, NodeState> = self
            .dag
            .node_ids()
            .iter()
            .map(|id| (id.clone(), NodeState::Pending))
            .collect();
        let mut forced_skips: HashMap<String, String> = HashMap::new();
        let mut trace: Vec<ExecutionTraceEntry> = Vec::new();
        let mut running: JoinSet<TaskOutcome> = JoinSet::new();
        let mut task_nodes: HashMap<tokio::task::Id, String> = HashMap::new();
        let mut aborted = false;

        tracing::debug!(pipeline = %pipeline_name, nodes = self.dag.len(), "pipeline run starting");

        'wave: loop {
            // Dispatch pass: release every ready node. Skips finalize
            // synchronously and may release further nodes, so scan until a
            // full pass makes no progress.
            loop {
                let mut progressed = false;
                for node_id in self.dag.node_ids() {
                    if states.get(node_id) != Some(&NodeState::Pending) {
                        continue;
                    }
                    let predecessors = self.dag.predecessors(node_id);
                    let ready = predecessors
                        .iter()
                        .all(|pred| states.get(pred).is_some_and(NodeState::is_terminal));
                    if !ready {
                        continue;
                    }

                    let node = match self.dag.node(node_id) {
                        Some(node) => node,
                        None => continue,
                    };

                    if let Some(reason) = self.skip_reason(node, node_id, predecessors, &states, &forced_skips, &context)
                    {
                        states.insert(node_id.clone(), NodeState::Skipped);
                        self.finalize_skip(&context, &pipeline_name, node_id, &reason, &mut trace).await;
                        progressed = true;
                        continue;
                    }

                    if let Some(cap) = self.max_parallelism {
                        if task_nodes.len() >= cap {
                            continue;
                        }
                    }

                    states.insert(node_id.clone(), NodeState::Running);
                    let handle = running.spawn(execute_node(
                        Arc::clone(&self.dag),
                        node_id.clone(),
                        Arc::clone(&context),
                        self.handlers.clone(),
                        self.cache.clone(),
                        run_token.clone(),
                        pipeline_name.clone(),
                    ));
                    task_nodes.insert(handle.id(), node_id.clone());
                    tracing::debug!(pipeline = %pipeline_name, node = %node_id, "node dispatched");
                    progressed = true;
                }
                if !progressed {
                    break;
                }
            }

            if task_nodes.is_empty() {
                break 'wave;
            }

            // Await the next completion (any-of), or the caller's cancel.
            // The cancel arm only signals; the task set is torn down after
            // the select so its join future is no longer borrowed.
            let polled = match &external {
                Some(token) => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => None,
                        joined = running.join_next_with_id() => Some(joined),
                    }
                }
                None => Some(running.join_next_with_id().await),
            };

            let Some(joined) = polled else {
                run_token.cancel();
                running.abort_all();
                while running.join_next().await.is_some() {}
                tracing::warn!(pipeline = %pipeline_name, "run cancelled by caller");
                return Err(PipelineError::Cancelled(format!(
                    "pipeline '{}' cancelled by caller",
                    pipeline_name
                )));
            };

            let Some(join_result) = joined else {
                continue;
            };
            let outcome = match join_result {
                Ok((task_id, outcome)) => {
                    task_nodes.remove(&task_id);
                    outcome
                }
                Err(join_error) => {
                    let node_id = task_nodes.remove(&join_error.id()).unwrap_or_default();
                    let message = if join_error.is_cancelled() {
                        PipelineError::Cancelled(format!("node '{}' aborted", node_id)).to_string()
                    } else {
                        PipelineError::Step(format!("node '{}' panicked", node_id)).to_string()
                    };
                    TaskOutcome {
                        node_id,
                        disposition: Disposition::Failed(message),
                        retries: 0,
                        latency_ms: 0.0,
                        started_at: Utc::now(),
                    }
                }
            };

            let node_id = outcome.node_id.clone();
            let completed_at = Utc::now();
            let usage = self.node_usage(&context, &node_id);

            match outcome.disposition {
                Disposition::Completed(value) => {
                    states.insert(node_id.clone(), NodeState::Completed);
                    let result = NodeResult::completed(&node_id, value)
                        .with_latency(outcome.latency_ms)
                        .with_retries(outcome.retries)
                        .with_usage(usage);
                    context.set_node_result(&node_id, result);
                    trace.push(ExecutionTraceEntry {
                        node_id: node_id.clone(),
                        started_at: outcome.started_at,
                        completed_at,
                        status: NodeStatus::Success,
                    });
                    notify_node_complete(&self.handlers, &node_id, &pipeline_name, outcome.latency_ms).await;
                    tracing::debug!(node = %node_id, latency_ms = outcome.latency_ms, "node completed");
                }
                Disposition::Failed(error) => {
                    states.insert(node_id.clone(), NodeState::Failed);
                    let result = NodeResult::failed(&node_id, &error)
                        .with_latency(outcome.latency_ms)
                        .with_retries(outcome.retries)
                        .with_usage(usage);
                    context.set_node_result(&node_id, result);
                    trace.push(ExecutionTraceEntry {
                        node_id: node_id.clone(),
                        started_at: outcome.started_at,
                        completed_at,
                        status: NodeStatus::Failed,
                    });
                    notify_node_error(&self.handlers, &node_id, &pipeline_name, &error).await;

                    let strategy = self
                        .dag
                        .node(&node_id)
                        .map(DagNode::failure_strategy)
                        .unwrap_or_default();
                    match strategy {
                        FailureStrategy::SkipDownstream => {
                            for descendant in self.dag.descendants(&node_id) {
                                forced_skips
                                    .entry(descendant)
                                    .or_insert_with(|| format!("upstream node '{}' failed", node_id));
                            }
                            tracing::warn!(node = %node_id, error = %error, "node failed, skipping downstream");
                        }
                        FailureStrategy::Continue => {
                            tracing::warn!(node = %node_id, error = %error, "node failed, continuing");
                        }
                        FailureStrategy::FailPipeline => {
                            let abort = PipelineError::Aborted(format!("node '{}' failed: {}", node_id, error));
                            tracing::error!(node = %node_id, error = %error, "node failed, aborting pipeline");
                            aborted = true;
                            run_token.cancel();
                            running.abort_all();
                            // Drain: tasks that slipped to completion before
                            // the abort keep their real outcome; the rest
                            // report as cancelled.
                            while let Some(drained) = running.join_next_with_id().await {
                                match drained {
                                    Ok((task_id, drained_outcome)) => {
                                        task_nodes.remove(&task_id);
                                        self.record_drained(&context, &pipeline_name, drained_outcome, &mut states, &mut trace)
                                            .await;
                                    }
                                    Err(join_error) => {
                                        let cancelled_id =
                                            task_nodes.remove(&join_error.id()).unwrap_or_default();
                                        states.insert(cancelled_id.clone(), NodeState::Failed);
                                        let message = PipelineError::Cancelled(format!(
                                            "node '{}' cancelled: {}",
                                            cancelled_id, abort
                                        ))
                                        .to_string();
                                        context.set_node_result(
                                            &cancelled_id,
                                            NodeResult::failed(&cancelled_id, &message),
                                        );
                                        trace.push(ExecutionTraceEntry {
                                            node_id: cancelled_id.clone(),
                                            started_at: completed_at,
                                            completed_at: Utc::now(),
                                            status: NodeStatus::Failed,
                                        });
                                        notify_node_error(&self.handlers, &cancelled_id, &pipeline_name, &message)
                                            .await;
                                    }
                                }
                            }
                            break 'wave;
                        }
                    }
                }
            }
        }

        // Abort leaves never-dispatched nodes pending; they are skipped so
        // every declared node ends the run in exactly one terminal state.
        let pending: Vec<String> = states
            .iter()
            .filter(|(_, state)| !state.is_terminal())
            .map(|(id, _)| id.clone())
            .collect();
        for node_id in pending {
            states.insert(node_id.clone(), NodeState::Skipped);
            let reason = if aborted {
                "pipeline aborted".to_string()
            } else {
                "node was never released".to_string()
            };
            self.finalize_skip(&context, &pipeline_name, &node_id, &reason, &mut trace).await;
        }

        let result = self
            .finalize(&context, &pipeline_name, trace, started.elapsed().as_secs_f64() * 1000.0)
            .await;
        Ok(result)
    }

    /// Decides whether a ready node must be skipped, and why.
    fn skip_reason(
        &self,
        node: &DagNode,
        node_id: &str,
        predecessors: &[String],
        states: &HashMap<String, NodeState>,
        forced_skips: &HashMap<String, String>,
        context: &PipelineContext,
    ) -> Option<String> {
        if let Some(reason) = forced_skips.get(node_id) {
            return Some(reason.clone());
        }
        if !predecessors.is_empty() {
            let all_skip_propagating = predecessors.iter().all(|pred| {
                match states.get(pred) {
                    Some(NodeState::Skipped) => true,
                    Some(NodeState::Failed) => self
                        .dag
                        .node(pred)
                        .is_some_and(|p| p.failure_strategy() == FailureStrategy::SkipDownstream),
                    _ => false,
                }
            });
            if all_skip_propagating {
                return Some("all upstream nodes were skipped".to_string());
            }
        }
        if let Some(condition) = node.condition() {
            if !condition(context) {
                return Some("condition evaluated to false".to_string());
            }
        }
        None
    }

    async fn finalize_skip(
        &self,
        context: &PipelineContext,
        pipeline_name: &str,
        node_id: &str,
        reason: &str,
        trace: &mut Vec<ExecutionTraceEntry>,
    ) {
        let now = Utc::now();
        context.set_node_result(node_id, NodeResult::skipped(node_id));
        trace.push(ExecutionTraceEntry {
            node_id: node_id.to_string(),
            started_at: now,
            completed_at: now,
            status: NodeStatus::Skipped,
        });
        notify_node_skip(&self.handlers, node_id, pipeline_name, reason).await;
        tracing::debug!(node = %node_id, reason = %reason, "node skipped");
    }

    /// Records a task that finished while the abort drain was underway.
    async fn record_drained(
        &self,
        context: &PipelineContext,
        pipeline_name: &str,
        outcome: TaskOutcome,
        states: &mut HashMap<String, NodeState>,
        trace: &mut Vec<ExecutionTraceEntry>,
    ) {
        let node_id = outcome.node_id.clone();
        let completed_at = Utc::now();
        let usage = self.node_usage(context, &node_id);
        match outcome.disposition {
            Disposition::Completed(value) => {
                states.insert(node_id.clone(), NodeState::Completed);
                context.set_node_result(
                    &node_id,
                    NodeResult::completed(&node_id, value)
                        .with_latency(outcome.latency_ms)
                        .with_retries(outcome.retries)
                        .with_usage(usage),
                );
                trace.push(ExecutionTraceEntry {
                    node_id: node_id.clone(),
                    started_at: outcome.started_at,
                    completed_at,
                    status: NodeStatus::Success,
                });
                notify_node_complete(&self.handlers, &node_id, pipeline_name, outcome.latency_ms).await;
            }
            Disposition::Failed(error) => {
                states.insert(node_id.clone(), NodeState::Failed);
                context.set_node_result(
                    &node_id,
                    NodeResult::failed(&node_id, &error)
                        .with_latency(outcome.latency_ms)
                        .with_retries(outcome.retries)
                        .with_usage(usage),
                );
                trace.push(ExecutionTraceEntry {
                    node_id: node_id.clone(),
                    started_at: outcome.started_at,
                    completed_at,
                    status: NodeStatus::Failed,
                });
                notify_node_error(&self.handlers, &node_id, pipeline_name, &error).await;
            }
        }
    }

    /// Usage rollup attributed to one node, when its step recorded any.
    fn node_usage(&self, context: &PipelineContext, node_id: &str) -> Option<UsageSummary> {
        let identity = self.dag.node(node_id)?.step().identity().to_string();
        let summary = self
            .tracker
            .get_summary_for_correlation_and_agent(context.correlation_id(), &identity);
        (!summary.is_empty()).then_some(summary)
    }

    async fn finalize(
        &self,
        context: &PipelineContext,
        pipeline_name: &str,
        trace: Vec<ExecutionTraceEntry>,
        total_duration_ms: f64,
    ) -> PipelineResult {
        let outputs = context.results();
        let success = outputs.values().all(|result| result.success || result.skipped);

        // Terminal nodes: non-skipped nodes with no non-skipped successors.
        let non_skipped: Vec<&String> = self
            .dag
            .node_ids()
            .iter()
            .filter(|id| outputs.get(*id).is_some_and(|r| !r.skipped))
            .collect();
        let terminal_outputs: Vec<Value> = non_skipped
            .iter()
            .filter(|id| {
                self.dag
                    .successors(id)
                    .iter()
                    .all(|succ| outputs.get(succ).map_or(true, |r| r.skipped))
            })
            .filter_map(|id| outputs.get(*id).map(|r| r.output.clone()))
            .collect();
        let final_output = match terminal_outputs.len() {
            0 => Value::Null,
            1 => terminal_outputs.into_iter().next().unwrap_or(Value::Null),
            _ => Value::Array(terminal_outputs),
        };

        let summary = self.tracker.get_summary_for_correlation(context.correlation_id());
        let usage = (!summary.is_empty()).then_some(summary);

        notify_pipeline_complete(&self.handlers, pipeline_name, success, total_duration_ms).await;
        tracing::info!(
            pipeline = %pipeline_name,
            success,
            duration_ms = total_duration_ms,
            nodes = outputs.len(),
            "pipeline run finished"
        );

        PipelineResult {
            pipeline_name: pipeline_name.to_string(),
            outputs,
            final_output,
            execution_trace: trace,
            total_duration_ms,
            success,
            usage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl NodeState {
    fn is_terminal(&self) -> bool {
        matches!(self, NodeState::Completed | NodeState::Failed | NodeState::Skipped)
    }
}

enum Disposition {
    Completed(Value),
    Failed(String),
}

struct TaskOutcome {
    node_id: String,
    disposition: Disposition,
    retries: u32,
    latency_ms: f64,
    started_at: DateTime<Utc>,
}

/// Per-node lifecycle, run inside a spawned task: start event, input
/// gathering, then the retry loop under the node's timeout and the run's
/// cancellation token.
async fn execute_node(
    dag: Arc<Dag>,
    node_id: String,
    context: Arc<PipelineContext>,
    handlers: Vec<Arc<dyn PipelineEventHandler>>,
    cache: Option<Arc<ResultCache>>,
    cancel: CancellationToken,
    pipeline_name: String,
) -> TaskOutcome {
    let started_at = Utc::now();
    let started = Instant::now();

    let Some(node) = dag.node(&node_id) else {
        return TaskOutcome {
            node_id: node_id.clone(),
            disposition: Disposition::Failed(format!("node '{}' is not declared in the graph", node_id)),
            retries: 0,
            latency_ms: 0.0,
            started_at,
        };
    };

    notify_node_start(&handlers, &node_id, &pipeline_name).await;
    let inputs = gather_inputs(&dag, &node_id, &context);

    let attempts = AtomicU32::new(0);
    let execution = match &cache {
        Some(cache) => {
            let payload = serde_json::to_value(&inputs).unwrap_or(Value::Null);
            let fingerprint = Fingerprint::compute(node.step().identity(), &payload);
            cache
                .get_or_compute(&fingerprint, || {
                    run_with_retries(node, &context, &inputs, &cancel, &node_id, &attempts)
                })
                .await
        }
        None => run_with_retries(node, &context, &inputs, &cancel, &node_id, &attempts).await,
    };

    let retries = attempts.load(Ordering::SeqCst).saturating_sub(1);
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
    match execution {
        Ok(value) => TaskOutcome {
            node_id,
            disposition: Disposition::Completed(value),
            retries,
            latency_ms,
            started_at,
        },
        Err(error) => TaskOutcome {
            node_id,
            disposition: Disposition::Failed(error.to_string()),
            retries,
            latency_ms,
            started_at,
        },
    }
}

/// The retry loop: attempts run until success, a cancellation, or an
/// exhausted budget. Timeouts count like any other failed attempt.
async fn run_with_retries(
    node: &DagNode,
    context: &PipelineContext,
    inputs: &StepInputs,
    cancel: &CancellationToken,
    node_id: &str,
    attempts: &AtomicU32,
) -> Result<Value, PipelineError> {
    let retry_budget = node.retry_max();
    loop {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        match run_attempt(node, context, inputs, cancel, node_id).await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_cancellation() => return Err(error),
            Err(error) => {
                if attempt <= retry_budget {
                    tracing::warn!(
                        node = %node_id,
                        attempt,
                        retry_budget,
                        error = %error,
                        "attempt failed, retrying"
                    );
                    continue;
                }
                return Err(error);
            }
        }
    }
}

/// One attempt: the step future raced against the run's cancellation
/// token, under the node's timeout when one is set.
async fn run_attempt(
    node: &DagNode,
    context: &PipelineContext,
    inputs: &StepInputs,
    cancel: &CancellationToken,
    node_id: &str,
) -> Result<Value, PipelineError> {
    let execution = node.step().execute(context, inputs);
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled(format!("node '{}' cancelled", node_id))),
        result = async {
            match node.timeout() {
                Some(budget) => match tokio::time::timeout(budget, execution).await {
                    Ok(result) => result,
                    Err(_) => Err(PipelineError::StepTimeout(format!(
                        "node '{}' exceeded its {:.3}s budget",
                        node_id,
                        budget.as_secs_f64()
                    ))),
                },
                None => execution.await,
            }
        } => result,
    }
}

/// Assembles a node's inputs from its incoming edges; sources receive the
/// original pipeline input under the default key. Edges drawing from
/// skipped or failed upstream nodes deliver null.
fn gather_inputs(dag: &Dag, node_id: &str, context: &PipelineContext) -> StepInputs {
    let edges = dag.incoming_edges(node_id);
    let mut inputs = StepInputs::new();
    if edges.is_empty() {
        inputs.insert(
            agentic_pipeline_domain::entities::dag_node::DEFAULT_INPUT_KEY.to_string(),
            context.inputs().clone(),
        );
        return inputs;
    }
    for edge in edges {
        let value = context
            .get_node_output(edge.source(), edge.output_key())
            .unwrap_or(Value::Null);
        inputs.insert(edge.input_key().to_string(), value);
    }
    inputs
}

async fn notify_node_start(handlers: &[Arc<dyn PipelineEventHandler>], node_id: &str, pipeline_name: &str) {
    for handler in handlers {
        if let Err(error) = handler.on_node_start(node_id, pipeline_name).await {
            tracing::warn!(node = %node_id, error = %error, "event handler failed on node start");
        }
    }
}

async fn notify_node_complete(
    handlers: &[Arc<dyn PipelineEventHandler>],
    node_id: &str,
    pipeline_name: &str,
    latency_ms: f64,
) {
    for handler in handlers {
        if let Err(error) = handler.on_node_complete(node_id, pipeline_name, latency_ms).await {
            tracing::warn!(node = %node_id, error = %error, "event handler failed on node complete");
        }
    }
}

async fn notify_node_error(
    handlers: &[Arc<dyn PipelineEventHandler>],
    node_id: &str,
    pipeline_name: &str,
    error_message: &str,
) {
    for handler in handlers {
        if let Err(error) = handler.on_node_error(node_id, pipeline_name, error_message).await {
            tracing::warn!(node = %node_id, error = %error, "event handler failed on node error");
        }
    }
}

async fn notify_node_skip(
    handlers: &[Arc<dyn PipelineEventHandler>],
    node_id: &str,
    pipeline_name: &str,
    reason: &str,
) {
    for handler in handlers {
        if let Err(error) = handler.on_node_skip(node_id, pipeline_name, reason).await {
            tracing::warn!(node = %node_id, error = %error, "event handler failed on node skip");
        }
    }
}

async fn notify_pipeline_complete(
    handlers: &[Arc<dyn PipelineEventHandler>],
    pipeline_name: &str,
    success: bool,
    duration_ms: f64,
) {
    for handler in handlers {
        if let Err(error) = handler.on_pipeline_complete(pipeline_name, success, duration_ms).await {
            tracing::warn!(pipeline = %pipeline_name, error = %error, "event handler failed on pipeline complete");
        }
    }
}
