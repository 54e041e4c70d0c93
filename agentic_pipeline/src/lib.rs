// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Agentic Pipeline
//!
//! A DAG execution engine for agentic workflows built with Rust. The crate
//! composes heterogeneous computational stages (LLM calls, tool
//! invocations, reasoning loops, branches, fan-out/fan-in) into
//! deterministic, observable, resilient pipelines where independent stages
//! execute concurrently.
//!
//! ## Architecture Overview
//!
//! The crate follows the workspace's Clean Architecture layering:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Application Layer                          │
//! │  (PipelineEngine scheduler, PipelineBuilder)                │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Domain Layer                             │
//! │  (agentic-pipeline-domain: entities, ports, errors)         │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Infrastructure Layer                         │
//! │  (Steps, ResultCache, UsageTracker, Cost, Event Logging)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Concepts
//!
//! ### Scheduling
//! The engine releases nodes as their dependencies reach terminal states
//! and runs every ready node concurrently. Per-node policy covers
//! condition gates, retry budgets, timeouts, and failure strategies
//! (skip-downstream, fail-pipeline, continue).
//!
//! ### Observation
//! Observers implementing the event-handler port receive node and
//! pipeline lifecycle notifications; failures inside an observer are
//! contained and logged. A tracing-backed handler ships in the box.
//!
//! ### Caching
//! A fingerprint-keyed result cache with TTL and LRU bounds deduplicates
//! identical work; single-flight semantics guarantee at most one
//! concurrent build per fingerprint.
//!
//! ### Accounting
//! Every agent invocation records token usage priced by a cost
//! calculator; rollups are available per agent, per run, and globally,
//! with cumulative cost surviving retention eviction.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use agentic_pipeline::{PipelineBuilder, CallableStep};
//! use std::sync::Arc;
//!
//! let engine = PipelineBuilder::new("greeting")
//!     .add_step("hello", Arc::new(CallableStep::from_sync("hello", |_ctx, inputs| {
//!         Ok(serde_json::json!(format!("hello {}", agentic_pipeline::primary_input(inputs))))
//!     })))
//!     .build()?;
//! let result = engine.run(serde_json::json!("world")).await;
//! assert!(result.success);
//! ```
//!
//! ## Testing
//!
//! Unit tests live beside each module; integration tests under `tests/`
//! cover the end-to-end scheduler scenarios, cache single-flight
//! semantics, usage rollups, and cancellation.

pub mod application;
pub mod infrastructure;

// Tests are organized as:
// - Unit tests: #[cfg(test)] modules within each source file
// - Integration tests: separate files in tests/ directory

// Re-export domain types for convenient access
pub use agentic_pipeline_domain::{
    primary_input, Agent, AgentRequest, AgentResponse, CorrelationId, CostCalculator, Dag, DagEdge, DagNode,
    ExecutionTraceEntry, FailureStrategy, Fingerprint, MemoryService, NodeResult, NodeStatus, PipelineContext,
    PipelineError, PipelineEvent, PipelineEventHandler, PipelineResult, ReasoningOutcome, ReasoningPattern,
    ReasoningTrace, StepExecutor, StepInputs, TraceStep, UsageRecord, UsageSummary,
};

// Re-export the engine surface
pub use application::services::{PipelineBuilder, PipelineEngine};
pub use infrastructure::cache::{CacheStats, ResultCache};
pub use infrastructure::logging::TracingEventHandler;
pub use infrastructure::metrics::{default_usage_tracker, StaticPriceCostCalculator, UsageTracker};
pub use infrastructure::runtime::{
    AgentStep, BranchStep, CallableStep, ChainOfThought, FallbackChain, FanInStep, FanOutStep, ReasoningStep,
};
