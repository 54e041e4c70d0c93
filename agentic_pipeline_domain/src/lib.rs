// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Agentic Pipeline Domain
//!
//! Pure domain layer for the agentic pipeline execution core. This crate
//! contains the business objects and collaborator contracts for composing
//! heterogeneous computational stages (LLM calls, tool invocations,
//! reasoning loops, branches, fan-out/fan-in) into deterministic,
//! observable, resilient workflows.
//!
//! ## Architecture Overview
//!
//! The crate follows Domain-Driven Design layering:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Entities                                │
//! │  (Dag, DagNode, PipelineContext, NodeResult, Usage)         │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   Value Objects                             │
//! │  (CorrelationId, Fingerprint)                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 Service Interfaces                          │
//! │  (StepExecutor, EventHandler, Agent, Memory, Reasoning)     │
//! ├─────────────────────────────────────────────────────────────┤
//! │                      Events                                 │
//! │  (PipelineEvent)                                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Concepts
//!
//! ### Graph
//! A pipeline is an immutable directed acyclic graph. Each node carries a
//! step (its behavior) and a policy: an optional condition gate, a retry
//! budget, a timeout, and a failure strategy governing what a terminal
//! failure does to the rest of the run.
//!
//! ### Context
//! Every run owns one [`PipelineContext`]: the original input, a
//! correlation id that flows to usage records and events, caller metadata,
//! an optional shared memory handle, and the per-node results written as
//! nodes complete.
//!
//! ### Results
//! A run always yields a [`PipelineResult`] mapping every declared node to
//! exactly one terminal outcome (completed, failed, or skipped), plus the
//! terminal output, the chronological trace, and the usage rollup for the
//! run's correlation id.
//!
//! ## Dependency Policy
//!
//! The domain stays dependency-light: serde for the wire model, thiserror
//! for the error type, sha2/hex for fingerprints, uuid for ids, and
//! async-trait for the I/O-bound ports. The tokio runtime, locks, and
//! tracing belong to the engine crate.

pub mod entities;
pub mod error;
pub mod events;
pub mod services;
pub mod value_objects;

// Re-export core types for convenient access
pub use entities::{
    Dag, DagEdge, DagNode, ExecutionTraceEntry, FailureStrategy, NodeCondition, NodeResult, NodeStatus,
    PipelineContext, PipelineResult, ReasoningOutcome, ReasoningTrace, TraceStep, UsageRecord, UsageSummary,
};
pub use error::PipelineError;
pub use events::PipelineEvent;
pub use services::{
    primary_input, Agent, AgentRequest, AgentResponse, CostCalculator, MemoryService, PipelineEventHandler,
    ReasoningPattern, StepExecutor, StepInputs,
};
pub use value_objects::{CorrelationId, Fingerprint};
