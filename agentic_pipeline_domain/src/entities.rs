// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Entities
//!
//! This module contains the entities of the pipeline execution domain:
//! objects with identity and lifecycle that the engine operates on.
//!
//! ## Overview
//!
//! The entities module provides:
//!
//! - **Graph**: [`Dag`], [`DagNode`], and [`DagEdge`] describe the
//!   workflow and its per-node policy; invariants are enforced at
//!   construction
//! - **Run State**: [`PipelineContext`] is the per-run blackboard
//!   carrying inputs, the correlation id, metadata, the memory handle,
//!   and collected results
//! - **Outcomes**: [`NodeResult`], [`ExecutionTraceEntry`], and
//!   [`PipelineResult`] model per-node and aggregate results, all
//!   JSON-serializable for external observers
//! - **Accounting**: [`UsageRecord`] and [`UsageSummary`] account for
//!   model usage; [`ReasoningTrace`] records iterative reasoning loops
//!
//! ## Entity Lifecycle
//!
//! ### Construction
//!
//! Graphs are built through validating operations and are immutable once
//! an engine holds them. Contexts are built per run and owned by exactly
//! one run.
//!
//! ### Execution
//!
//! The engine writes each node's result into the context exactly once;
//! downstream steps and observers read fully initialized results.
//!
//! ### Completion
//!
//! Every declared node ends a run in exactly one terminal state
//! (completed, failed, or skipped), recorded on the aggregate result.
//!
//! ## Design Notes
//!
//! Entities stay technology-agnostic: scheduling, caching, and tracking
//! live in the engine crate. The only synchronization an entity carries
//! is the context's guarded results map, which the execution model
//! requires.

pub mod dag;
pub mod dag_node;
pub mod node_result;
pub mod pipeline_context;
pub mod reasoning_trace;
pub mod usage;

pub use dag::Dag;
pub use dag_node::{DagEdge, DagNode, FailureStrategy, NodeCondition};
pub use node_result::{ExecutionTraceEntry, NodeResult, NodeStatus, PipelineResult};
pub use pipeline_context::PipelineContext;
pub use reasoning_trace::{ReasoningOutcome, ReasoningTrace, TraceStep};
pub use usage::{UsageRecord, UsageSummary};
