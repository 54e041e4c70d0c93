// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Reasoning Trace Entities
//!
//! Structured trace model for iterative reasoning loops. Every reasoning
//! pattern emits ordered [`TraceStep`] records into a [`ReasoningTrace`],
//! making the loop inspectable for observability and debugging. The trace
//! rides along on the pattern's [`ReasoningOutcome`] and surfaces in the
//! owning node's output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One step taken by a reasoning loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceStep {
    /// Internal reasoning or analysis produced by the model
    Thought { content: String },
    /// A tool invocation selected by the loop
    Action { tool_name: String, tool_args: Value },
    /// Result of a tool invocation or external input
    Observation { content: String, source: String },
    /// Self-critique produced during reflective reasoning
    Reflection { critique: String, should_retry: bool },
    /// A planned sub-task within a larger decomposition
    Plan { description: String, sub_steps: Vec<String> },
}

/// Ordered collection of steps produced by one pattern execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningTrace {
    /// Name of the pattern that produced the trace
    pub pattern_name: String,
    /// Steps in the order they were taken
    pub steps: Vec<TraceStep>,
    /// When the loop started
    pub started_at: DateTime<Utc>,
    /// When the loop finished, once complete
    pub completed_at: Option<DateTime<Utc>>,
}

impl ReasoningTrace {
    /// Creates an empty trace for the named pattern
    pub fn new(pattern_name: impl Into<String>) -> Self {
        Self {
            pattern_name: pattern_name.into(),
            steps: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Appends a step to the trace
    pub fn add_step(&mut self, step: TraceStep) {
        self.steps.push(step);
    }

    /// Marks the trace as completed at the current time
    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    /// Number of steps taken so far
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true when no steps were recorded
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Final outcome of a reasoning pattern execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningOutcome {
    /// The loop's final output value
    pub output: Value,
    /// The full trace of the loop
    pub trace: ReasoningTrace,
    /// Number of steps the loop took
    pub steps_taken: usize,
    /// Whether the loop reached a final answer
    pub success: bool,
}

impl ReasoningOutcome {
    /// Creates a successful outcome, completing the trace
    pub fn success(output: Value, mut trace: ReasoningTrace) -> Self {
        trace.complete();
        let steps_taken = trace.len();
        Self {
            output,
            trace,
            steps_taken,
            success: true,
        }
    }
}
