// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Usage Accounting Entities
//!
//! This module contains the entities that account for model usage during
//! pipeline execution: a single observation ([`UsageRecord`]) and the
//! aggregate over a set of observations ([`UsageSummary`]).
//!
//! ## Overview
//!
//! Every model invocation produces one record carrying token counts, the
//! estimated cost, latency, and the correlation id of the run that caused
//! it. Summaries roll records up for reporting:
//!
//! - **Per-run**: all records with a given correlation id
//! - **Per-agent**: all records produced by one agent
//! - **Global**: everything currently retained by the tracker
//!
//! Records are immutable once created. Aggregation is performed by
//! [`UsageSummary::absorb`], which accumulates one record at a time so the
//! tracker can fold over its ring without intermediate allocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CorrelationId;

/// A single model usage observation.
///
/// One record is produced per model invocation. The correlation id ties the
/// record to the pipeline run that caused it; the agent name ties it to the
/// step that issued the call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Name of the agent that issued the call
    pub agent: String,
    /// Model identifier, e.g. `openai:gpt-4o`
    pub model: String,
    /// Prompt-side token count
    pub input_tokens: u64,
    /// Completion-side token count
    pub output_tokens: u64,
    /// Total tokens (prompt + completion)
    pub total_tokens: u64,
    /// Estimated cost in USD
    pub cost_usd: f64,
    /// Wall-clock latency of the invocation in milliseconds
    pub latency_ms: f64,
    /// Correlation id of the owning pipeline run
    pub correlation_id: CorrelationId,
    /// When the observation was recorded
    pub timestamp: DateTime<Utc>,
}

impl UsageRecord {
    /// Creates a record with the given attribution and zeroed measurements
    pub fn new(agent: impl Into<String>, model: impl Into<String>, correlation_id: CorrelationId) -> Self {
        Self {
            agent: agent.into(),
            model: model.into(),
            input_tokens: 0,
            output_tokens: 0,
            total_tokens: 0,
            cost_usd: 0.0,
            latency_ms: 0.0,
            correlation_id,
            timestamp: Utc::now(),
        }
    }

    /// Sets token counts, deriving the total
    pub fn with_tokens(mut self, input_tokens: u64, output_tokens: u64) -> Self {
        self.input_tokens = input_tokens;
        self.output_tokens = output_tokens;
        self.total_tokens = input_tokens + output_tokens;
        self
    }

    /// Sets the estimated cost
    pub fn with_cost(mut self, cost_usd: f64) -> Self {
        self.cost_usd = cost_usd;
        self
    }

    /// Sets the invocation latency
    pub fn with_latency(mut self, latency_ms: f64) -> Self {
        self.latency_ms = latency_ms;
        self
    }
}

/// Aggregate over a set of usage records.
///
/// All fields are plain sums; `record_count` distinguishes "no records"
/// (empty summary) from "records that all happened to be zero".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    /// Number of records aggregated
    pub record_count: u64,
    /// Sum of prompt-side tokens
    pub total_input_tokens: u64,
    /// Sum of completion-side tokens
    pub total_output_tokens: u64,
    /// Sum of total tokens
    pub total_tokens: u64,
    /// Sum of estimated costs in USD
    pub total_cost_usd: f64,
    /// Sum of invocation latencies in milliseconds
    pub total_latency_ms: f64,
}

impl UsageSummary {
    /// Creates an empty summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulates one record into the summary
    pub fn absorb(&mut self, record: &UsageRecord) {
        self.record_count += 1;
        self.total_input_tokens += record.input_tokens;
        self.total_output_tokens += record.output_tokens;
        self.total_tokens += record.total_tokens;
        self.total_cost_usd += record.cost_usd;
        self.total_latency_ms += record.latency_ms;
    }

    /// Rolls up an iterator of records into a fresh summary
    pub fn roll_up<'a>(records: impl IntoIterator<Item = &'a UsageRecord>) -> Self {
        let mut summary = Self::new();
        for record in records {
            summary.absorb(record);
        }
        summary
    }

    /// Returns true when no records have been aggregated
    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }
}
