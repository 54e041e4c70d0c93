// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Usage Tracker
//!
//! This module provides the bounded append-only ring of usage records
//! with aggregate rollups that accounts for every model invocation a
//! pipeline makes.
//!
//! ## Overview
//!
//! The usage tracker provides:
//!
//! - **Bounded Retention**: The most recent `max_records` observations,
//!   with first-in-first-out eviction
//! - **Cost Survival**: Every record's cost is credited to a cumulative
//!   counter at append time, so budget tracking survives eviction
//! - **Filtered Rollups**: Summaries over everything retained, per agent,
//!   per run, and per (run, agent) pair for node-level attribution
//! - **Reset**: Tests and budget windows can clear records and the
//!   cumulative counter together
//!
//! ## Rollups
//!
//! - [`UsageTracker::get_summary`] over everything retained
//! - [`UsageTracker::get_summary_for_agent`] filtered by agent name
//! - [`UsageTracker::get_summary_for_correlation`] filtered by run
//! - [`UsageTracker::get_summary_for_correlation_and_agent`] for one
//!   node's attribution
//!
//! ## Usage Examples
//!
//! ### Recording and Summarizing
//!
//! ```rust,ignore
//! let tracker = UsageTracker::with_max_records(1000);
//! tracker.record(
//!     UsageRecord::new("summarizer", "openai:gpt-4o-mini", correlation_id)
//!         .with_tokens(500, 150)
//!         .with_cost(0.001)
//!         .with_latency(320.0),
//! );
//! let summary = tracker.get_summary_for_agent("summarizer");
//! println!("{} tokens, ${:.4}", summary.total_tokens, summary.total_cost_usd);
//! ```
//!
//! ### Budget Tracking Across Eviction
//!
//! ```rust,ignore
//! // cumulative_cost_usd keeps counting even after records age out
//! assert!(tracker.cumulative_cost_usd() >= tracker.get_summary().total_cost_usd);
//! ```
//!
//! ## Process-Wide Default
//!
//! [`default_usage_tracker`] returns the shared tracker that agent steps
//! and engines use unless given a specific one. Tests reset it between
//! cases.
//!
//! ## Thread Safety
//!
//! All methods are safe under concurrent callers; the ring and the
//! cumulative counter sit behind one `parking_lot` mutex so a record and
//! its cost credit are applied atomically.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use agentic_pipeline_domain::{CorrelationId, UsageRecord, UsageSummary};

const DEFAULT_MAX_RECORDS: usize = 10_000;

struct TrackerState {
    records: VecDeque<UsageRecord>,
    cumulative_cost_usd: f64,
}

/// Concurrency-safe bounded ring of usage records.
pub struct UsageTracker {
    max_records: usize,
    state: Mutex<TrackerState>,
}

impl UsageTracker {
    /// Creates a tracker with the default retention bound
    pub fn new() -> Self {
        Self::with_max_records(DEFAULT_MAX_RECORDS)
    }

    /// Creates a tracker retaining at most `max_records` observations
    pub fn with_max_records(max_records: usize) -> Self {
        Self {
            max_records: max_records.max(1),
            state: Mutex::new(TrackerState {
                records: VecDeque::new(),
                cumulative_cost_usd: 0.0,
            }),
        }
    }

    /// Appends a record, evicting the oldest when over the bound.
    ///
    /// Every record's cost is credited to the cumulative counter at append
    /// time, so eviction never loses cost accounting.
    pub fn record(&self, record: UsageRecord) {
        let mut state = self.state.lock();
        state.cumulative_cost_usd += record.cost_usd;
        state.records.push_back(record);
        while state.records.len() > self.max_records {
            state.records.pop_front();
        }
    }

    /// Snapshot of the currently retained records, oldest first
    pub fn records(&self) -> Vec<UsageRecord> {
        self.state.lock().records.iter().cloned().collect()
    }

    /// Rolls up all retained records
    pub fn get_summary(&self) -> UsageSummary {
        let state = self.state.lock();
        UsageSummary::roll_up(state.records.iter())
    }

    /// Rolls up retained records produced by the named agent
    pub fn get_summary_for_agent(&self, agent: &str) -> UsageSummary {
        let state = self.state.lock();
        UsageSummary::roll_up(state.records.iter().filter(|r| r.agent == agent))
    }

    /// Rolls up retained records carrying the given correlation id
    pub fn get_summary_for_correlation(&self, correlation_id: &CorrelationId) -> UsageSummary {
        let state = self.state.lock();
        UsageSummary::roll_up(state.records.iter().filter(|r| &r.correlation_id == correlation_id))
    }

    /// Rolls up retained records for one (correlation id, agent) pair.
    ///
    /// This is the per-node attribution the engine attaches to a
    /// `NodeResult` when the node's step recorded usage.
    pub fn get_summary_for_correlation_and_agent(
        &self,
        correlation_id: &CorrelationId,
        agent: &str,
    ) -> UsageSummary {
        let state = self.state.lock();
        UsageSummary::roll_up(
            state
                .records
                .iter()
                .filter(|r| &r.correlation_id == correlation_id && r.agent == agent),
        )
    }

    /// Total cost since the last reset, including evicted records.
    ///
    /// Monotonically non-decreasing between resets and never less than the
    /// retained summary's total cost.
    pub fn cumulative_cost_usd(&self) -> f64 {
        self.state.lock().cumulative_cost_usd
    }

    /// Clears all records and resets the cumulative counter
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.records.clear();
        state.cumulative_cost_usd = 0.0;
    }
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self::new()
    }
}

static DEFAULT_TRACKER: Lazy<Arc<UsageTracker>> = Lazy::new(|| Arc::new(UsageTracker::new()));

/// The process-wide default tracker.
pub fn default_usage_tracker() -> Arc<UsageTracker> {
    Arc::clone(&DEFAULT_TRACKER)
}
