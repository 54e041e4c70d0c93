// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Model Fallback Chain
//!
//! Ordered candidate list of model identifiers with failover semantics:
//! when the current model fails, the chain advances to the next candidate
//! until the list (or the configured attempt cap) is exhausted. Agent steps
//! configured with a chain walk it per invocation, so concurrent nodes
//! never share advancement state.

use agentic_pipeline_domain::PipelineError;

/// Ordered list of candidate models, primary first.
#[derive(Debug, Clone)]
pub struct FallbackChain {
    models: Vec<String>,
    max_attempts: usize,
}

impl FallbackChain {
    /// Creates a chain from an ordered candidate list.
    ///
    /// Fails when the list is empty; a chain always has a primary.
    pub fn new(models: Vec<String>) -> Result<Self, PipelineError> {
        if models.is_empty() {
            return Err(PipelineError::Validation(
                "fallback chain requires at least one model".to_string(),
            ));
        }
        let max_attempts = models.len();
        Ok(Self { models, max_attempts })
    }

    /// Caps how many candidates may be tried per invocation
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// The primary (first) model
    pub fn primary(&self) -> &str {
        &self.models[0]
    }

    /// All candidate models in order
    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Begins a walk over the candidates for one invocation
    pub fn walk(&self) -> FallbackWalk<'_> {
        FallbackWalk {
            chain: self,
            index: 0,
        }
    }
}

/// Per-invocation cursor over a fallback chain.
#[derive(Debug)]
pub struct FallbackWalk<'a> {
    chain: &'a FallbackChain,
    index: usize,
}

impl FallbackWalk<'_> {
    /// The currently selected model
    pub fn current(&self) -> &str {
        &self.chain.models[self.index]
    }

    /// Advances to the next candidate.
    ///
    /// Returns the next model identifier, or `None` once the candidate
    /// list or the attempt cap is exhausted.
    pub fn advance(&mut self) -> Option<&str> {
        let next = self.index + 1;
        if next >= self.chain.max_attempts || next >= self.chain.models.len() {
            return None;
        }
        self.index = next;
        tracing::info!(model = self.current(), index = self.index, "falling back to backup model");
        Some(self.current())
    }

    /// Resets the walk to the primary model
    pub fn reset(&mut self) {
        self.index = 0;
    }
}
