// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Correlation Identifier Value Object
//!
//! This module provides the correlation identifier that ties together
//! everything produced by a single pipeline run: usage records, event
//! emissions, and the aggregate rollup on the final result.
//!
//! ## Overview
//!
//! The correlation identifier provides:
//!
//! - **Type-Safe Identification**: Strongly-typed run identifiers that
//!   cannot be confused with node ids or other strings
//! - **Explicit Propagation**: The id is carried on the context and every
//!   usage record; there is no ambient or thread-local propagation
//! - **Serialization**: String representation for logs, JSON payloads, and
//!   external observers
//!
//! ## Usage
//!
//! A fresh id is generated when a run starts without one; callers that want
//! to correlate a run with an external trace supply their own.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use uuid::Uuid;

use crate::PipelineError;

/// Run-scoped correlation identifier value object.
///
/// Wraps a UUID-v4 rendered in simple (hyphen-free) form. Immutable once
/// created; comparisons and hashing operate on the string form.
///
/// # Examples
///
/// ```rust,ignore
/// let generated = CorrelationId::new();
/// let supplied = CorrelationId::parse("run-2024-review")?;
/// assert_ne!(generated, supplied);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generates a new random correlation id
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Creates a correlation id from a caller-supplied string
    ///
    /// Any non-empty string is accepted so callers can thread external
    /// trace identifiers through the pipeline.
    pub fn parse(value: impl Into<String>) -> Result<Self, PipelineError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(PipelineError::Validation(
                "correlation id cannot be empty".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Returns the string form of the id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    /// Generates a new random id rather than an empty one, so an
    /// uninitialized default can never collide with another run.
    fn default() -> Self {
        Self::new()
    }
}

impl Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CorrelationId {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
