// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Request Fingerprint Value Object
//!
//! This module derives stable cache keys from step identity and input
//! payloads. Two requests with the same identity and semantically equal
//! inputs always produce the same fingerprint, regardless of field ordering
//! in the original payload.
//!
//! ## Derivation
//!
//! A fingerprint is the SHA-256 digest, hex encoded, of:
//!
//! ```text
//! identity \0 canonical-json(payload)
//! ```
//!
//! Canonical form comes from `serde_json`'s object representation, which
//! stores keys in sorted order. The NUL separator keeps
//! `("ab", "c")` and `("a", "bc")` from colliding.
//!
//! ## Identity
//!
//! The identity half of the key is the model id for prompt-level caching and
//! the step identity for node-output caching. Including identity prevents
//! cross-step collisions when several steps share one cache.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt::{self, Display};

/// Stable, hex-encoded SHA-256 cache key.
///
/// Immutable value object; equality and hashing operate on the digest
/// string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Computes a fingerprint from an identity and a structured payload.
    ///
    /// The payload is rendered in canonical JSON (sorted object keys) before
    /// hashing, so logically equal payloads fingerprint identically.
    pub fn compute(identity: &str, payload: &Value) -> Self {
        let canonical = payload.to_string();
        Self::digest(identity, &canonical)
    }

    /// Computes a fingerprint for a plain (model, prompt) pair.
    ///
    /// This is the key shape used by prompt-level result caching.
    pub fn for_prompt(model: &str, prompt: &str) -> Self {
        Self::digest(model, prompt)
    }

    fn digest(identity: &str, payload: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(identity.as_bytes());
        hasher.update([0u8]);
        hasher.update(payload.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Returns the hex digest string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
