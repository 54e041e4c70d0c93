// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Result Cache
//!
//! This module provides the fingerprint-keyed, TTL and LRU bounded,
//! single-flight cache of computed artifacts. The cache maps a request
//! fingerprint to a previously computed value and guarantees at most one
//! concurrent build per fingerprint.
//!
//! ## Overview
//!
//! The result cache provides:
//!
//! - **Keyed Storage**: Entries keyed by SHA-256 fingerprints of the
//!   model id and prompt, or of step identity and canonical JSON inputs
//! - **Expiry**: Per-entry TTL measured against the monotonic clock
//! - **Bounded Size**: Least-recently-used eviction past the size bound
//! - **Single-Flight Builds**: Concurrent misses for one key share a
//!   single producer run
//! - **Statistics**: Hit, miss, and size counters for observability
//!
//! ## Semantics
//!
//! ### TTL
//!
//! A positive TTL expires entries based on the monotonic clock, never
//! wall time; a non-positive TTL disables expiry. A lookup that finds an
//! expired entry removes it and counts a miss.
//!
//! ### LRU
//!
//! Hits promote entries to most recently used. When an insert pushes the
//! store past `max_size`, the least recently used entry is evicted; a
//! zero size disables the bound.
//!
//! ### Single-Flight
//!
//! Concurrent `get_or_compute` callers for the same fingerprint share one
//! producer run; the waiters read the published value and count as hits.
//! A failed producer leaves nothing published, so a waiting caller may
//! take over the build; builds for one key are never concurrent.
//!
//! ## Usage Examples
//!
//! ### Prompt-Level Caching
//!
//! ```rust,ignore
//! let cache = ResultCache::with_policy(300.0, 256);
//! if cache.get("openai:gpt-4o", "summarise this text").is_none() {
//!     let result = agent.run(request).await?;
//!     cache.put("openai:gpt-4o", "summarise this text", result.output);
//! }
//! ```
//!
//! ### Single-Flight Computation
//!
//! ```rust,ignore
//! let key = Fingerprint::for_prompt("openai:gpt-4o", prompt);
//! let value = cache
//!     .get_or_compute(&key, || async { run_expensive_call(prompt).await })
//!     .await?;
//! ```
//!
//! ## Thread Safety
//!
//! All operations are safe under concurrent callers: the store sits
//! behind a `parking_lot` mutex and in-flight builds are tracked in a
//! registry of per-key cells.

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;

use agentic_pipeline_domain::{Fingerprint, PipelineError};

const DEFAULT_TTL_SECONDS: f64 = 300.0;
const DEFAULT_MAX_SIZE: usize = 256;

/// Hit/miss statistics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups that found a live entry or a published in-flight value
    pub hits: u64,
    /// Lookups that found nothing and triggered (or would trigger) a build
    pub misses: u64,
    /// Entries currently stored, including not-yet-collected expired ones
    pub size: usize,
}

struct CacheEntry {
    value: Value,
    expires_at: Option<Instant>,
    last_used: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    clock: u64,
    hits: u64,
    misses: u64,
}

impl CacheState {
    fn touch(&mut self, key: &str) {
        self.clock += 1;
        if let Some(entry) = self.entries.get_mut(key) {
            entry.last_used = self.clock;
        }
    }

    fn evict_lru(&mut self) {
        if let Some(oldest) = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone())
        {
            self.entries.remove(&oldest);
        }
    }
}

/// In-memory single-flight result cache.
pub struct ResultCache {
    ttl: Option<Duration>,
    max_size: Option<usize>,
    state: Mutex<CacheState>,
    in_flight: Mutex<HashMap<String, Arc<OnceCell<Value>>>>,
}

impl ResultCache {
    /// Creates a cache with the default policy (300s TTL, 256 entries)
    pub fn new() -> Self {
        Self::with_policy(DEFAULT_TTL_SECONDS, DEFAULT_MAX_SIZE)
    }

    /// Creates a cache with an explicit policy.
    ///
    /// A non-positive `ttl_seconds` disables expiry; a `max_size` of zero
    /// disables the size bound.
    pub fn with_policy(ttl_seconds: f64, max_size: usize) -> Self {
        Self {
            ttl: (ttl_seconds > 0.0).then(|| Duration::from_secs_f64(ttl_seconds)),
            max_size: (max_size > 0).then_some(max_size),
            state: Mutex::new(CacheState::default()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value for (model, prompt), or `None` on miss.
    ///
    /// A hit promotes the entry to most recently used. An expired entry is
    /// removed and counted as a miss.
    pub fn get(&self, model: &str, prompt: &str) -> Option<Value> {
        let key = Fingerprint::for_prompt(model, prompt);
        let mut state = self.state.lock();
        match Self::live_value(&mut state, key.as_str()) {
            Some(value) => {
                state.touch(key.as_str());
                state.hits += 1;
                Some(value)
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    /// Stores a value under (model, prompt), evicting the least recently
    /// used entry when the cache is over capacity.
    pub fn put(&self, model: &str, prompt: &str, value: Value) {
        let key = Fingerprint::for_prompt(model, prompt);
        self.put_by_key(&key, value);
    }

    /// Removes a specific entry; returns true when it existed
    pub fn invalidate(&self, model: &str, prompt: &str) -> bool {
        let key = Fingerprint::for_prompt(model, prompt);
        self.state.lock().entries.remove(key.as_str()).is_some()
    }

    /// Drops all entries and resets the hit/miss counters
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.hits = 0;
        state.misses = 0;
        self.in_flight.lock().clear();
    }

    /// Returns the current hit/miss/size statistics
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            size: state.entries.len(),
        }
    }

    /// Returns the cached value for `key`, or runs `produce` to build it.
    ///
    /// Single-flight: when several callers arrive for the same key with no
    /// published value, exactly one producer runs; the rest await its
    /// result. The producing caller counts one miss, every reader counts
    /// one hit. Producer errors are returned to the producing caller and
    /// publish nothing.
    pub async fn get_or_compute<F, Fut>(&self, key: &Fingerprint, produce: F) -> Result<Value, PipelineError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, PipelineError>>,
    {
        // Fast path: a live published entry is a plain hit.
        {
            let mut state = self.state.lock();
            if let Some(value) = Self::live_value(&mut state, key.as_str()) {
                state.touch(key.as_str());
                state.hits += 1;
                return Ok(value);
            }
        }

        let cell = {
            let mut flights = self.in_flight.lock();
            flights
                .entry(key.as_str().to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let mut ran = false;
        let result = cell
            .get_or_try_init(|| {
                ran = true;
                produce()
            })
            .await;

        match result {
            Ok(value) => {
                let value = value.clone();
                if ran {
                    self.state.lock().misses += 1;
                    self.put_by_key(key, value.clone());
                    self.in_flight.lock().remove(key.as_str());
                } else {
                    self.state.lock().hits += 1;
                }
                Ok(value)
            }
            Err(error) => {
                if ran {
                    self.state.lock().misses += 1;
                    self.in_flight.lock().remove(key.as_str());
                }
                Err(error)
            }
        }
    }

    fn put_by_key(&self, key: &Fingerprint, value: Value) {
        let mut state = self.state.lock();
        state.clock += 1;
        let entry = CacheEntry {
            value,
            expires_at: self.ttl.map(|ttl| Instant::now() + ttl),
            last_used: state.clock,
        };
        state.entries.insert(key.as_str().to_string(), entry);
        if let Some(max_size) = self.max_size {
            while state.entries.len() > max_size {
                state.evict_lru();
            }
        }
    }

    /// Returns the live (non-expired) value for `key`, removing it when
    /// expired. Does not touch the counters.
    fn live_value(state: &mut CacheState, key: &str) -> Option<Value> {
        let expired = match state.entries.get(key) {
            None => return None,
            Some(entry) => entry.expires_at.is_some_and(|at| Instant::now() >= at),
        };
        if expired {
            state.entries.remove(key);
            return None;
        }
        state.entries.get(key).map(|entry| entry.value.clone())
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}
