// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Memory Collaborator Interface
//!
//! This module defines the port for the external memory store a context
//! may carry. The engine never reads or writes memory itself; it passes
//! the handle unchanged to step executors.
//!
//! ## Overview
//!
//! The memory interface provides:
//!
//! - **Conversation History**: Append-and-load of ordered history entries
//!   per session, for steps that feed prior turns to agents
//! - **Working Memory**: Keyed get/put scratch shared between nodes of a
//!   run
//! - **Opaque Ownership**: The store's semantics and thread-safety are
//!   the collaborator's responsibility, not the engine's
//!
//! ## Usage Examples
//!
//! ### Reading Scratch from an Earlier Node
//!
//! ```rust,ignore
//! if let Some(memory) = context.memory() {
//!     if let Some(notes) = memory.get("research:notes").await? {
//!         prompt = enrich_prompt(prompt, &notes);
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde_json::Value;

use crate::PipelineError;

/// External memory store shared across the nodes of a run.
#[async_trait]
pub trait MemoryService: Send + Sync {
    /// Appends an entry to the named conversation history
    async fn append_history(&self, session: &str, entry: Value) -> Result<(), PipelineError>;

    /// Loads the named conversation history, oldest first
    async fn load_history(&self, session: &str) -> Result<Vec<Value>, PipelineError>;

    /// Writes a working-memory value under the given key
    async fn put(&self, key: &str, value: Value) -> Result<(), PipelineError>;

    /// Reads a working-memory value, when present
    async fn get(&self, key: &str) -> Result<Option<Value>, PipelineError>;
}
