// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Service Interfaces
//!
//! This module contains the ports through which the pipeline core talks to
//! its collaborators. The domain defines the contracts; implementations
//! live in the engine crate or in the embedding application.
//!
//! ## Overview
//!
//! - **StepExecutor**: the uniform unit-of-work interface every stage kind
//!   satisfies (inbound)
//! - **PipelineEventHandler**: lifecycle observer notified at node and
//!   pipeline boundaries (outbound, best-effort)
//! - **Agent**: the LLM-driven collaborator agent steps wrap, with token
//!   accounting for usage attribution
//! - **CostCalculator**: prices token counts into USD estimates
//! - **MemoryService**: external memory handle passed through untouched
//! - **ReasoningPattern**: iterative reasoning loop driver
//!
//! ## Interface Design
//!
//! All I/O-bound ports are async (`async_trait`) and `Send + Sync`, since
//! the engine shares them across concurrently executing nodes. Ports return
//! the domain's `PipelineError` so failure classification stays uniform.

pub mod agent_service;
pub mod event_handler;
pub mod memory_service;
pub mod reasoning_service;
pub mod step_executor;

pub use agent_service::{Agent, AgentRequest, AgentResponse, CostCalculator};
pub use event_handler::PipelineEventHandler;
pub use memory_service::MemoryService;
pub use reasoning_service::ReasoningPattern;
pub use step_executor::{primary_input, StepExecutor, StepInputs};
