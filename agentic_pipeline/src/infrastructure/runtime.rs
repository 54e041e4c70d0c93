// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Runtime Infrastructure
//!
//! Step executor implementations, reasoning patterns, and model failover.

pub mod fallback;
pub mod reasoning;
pub mod steps;

pub use fallback::{FallbackChain, FallbackWalk};
pub use reasoning::ChainOfThought;
pub use steps::{AgentStep, BranchStep, CallableStep, FanInStep, FanOutStep, ReasoningStep};
