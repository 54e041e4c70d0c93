// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure Layer
//!
//! Concrete implementations behind the domain ports:
//!
//! - **runtime**: step executor variants, the chain-of-thought reasoning
//!   pattern, and the model fallback chain
//! - **cache**: the single-flight result cache
//! - **metrics**: the usage tracker and static cost estimation
//! - **logging**: the tracing-backed event handler

pub mod cache;
pub mod logging;
pub mod metrics;
pub mod runtime;
