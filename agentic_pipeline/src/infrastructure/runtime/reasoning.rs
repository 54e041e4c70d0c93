// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chain-of-Thought Reasoning Pattern
//!
//! The simplest reasoning loop: the agent reasons step by step, each
//! iteration seeing the problem and the chain of previous thoughts, until
//! it signals a final answer or the step budget runs out.
//!
//! ## Final-Answer Protocol
//!
//! An iteration's output is treated as final when it is an object with
//! `is_final: true` (the `final_answer` field, falling back to `content`,
//! becomes the loop output), or a string prefixed with `FINAL:`. Agents
//! that never signal finality get the last thought as the answer once
//! `max_steps` is reached.

use async_trait::async_trait;
use serde_json::{json, Value};

use agentic_pipeline_domain::{
    Agent, AgentRequest, PipelineContext, PipelineError, ReasoningOutcome, ReasoningPattern, ReasoningTrace,
    TraceStep,
};

const DEFAULT_MAX_STEPS: usize = 10;
const FINAL_MARKER: &str = "FINAL:";

/// Structured step-by-step reasoning loop.
pub struct ChainOfThought {
    max_steps: usize,
}

impl ChainOfThought {
    /// Creates a loop with the default step budget
    pub fn new() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Caps the number of reasoning steps
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    fn step_prompt(problem: &Value, chain: &[String], step_number: usize) -> Value {
        let previous_steps = chain
            .iter()
            .enumerate()
            .map(|(i, step)| format!("Step {}: {}", i + 1, step))
            .collect::<Vec<_>>()
            .join("\n");
        json!({
            "problem": problem,
            "previous_steps": previous_steps,
            "step_number": step_number,
        })
    }

    /// Interprets one iteration's output as (thought content, final answer).
    fn interpret(output: &Value) -> (String, Option<Value>) {
        if let Value::Object(map) = output {
            let content = map
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if map.get("is_final").and_then(Value::as_bool).unwrap_or(false) {
                let answer = map
                    .get("final_answer")
                    .cloned()
                    .unwrap_or_else(|| Value::String(content.clone()));
                return (content, Some(answer));
            }
            return (content, None);
        }
        let text = output.as_str().unwrap_or_default().to_string();
        match text.strip_prefix(FINAL_MARKER) {
            Some(answer) => (text.clone(), Some(Value::String(answer.trim().to_string()))),
            None => (text, None),
        }
    }
}

impl Default for ChainOfThought {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReasoningPattern for ChainOfThought {
    fn name(&self) -> &str {
        "chain_of_thought"
    }

    async fn execute(
        &self,
        agent: &dyn Agent,
        input: &Value,
        context: &PipelineContext,
    ) -> Result<ReasoningOutcome, PipelineError> {
        let mut trace = ReasoningTrace::new(self.name());
        let mut chain: Vec<String> = Vec::new();

        for step_number in 1..=self.max_steps {
            if context.cancellation().is_cancelled() {
                return Err(PipelineError::Cancelled(format!(
                    "reasoning loop '{}' cancelled at step {}",
                    self.name(),
                    step_number
                )));
            }

            let prompt = Self::step_prompt(input, &chain, step_number);
            let response = agent
                .run(AgentRequest::new(prompt, context.correlation_id().clone()))
                .await?;
            let (content, final_answer) = Self::interpret(&response.output);
            tracing::debug!(step = step_number, is_final = final_answer.is_some(), "reasoning step");
            trace.add_step(TraceStep::Thought {
                content: content.clone(),
            });
            chain.push(content);

            if let Some(answer) = final_answer {
                return Ok(ReasoningOutcome::success(answer, trace));
            }
        }

        // Step budget exhausted: the last thought stands as the answer.
        let answer = chain.last().cloned().unwrap_or_default();
        Ok(ReasoningOutcome::success(Value::String(answer), trace))
    }
}
