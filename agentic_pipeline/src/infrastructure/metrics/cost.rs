// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Static Price Cost Estimation
//!
//! Table-driven implementation of the domain `CostCalculator` port. Prices
//! are expressed in USD per million tokens, separately for prompt and
//! completion sides. Model lookup uses longest-prefix matching so dated
//! model revisions (`openai:gpt-4o-2024-08-06`) price like their base model
//! (`openai:gpt-4o`); unknown models cost zero rather than guessing.

use std::collections::HashMap;

use agentic_pipeline_domain::CostCalculator;

/// Built-in price table: model prefix -> (input USD/M, output USD/M).
fn builtin_prices() -> HashMap<String, (f64, f64)> {
    let table = [
        ("openai:gpt-4o", (2.5, 10.0)),
        ("openai:gpt-4o-mini", (0.15, 0.6)),
        ("openai:gpt-4.1", (2.0, 8.0)),
        ("openai:gpt-3.5-turbo", (0.5, 1.5)),
        ("anthropic:claude-3-5-sonnet", (3.0, 15.0)),
        ("anthropic:claude-3-5-haiku", (0.8, 4.0)),
        ("google:gemini-1.5-pro", (1.25, 5.0)),
        ("google:gemini-1.5-flash", (0.075, 0.3)),
        ("mistral:mistral-large", (2.0, 6.0)),
    ];
    table.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// Cost calculator backed by a static per-million price table.
pub struct StaticPriceCostCalculator {
    prices: HashMap<String, (f64, f64)>,
}

impl StaticPriceCostCalculator {
    /// Creates a calculator with the built-in price table
    pub fn new() -> Self {
        Self {
            prices: builtin_prices(),
        }
    }

    /// Creates a calculator with a caller-supplied price table
    pub fn with_prices(prices: HashMap<String, (f64, f64)>) -> Self {
        Self { prices }
    }

    /// Finds the longest price-table prefix matching the model id
    fn lookup(&self, model: &str) -> Option<(f64, f64)> {
        self.prices
            .iter()
            .filter(|(prefix, _)| model.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, prices)| *prices)
    }
}

impl Default for StaticPriceCostCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl CostCalculator for StaticPriceCostCalculator {
    fn estimate(&self, model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        match self.lookup(model) {
            Some((input_per_million, output_per_million)) => {
                (input_tokens as f64) * input_per_million / 1_000_000.0
                    + (output_tokens as f64) * output_per_million / 1_000_000.0
            }
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_model_returns_nonzero() {
        let calc = StaticPriceCostCalculator::new();
        assert!(calc.estimate("openai:gpt-4o", 1000, 500) > 0.0);
    }

    #[test]
    fn test_unknown_model_returns_zero() {
        let calc = StaticPriceCostCalculator::new();
        assert_eq!(calc.estimate("unknown:mystery-model", 1000, 500), 0.0);
    }

    #[test]
    fn test_prefix_match_prices_dated_revisions() {
        let calc = StaticPriceCostCalculator::new();
        let base = calc.estimate("openai:gpt-4o", 1000, 500);
        let dated = calc.estimate("openai:gpt-4o-2024-08-06", 1000, 500);
        assert_eq!(base, dated);
    }

    #[test]
    fn test_longest_prefix_wins() {
        let calc = StaticPriceCostCalculator::new();
        // gpt-4o-mini must match its own entry, not the gpt-4o prefix.
        let mini = calc.estimate("openai:gpt-4o-mini", 1_000_000, 0);
        assert!((mini - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_custom_prices_accuracy() {
        let mut prices = HashMap::new();
        prices.insert("test:model".to_string(), (10.0, 20.0));
        let calc = StaticPriceCostCalculator::with_prices(prices);
        // 100 input at $10/M = $0.001; 200 output at $20/M = $0.004
        let cost = calc.estimate("test:model", 100, 200);
        assert!((cost - 0.005).abs() < 1e-9);
    }

    #[test]
    fn test_zero_tokens_cost_zero() {
        let calc = StaticPriceCostCalculator::new();
        assert_eq!(calc.estimate("openai:gpt-4o", 0, 0), 0.0);
    }
}
