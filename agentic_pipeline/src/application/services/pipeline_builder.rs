// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Builder
//!
//! Fluent construction API for pipeline graphs. Nodes and edges accumulate
//! unvalidated; [`PipelineBuilder::build`] applies them in declaration
//! order against the validating graph operations and returns a ready
//! engine (or the first validation error).
//!
//! ```rust,ignore
//! let engine = PipelineBuilder::new("idp-pipeline")
//!     .add_step("split", splitter)
//!     .add_step("classify", classifier)
//!     .add_step("extract", extractor)
//!     .chain(&["split", "classify", "extract"])
//!     .build()?;
//! ```

use std::sync::Arc;

use agentic_pipeline_domain::{Dag, DagEdge, DagNode, PipelineError, StepExecutor};

use crate::application::services::pipeline_engine::PipelineEngine;

/// Fluent builder for a graph and its engine.
pub struct PipelineBuilder {
    name: String,
    nodes: Vec<DagNode>,
    edges: Vec<DagEdge>,
}

impl PipelineBuilder {
    /// Creates a builder for the named pipeline
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Adds a fully configured node
    pub fn add_node(mut self, node: DagNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Adds a node with default policy around the given step
    pub fn add_step(self, node_id: impl Into<String>, step: Arc<dyn StepExecutor>) -> Self {
        self.add_node(DagNode::new(node_id, step))
    }

    /// Adds a directed edge with default keys
    pub fn add_edge(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.edges.push(DagEdge::new(source, target));
        self
    }

    /// Adds a directed edge with explicit output/input keys
    pub fn add_edge_keyed(
        mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        output_key: impl Into<String>,
        input_key: impl Into<String>,
    ) -> Self {
        self.edges
            .push(DagEdge::new(source, target).with_output_key(output_key).with_input_key(input_key));
        self
    }

    /// Connects the listed nodes in sequence: A -> B -> C -> ...
    pub fn chain(mut self, node_ids: &[&str]) -> Self {
        for window in node_ids.windows(2) {
            self.edges.push(DagEdge::new(window[0], window[1]));
        }
        self
    }

    /// Builds and validates the graph, returning it for inspection or a
    /// custom engine
    pub fn build_dag(self) -> Result<Dag, PipelineError> {
        let mut dag = Dag::new(self.name);
        for node in self.nodes {
            dag.add_node(node)?;
        }
        for edge in self.edges {
            dag.add_edge(edge)?;
        }
        Ok(dag)
    }

    /// Builds, validates, and wraps the graph in an engine
    pub fn build(self) -> Result<PipelineEngine, PipelineError> {
        Ok(PipelineEngine::new(self.build_dag()?))
    }
}
