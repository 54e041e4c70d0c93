// /////////////////////////////////////////////////////////////////////////////
// Agentic Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Graph Entity
//!
//! This module contains the immutable graph of nodes and directed edges
//! that a pipeline executes, with every structural invariant enforced at
//! construction time.
//!
//! ## Overview
//!
//! The graph entity provides:
//!
//! - **Validated Construction**: Appending operations that reject
//!   duplicate ids, undeclared endpoints, self-loops, and cycles
//! - **Neighbor Access**: Predecessors, successors, sources, incoming
//!   edges, and transitive descendants
//! - **Level Structure**: Topological layers for introspection and
//!   validation
//! - **Deterministic Order**: Declaration order is preserved so engines
//!   can dispatch deterministically within a wave
//!
//! ## Invariants
//!
//! ### 1. Unique Node Ids
//!
//! A second node with an already-declared id is rejected.
//!
//! ### 2. Declared Endpoints
//!
//! Both endpoints of an edge must reference declared nodes.
//!
//! ### 3. Acyclicity
//!
//! An edge that would close a cycle is rejected, and the rejection rolls
//! the tentative wiring back, so no partially constructed graph is ever
//! observable. Cycle detection uses a three-color depth-first search and
//! reports the offending node path in the error message.
//!
//! ## Usage Examples
//!
//! ### Building and Inspecting a Graph
//!
//! ```rust,ignore
//! use agentic_pipeline_domain::{Dag, DagEdge, DagNode};
//!
//! let mut dag = Dag::new("diamond");
//! for id in ["a", "b", "c", "d"] {
//!     dag.add_node(DagNode::new(id, step.clone()))?;
//! }
//! dag.add_edge(DagEdge::new("a", "b"))?;
//! dag.add_edge(DagEdge::new("a", "c"))?;
//! dag.add_edge(DagEdge::new("b", "d"))?;
//! dag.add_edge(DagEdge::new("c", "d"))?;
//!
//! assert_eq!(dag.sources(), vec!["a".to_string()]);
//! assert_eq!(dag.topological_layers().len(), 3);
//! ```
//!
//! ## Scheduling Semantics
//!
//! [`Dag::topological_layers`] produces the level structure (every node's
//! predecessors live in earlier layers) used for introspection; the
//! engine schedules with a finer-grained dynamic ready set that is
//! equivalent in dependency semantics but releases each node the moment
//! its own predecessors are terminal.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use crate::entities::dag_node::{DagEdge, DagNode};
use crate::PipelineError;

/// Immutable, validated graph of nodes and directed dependencies.
///
/// Nodes and edges are appended through the validating `add_*` operations;
/// declaration order is preserved so engines can dispatch deterministically
/// within a wave.
#[derive(Clone)]
pub struct Dag {
    name: String,
    nodes: HashMap<String, DagNode>,
    node_order: Vec<String>,
    edges: Vec<DagEdge>,
    successors: HashMap<String, Vec<String>>,
    predecessors: HashMap<String, Vec<String>>,
}

impl Dag {
    /// Creates an empty graph with the given pipeline name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: HashMap::new(),
            node_order: Vec::new(),
            edges: Vec::new(),
            successors: HashMap::new(),
            predecessors: HashMap::new(),
        }
    }

    /// Gets the pipeline name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a node; fails when the id is already declared
    pub fn add_node(&mut self, node: DagNode) -> Result<(), PipelineError> {
        let node_id = node.node_id().to_string();
        if self.nodes.contains_key(&node_id) {
            return Err(PipelineError::Validation(format!(
                "duplicate node id '{}' in pipeline '{}'",
                node_id, self.name
            )));
        }
        self.successors.insert(node_id.clone(), Vec::new());
        self.predecessors.insert(node_id.clone(), Vec::new());
        self.node_order.push(node_id.clone());
        self.nodes.insert(node_id, node);
        Ok(())
    }

    /// Appends an edge; fails on unknown endpoints or when the edge would
    /// close a cycle. A rejected edge leaves the graph untouched.
    pub fn add_edge(&mut self, edge: DagEdge) -> Result<(), PipelineError> {
        for endpoint in [edge.source(), edge.target()] {
            if !self.nodes.contains_key(endpoint) {
                return Err(PipelineError::Validation(format!(
                    "edge {} -> {} references undeclared node '{}'",
                    edge.source(),
                    edge.target(),
                    endpoint
                )));
            }
        }
        if edge.source() == edge.target() {
            return Err(PipelineError::Validation(format!(
                "self-loop on node '{}'",
                edge.source()
            )));
        }

        // Tentatively wire the edge, then verify acyclicity and roll back on
        // failure so a rejected edge is never observable.
        let source = edge.source().to_string();
        let target = edge.target().to_string();
        if let Some(successors) = self.successors.get_mut(&source) {
            successors.push(target.clone());
        }
        if let Some(predecessors) = self.predecessors.get_mut(&target) {
            predecessors.push(source.clone());
        }

        if let Some(cycle) = self.find_cycle() {
            if let Some(successors) = self.successors.get_mut(&source) {
                successors.pop();
            }
            if let Some(predecessors) = self.predecessors.get_mut(&target) {
                predecessors.pop();
            }
            return Err(PipelineError::Validation(format!(
                "edge {} -> {} would create a cycle through [{}]",
                source,
                target,
                cycle.join(" -> ")
            )));
        }

        self.edges.push(edge);
        Ok(())
    }

    /// Gets a node by id
    pub fn node(&self, node_id: &str) -> Option<&DagNode> {
        self.nodes.get(node_id)
    }

    /// Node ids in declaration order
    pub fn node_ids(&self) -> &[String] {
        &self.node_order
    }

    /// Number of declared nodes
    pub fn len(&self) -> usize {
        self.node_order.len()
    }

    /// Returns true when the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.node_order.is_empty()
    }

    /// All declared edges in declaration order
    pub fn edges(&self) -> &[DagEdge] {
        &self.edges
    }

    /// Edges arriving at the given node, in declaration order
    pub fn incoming_edges(&self, node_id: &str) -> Vec<&DagEdge> {
        self.edges.iter().filter(|e| e.target() == node_id).collect()
    }

    /// Direct predecessors of the given node
    pub fn predecessors(&self, node_id: &str) -> &[String] {
        self.predecessors.get(node_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct successors of the given node
    pub fn successors(&self, node_id: &str) -> &[String] {
        self.successors.get(node_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes with no incoming edges, in declaration order
    pub fn sources(&self) -> Vec<String> {
        self.node_order
            .iter()
            .filter(|id| self.predecessors(id).is_empty())
            .cloned()
            .collect()
    }

    /// All nodes transitively reachable from the given node (excluded)
    pub fn descendants(&self, node_id: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<&str> = self.successors(node_id).iter().map(String::as_str).collect();
        while let Some(current) = queue.pop_front() {
            if seen.insert(current.to_string()) {
                queue.extend(self.successors(current).iter().map(String::as_str));
            }
        }
        seen
    }

    /// Produces the level structure of the graph.
    ///
    /// Each layer contains nodes whose predecessors all appear in earlier
    /// layers; layer zero is exactly [`Dag::sources`]. The graph is acyclic
    /// by construction, so every node appears in exactly one layer.
    pub fn topological_layers(&self) -> Vec<Vec<String>> {
        let mut remaining_preds: HashMap<&str, usize> = self
            .node_order
            .iter()
            .map(|id| (id.as_str(), self.predecessors(id).len()))
            .collect();
        let mut layers = Vec::new();
        let mut placed = 0usize;

        while placed < self.node_order.len() {
            let layer: Vec<String> = self
                .node_order
                .iter()
                .filter(|id| remaining_preds.get(id.as_str()) == Some(&0))
                .cloned()
                .collect();
            for id in &layer {
                remaining_preds.remove(id.as_str());
                for succ in self.successors(id) {
                    if let Some(count) = remaining_preds.get_mut(succ.as_str()) {
                        *count -= 1;
                    }
                }
            }
            placed += layer.len();
            layers.push(layer);
        }
        layers
    }

    /// Three-color depth-first search; returns the node path of a cycle
    /// when one exists.
    fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        fn visit(
            node: &str,
            successors: &HashMap<String, Vec<String>>,
            colors: &mut HashMap<String, Color>,
            stack: &mut Vec<String>,
        ) -> Option<Vec<String>> {
            colors.insert(node.to_string(), Color::Gray);
            stack.push(node.to_string());
            if let Some(succs) = successors.get(node) {
                for succ in succs {
                    match colors.get(succ).copied().unwrap_or(Color::White) {
                        Color::Gray => {
                            // Trim the stack down to the cycle entry point.
                            let start = stack.iter().position(|n| n == succ).unwrap_or(0);
                            let mut cycle = stack[start..].to_vec();
                            cycle.push(succ.clone());
                            return Some(cycle);
                        }
                        Color::White => {
                            if let Some(cycle) = visit(succ, successors, colors, stack) {
                                return Some(cycle);
                            }
                        }
                        Color::Black => {}
                    }
                }
            }
            stack.pop();
            colors.insert(node.to_string(), Color::Black);
            None
        }

        let mut colors: HashMap<String, Color> = HashMap::new();
        for node in &self.node_order {
            if colors.get(node).copied().unwrap_or(Color::White) == Color::White {
                let mut stack = Vec::new();
                if let Some(cycle) = visit(node, &self.successors, &mut colors, &mut stack) {
                    return Some(cycle);
                }
            }
        }
        None
    }
}

impl fmt::Debug for Dag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dag")
            .field("name", &self.name)
            .field("nodes", &self.node_order)
            .field("edges", &self.edges.len())
            .finish()
    }
}
