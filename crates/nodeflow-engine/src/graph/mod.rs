//! Graph model: nodes, directed edges, the adjacency index and trigger
//! location.
//!
//! A `Graph` is supplied whole by the caller and is read-only for the
//! duration of a run. Cycles are legal; the runner's step ceiling is what
//! bounds them.

pub mod edge;
pub mod node;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use nodeflow_core::error::{NodeflowError, Result};

pub use edge::{build_adjacency, Adjacency, Edge};
pub use node::{Node, NodeKind};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    /// Parse a serialized graph. Shape errors become `InvalidGraph`.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| NodeflowError::InvalidGraph(e.to_string()))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| NodeflowError::InvalidGraph(e.to_string()))
    }

    /// Node ids must be unique.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(NodeflowError::InvalidGraph(format!(
                    "duplicate node id '{}'",
                    node.id
                )));
            }
        }
        Ok(())
    }

    /// Id → node lookup.
    pub fn index(&self) -> HashMap<&str, &Node> {
        self.nodes.iter().map(|n| (n.id.as_str(), n)).collect()
    }

    pub fn adjacency(&self) -> Adjacency {
        build_adjacency(&self.edges)
    }

    /// The first node, in declaration order, whose kind is a trigger.
    ///
    /// This does not look at in-degree: a trigger-kind node with incoming
    /// edges is still chosen if it comes first.
    pub fn find_trigger(&self) -> Result<&Node> {
        self.nodes
            .iter()
            .find(|n| n.kind.is_trigger())
            .ok_or(NodeflowError::NoTrigger)
    }
}
