use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A directed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Source node id.
    #[serde(alias = "from")]
    pub source: String,
    /// Target node id.
    #[serde(alias = "to")]
    pub target: String,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Node id → successor ids, in edge-declaration order.
pub type Adjacency = HashMap<String, Vec<String>>;

/// Build the adjacency index. No de-duplication, no sorting; nodes without
/// outgoing edges are simply absent.
pub fn build_adjacency(edges: &[Edge]) -> Adjacency {
    let mut adjacency = Adjacency::new();
    for edge in edges {
        adjacency
            .entry(edge.source.clone())
            .or_default()
            .push(edge.target.clone());
    }
    adjacency
}
