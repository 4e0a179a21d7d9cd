// Copyright the quorate authors.
// Licensed under the MIT and Apache-2.0 licenses.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// A `Node` is a leaf variable of a quorum expression: one named replica
/// together with the performance parameters the planner optimizes against.
///
/// Nodes are compared, ordered and hashed _by name alone_: two nodes with the
/// same name are the same node, whatever their capacities say. This matters
/// when callers probe [crate::Expr::is_quorum] with freshly-built nodes, and
/// it is why capacities live on the node rather than in a side table.
///
/// Capacities are in operations per unit time; a node with read capacity 2
/// serves reads at twice the unit rate. Latency is in whatever unit the
/// caller prefers, as long as it is consistent across the system.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub read_capacity: f64,
    pub write_capacity: f64,
    pub latency: f64,
}

impl Node {
    /// A node with unit read and write capacity and unit latency.
    pub fn new(name: impl Into<String>) -> Node {
        Node {
            name: name.into(),
            read_capacity: 1.0,
            write_capacity: 1.0,
            latency: 1.0,
        }
    }

    pub fn with_capacity(name: impl Into<String>, read: f64, write: f64) -> Node {
        Node {
            read_capacity: read,
            write_capacity: write,
            ..Node::new(name)
        }
    }

    pub fn with_latency(name: impl Into<String>, latency: f64) -> Node {
        Node {
            latency,
            ..Node::new(name)
        }
    }

    pub fn with_capacity_and_latency(
        name: impl Into<String>,
        read: f64,
        write: f64,
        latency: f64,
    ) -> Node {
        Node {
            read_capacity: read,
            write_capacity: write,
            latency,
            ..Node::new(name)
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Node) -> bool {
        self.name == other.name
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Node) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Node) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state)
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
