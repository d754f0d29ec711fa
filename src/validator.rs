// SPDX-License-Identifier: MIT

//! Structural validation of a flow graph
//!
//! Pure function over a (nodes, edges) snapshot. Dangling edges make a graph
//! invalid; orphaned nodes are reported as warnings only.

use std::collections::HashSet;

use serde::Serialize;

use crate::graph::{Edge, Node};

/// A single problem found in the graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValidationIssue {
    /// A node with no incoming or outgoing edge
    OrphanedNode { node_id: String },
    /// An edge whose endpoint does not resolve to a node
    DanglingEdge { edge_id: String, node_id: String },
}

impl ValidationIssue {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DanglingEdge { .. })
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OrphanedNode { node_id } => {
                write!(f, "Node '{}' is not connected to any other node", node_id)
            }
            Self::DanglingEdge { edge_id, node_id } => {
                write!(f, "Edge '{}' references missing node '{}'", edge_id, node_id)
            }
        }
    }
}

/// Result of validating a graph
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    pub orphaned_nodes: Vec<String>,
    pub dangling_edges: Vec<String>,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Human-readable messages, fatal problems first
    pub fn messages(&self) -> Vec<String> {
        let mut issues: Vec<&ValidationIssue> = self.issues.iter().collect();
        issues.sort_by_key(|i| !i.is_fatal());
        issues.iter().map(|i| i.to_string()).collect()
    }

    /// Fatal messages only
    pub fn errors(&self) -> Vec<String> {
        self.issues
            .iter()
            .filter(|i| i.is_fatal())
            .map(|i| i.to_string())
            .collect()
    }
}

/// Validate a graph snapshot
pub fn validate(nodes: &[Node], edges: &[Edge]) -> ValidationReport {
    let node_ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let mut report = ValidationReport::default();

    for edge in edges {
        let mut dangling = false;
        for endpoint in [&edge.source, &edge.target] {
            if !node_ids.contains(endpoint.as_str()) {
                dangling = true;
                report.issues.push(ValidationIssue::DanglingEdge {
                    edge_id: edge.id.clone(),
                    node_id: endpoint.clone(),
                });
            }
        }
        if dangling {
            report.dangling_edges.push(edge.id.clone());
        }
    }

    let connected: HashSet<&str> = edges
        .iter()
        .flat_map(|e| [e.source.as_str(), e.target.as_str()])
        .collect();

    for node in nodes {
        if !connected.contains(node.id.as_str()) {
            report.orphaned_nodes.push(node.id.clone());
            report.issues.push(ValidationIssue::OrphanedNode {
                node_id: node.id.clone(),
            });
        }
    }

    report.valid = report.dangling_edges.is_empty();
    report
}
