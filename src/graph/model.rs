// SPDX-License-Identifier: MIT

//! In-memory graph model
//!
//! Holds the node and edge sets of the flow currently being edited. Reads
//! are public; every mutator is crate-private so that callers go through the
//! editor verbs, which keep these invariants:
//! - node ids are unique
//! - every edge's source and target exist in the node set
//! - removing a node removes every edge touching it in the same call

use super::types::{Edge, Node};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphModel {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    pub fn contains_edge(&self, id: &str) -> bool {
        self.edge(id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Edges whose source or target is the given node
    pub fn edges_touching<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.touches(node_id))
    }

    /// Install a whole node/edge set as-is (load, undo, redo)
    pub(crate) fn replace(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) {
        self.nodes = nodes;
        self.edges = edges;
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.iter_mut()
    }

    pub(crate) fn edge_mut(&mut self, id: &str) -> Option<&mut Edge> {
        self.edges.iter_mut().find(|e| e.id == id)
    }

    /// Add a node. Rejected if the id is already taken.
    pub(crate) fn insert_node(&mut self, node: Node) -> bool {
        if self.contains_node(&node.id) {
            return false;
        }
        self.nodes.push(node);
        true
    }

    /// Add an edge. Rejected if the id is taken or an endpoint is missing.
    pub(crate) fn insert_edge(&mut self, edge: Edge) -> bool {
        if self.contains_edge(&edge.id)
            || !self.contains_node(&edge.source)
            || !self.contains_node(&edge.target)
        {
            return false;
        }
        self.edges.push(edge);
        true
    }

    /// Remove a node together with every edge touching it
    pub(crate) fn remove_node(&mut self, id: &str) -> Option<(Node, Vec<Edge>)> {
        let index = self.nodes.iter().position(|n| n.id == id)?;
        let node = self.nodes.remove(index);

        let (removed, kept): (Vec<Edge>, Vec<Edge>) =
            self.edges.drain(..).partition(|e| e.touches(id));
        self.edges = kept;

        Some((node, removed))
    }

    pub(crate) fn remove_edge(&mut self, id: &str) -> Option<Edge> {
        let index = self.edges.iter().position(|e| e.id == id)?;
        Some(self.edges.remove(index))
    }
}
