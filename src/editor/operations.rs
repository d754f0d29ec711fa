// SPDX-License-Identifier: MIT

//! Graph-mutating verbs
//!
//! Each verb is one synchronous unit: it mutates the model, keeps the
//! selection consistent, and commits at most one history entry. Commit
//! granularity follows user actions, not model writes:
//! - structural edits (add, delete, duplicate, connect) always commit
//! - `update_node` commits only when config or inputs change
//! - selection never commits
//! - change batches commit once, and only for settled moves or removals

use uuid::Uuid;

use super::FlowEditor;
use crate::graph::{
    Connection, Edge, EdgeChange, EdgeData, EdgeDataPatch, Node, NodeChange, NodeDataPatch,
    Position,
};
use crate::history::GraphSnapshot;

/// Offset applied to a duplicated node's position
pub const DUPLICATE_OFFSET: f64 = 50.0;

fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4())
}

impl FlowEditor {
    /// Add a node of `component_type` at `position`, returning its id
    pub fn add_node(&mut self, component_type: &str, position: Position) -> String {
        let id = new_id("node");
        let node = Node::new(id.clone(), component_type, position);
        self.graph.insert_node(node);

        self.touch();
        self.commit();
        id
    }

    /// Merge `patch` into a node's data
    pub fn update_node(&mut self, id: &str, patch: &NodeDataPatch) -> bool {
        let Some(node) = self.graph.node_mut(id) else {
            return false;
        };
        if !patch.apply(&mut node.data) {
            return false;
        }

        self.touch();
        if patch.touches_history() {
            self.commit();
        }
        true
    }

    /// Remove a node and every edge touching it as one history entry
    pub fn delete_node(&mut self, id: &str) -> bool {
        let Some((_, removed_edges)) = self.graph.remove_node(id) else {
            return false;
        };

        self.selection.set_node(id, false);
        for edge in &removed_edges {
            self.selection.set_edge(&edge.id, false);
        }

        log::debug!(
            "Deleted node {} and {} connected edges",
            id,
            removed_edges.len()
        );
        self.touch();
        self.commit();
        true
    }

    /// Clone a node next to the original, returning the copy's id
    pub fn duplicate_node(&mut self, id: &str) -> Option<String> {
        let original = self.graph.node(id)?;

        let mut copy = original.clone();
        copy.id = new_id("node");
        copy.position = original.position.offset(DUPLICATE_OFFSET, DUPLICATE_OFFSET);
        copy.data.label = format!("{} Copy", original.data.label);
        copy.data.reset_runtime();

        let copy_id = copy.id.clone();
        self.graph.insert_node(copy);

        self.touch();
        self.commit();
        Some(copy_id)
    }

    /// Create an edge for `connection`. Returns `None` when an endpoint is
    /// missing or the same connection already exists.
    pub fn connect(&mut self, connection: &Connection) -> Option<String> {
        if !self.graph.contains_node(&connection.source)
            || !self.graph.contains_node(&connection.target)
        {
            log::debug!(
                "Rejected connection {} -> {}: endpoint missing",
                connection.source,
                connection.target
            );
            return None;
        }
        if self.graph.edges().iter().any(|e| connection.matches(e)) {
            return None;
        }

        let edge = Edge {
            id: new_id("edge"),
            source: connection.source.clone(),
            target: connection.target.clone(),
            data: EdgeData {
                source_handle: connection.source_handle.clone(),
                target_handle: connection.target_handle.clone(),
                data_type: connection.data_type.clone(),
            },
        };
        let edge_id = edge.id.clone();
        if !self.graph.insert_edge(edge) {
            return None;
        }

        self.touch();
        self.commit();
        Some(edge_id)
    }

    pub fn update_edge(&mut self, id: &str, patch: &EdgeDataPatch) -> bool {
        let Some(edge) = self.graph.edge_mut(id) else {
            return false;
        };
        if !patch.apply(&mut edge.data) {
            return false;
        }

        self.touch();
        self.commit();
        true
    }

    pub fn delete_edge(&mut self, id: &str) -> bool {
        if self.graph.remove_edge(id).is_none() {
            return false;
        }
        self.selection.set_edge(id, false);

        self.touch();
        self.commit();
        true
    }

    /// Remove every selected node (with its edges) and edge at once
    pub fn delete_selected(&mut self) -> bool {
        if self.selection.is_empty() {
            return false;
        }

        let nodes = self.selected_nodes();
        let edges = self.selected_edges();
        let mut changed = false;
        for id in &nodes {
            changed |= self.graph.remove_node(id).is_some();
        }
        for id in &edges {
            changed |= self.graph.remove_edge(id).is_some();
        }
        self.selection.clear();

        if changed {
            self.touch();
            self.commit();
        }
        changed
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn select_node(&mut self, id: &str, multi: bool) {
        if self.graph.contains_node(id) {
            self.selection.select_node(id, multi);
        }
    }

    pub fn select_edge(&mut self, id: &str, multi: bool) {
        if self.graph.contains_edge(id) {
            self.selection.select_edge(id, multi);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn select_all(&mut self) {
        self.selection.select_all(&self.graph);
    }

    // ------------------------------------------------------------------
    // Change batches from the rendering layer
    // ------------------------------------------------------------------

    /// Apply node deltas. Mid-drag moves and selection changes never commit.
    pub fn apply_node_changes(&mut self, changes: &[NodeChange]) {
        let mut changed = false;
        let mut settled = false;

        for change in changes {
            match change {
                NodeChange::Position {
                    id,
                    position,
                    dragging,
                } => {
                    let Some(node) = self.graph.node_mut(id) else {
                        continue;
                    };
                    if node.position != *position {
                        node.position = *position;
                        changed = true;
                    }
                    settled |= !dragging;
                }
                NodeChange::Remove { id } => {
                    if let Some((_, removed_edges)) = self.graph.remove_node(id) {
                        self.selection.set_node(id, false);
                        for edge in &removed_edges {
                            self.selection.set_edge(&edge.id, false);
                        }
                        changed = true;
                        settled = true;
                    }
                }
                NodeChange::Select { id, selected } => {
                    if self.graph.contains_node(id) {
                        self.selection.set_node(id, *selected);
                    }
                }
            }
        }

        if changed {
            self.touch();
        }
        if settled {
            self.commit_if_changed();
        }
    }

    /// Apply edge deltas. Only removals commit.
    pub fn apply_edge_changes(&mut self, changes: &[EdgeChange]) {
        let mut removed = false;

        for change in changes {
            match change {
                EdgeChange::Remove { id } => {
                    if self.graph.remove_edge(id).is_some() {
                        self.selection.set_edge(id, false);
                        removed = true;
                    }
                }
                EdgeChange::Select { id, selected } => {
                    if self.graph.contains_edge(id) {
                        self.selection.set_edge(id, *selected);
                    }
                }
            }
        }

        if removed {
            self.touch();
            self.commit();
        }
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo().cloned() else {
            return false;
        };
        self.restore(snapshot);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo().cloned() else {
            return false;
        };
        self.restore(snapshot);
        true
    }

    fn restore(&mut self, snapshot: GraphSnapshot) {
        self.graph.replace(snapshot.nodes, snapshot.edges);
        self.selection.retain_existing(&self.graph);
        self.touch();
    }
}
