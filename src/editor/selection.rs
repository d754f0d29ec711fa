// SPDX-License-Identifier: MIT

//! UI-facing selection sets

use std::collections::BTreeSet;

use crate::graph::GraphModel;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    nodes: BTreeSet<String>,
    edges: BTreeSet<String>,
}

impl Selection {
    pub fn nodes(&self) -> &BTreeSet<String> {
        &self.nodes
    }

    pub fn edges(&self) -> &BTreeSet<String> {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Single select replaces everything; multi toggles within nodes only
    pub(crate) fn select_node(&mut self, id: &str, multi: bool) {
        if multi {
            toggle(&mut self.nodes, id);
        } else {
            self.nodes.clear();
            self.edges.clear();
            self.nodes.insert(id.to_string());
        }
    }

    pub(crate) fn select_edge(&mut self, id: &str, multi: bool) {
        if multi {
            toggle(&mut self.edges, id);
        } else {
            self.nodes.clear();
            self.edges.clear();
            self.edges.insert(id.to_string());
        }
    }

    pub(crate) fn set_node(&mut self, id: &str, selected: bool) {
        set(&mut self.nodes, id, selected);
    }

    pub(crate) fn set_edge(&mut self, id: &str, selected: bool) {
        set(&mut self.edges, id, selected);
    }

    pub(crate) fn select_all(&mut self, graph: &GraphModel) {
        self.nodes = graph.nodes().iter().map(|n| n.id.clone()).collect();
        self.edges = graph.edges().iter().map(|e| e.id.clone()).collect();
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    /// Drop ids that no longer exist in the graph
    pub(crate) fn retain_existing(&mut self, graph: &GraphModel) {
        self.nodes.retain(|id| graph.contains_node(id));
        self.edges.retain(|id| graph.contains_edge(id));
    }
}

fn toggle(set: &mut BTreeSet<String>, id: &str) {
    if !set.remove(id) {
        set.insert(id.to_string());
    }
}

fn set(set: &mut BTreeSet<String>, id: &str, selected: bool) {
    if selected {
        set.insert(id.to_string());
    } else {
        set.remove(id);
    }
}
