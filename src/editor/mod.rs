// SPDX-License-Identifier: MIT

//! Editor state container
//!
//! `FlowEditor` owns the graph model, the undo/redo history, the selection
//! and the flags the rendering layer reads. Every change goes through a verb
//! (see `operations`); callers never reach into the model directly.
//!
//! Async collaborators (`FlowLifecycle`, `ExecutionOrchestrator`) share the
//! editor as a [`SharedEditor`] and only lock it between suspension points.

mod operations;
mod selection;

pub use operations::DUPLICATE_OFFSET;
pub use selection::Selection;

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Notify;

use crate::execution::{Execution, ExecutionStatus, NodeResult};
use crate::graph::{Edge, Flow, FlowMetadataPatch, GraphModel, Node, NodeStatus};
use crate::history::{History, DEFAULT_HISTORY_LIMIT};

/// Editor handle shared between the UI side and async collaborators
pub type SharedEditor = Arc<Mutex<FlowEditor>>;

/// Read-only projection consumed by the rendering layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorView {
    pub flow_id: Option<String>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub selected_nodes: Vec<String>,
    pub selected_edges: Vec<String>,
    pub is_dirty: bool,
    pub is_loading: bool,
    pub error: Option<String>,
    pub is_executing: bool,
    pub can_undo: bool,
    pub can_redo: bool,
}

#[derive(Debug, Clone)]
pub struct FlowEditor {
    flow: Option<Flow>,
    graph: GraphModel,
    history: History,
    selection: Selection,
    dirty: bool,
    loading: bool,
    error: Option<String>,
    execution: Option<Execution>,
    /// Fired when the active execution ends for any reason
    cancel_signal: Option<Arc<Notify>>,
    /// Bumped on every graph or metadata edit
    revision: u64,
    /// Bumped whenever a different document is installed
    document: u64,
}

impl FlowEditor {
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(limit: usize) -> Self {
        let graph = GraphModel::new();
        let mut history = History::new(limit);
        history.reset(graph.nodes(), graph.edges());

        Self {
            flow: None,
            graph,
            history,
            selection: Selection::default(),
            dirty: false,
            loading: false,
            error: None,
            execution: None,
            cancel_signal: None,
            revision: 0,
            document: 0,
        }
    }

    /// Wrap into a shareable handle
    pub fn into_shared(self) -> SharedEditor {
        Arc::new(Mutex::new(self))
    }

    // ------------------------------------------------------------------
    // Projections
    // ------------------------------------------------------------------

    pub fn current_flow(&self) -> Option<&Flow> {
        self.flow.as_ref()
    }

    pub fn graph(&self) -> &GraphModel {
        &self.graph
    }

    pub fn nodes(&self) -> &[Node] {
        self.graph.nodes()
    }

    pub fn edges(&self) -> &[Edge] {
        self.graph.edges()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.graph.node(id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.graph.edge(id)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected_nodes(&self) -> Vec<String> {
        self.selection.nodes().iter().cloned().collect()
    }

    pub fn selected_edges(&self) -> Vec<String> {
        self.selection.edges().iter().cloned().collect()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Most recent execution, active or terminal
    pub fn execution(&self) -> Option<&Execution> {
        self.execution.as_ref()
    }

    pub fn is_executing(&self) -> bool {
        self.execution.as_ref().is_some_and(|e| !e.is_terminal())
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn view(&self) -> EditorView {
        EditorView {
            flow_id: self.flow.as_ref().map(|f| f.id.clone()),
            nodes: self.graph.nodes().to_vec(),
            edges: self.graph.edges().to_vec(),
            selected_nodes: self.selected_nodes(),
            selected_edges: self.selected_edges(),
            is_dirty: self.dirty,
            is_loading: self.loading,
            error: self.error.clone(),
            is_executing: self.is_executing(),
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        }
    }

    /// Dismiss the visible error message
    pub fn clear_error(&mut self) {
        self.error = None;
    }

    // ------------------------------------------------------------------
    // Lifecycle hooks
    // ------------------------------------------------------------------

    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn document(&self) -> u64 {
        self.document
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub(crate) fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Make `flow` the current document: graph, clean flags, fresh history.
    ///
    /// A run of the previous document is cancelled and forgotten.
    pub(crate) fn install_flow(&mut self, mut flow: Flow) {
        if let Some(id) = self.cancel_active() {
            log::info!("Cancelled execution {} of the closed document", id);
        }
        self.execution = None;

        let nodes = std::mem::take(&mut flow.nodes);
        let edges = std::mem::take(&mut flow.edges);

        self.graph.replace(nodes, edges);
        self.history.reset(self.graph.nodes(), self.graph.edges());
        self.selection.clear();
        self.flow = Some(flow);
        self.dirty = false;
        self.error = None;
        self.revision += 1;
        self.document += 1;
    }

    /// Current flow document with the live graph merged in
    pub(crate) fn flow_document(&self) -> Option<Flow> {
        let mut flow = self.flow.clone()?;
        flow.nodes = self.graph.nodes().to_vec();
        flow.edges = self.graph.edges().to_vec();
        Some(flow)
    }

    /// Adopt the stored copy returned by a save started at (`document`,
    /// `revision`). Returns false when another document was installed in the
    /// meantime; the stored copy is then dropped.
    pub(crate) fn complete_save(&mut self, mut saved: Flow, document: u64, revision: u64) -> bool {
        let same_flow = self.flow.as_ref().is_some_and(|f| f.id == saved.id);
        if self.document != document || !same_flow {
            log::info!("Flow {} was closed while saving; not reinstalling it", saved.id);
            return false;
        }

        saved.nodes.clear();
        saved.edges.clear();
        self.flow = Some(saved);
        self.error = None;
        if self.revision == revision {
            self.dirty = false;
        } else {
            log::debug!("Graph edited while saving; keeping dirty flag");
        }
        true
    }

    pub(crate) fn apply_flow_metadata(&mut self, patch: &FlowMetadataPatch) -> bool {
        let Some(flow) = self.flow.as_mut() else {
            return false;
        };
        if let Some(name) = &patch.name {
            flow.name = name.clone();
        }
        if let Some(description) = &patch.description {
            flow.description = description.clone();
        }
        if let Some(variables) = &patch.global_variables {
            for (key, value) in variables {
                flow.global_variables.insert(key.clone(), value.clone());
            }
        }
        self.touch();
        true
    }

    // ------------------------------------------------------------------
    // Execution hooks. None of these touch history.
    // ------------------------------------------------------------------

    pub(crate) fn active_execution_id(&self) -> Option<&str> {
        self.execution
            .as_ref()
            .filter(|e| !e.is_terminal())
            .map(|e| e.id.as_str())
    }

    /// Reset every node to idle and make `execution` the active run.
    ///
    /// Returns the signal fired when this run is finished or cancelled.
    pub(crate) fn begin_execution(&mut self, mut execution: Execution) -> Arc<Notify> {
        self.cancel_active();
        for node in self.graph.nodes_mut() {
            node.data.reset_runtime();
        }
        execution.start();
        self.error = None;
        self.execution = Some(execution);

        let signal = Arc::new(Notify::new());
        self.cancel_signal = Some(Arc::clone(&signal));
        signal
    }

    /// Move the active run to `cancelled`, returning its id
    pub(crate) fn cancel_active(&mut self) -> Option<String> {
        let id = self.active_execution_id()?.to_string();
        self.finish_execution(&id, ExecutionStatus::Cancelled, None);
        Some(id)
    }

    /// Apply a status event from run `execution_id`. Returns false when that
    /// run is no longer the active one.
    pub(crate) fn apply_execution_event(
        &mut self,
        execution_id: &str,
        node_id: &str,
        status: NodeStatus,
        result: Option<&NodeResult>,
    ) -> bool {
        if self.active_execution_id() != Some(execution_id) {
            return false;
        }
        if let (Some(execution), Some(result)) = (self.execution.as_mut(), result) {
            execution.record(node_id, result);
        }
        if !self.set_node_status(node_id, status, result) {
            log::debug!("Status event for unknown node {}", node_id);
        }
        true
    }

    /// Write a node's runtime status directly
    pub(crate) fn set_node_status(
        &mut self,
        node_id: &str,
        status: NodeStatus,
        result: Option<&NodeResult>,
    ) -> bool {
        match self.graph.node_mut(node_id) {
            Some(node) => {
                node.data.apply_result(status, result);
                true
            }
            None => false,
        }
    }

    /// Move run `execution_id` to a terminal status if it is still active
    pub(crate) fn finish_execution(
        &mut self,
        execution_id: &str,
        status: ExecutionStatus,
        error: Option<String>,
    ) -> Option<Execution> {
        if self.active_execution_id() != Some(execution_id) {
            return None;
        }
        let execution = self.execution.as_mut()?;
        execution.finish(status, error.clone());
        let finished = execution.clone();
        if let Some(message) = error {
            self.error = Some(message);
        }
        if let Some(signal) = self.cancel_signal.take() {
            signal.notify_one();
        }
        Some(finished)
    }

    // ------------------------------------------------------------------
    // Commit helpers used by the verbs
    // ------------------------------------------------------------------

    fn touch(&mut self) {
        self.dirty = true;
        self.revision += 1;
    }

    fn commit(&mut self) {
        self.history.save(self.graph.nodes(), self.graph.edges());
    }

    /// Commit only if the graph differs from the entry under the cursor
    fn commit_if_changed(&mut self) -> bool {
        let unchanged = self.history.current().is_some_and(|snapshot| {
            snapshot.nodes.len() == self.graph.nodes().len()
                && snapshot
                    .nodes
                    .iter()
                    .zip(self.graph.nodes())
                    .all(|(a, b)| a.same_design(b))
                && snapshot.edges == self.graph.edges()
        });
        if unchanged {
            return false;
        }
        self.commit();
        true
    }
}

impl Default for FlowEditor {
    fn default() -> Self {
        Self::new()
    }
}
