// SPDX-License-Identifier: MIT

//! Undo/redo history using immutable graph snapshots
//!
//! Every entry is an independently owned copy of the node and edge sets.
//! Entries are shared only inside the log (`Arc`); whatever leaves the log
//! to be installed into the live model is cloned again, so later edits can
//! never reach back into history.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::graph::{Edge, Node};

/// Maximum number of entries kept in the log
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Immutable copy of the graph at one point in time
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    pub fn new(nodes: &[Node], edges: &[Edge]) -> Self {
        Self {
            nodes: nodes.to_vec(),
            edges: edges.to_vec(),
        }
    }
}

/// Linear, bounded undo/redo log with a cursor at the materialized entry
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Arc<GraphSnapshot>>,
    index: usize,
    limit: usize,
}

impl History {
    /// Create an empty history keeping at most `limit` entries
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            index: 0,
            limit: limit.max(1),
        }
    }

    /// Record a new entry after the cursor.
    ///
    /// Anything after the cursor (redo history) is discarded first.
    pub fn save(&mut self, nodes: &[Node], edges: &[Edge]) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.index + 1);
        }

        self.entries
            .push_back(Arc::new(GraphSnapshot::new(nodes, edges)));

        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
        self.index = self.entries.len() - 1;
    }

    /// Step back one entry, or `None` at the beginning
    pub fn undo(&mut self) -> Option<&GraphSnapshot> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        self.entries.get(self.index).map(|s| s.as_ref())
    }

    /// Step forward one entry, or `None` at the end
    pub fn redo(&mut self) -> Option<&GraphSnapshot> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        self.entries.get(self.index).map(|s| s.as_ref())
    }

    /// Entry under the cursor
    pub fn current(&self) -> Option<&GraphSnapshot> {
        self.entries.get(self.index).map(|s| s.as_ref())
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index = 0;
    }

    /// Clear and start over from a single entry (new or loaded document)
    pub fn reset(&mut self, nodes: &[Node], edges: &[Edge]) {
        self.clear();
        self.save(nodes, edges);
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
