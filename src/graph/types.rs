// SPDX-License-Identifier: MIT

//! Flow graph type definitions
//!
//! This module defines the document shapes exchanged with persistence and
//! the rendering layer: nodes, edges, flows, and the partial updates and
//! change deltas applied to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::execution::NodeResult;

/// Free-form JSON object used for config, inputs, outputs and variables
pub type ValueMap = Map<String, Value>;

/// Spatial position of a node on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Return this position shifted by (dx, dy)
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Runtime status of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Data payload carried by a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    /// Display label
    pub label: String,
    /// Component type tag selecting node behavior
    pub component_type: String,
    #[serde(default)]
    pub config: ValueMap,
    #[serde(default)]
    pub inputs: ValueMap,
    #[serde(default)]
    pub outputs: ValueMap,
    #[serde(default)]
    pub status: NodeStatus,
    /// Duration of the last execution in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    /// Error message of the last failed execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NodeData {
    /// Fresh data for a node of the given component type
    pub fn new(component_type: impl Into<String>) -> Self {
        let component_type = component_type.into();
        Self {
            label: component_type.clone(),
            component_type,
            config: ValueMap::new(),
            inputs: ValueMap::new(),
            outputs: ValueMap::new(),
            status: NodeStatus::Idle,
            execution_time: None,
            error: None,
        }
    }

    /// Clear everything a previous run left behind
    pub fn reset_runtime(&mut self) {
        self.status = NodeStatus::Idle;
        self.outputs.clear();
        self.execution_time = None;
        self.error = None;
    }

    /// Apply a status transition and merge any returned result
    pub fn apply_result(&mut self, status: NodeStatus, result: Option<&NodeResult>) {
        self.status = status;
        if status == NodeStatus::Running {
            self.error = None;
        }

        let Some(result) = result else {
            return;
        };

        if let Some(outputs) = &result.outputs {
            for (key, value) in outputs {
                self.outputs.insert(key.clone(), value.clone());
            }
        }
        if let Some(ms) = result.execution_time {
            self.execution_time = Some(ms);
        }
        if let Some(error) = &result.error {
            self.error = Some(error.clone());
        }
    }
}

/// A computation node in the flow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    /// Renderer node kind, carried through untouched
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default)]
    pub position: Position,
    pub data: NodeData,
}

impl Node {
    pub fn new(id: impl Into<String>, component_type: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            node_type: None,
            position,
            data: NodeData::new(component_type),
        }
    }

    /// Equal apart from runtime state (status, outputs, duration, error)
    pub fn same_design(&self, other: &Node) -> bool {
        self.id == other.id
            && self.node_type == other.node_type
            && self.position == other.position
            && self.data.label == other.data.label
            && self.data.component_type == other.data.component_type
            && self.data.config == other.data.config
            && self.data.inputs == other.data.inputs
    }
}

/// Edge-local data: connection points and the carried value's type
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

/// A directed connection between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub data: EdgeData,
}

impl Edge {
    /// Whether either endpoint is the given node
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// A proposed connection coming from the rendering layer
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub source_handle: Option<String>,
    #[serde(default)]
    pub target_handle: Option<String>,
    #[serde(default)]
    pub data_type: Option<String>,
}

impl Connection {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            ..Default::default()
        }
    }

    pub fn with_handles(mut self, source_handle: &str, target_handle: &str) -> Self {
        self.source_handle = Some(source_handle.to_string());
        self.target_handle = Some(target_handle.to_string());
        self
    }

    /// Whether an existing edge already represents this connection
    pub fn matches(&self, edge: &Edge) -> bool {
        edge.source == self.source
            && edge.target == self.target
            && edge.data.source_handle == self.source_handle
            && edge.data.target_handle == self.target_handle
    }
}

/// A persisted flow document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Variables available to every node
    #[serde(default)]
    pub global_variables: ValueMap,
    #[serde(default)]
    pub metadata: ValueMap,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Flow {
    /// Create an empty flow with a fresh id
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: description.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            global_variables: ValueMap::new(),
            metadata: ValueMap::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a node's data. Absent fields are left untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDataPatch {
    pub label: Option<String>,
    pub component_type: Option<String>,
    pub config: Option<ValueMap>,
    pub inputs: Option<ValueMap>,
    pub outputs: Option<ValueMap>,
    pub status: Option<NodeStatus>,
    pub execution_time: Option<f64>,
    pub error: Option<String>,
}

impl NodeDataPatch {
    /// Config and declared inputs are the user-authored parts of a node;
    /// everything else is cosmetic or runtime state.
    pub fn touches_history(&self) -> bool {
        self.config.is_some() || self.inputs.is_some()
    }

    /// Merge into `data`, returning whether anything changed
    pub fn apply(&self, data: &mut NodeData) -> bool {
        let before = data.clone();

        if let Some(label) = &self.label {
            data.label = label.clone();
        }
        if let Some(component_type) = &self.component_type {
            data.component_type = component_type.clone();
        }
        if let Some(config) = &self.config {
            data.config = config.clone();
        }
        if let Some(inputs) = &self.inputs {
            data.inputs = inputs.clone();
        }
        if let Some(outputs) = &self.outputs {
            data.outputs = outputs.clone();
        }
        if let Some(status) = self.status {
            data.status = status;
        }
        if let Some(ms) = self.execution_time {
            data.execution_time = Some(ms);
        }
        if let Some(error) = &self.error {
            data.error = Some(error.clone());
        }

        *data != before
    }
}

/// Partial update of an edge's data
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDataPatch {
    pub source_handle: Option<String>,
    pub target_handle: Option<String>,
    pub data_type: Option<String>,
}

impl EdgeDataPatch {
    pub fn apply(&self, data: &mut EdgeData) -> bool {
        let before = data.clone();
        if let Some(handle) = &self.source_handle {
            data.source_handle = Some(handle.clone());
        }
        if let Some(handle) = &self.target_handle {
            data.target_handle = Some(handle.clone());
        }
        if let Some(data_type) = &self.data_type {
            data.data_type = Some(data_type.clone());
        }
        *data != before
    }
}

/// Partial update of a flow's metadata
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowMetadataPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub global_variables: Option<ValueMap>,
}

/// Node delta produced by the rendering layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeChange {
    /// Node moved. `dragging` is true for intermediate drag frames.
    Position {
        id: String,
        position: Position,
        #[serde(default)]
        dragging: bool,
    },
    Remove {
        id: String,
    },
    Select {
        id: String,
        selected: bool,
    },
}

/// Edge delta produced by the rendering layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EdgeChange {
    Remove { id: String },
    Select { id: String, selected: bool },
}
