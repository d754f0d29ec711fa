// SPDX-License-Identifier: MIT

//! Flow graph model
//!
//! This module provides the document types (nodes, edges, flows) and the
//! in-memory graph model the editor mutates.

mod model;
pub mod types;

pub use model::GraphModel;
pub use types::{
    Connection, Edge, EdgeChange, EdgeData, EdgeDataPatch, Flow, FlowMetadataPatch, Node,
    NodeChange, NodeData, NodeDataPatch, NodeStatus, Position, ValueMap,
};
