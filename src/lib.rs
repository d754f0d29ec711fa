// SPDX-License-Identifier: MIT

//! State core of a visual workflow editor
//!
//! A [`FlowEditor`] owns the working graph of one flow document together
//! with its undo history, selection and status flags. Collaborators work on
//! a [`SharedEditor`]:
//! - [`FlowLifecycle`] loads and saves documents through a [`FlowStore`]
//! - [`ExecutionOrchestrator`] runs the graph on an [`ExecutionBackend`] and
//!   folds the streamed node events back into the editor

pub mod config;
pub mod editor;
pub mod error;
pub mod execution;
pub mod graph;
pub mod history;
pub mod lifecycle;
pub mod store;
pub mod validator;

pub use config::ClientConfig;
pub use editor::{EditorView, FlowEditor, SharedEditor};
pub use error::{Result, StudioError};
pub use execution::{
    Execution, ExecutionBackend, ExecutionOrchestrator, ExecutionStatus, HttpExecutionBackend,
    NodeResult,
};
pub use graph::{Connection, Edge, Flow, Node, NodeData, NodeStatus, Position};
pub use history::{GraphSnapshot, History};
pub use lifecycle::FlowLifecycle;
pub use store::{FileFlowStore, FlowStore, HttpFlowStore, MemoryFlowStore};
pub use validator::{validate, ValidationIssue, ValidationReport};
