// SPDX-License-Identifier: MIT

//! Execution records and wire types for the execution service

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::{Edge, Node, NodeStatus, ValueMap};

/// Lifecycle status of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Result returned for one node, either in a stream event or by a step run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<ValueMap>,
    /// Milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NodeResult {
    /// Merge a later result for the same node into this one
    pub fn merge(&mut self, other: &NodeResult) {
        if let Some(outputs) = &other.outputs {
            let merged = self.outputs.get_or_insert_with(ValueMap::new);
            for (key, value) in outputs {
                merged.insert(key.clone(), value.clone());
            }
        }
        if other.execution_time.is_some() {
            self.execution_time = other.execution_time;
        }
        if other.error.is_some() {
            self.error = other.error.clone();
        }
    }
}

/// One run of a flow, from start to terminal status. Never reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub id: String,
    pub flow_id: String,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Accumulated per-node results
    #[serde(default)]
    pub results: HashMap<String, NodeResult>,
    #[serde(default)]
    pub global_inputs: ValueMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Execution {
    /// A new pending execution with a fresh id
    pub fn new(flow_id: impl Into<String>, global_inputs: ValueMap) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            flow_id: flow_id.into(),
            status: ExecutionStatus::Pending,
            started_at: Utc::now(),
            ended_at: None,
            results: HashMap::new(),
            global_inputs,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// pending -> running
    pub fn start(&mut self) -> bool {
        if self.status != ExecutionStatus::Pending {
            return false;
        }
        self.status = ExecutionStatus::Running;
        self.started_at = Utc::now();
        true
    }

    /// Move to a terminal status. Terminal executions never transition again.
    pub fn finish(&mut self, status: ExecutionStatus, error: Option<String>) -> bool {
        if self.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        self.ended_at = Some(Utc::now());
        self.error = error;
        true
    }

    /// Accumulate a node result
    pub fn record(&mut self, node_id: &str, result: &NodeResult) {
        self.results
            .entry(node_id.to_string())
            .or_default()
            .merge(result);
    }
}

/// A decoded record from the execution stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    #[serde(rename_all = "camelCase")]
    NodeStatus {
        node_id: String,
        status: NodeStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<NodeResult>,
    },
    /// Any other record type; ignored by the orchestrator
    #[serde(other)]
    Unknown,
}

/// Body of a whole-flow run request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub execution_id: String,
    pub flow_id: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub global_inputs: ValueMap,
}

/// Body of a single-node run request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRequest {
    #[serde(skip)]
    pub node_id: String,
    pub config: ValueMap,
    pub inputs: ValueMap,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_execution_state_machine() {
        let mut execution = Execution::new("flow-1", ValueMap::new());
        assert_eq!(execution.status, ExecutionStatus::Pending);

        assert!(execution.start());
        assert_eq!(execution.status, ExecutionStatus::Running);
        assert!(!execution.start());

        assert!(execution.finish(ExecutionStatus::Completed, None));
        assert!(execution.ended_at.is_some());

        // Terminal: no further transitions
        assert!(!execution.finish(ExecutionStatus::Failed, Some("late".to_string())));
        assert_eq!(execution.status, ExecutionStatus::Completed);
        assert!(execution.error.is_none());
    }

    #[test]
    fn test_finish_requires_terminal_target() {
        let mut execution = Execution::new("flow-1", ValueMap::new());
        execution.start();
        assert!(!execution.finish(ExecutionStatus::Running, None));
        assert!(!execution.is_terminal());
    }

    #[test]
    fn test_executions_get_distinct_ids() {
        let a = Execution::new("f", ValueMap::new());
        let b = Execution::new("f", ValueMap::new());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_record_merges_results() {
        let mut execution = Execution::new("f", ValueMap::new());
        execution.record(
            "n1",
            &NodeResult {
                outputs: Some(json!({"a": 1}).as_object().unwrap().clone()),
                ..Default::default()
            },
        );
        execution.record(
            "n1",
            &NodeResult {
                outputs: Some(json!({"b": 2}).as_object().unwrap().clone()),
                execution_time: Some(5.0),
                error: None,
            },
        );

        let result = &execution.results["n1"];
        let outputs = result.outputs.as_ref().unwrap();
        assert_eq!(outputs["a"], 1);
        assert_eq!(outputs["b"], 2);
        assert_eq!(result.execution_time, Some(5.0));
    }

    #[test]
    fn test_node_status_event_wire_format() {
        let event: StreamEvent = serde_json::from_value(json!({
            "type": "node_status",
            "nodeId": "n1",
            "status": "completed",
            "result": {"outputs": {"x": 1}, "executionTime": 3}
        }))
        .unwrap();

        match event {
            StreamEvent::NodeStatus {
                node_id,
                status,
                result,
            } => {
                assert_eq!(node_id, "n1");
                assert_eq!(status, NodeStatus::Completed);
                let result = result.unwrap();
                assert_eq!(result.outputs.unwrap()["x"], 1);
                assert_eq!(result.execution_time, Some(3.0));
            }
            StreamEvent::Unknown => panic!("Expected NodeStatus"),
        }
    }

    #[test]
    fn test_unknown_event_type() {
        let event: StreamEvent =
            serde_json::from_value(json!({"type": "heartbeat"})).unwrap();
        assert_eq!(event, StreamEvent::Unknown);
    }

    #[test]
    fn test_run_request_shape() {
        let request = RunRequest {
            execution_id: "x".to_string(),
            flow_id: "f".to_string(),
            nodes: vec![],
            edges: vec![],
            global_inputs: json!({"k": "v"}).as_object().unwrap().clone(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["globalInputs"]["k"], "v");
        assert_eq!(value["executionId"], "x");
        assert!(value["nodes"].is_array());
    }

    #[test]
    fn test_step_request_omits_node_id() {
        let request = StepRequest {
            node_id: "n1".to_string(),
            config: ValueMap::new(),
            inputs: ValueMap::new(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("nodeId").is_none());
        assert!(value["config"].is_object());
    }
}
