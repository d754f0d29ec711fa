// SPDX-License-Identifier: MIT

//! Drives remote runs against the editor's graph
//!
//! The editor lock is taken only between suspension points. Every stream
//! event is checked against the active execution id, so a cancelled or
//! superseded run can never write into the graph. Each run also waits on a
//! signal fired when its execution ends, so a cancel stops a stalled stream
//! without waiting for the next chunk.

use std::sync::Arc;

use futures::StreamExt;

use super::backend::ExecutionBackend;
use super::decoder::NdjsonDecoder;
use super::types::{Execution, ExecutionStatus, NodeResult, RunRequest, StepRequest, StreamEvent};
use crate::editor::SharedEditor;
use crate::error::StudioError;
use crate::graph::{NodeStatus, ValueMap};
use crate::validator::validate;

#[derive(Clone)]
pub struct ExecutionOrchestrator {
    editor: SharedEditor,
    backend: Arc<dyn ExecutionBackend>,
}

impl ExecutionOrchestrator {
    pub fn new(editor: SharedEditor, backend: Arc<dyn ExecutionBackend>) -> Self {
        Self { editor, backend }
    }

    pub fn editor(&self) -> &SharedEditor {
        &self.editor
    }

    /// Run the current flow to a terminal status.
    ///
    /// Returns `None` without a flow or when validation blocks the run.
    /// Starting a run while another is active cancels the older one first.
    pub async fn execute_flow(&self, global_inputs: ValueMap) -> Option<Execution> {
        if self.cancel_execution() {
            log::info!("Superseded the active execution");
        }

        let (execution_id, request, ended) = {
            let mut editor = self.editor.lock();
            let flow_id = editor.current_flow()?.id.clone();

            let report = validate(editor.nodes(), editor.edges());
            if !report.is_valid() {
                let message = report.messages().join("; ");
                log::warn!("Flow {} failed validation: {}", flow_id, message);
                editor.set_error(message);
                return None;
            }

            let execution = Execution::new(flow_id.clone(), global_inputs.clone());
            let execution_id = execution.id.clone();
            let ended = editor.begin_execution(execution);

            let request = RunRequest {
                execution_id: execution_id.clone(),
                flow_id,
                nodes: editor.nodes().to_vec(),
                edges: editor.edges().to_vec(),
                global_inputs,
            };
            (execution_id, request, ended)
        };

        log::info!(
            "Starting execution {} for flow {} ({} nodes)",
            execution_id,
            request.flow_id,
            request.nodes.len()
        );

        let started = tokio::select! {
            started = self.backend.start_run(request) => started,
            _ = ended.notified() => return self.abandon(&execution_id),
        };
        let mut stream = match started {
            Ok(stream) => stream,
            Err(e) => return self.fail(&execution_id, e),
        };

        let mut decoder = NdjsonDecoder::new();
        loop {
            let chunk = tokio::select! {
                chunk = stream.next() => chunk,
                _ = ended.notified() => return self.abandon(&execution_id),
            };
            let Some(chunk) = chunk else {
                break;
            };
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => return self.fail(&execution_id, e),
            };
            for event in decoder.push(&bytes) {
                if !self.apply_event(&execution_id, event) {
                    return self.abandon(&execution_id);
                }
            }
        }

        if let Some(event) = decoder.finish() {
            if !self.apply_event(&execution_id, event) {
                return self.abandon(&execution_id);
            }
        }
        if decoder.skipped() > 0 {
            log::warn!(
                "Execution {} skipped {} malformed records",
                execution_id,
                decoder.skipped()
            );
        }

        let finished = self
            .editor
            .lock()
            .finish_execution(&execution_id, ExecutionStatus::Completed, None);
        match finished {
            Some(execution) => {
                log::info!("Execution {} completed", execution_id);
                Some(execution)
            }
            None => self.snapshot(&execution_id),
        }
    }

    /// Stop the active run.
    ///
    /// The local execution flips to `cancelled` immediately. The run task
    /// wakes, drops its stream and asks the backend to stop on a spawned
    /// task. Returns false when nothing was running.
    pub fn cancel_execution(&self) -> bool {
        match self.editor.lock().cancel_active() {
            Some(id) => {
                log::info!("Cancelled execution {}", id);
                true
            }
            None => false,
        }
    }

    /// Run a single node in isolation.
    ///
    /// Returns `None` for an unknown node. A failed call still returns a
    /// result carrying the error. Concurrent steps of one node race and the
    /// last response wins.
    pub async fn step_execute(&self, node_id: &str) -> Option<NodeResult> {
        let request = {
            let mut editor = self.editor.lock();
            let node = editor.node(node_id)?;
            let request = StepRequest {
                node_id: node_id.to_string(),
                config: node.data.config.clone(),
                inputs: node.data.inputs.clone(),
            };
            editor.set_node_status(node_id, NodeStatus::Running, None);
            request
        };

        log::info!("Executing node {}", node_id);
        let (status, result) = match self.backend.execute_node(request).await {
            Ok(result) if result.error.is_some() => (NodeStatus::Failed, result),
            Ok(result) => (NodeStatus::Completed, result),
            Err(e) => {
                log::error!("Node {} failed: {}", node_id, e);
                let result = NodeResult {
                    error: Some(e.to_string()),
                    ..Default::default()
                };
                (NodeStatus::Failed, result)
            }
        };

        if !self
            .editor
            .lock()
            .set_node_status(node_id, status, Some(&result))
        {
            log::debug!("Node {} was removed before its step finished", node_id);
        }
        Some(result)
    }

    /// Apply one decoded event. False means the run is no longer active.
    fn apply_event(&self, execution_id: &str, event: StreamEvent) -> bool {
        match event {
            StreamEvent::NodeStatus {
                node_id,
                status,
                result,
            } => self.editor.lock().apply_execution_event(
                execution_id,
                &node_id,
                status,
                result.as_ref(),
            ),
            StreamEvent::Unknown => {
                log::debug!("Ignoring unknown event in execution {}", execution_id);
                true
            }
        }
    }

    /// Stop reading a run that is no longer active and notify the backend
    fn abandon(&self, execution_id: &str) -> Option<Execution> {
        log::debug!("Execution {} is no longer active, dropping stream", execution_id);

        let backend = Arc::clone(&self.backend);
        let id = execution_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = backend.cancel(&id).await {
                log::warn!("Backend cancel for {} failed: {}", id, e);
            }
        });
        self.snapshot(execution_id)
    }

    fn fail(&self, execution_id: &str, error: StudioError) -> Option<Execution> {
        log::error!("Execution {} failed: {}", execution_id, error);
        let message = format!("Execution failed: {}", error);
        let finished = self.editor.lock().finish_execution(
            execution_id,
            ExecutionStatus::Failed,
            Some(message),
        );
        finished.or_else(|| self.snapshot(execution_id))
    }

    /// The editor's record of run `execution_id`, if it is still the latest
    fn snapshot(&self, execution_id: &str) -> Option<Execution> {
        self.editor
            .lock()
            .execution()
            .filter(|e| e.id == execution_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::FlowEditor;
    use crate::error::Result;
    use crate::execution::backend::ByteStream;
    use crate::graph::{Edge, EdgeData, Flow, Node, Position};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Backend replaying fixed chunks and recording what it was asked
    #[derive(Default)]
    struct ScriptedBackend {
        chunks: Vec<&'static str>,
        fail_after: Option<usize>,
        refuse: bool,
        step_error: bool,
        runs: Mutex<Vec<RunRequest>>,
        steps: Mutex<Vec<StepRequest>>,
    }

    #[async_trait]
    impl ExecutionBackend for ScriptedBackend {
        async fn start_run(&self, request: RunRequest) -> Result<ByteStream> {
            self.runs.lock().push(request);
            if self.refuse {
                return Err(StudioError::api("execution", "500 Internal Server Error"));
            }
            let mut items: Vec<Result<Vec<u8>>> = self
                .chunks
                .iter()
                .map(|c| Ok(c.as_bytes().to_vec()))
                .collect();
            if let Some(n) = self.fail_after {
                items.truncate(n);
                items.push(Err(StudioError::other("connection reset")));
            }
            Ok(Box::pin(futures::stream::iter(items)))
        }

        async fn cancel(&self, _execution_id: &str) -> Result<()> {
            Ok(())
        }

        async fn execute_node(&self, request: StepRequest) -> Result<NodeResult> {
            self.steps.lock().push(request);
            if self.step_error {
                return Err(StudioError::api("execution", "502 Bad Gateway"));
            }
            Ok(NodeResult {
                outputs: Some(json!({"body": "ok"}).as_object().unwrap().clone()),
                execution_time: Some(12.5),
                error: None,
            })
        }
    }

    fn connected_editor() -> SharedEditor {
        let mut flow = Flow::new("Run me", "");
        let mut fetch = Node::new("a", "http", Position::new(0.0, 0.0));
        fetch.data.config.insert("url".to_string(), json!("https://example.com"));
        flow.nodes.push(fetch);
        flow.nodes.push(Node::new("b", "transform", Position::new(200.0, 0.0)));
        flow.edges.push(Edge {
            id: "e1".to_string(),
            source: "a".to_string(),
            target: "b".to_string(),
            data: EdgeData::default(),
        });

        let mut editor = FlowEditor::new();
        editor.install_flow(flow);
        editor.into_shared()
    }

    fn orchestrator(backend: ScriptedBackend) -> (ExecutionOrchestrator, Arc<ScriptedBackend>) {
        let backend = Arc::new(backend);
        let orchestrator = ExecutionOrchestrator::new(connected_editor(), backend.clone());
        (orchestrator, backend)
    }

    #[tokio::test]
    async fn test_execute_flow_applies_split_events() {
        let (orchestrator, backend) = orchestrator(ScriptedBackend {
            chunks: vec![
                "{\"type\":\"node_status\",\"nodeId\":\"a\",\"status\":\"running\"}\n{\"type\":\"node_st",
                "atus\",\"nodeId\":\"a\",\"status\":\"completed\",\"result\":{\"outputs\":{\"x\":1},\"executionTime\":8}}\n",
                "{\"type\":\"log\",\"message\":\"hello\"}\n",
                "{\"type\":\"node_status\",\"nodeId\":\"b\",\"status\":\"completed\"}",
            ],
            ..Default::default()
        });
        let history_before = orchestrator.editor().lock().history_len();

        let execution = orchestrator.execute_flow(ValueMap::new()).await.unwrap();

        assert_eq!(execution.status, ExecutionStatus::Completed);
        assert!(execution.ended_at.is_some());
        assert_eq!(execution.results["a"].outputs.as_ref().unwrap()["x"], 1);

        let editor = orchestrator.editor().lock();
        let a = editor.node("a").unwrap();
        assert_eq!(a.data.status, NodeStatus::Completed);
        assert_eq!(a.data.outputs["x"], 1);
        assert_eq!(a.data.execution_time, Some(8.0));
        assert_eq!(editor.node("b").unwrap().data.status, NodeStatus::Completed);
        assert_eq!(editor.history_len(), history_before);
        assert!(!editor.is_executing());
        assert!(!editor.is_dirty());

        let runs = backend.runs.lock();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].execution_id, execution.id);
        assert_eq!(runs[0].nodes.len(), 2);
        assert_eq!(runs[0].edges.len(), 1);
    }

    #[tokio::test]
    async fn test_execute_flow_without_flow() {
        let backend = Arc::new(ScriptedBackend::default());
        let orchestrator =
            ExecutionOrchestrator::new(FlowEditor::new().into_shared(), backend.clone());

        assert!(orchestrator.execute_flow(ValueMap::new()).await.is_none());
        assert!(backend.runs.lock().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_flow_blocks_run() {
        let (orchestrator, backend) = orchestrator(ScriptedBackend::default());
        {
            let mut editor = orchestrator.editor().lock();
            let mut flow = editor.flow_document().unwrap();
            flow.edges.push(Edge {
                id: "dangling".to_string(),
                source: "a".to_string(),
                target: "ghost".to_string(),
                data: EdgeData::default(),
            });
            editor.install_flow(flow);
        }

        assert!(orchestrator.execute_flow(ValueMap::new()).await.is_none());

        let editor = orchestrator.editor().lock();
        assert!(editor
            .error()
            .unwrap()
            .contains("Edge 'dangling' references missing node 'ghost'"));
        assert!(editor.execution().is_none());
        assert!(backend.runs.lock().is_empty());
    }

    #[tokio::test]
    async fn test_start_failure_marks_failed() {
        let (orchestrator, _) = orchestrator(ScriptedBackend {
            refuse: true,
            ..Default::default()
        });

        let execution = orchestrator.execute_flow(ValueMap::new()).await.unwrap();

        assert_eq!(execution.status, ExecutionStatus::Failed);
        let editor = orchestrator.editor().lock();
        assert!(!editor.is_executing());
        assert!(editor.error().unwrap().starts_with("Execution failed"));
    }

    #[tokio::test]
    async fn test_mid_stream_failure_keeps_applied_events() {
        let (orchestrator, _) = orchestrator(ScriptedBackend {
            chunks: vec!["{\"type\":\"node_status\",\"nodeId\":\"a\",\"status\":\"completed\"}\n"],
            fail_after: Some(1),
            ..Default::default()
        });

        let execution = orchestrator.execute_flow(ValueMap::new()).await.unwrap();

        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert!(execution.error.unwrap().contains("connection reset"));
        let editor = orchestrator.editor().lock();
        assert_eq!(editor.node("a").unwrap().data.status, NodeStatus::Completed);
        assert!(!editor.is_executing());
    }

    #[tokio::test]
    async fn test_cancel_without_run() {
        let (orchestrator, _) = orchestrator(ScriptedBackend::default());
        assert!(!orchestrator.cancel_execution());
    }

    #[tokio::test]
    async fn test_step_execute_success() {
        let (orchestrator, backend) = orchestrator(ScriptedBackend::default());

        let result = orchestrator.step_execute("a").await.unwrap();

        assert_eq!(result.execution_time, Some(12.5));
        let editor = orchestrator.editor().lock();
        let a = editor.node("a").unwrap();
        assert_eq!(a.data.status, NodeStatus::Completed);
        assert_eq!(a.data.outputs["body"], "ok");
        assert!(editor.execution().is_none());

        let steps = backend.steps.lock();
        assert_eq!(steps[0].node_id, "a");
        assert_eq!(steps[0].config["url"], "https://example.com");
    }

    #[tokio::test]
    async fn test_step_execute_failure() {
        let (orchestrator, _) = orchestrator(ScriptedBackend {
            step_error: true,
            ..Default::default()
        });

        let result = orchestrator.step_execute("b").await.unwrap();

        assert!(result.error.as_ref().unwrap().contains("502"));
        let editor = orchestrator.editor().lock();
        let b = editor.node("b").unwrap();
        assert_eq!(b.data.status, NodeStatus::Failed);
        assert!(b.data.error.is_some());
    }

    #[tokio::test]
    async fn test_step_execute_unknown_node() {
        let (orchestrator, backend) = orchestrator(ScriptedBackend::default());
        assert!(orchestrator.step_execute("missing").await.is_none());
        assert!(backend.steps.lock().is_empty());
    }
}
