// SPDX-License-Identifier: MIT

//! Flow lifecycle: load, save, create and rename the current document
//!
//! Failures never escape these verbs. They leave the editor unchanged apart
//! from a visible error message.

use std::sync::Arc;

use crate::editor::SharedEditor;
use crate::graph::{Flow, FlowMetadataPatch};
use crate::store::FlowStore;

#[derive(Clone)]
pub struct FlowLifecycle {
    editor: SharedEditor,
    store: Arc<dyn FlowStore>,
}

impl FlowLifecycle {
    pub fn new(editor: SharedEditor, store: Arc<dyn FlowStore>) -> Self {
        Self { editor, store }
    }

    pub fn editor(&self) -> &SharedEditor {
        &self.editor
    }

    /// Fetch flow `id` and make it the current document.
    ///
    /// Returns whether the load succeeded.
    pub async fn load_flow(&self, id: &str) -> bool {
        self.editor.lock().set_loading(true);

        let result = self.store.get_flow(id).await;

        let mut editor = self.editor.lock();
        editor.set_loading(false);
        match result {
            Ok(flow) => {
                log::info!(
                    "Loaded flow {} ({} nodes, {} edges)",
                    flow.id,
                    flow.nodes.len(),
                    flow.edges.len()
                );
                editor.install_flow(flow);
                true
            }
            Err(e) => {
                log::error!("Failed to load flow {}: {}", id, e);
                editor.set_error(format!("Failed to load flow: {}", e));
                false
            }
        }
    }

    /// Persist the current graph. No-op (returns false) without a flow.
    ///
    /// If another document is opened while the save is in flight, the save
    /// still lands in the store but the editor keeps the newer document.
    pub async fn save_flow(&self) -> bool {
        let (document, generation, revision) = {
            let editor = self.editor.lock();
            let Some(mut document) = editor.flow_document() else {
                return false;
            };
            document.updated_at = chrono::Utc::now();
            (document, editor.document(), editor.revision())
        };

        let result = self.store.put_flow(&document).await;

        let mut editor = self.editor.lock();
        match result {
            Ok(saved) => {
                log::info!("Saved flow {}", saved.id);
                editor.complete_save(saved, generation, revision);
                true
            }
            Err(e) => {
                log::error!("Failed to save flow {}: {}", document.id, e);
                editor.set_error(format!("Failed to save flow: {}", e));
                false
            }
        }
    }

    /// Start a fresh, empty flow and return its id
    pub fn create_new_flow(&self, name: &str, description: &str) -> String {
        let flow = Flow::new(name, description);
        let id = flow.id.clone();
        log::info!("Created flow {} ({})", id, name);
        self.editor.lock().install_flow(flow);
        id
    }

    /// Merge name, description and global variables into the current flow
    pub fn update_flow_metadata(&self, patch: &FlowMetadataPatch) -> bool {
        self.editor.lock().apply_flow_metadata(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::FlowEditor;
    use crate::error::{Result, StudioError};
    use crate::graph::{Node, Position};
    use crate::store::MemoryFlowStore;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Notify;

    /// Store whose every call fails
    struct FailingStore;

    #[async_trait]
    impl FlowStore for FailingStore {
        async fn get_flow(&self, _id: &str) -> Result<Flow> {
            Err(StudioError::api("flow-store", "503"))
        }

        async fn put_flow(&self, _flow: &Flow) -> Result<Flow> {
            Err(StudioError::api("flow-store", "503"))
        }
    }

    /// Memory store whose writes wait until released
    #[derive(Default)]
    struct GatedStore {
        inner: MemoryFlowStore,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl FlowStore for GatedStore {
        async fn get_flow(&self, id: &str) -> Result<Flow> {
            self.inner.get_flow(id).await
        }

        async fn put_flow(&self, flow: &Flow) -> Result<Flow> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.put_flow(flow).await
        }
    }

    fn lifecycle_with(store: Arc<dyn FlowStore>) -> FlowLifecycle {
        FlowLifecycle::new(FlowEditor::new().into_shared(), store)
    }

    fn stored_flow() -> Flow {
        let mut flow = Flow::new("Stored", "from the store");
        flow.nodes.push(Node::new("a", "http", Position::new(0.0, 0.0)));
        flow.nodes.push(Node::new("b", "transform", Position::new(100.0, 0.0)));
        flow
    }

    #[tokio::test]
    async fn test_load_flow_installs_document() {
        let store = MemoryFlowStore::new();
        let flow = stored_flow();
        store.insert(flow.clone()).await;
        let lifecycle = lifecycle_with(Arc::new(store));

        assert!(lifecycle.load_flow(&flow.id).await);

        let editor = lifecycle.editor().lock();
        assert_eq!(editor.current_flow().unwrap().id, flow.id);
        assert_eq!(editor.nodes().len(), 2);
        assert!(!editor.is_dirty());
        assert!(!editor.is_loading());
        assert_eq!(editor.history_len(), 1);
        assert!(!editor.can_undo());
    }

    #[tokio::test]
    async fn test_load_failure_keeps_previous_flow() {
        let lifecycle = lifecycle_with(Arc::new(FailingStore));
        let id = lifecycle.create_new_flow("Current", "");
        let node = lifecycle
            .editor()
            .lock()
            .add_node("http", Position::default());

        assert!(!lifecycle.load_flow("other").await);

        let editor = lifecycle.editor().lock();
        assert_eq!(editor.current_flow().unwrap().id, id);
        assert!(editor.node(&node).is_some());
        assert!(!editor.is_loading());
        assert!(editor.error().unwrap().starts_with("Failed to load flow"));
    }

    #[tokio::test]
    async fn test_save_without_flow_is_noop() {
        let store = MemoryFlowStore::new();
        let lifecycle = lifecycle_with(Arc::new(store.clone()));
        assert!(!lifecycle.save_flow().await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_save_persists_graph_and_clears_dirty() {
        let store = MemoryFlowStore::new();
        let lifecycle = lifecycle_with(Arc::new(store.clone()));
        let id = lifecycle.create_new_flow("New", "");
        let node = lifecycle
            .editor()
            .lock()
            .add_node("http", Position::default());
        assert!(lifecycle.editor().lock().is_dirty());

        assert!(lifecycle.save_flow().await);

        assert!(!lifecycle.editor().lock().is_dirty());
        let stored = store.get_flow(&id).await.unwrap();
        assert_eq!(stored.nodes.len(), 1);
        assert_eq!(stored.nodes[0].id, node);
    }

    #[tokio::test]
    async fn test_save_failure_keeps_edits() {
        let lifecycle = lifecycle_with(Arc::new(FailingStore));
        lifecycle.create_new_flow("New", "");
        lifecycle
            .editor()
            .lock()
            .add_node("http", Position::default());

        assert!(!lifecycle.save_flow().await);

        let editor = lifecycle.editor().lock();
        assert!(editor.is_dirty());
        assert_eq!(editor.nodes().len(), 1);
        assert!(editor.error().unwrap().starts_with("Failed to save flow"));
    }

    #[tokio::test]
    async fn test_create_new_flow_resets_everything() {
        let lifecycle = lifecycle_with(Arc::new(MemoryFlowStore::new()));
        {
            let mut editor = lifecycle.editor().lock();
            let a = editor.add_node("http", Position::default());
            editor.select_node(&a, false);
        }

        let id = lifecycle.create_new_flow("Fresh", "empty");

        let editor = lifecycle.editor().lock();
        let flow = editor.current_flow().unwrap();
        assert_eq!(flow.id, id);
        assert_eq!(flow.name, "Fresh");
        assert!(editor.nodes().is_empty());
        assert!(editor.selected_nodes().is_empty());
        assert!(!editor.is_dirty());
        assert!(editor.error().is_none());
        assert_eq!(editor.history_len(), 1);
        assert!(editor.history().current().unwrap().nodes.is_empty());
    }

    #[tokio::test]
    async fn test_update_flow_metadata() {
        let lifecycle = lifecycle_with(Arc::new(MemoryFlowStore::new()));
        let patch = FlowMetadataPatch {
            name: Some("Renamed".to_string()),
            global_variables: Some(json!({"region": "eu"}).as_object().unwrap().clone()),
            ..Default::default()
        };

        assert!(!lifecycle.update_flow_metadata(&patch));

        lifecycle.create_new_flow("Original", "keep me");
        assert!(lifecycle.update_flow_metadata(&patch));

        let editor = lifecycle.editor().lock();
        let flow = editor.current_flow().unwrap();
        assert_eq!(flow.name, "Renamed");
        assert_eq!(flow.description, "keep me");
        assert_eq!(flow.global_variables["region"], "eu");
        assert!(editor.is_dirty());
    }

    #[tokio::test]
    async fn test_slow_save_does_not_replace_newer_document() {
        let store = Arc::new(GatedStore::default());
        let lifecycle = lifecycle_with(store.clone());
        let first = lifecycle.create_new_flow("First", "");
        lifecycle
            .editor()
            .lock()
            .add_node("http", Position::default());

        let saving = tokio::spawn({
            let lifecycle = lifecycle.clone();
            async move { lifecycle.save_flow().await }
        });
        store.entered.notified().await;

        let second = lifecycle.create_new_flow("Second", "");
        let node = lifecycle
            .editor()
            .lock()
            .add_node("transform", Position::default());
        store.release.notify_one();
        assert!(saving.await.unwrap());

        {
            let editor = lifecycle.editor().lock();
            assert_eq!(editor.current_flow().unwrap().id, second);
            assert!(editor.is_dirty());
        }

        // The next save writes the second document under its own id
        store.release.notify_one();
        assert!(lifecycle.save_flow().await);
        let stored_second = store.inner.get_flow(&second).await.unwrap();
        assert_eq!(stored_second.nodes[0].id, node);
        let stored_first = store.inner.get_flow(&first).await.unwrap();
        assert_eq!(stored_first.nodes.len(), 1);
        assert_ne!(stored_first.nodes[0].id, node);
    }
}
