// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::FlowStore;
use crate::error::{Result, StudioError};
use crate::graph::Flow;

/// Flow store backed by an in-process map. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryFlowStore {
    flows: Arc<RwLock<HashMap<String, Flow>>>,
}

impl MemoryFlowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a document
    pub async fn insert(&self, flow: Flow) {
        let mut flows = self.flows.write().await;
        flows.insert(flow.id.clone(), flow);
    }

    pub async fn len(&self) -> usize {
        self.flows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.flows.read().await.is_empty()
    }
}

#[async_trait]
impl FlowStore for MemoryFlowStore {
    async fn get_flow(&self, id: &str) -> Result<Flow> {
        let flows = self.flows.read().await;
        flows
            .get(id)
            .cloned()
            .ok_or_else(|| StudioError::not_found("Flow", id))
    }

    async fn put_flow(&self, flow: &Flow) -> Result<Flow> {
        let mut stored = flow.clone();
        stored.updated_at = Utc::now();

        let mut flows = self.flows.write().await;
        flows.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }
}
