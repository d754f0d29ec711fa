// SPDX-License-Identifier: MIT

//! REST flow store: `GET`/`PUT {base}/flows/{id}`

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};

use super::FlowStore;
use crate::config::ClientConfig;
use crate::error::{Result, StudioError};
use crate::graph::Flow;

const SERVICE: &str = "flow-store";

pub struct HttpFlowStore {
    client: Client,
    config: ClientConfig,
}

impl HttpFlowStore {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = config.build_client()?;
        Ok(Self { client, config })
    }

    pub fn with_client(client: Client, config: ClientConfig) -> Self {
        Self { client, config }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl FlowStore for HttpFlowStore {
    async fn get_flow(&self, id: &str) -> Result<Flow> {
        let url = self.config.url(&format!("flows/{}", id));
        let resp = self.authorize(self.client.get(&url)).send().await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(StudioError::not_found("Flow", id));
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(StudioError::api(SERVICE, format!("{}: {}", status, text)));
        }

        let flow: Flow = resp.json().await?;
        Ok(flow)
    }

    async fn put_flow(&self, flow: &Flow) -> Result<Flow> {
        let url = self.config.url(&format!("flows/{}", flow.id));
        let resp = self
            .authorize(self.client.put(&url))
            .header("Content-Type", "application/json")
            .json(flow)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(StudioError::api(SERVICE, format!("{}: {}", status, text)));
        }

        let stored: Flow = resp.json().await?;
        log::info!("Saved flow {} ({} nodes)", stored.id, stored.nodes.len());
        Ok(stored)
    }
}
