// SPDX-License-Identifier: MIT

//! HTTP execution backend
//!
//! - `POST {base}/flows/{flowId}/execute` streams NDJSON events
//! - `POST {base}/executions/{id}/cancel`
//! - `POST {base}/nodes/execute` runs one node and returns its result

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response};

use super::backend::{ByteStream, ExecutionBackend};
use super::types::{NodeResult, RunRequest, StepRequest};
use crate::config::ClientConfig;
use crate::error::{Result, StudioError};

const SERVICE: &str = "execution";

pub struct HttpExecutionBackend {
    client: Client,
    config: ClientConfig,
}

impl HttpExecutionBackend {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = config.build_client()?;
        Ok(Self { client, config })
    }

    /// Reuse an existing client
    pub fn with_client(client: Client, config: ClientConfig) -> Self {
        Self { client, config }
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let request = self
            .client
            .post(self.config.url(path))
            .header("Content-Type", "application/json");
        match &self.config.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Turn non-2xx responses into an API error carrying the body text
async fn check_status(resp: Response) -> Result<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    Err(StudioError::api(SERVICE, format!("{}: {}", status, text)))
}

#[async_trait]
impl ExecutionBackend for HttpExecutionBackend {
    async fn start_run(&self, request: RunRequest) -> Result<ByteStream> {
        log::debug!(
            "POST run {} for flow {} ({} nodes, {} edges)",
            request.execution_id,
            request.flow_id,
            request.nodes.len(),
            request.edges.len()
        );

        let resp = self
            .post(&format!("flows/{}/execute", request.flow_id))
            .header("Accept", "application/x-ndjson")
            .json(&request)
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let stream = resp
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(StudioError::from));
        Ok(Box::pin(stream))
    }

    async fn cancel(&self, execution_id: &str) -> Result<()> {
        let resp = self
            .post(&format!("executions/{}/cancel", execution_id))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn execute_node(&self, request: StepRequest) -> Result<NodeResult> {
        log::debug!("Executing node {} in isolation", request.node_id);

        let resp = self.post("nodes/execute").json(&request).send().await?;
        let resp = check_status(resp).await?;

        let result: NodeResult = resp.json().await?;
        Ok(result)
    }
}
