// SPDX-License-Identifier: MIT

//! Execution service contract

use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::Stream;

use super::types::{NodeResult, RunRequest, StepRequest};
use crate::error::Result;

/// Raw response body of a run, chunked however the transport delivers it
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// Remote service that runs flows and single nodes
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Start a run and return its NDJSON event stream
    async fn start_run(&self, request: RunRequest) -> Result<ByteStream>;

    /// Ask the service to stop a run. Callers do not wait on the outcome.
    async fn cancel(&self, execution_id: &str) -> Result<()>;

    /// Run one node in isolation
    async fn execute_node(&self, request: StepRequest) -> Result<NodeResult>;
}
