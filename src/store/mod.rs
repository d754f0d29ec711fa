// SPDX-License-Identifier: MIT

//! Flow persistence
//!
//! This module provides the `FlowStore` contract and its implementations:
//! - [`FileFlowStore`] - one JSON/YAML document per file in a directory
//! - [`HttpFlowStore`] - REST persistence service
//! - [`MemoryFlowStore`] - in-process map

mod file;
mod http;
mod memory;

pub use file::FileFlowStore;
pub use http::HttpFlowStore;
pub use memory::MemoryFlowStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::graph::Flow;

/// Loads and stores flow documents
#[async_trait]
pub trait FlowStore: Send + Sync {
    /// Fetch a flow document by id
    async fn get_flow(&self, id: &str) -> Result<Flow>;

    /// Store a flow document and return the canonical stored copy
    async fn put_flow(&self, flow: &Flow) -> Result<Flow>;
}
