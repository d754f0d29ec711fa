// SPDX-License-Identifier: MIT

//! Flow execution
//!
//! - [`ExecutionOrchestrator`] - run lifecycle, cancellation, single-node steps
//! - [`NdjsonDecoder`] - incremental decoding of the event stream
//! - [`ExecutionBackend`] - remote execution service, with an HTTP implementation

mod backend;
mod decoder;
mod http;
mod orchestrator;
pub mod types;

pub use backend::{ByteStream, ExecutionBackend};
pub use decoder::NdjsonDecoder;
pub use http::HttpExecutionBackend;
pub use orchestrator::ExecutionOrchestrator;
pub use types::{
    Execution, ExecutionStatus, NodeResult, RunRequest, StepRequest, StreamEvent,
};
