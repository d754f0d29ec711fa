// SPDX-License-Identifier: MIT

//! Typed error handling for flow-studio
//!
//! Collaborators (flow stores, execution backends, configuration) return
//! `StudioError`. Editor-facing verbs never surface it directly: they turn
//! failures into a visible error string on the editor state.

use thiserror::Error;

/// Top-level error type for flow-studio
#[derive(Debug, Error)]
pub enum StudioError {
    /// Non-success responses from the persistence or execution service
    #[error("API error from {service}: {message}")]
    Api { service: String, message: String },

    /// A flow, node or execution that does not exist
    #[error("{kind} '{id}' not found")]
    NotFound { kind: String, id: String },

    /// Configuration errors (invalid env vars, bad paths)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP transport errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, StudioError>;

impl StudioError {
    /// Create an API error
    pub fn api(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create from a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<&str> for StudioError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for StudioError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}
