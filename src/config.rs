// SPDX-License-Identifier: MIT

//! Client configuration loaded from the environment
//!
//! - `FLOW_API_URL`: base URL of the flow service (default `http://localhost:8000/api`)
//! - `FLOW_API_TOKEN`: optional bearer token
//! - `FLOW_API_TIMEOUT_SECS`: request timeout in seconds (default 300)

use std::env;
use std::time::Duration;

use reqwest::Client;

use crate::error::{Result, StudioError};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Connection settings shared by the HTTP flow store and execution backend
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub timeout_secs: u64,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Load configuration from `FLOW_API_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base_url = lookup("FLOW_API_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let api_token = lookup("FLOW_API_TOKEN").filter(|t| !t.is_empty());
        let timeout_secs = match lookup("FLOW_API_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                StudioError::config(format!("FLOW_API_TIMEOUT_SECS must be an integer, got '{}'", raw))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
            timeout_secs,
        })
    }

    /// Join a path onto the base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Build the shared HTTP client
    pub fn build_client(&self) -> Result<Client> {
        let client = Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;
        Ok(client)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
