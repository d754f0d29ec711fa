// SPDX-License-Identifier: MIT

//! Directory-backed flow store
//!
//! Flow `id` lives in `{dir}/{id}.json`, `{dir}/{id}.yaml` or `{dir}/{id}.yml`
//! (checked in that order). Saves always write pretty-printed JSON.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;

use super::FlowStore;
use crate::error::{Result, StudioError};
use crate::graph::Flow;

const EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

pub struct FileFlowStore {
    dir: PathBuf,
}

impl FileFlowStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Parse a flow document, choosing the format from the file extension
    pub fn parse(content: &str, path: &Path) -> Result<Flow> {
        let is_yaml = path
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        if is_yaml {
            Ok(serde_yaml::from_str(content)?)
        } else {
            Ok(serde_json::from_str(content)?)
        }
    }

    fn check_id(id: &str) -> Result<()> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(())
        } else {
            Err(StudioError::config(format!("Invalid flow id '{}'", id)))
        }
    }

    async fn find(&self, id: &str) -> Option<PathBuf> {
        for ext in EXTENSIONS {
            let path = self.dir.join(format!("{}.{}", id, ext));
            if fs::try_exists(&path).await.unwrap_or(false) {
                return Some(path);
            }
        }
        None
    }

    /// Ids of every flow document in the directory
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let known = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| EXTENSIONS.contains(&ext));
            if !known {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

#[async_trait]
impl FlowStore for FileFlowStore {
    async fn get_flow(&self, id: &str) -> Result<Flow> {
        Self::check_id(id)?;
        let path = self
            .find(id)
            .await
            .ok_or_else(|| StudioError::not_found("Flow", id))?;

        log::debug!("Reading flow {} from {:?}", id, path);
        let content = fs::read_to_string(&path).await?;
        Self::parse(&content, &path)
    }

    async fn put_flow(&self, flow: &Flow) -> Result<Flow> {
        Self::check_id(&flow.id)?;
        fs::create_dir_all(&self.dir).await?;

        let mut stored = flow.clone();
        stored.updated_at = Utc::now();

        let path = self.dir.join(format!("{}.json", stored.id));
        let content = serde_json::to_string_pretty(&stored)?;
        fs::write(&path, content).await?;
        log::info!("Saved flow {} to {:?}", stored.id, path);

        Ok(stored)
    }
}
