//! Filesystem storage backend.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::context::RunContext;
use crate::model::Media;
use crate::registry::StepConfig;
use crate::stage::{Step, Storage};

use super::config_str;

/// Stores media as plain files under a root directory, keyed by their
/// storage key. Reachable URLs are `file://` paths.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Builds the backend from its module config (`root`, default
    /// `./archive`).
    pub fn from_config(config: &StepConfig) -> Result<Self> {
        let root = config_str(config, "root").unwrap_or_else(|| "./archive".to_string());
        Ok(Self::new(root))
    }

    /// A backend rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The backend's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dest_for(&self, media: &Media) -> Result<PathBuf> {
        let key = media
            .key()
            .ok_or_else(|| anyhow!("media has no storage key"))?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl Step for LocalStorage {
    fn name(&self) -> &str {
        "local_storage"
    }

    async fn setup(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("failed to create storage root {}", self.root.display()))?;
        debug!(root = %self.root.display(), "local storage ready");
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(&self, media: &Media, _ctx: &RunContext) -> Result<()> {
        let dest = self.dest_for(media)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        tokio::fs::copy(&media.filename, &dest)
            .await
            .with_context(|| {
                format!(
                    "failed to copy {} to {}",
                    media.filename.display(),
                    dest.display()
                )
            })?;
        Ok(())
    }

    async fn reachable_url(&self, media: &Media) -> Result<String> {
        let dest = self.dest_for(media)?;
        let absolute = tokio::fs::canonicalize(&dest)
            .await
            .unwrap_or_else(|_| dest.clone());
        Ok(format!("file://{}", absolute.display()))
    }
}
