//! Per-item run context passed to every stage call.
//!
//! The context replaces ambient process-wide state: instead of stages
//! reaching into globals for "the current temp dir" or "the hash
//! algorithm", the orchestrator builds one context per item and threads it
//! through every call. The temp dir is scoped to the context and removed
//! when it drops, which holds on every exit path including stage errors.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use uuid::Uuid;

use crate::keys::HashAlgorithm;

/// Ambient per-item state available to every stage.
#[derive(Debug)]
pub struct RunContext {
    tmp: TempDir,
    folder: String,
    hash: HashAlgorithm,
    storage_count: usize,
    item_token: String,
}

impl RunContext {
    /// Starts building a context. `build` creates the scoped temp dir.
    pub fn builder() -> RunContextBuilder {
        RunContextBuilder::default()
    }

    /// The working directory exclusive to this item. Stages place
    /// downloaded and generated files here; the directory and its contents
    /// are removed when the item reaches a terminal state.
    pub fn tmp_dir(&self) -> &Path {
        self.tmp.path()
    }

    /// A path inside the item's working directory.
    pub fn tmp_file(&self, name: impl AsRef<Path>) -> PathBuf {
        self.tmp.path().join(name)
    }

    /// The destination folder for this item's storage keys.
    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// The configured content-hash algorithm.
    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    /// Number of configured storage backends; a media is fully stored once
    /// it has this many URLs.
    pub fn storage_count(&self) -> usize {
        self.storage_count
    }

    /// The random token shared by all of this item's media when the
    /// `random` path style is configured.
    pub fn item_token(&self) -> &str {
        &self.item_token
    }
}

/// Builder for [`RunContext`].
#[derive(Debug, Default)]
pub struct RunContextBuilder {
    parent_dir: Option<PathBuf>,
    folder: String,
    hash: HashAlgorithm,
    storage_count: usize,
}

impl RunContextBuilder {
    /// Parent directory for the item's temp dir; the system temp dir when
    /// unset.
    pub fn parent_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.parent_dir = Some(dir.into());
        self
    }

    /// Destination folder for storage keys.
    pub fn folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    /// Content-hash algorithm.
    pub fn hash(mut self, hash: HashAlgorithm) -> Self {
        self.hash = hash;
        self
    }

    /// Number of configured storage backends.
    pub fn storage_count(mut self, count: usize) -> Self {
        self.storage_count = count;
        self
    }

    /// Creates the context and its scoped temp dir.
    pub fn build(self) -> io::Result<RunContext> {
        let tmp = match &self.parent_dir {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                TempDir::with_prefix_in("arkive-item-", parent)?
            }
            None => TempDir::with_prefix("arkive-item-")?,
        };
        Ok(RunContext {
            tmp,
            folder: self.folder,
            hash: self.hash,
            storage_count: self.storage_count,
            item_token: Uuid::new_v4().simple().to_string(),
        })
    }
}
