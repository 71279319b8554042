//! Mock extractor for testing.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::context::RunContext;
use crate::model::Metadata;
use crate::stage::{Extractor, Step};

/// Mock implementation of the Extractor trait.
///
/// Scriptable behavior:
/// - return a fixed result from `download` (merged by the orchestrator)
/// - decline every item (`Ok(None)`)
/// - fail every call with a fixed message
/// - rewrite URLs during sanitization
///
/// Records every sanitized and downloaded URL for assertions.
#[derive(Clone)]
pub struct MockExtractor {
    name: String,
    result: Arc<RwLock<Option<Metadata>>>,
    failure: Arc<RwLock<Option<String>>>,
    rewrite: Arc<RwLock<Option<String>>>,
    sanitize_calls: Arc<RwLock<Vec<String>>>,
    download_calls: Arc<RwLock<Vec<String>>>,
}

impl MockExtractor {
    /// An extractor that declines every item.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            result: Arc::new(RwLock::new(None)),
            failure: Arc::new(RwLock::new(None)),
            rewrite: Arc::new(RwLock::new(None)),
            sanitize_calls: Arc::new(RwLock::new(Vec::new())),
            download_calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Scripts the result returned (cloned) on every download call.
    pub async fn set_result(&self, result: Metadata) {
        *self.result.write().await = Some(result);
    }

    /// Scripts every download call to fail with this message.
    pub async fn set_failure(&self, message: impl Into<String>) {
        *self.failure.write().await = Some(message.into());
    }

    /// Scripts `sanitize_url` to return this URL regardless of input.
    pub async fn set_sanitized_url(&self, url: impl Into<String>) {
        *self.rewrite.write().await = Some(url.into());
    }

    /// URLs passed to `download`, in call order.
    pub async fn downloaded_urls(&self) -> Vec<String> {
        self.download_calls.read().await.clone()
    }

    /// Number of download calls received.
    pub async fn download_count(&self) -> usize {
        self.download_calls.read().await.len()
    }

    /// Number of sanitize calls received.
    pub async fn sanitize_count(&self) -> usize {
        self.sanitize_calls.read().await.len()
    }
}

#[async_trait]
impl Step for MockExtractor {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    async fn sanitize_url(&self, url: &str) -> Result<String> {
        self.sanitize_calls.write().await.push(url.to_string());
        match self.rewrite.read().await.clone() {
            Some(rewritten) => Ok(rewritten),
            None => Ok(url.to_string()),
        }
    }

    async fn download(&self, item: &Metadata, _ctx: &RunContext) -> Result<Option<Metadata>> {
        self.download_calls.write().await.push(item.url().to_string());
        if let Some(message) = self.failure.read().await.clone() {
            return Err(anyhow!(message));
        }
        Ok(self.result.read().await.clone())
    }
}
