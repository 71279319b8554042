//! Mock storage backend for testing.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::context::RunContext;
use crate::model::Media;
use crate::stage::{Step, Storage};

/// Mock implementation of the Storage trait.
///
/// Records every uploaded key and serves `mock://<name>/<key>` URLs.
/// Uploads can be scripted to fail, persistently or not at all.
#[derive(Clone)]
pub struct MockStorage {
    name: String,
    uploads: Arc<RwLock<Vec<String>>>,
    url_requests: Arc<RwLock<Vec<String>>>,
    failure: Arc<RwLock<Option<String>>>,
}

impl MockStorage {
    /// A storage backend that accepts everything.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uploads: Arc::new(RwLock::new(Vec::new())),
            url_requests: Arc::new(RwLock::new(Vec::new())),
            failure: Arc::new(RwLock::new(None)),
        }
    }

    /// Scripts every upload to fail with this message.
    pub async fn set_failure(&self, message: impl Into<String>) {
        *self.failure.write().await = Some(message.into());
    }

    /// Clears a scripted failure.
    pub async fn clear_failure(&self) {
        *self.failure.write().await = None;
    }

    /// Keys uploaded so far, in order.
    pub async fn uploaded_keys(&self) -> Vec<String> {
        self.uploads.read().await.clone()
    }

    /// Number of uploads performed.
    pub async fn upload_count(&self) -> usize {
        self.uploads.read().await.len()
    }

    /// Number of reachable-URL requests served.
    pub async fn url_request_count(&self) -> usize {
        self.url_requests.read().await.len()
    }
}

#[async_trait]
impl Step for MockStorage {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn upload(&self, media: &Media, _ctx: &RunContext) -> Result<()> {
        if let Some(message) = self.failure.read().await.clone() {
            return Err(anyhow!(message));
        }
        let key = media
            .key()
            .ok_or_else(|| anyhow!("media has no storage key"))?;
        self.uploads.write().await.push(key.to_string());
        Ok(())
    }

    async fn reachable_url(&self, media: &Media) -> Result<String> {
        let key = media
            .key()
            .ok_or_else(|| anyhow!("media has no storage key"))?;
        self.url_requests.write().await.push(key.to_string());
        Ok(format!("mock://{}/{}", self.name, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_uploads_and_serves_urls() {
        let storage = MockStorage::new("s1");
        let ctx = RunContext::builder().build().unwrap();

        let mut media = Media::new("/tmp/a.jpg");
        media.set_key("folder/abc.jpg");

        storage.upload(&media, &ctx).await.unwrap();
        assert_eq!(storage.uploaded_keys().await, vec!["folder/abc.jpg"]);

        let url = storage.reachable_url(&media).await.unwrap();
        assert_eq!(url, "mock://s1/folder/abc.jpg");
        assert_eq!(storage.url_request_count().await, 1);
    }

    #[tokio::test]
    async fn test_scripted_failure_blocks_uploads() {
        let storage = MockStorage::new("s1");
        storage.set_failure("bucket offline").await;
        let ctx = RunContext::builder().build().unwrap();

        let mut media = Media::new("/tmp/a.jpg");
        media.set_key("abc.jpg");
        assert!(storage.upload(&media, &ctx).await.is_err());
        assert_eq!(storage.upload_count().await, 0);

        storage.clear_failure().await;
        assert!(storage.upload(&media, &ctx).await.is_ok());
    }

    #[tokio::test]
    async fn test_unkeyed_media_is_rejected() {
        let storage = MockStorage::new("s1");
        let ctx = RunContext::builder().build().unwrap();
        let media = Media::new("/tmp/a.jpg");
        assert!(storage.upload(&media, &ctx).await.is_err());
    }
}
