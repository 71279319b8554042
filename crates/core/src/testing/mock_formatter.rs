//! Mock formatter for testing.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::context::RunContext;
use crate::model::{Media, Metadata};
use crate::stage::{Formatter, Step};

/// Mock implementation of the Formatter trait.
///
/// When given bytes, writes them into the item's working directory and
/// returns a media pointing at the file, the way a real formatter renders
/// its artifact. Without bytes it produces nothing.
#[derive(Clone)]
pub struct MockFormatter {
    name: String,
    bytes: Arc<RwLock<Option<Vec<u8>>>>,
    failure: Arc<RwLock<Option<String>>>,
    calls: Arc<RwLock<usize>>,
}

impl MockFormatter {
    /// A formatter that produces nothing.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bytes: Arc::new(RwLock::new(None)),
            failure: Arc::new(RwLock::new(None)),
            calls: Arc::new(RwLock::new(0)),
        }
    }

    /// Scripts the artifact bytes produced on every call.
    pub async fn set_output(&self, bytes: impl Into<Vec<u8>>) {
        *self.bytes.write().await = Some(bytes.into());
    }

    /// Scripts every call to fail with this message.
    pub async fn set_failure(&self, message: impl Into<String>) {
        *self.failure.write().await = Some(message.into());
    }

    /// Number of format calls received.
    pub async fn call_count(&self) -> usize {
        *self.calls.read().await
    }
}

#[async_trait]
impl Step for MockFormatter {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Formatter for MockFormatter {
    async fn format(&self, _item: &Metadata, ctx: &RunContext) -> Result<Option<Media>> {
        *self.calls.write().await += 1;
        if let Some(message) = self.failure.read().await.clone() {
            return Err(anyhow!(message));
        }
        let Some(bytes) = self.bytes.read().await.clone() else {
            return Ok(None);
        };
        let path = ctx.tmp_file("formatted.html");
        tokio::fs::write(&path, bytes).await?;
        Ok(Some(Media::new(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_produces_nothing_by_default() {
        let formatter = MockFormatter::new("f1");
        let ctx = RunContext::builder().build().unwrap();
        let item = Metadata::with_url("https://example.com");

        assert!(formatter.format(&item, &ctx).await.unwrap().is_none());
        assert_eq!(formatter.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_writes_artifact_into_working_dir() {
        let formatter = MockFormatter::new("f1");
        formatter.set_output(b"<html>summary</html>".to_vec()).await;
        let ctx = RunContext::builder().build().unwrap();
        let item = Metadata::with_url("https://example.com");

        let media = formatter.format(&item, &ctx).await.unwrap().unwrap();
        assert!(media.filename.starts_with(ctx.tmp_dir()));
        assert_eq!(
            std::fs::read(&media.filename).unwrap(),
            b"<html>summary</html>"
        );
    }
}
