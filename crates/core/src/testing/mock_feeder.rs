//! Mock feeder for testing.

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::model::Metadata;
use crate::stage::{Feeder, Step};

/// Mock implementation of the Feeder trait: yields a scripted item
/// sequence, then `None`.
#[derive(Clone)]
pub struct MockFeeder {
    queue: Arc<RwLock<VecDeque<Metadata>>>,
    fed: Arc<RwLock<usize>>,
    failure: Arc<RwLock<Option<String>>>,
}

impl MockFeeder {
    /// A feeder over the given items.
    pub fn from_items(items: impl IntoIterator<Item = Metadata>) -> Self {
        Self {
            queue: Arc::new(RwLock::new(items.into_iter().collect())),
            fed: Arc::new(RwLock::new(0)),
            failure: Arc::new(RwLock::new(None)),
        }
    }

    /// A feeder over the given URLs.
    pub fn from_urls(urls: impl IntoIterator<Item = &'static str>) -> Self {
        Self::from_items(urls.into_iter().map(Metadata::with_url))
    }

    /// Scripts the next `next_item` call to fail with this message.
    pub async fn set_failure(&self, message: impl Into<String>) {
        *self.failure.write().await = Some(message.into());
    }

    /// Number of items handed out so far.
    pub async fn fed_count(&self) -> usize {
        *self.fed.read().await
    }
}

#[async_trait]
impl Step for MockFeeder {
    fn name(&self) -> &str {
        "mock_feeder"
    }
}

#[async_trait]
impl Feeder for MockFeeder {
    async fn next_item(&self) -> Result<Option<Metadata>> {
        if let Some(message) = self.failure.write().await.take() {
            return Err(anyhow!(message));
        }
        let next = self.queue.write().await.pop_front();
        if next.is_some() {
            *self.fed.write().await += 1;
        }
        Ok(next)
    }
}
