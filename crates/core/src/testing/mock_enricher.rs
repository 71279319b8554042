//! Mock enricher for testing.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::context::RunContext;
use crate::model::{Media, Metadata, PropertyValue};
use crate::stage::{Enricher, Step};

/// Mock implementation of the Enricher trait.
///
/// Can add a scripted media and/or property to every item it sees, or
/// fail every call. Records how many items it enriched.
#[derive(Clone)]
pub struct MockEnricher {
    name: String,
    media_to_add: Arc<RwLock<Option<Media>>>,
    property_to_add: Arc<RwLock<Option<(String, PropertyValue)>>>,
    failure: Arc<RwLock<Option<String>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockEnricher {
    /// An enricher that does nothing.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            media_to_add: Arc::new(RwLock::new(None)),
            property_to_add: Arc::new(RwLock::new(None)),
            failure: Arc::new(RwLock::new(None)),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Scripts a media (cloned) to add to every enriched item.
    pub async fn set_media_to_add(&self, media: Media) {
        *self.media_to_add.write().await = Some(media);
    }

    /// Scripts a property to set on every enriched item.
    pub async fn set_property_to_add(&self, key: impl Into<String>, value: PropertyValue) {
        *self.property_to_add.write().await = Some((key.into(), value));
    }

    /// Scripts every call to fail with this message.
    pub async fn set_failure(&self, message: impl Into<String>) {
        *self.failure.write().await = Some(message.into());
    }

    /// URLs of the items enriched, in call order.
    pub async fn enriched_urls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }

    /// Number of enrich calls received.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }
}

#[async_trait]
impl Step for MockEnricher {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Enricher for MockEnricher {
    async fn enrich(&self, item: &mut Metadata, _ctx: &RunContext) -> Result<()> {
        self.calls.write().await.push(item.url().to_string());
        if let Some(message) = self.failure.read().await.clone() {
            return Err(anyhow!(message));
        }
        if let Some(media) = self.media_to_add.read().await.clone() {
            item.add_media(media);
        }
        if let Some((key, value)) = self.property_to_add.read().await.clone() {
            item.set(key, value);
        }
        Ok(())
    }
}
