//! Mock database backend for testing.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::model::Metadata;
use crate::stage::{Database, Step};

/// A recorded lifecycle event for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum DbEvent {
    /// `started` was called.
    Started { url: String },
    /// `failed` was called.
    Failed { url: String, reason: String },
    /// `aborted` was called.
    Aborted { url: String },
    /// `done` was called.
    Done {
        url: String,
        status: String,
        media_count: usize,
        cached: bool,
    },
}

/// Mock implementation of the Database trait.
///
/// Records every lifecycle hook in order and can be scripted to serve a
/// cache hit from `fetch` or to fail its hooks.
#[derive(Clone)]
pub struct MockDatabase {
    name: String,
    events: Arc<RwLock<Vec<DbEvent>>>,
    fetch_result: Arc<RwLock<Option<Metadata>>>,
    fetch_calls: Arc<RwLock<usize>>,
    failure: Arc<RwLock<Option<String>>>,
}

impl MockDatabase {
    /// A database with no cache and succeeding hooks.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            events: Arc::new(RwLock::new(Vec::new())),
            fetch_result: Arc::new(RwLock::new(None)),
            fetch_calls: Arc::new(RwLock::new(0)),
            failure: Arc::new(RwLock::new(None)),
        }
    }

    /// Scripts `fetch` to return this prior result (cloned) for every
    /// item.
    pub async fn set_fetch_result(&self, result: Metadata) {
        *self.fetch_result.write().await = Some(result);
    }

    /// Scripts every hook to fail with this message.
    pub async fn set_failure(&self, message: impl Into<String>) {
        *self.failure.write().await = Some(message.into());
    }

    /// All recorded events, in order.
    pub async fn events(&self) -> Vec<DbEvent> {
        self.events.read().await.clone()
    }

    /// Number of `fetch` calls received.
    pub async fn fetch_count(&self) -> usize {
        *self.fetch_calls.read().await
    }

    /// The recorded `done` events only.
    pub async fn done_events(&self) -> Vec<DbEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|event| matches!(event, DbEvent::Done { .. }))
            .cloned()
            .collect()
    }

    async fn record(&self, event: DbEvent) -> Result<()> {
        if let Some(message) = self.failure.read().await.clone() {
            return Err(anyhow!(message));
        }
        self.events.write().await.push(event);
        Ok(())
    }
}

#[async_trait]
impl Step for MockDatabase {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Database for MockDatabase {
    async fn started(&self, item: &Metadata) -> Result<()> {
        self.record(DbEvent::Started {
            url: item.url().to_string(),
        })
        .await
    }

    async fn failed(&self, item: &Metadata, reason: &str) -> Result<()> {
        self.record(DbEvent::Failed {
            url: item.url_opt().unwrap_or_default().to_string(),
            reason: reason.to_string(),
        })
        .await
    }

    async fn aborted(&self, item: &Metadata) -> Result<()> {
        self.record(DbEvent::Aborted {
            url: item.url_opt().unwrap_or_default().to_string(),
        })
        .await
    }

    async fn fetch(&self, _item: &Metadata) -> Result<Option<Metadata>> {
        *self.fetch_calls.write().await += 1;
        Ok(self.fetch_result.read().await.clone())
    }

    async fn done(&self, item: &Metadata, cached: bool) -> Result<()> {
        self.record(DbEvent::Done {
            url: item.url().to_string(),
            status: item.status.clone(),
            media_count: item.media().len(),
            cached,
        })
        .await
    }
}
