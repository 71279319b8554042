//! Database backend reporting lifecycle events through tracing.

use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::model::Metadata;
use crate::stage::{Database, Step};

/// The always-available outcome sink: every lifecycle hook becomes a log
/// line. Useful on its own for ad-hoc runs and as the minimal reference
/// database implementation.
#[derive(Default)]
pub struct LogDb;

impl LogDb {
    /// Creates the database.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Step for LogDb {
    fn name(&self) -> &str {
        "log_db"
    }
}

#[async_trait]
impl Database for LogDb {
    async fn started(&self, item: &Metadata) -> Result<()> {
        info!(url = item.url(), "archiving started");
        Ok(())
    }

    async fn failed(&self, item: &Metadata, reason: &str) -> Result<()> {
        error!(url = item.url_opt().unwrap_or_default(), reason, "archiving failed");
        Ok(())
    }

    async fn aborted(&self, item: &Metadata) -> Result<()> {
        warn!(url = item.url_opt().unwrap_or_default(), "archiving aborted");
        Ok(())
    }

    async fn done(&self, item: &Metadata, cached: bool) -> Result<()> {
        info!(
            url = item.url(),
            status = %item.status,
            media = item.media().len(),
            cached,
            "archiving done"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hooks_never_fail() {
        let db = LogDb::new();
        let item = Metadata::with_url("https://example.com");

        assert!(db.started(&item).await.is_ok());
        assert!(db.failed(&item, "boom").await.is_ok());
        assert!(db.aborted(&item).await.is_ok());
        assert!(db.done(&item, true).await.is_ok());
        // Default cache lookup declines.
        assert!(db.fetch(&item).await.unwrap().is_none());
    }
}
