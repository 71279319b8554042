//! Enricher recording content hashes on every media.

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use crate::context::RunContext;
use crate::keys::ensure_hash;
use crate::model::Metadata;
use crate::stage::{Enricher, Step};

/// Computes the configured content digest for each media (and its nested
/// media) that does not carry one yet.
///
/// Running this early pins the hash to the bytes as downloaded, so later
/// consumers can verify integrity even if the stored copy is rewritten.
#[derive(Default)]
pub struct HashEnricher;

impl HashEnricher {
    /// Creates the enricher.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Step for HashEnricher {
    fn name(&self) -> &str {
        "hash_enricher"
    }
}

#[async_trait]
impl Enricher for HashEnricher {
    async fn enrich(&self, item: &mut Metadata, ctx: &RunContext) -> Result<()> {
        for media in item.media_mut().iter_mut() {
            if let Err(e) = ensure_hash(media, ctx.hash()) {
                warn!(file = %media.filename.display(), "could not hash media: {e}");
            }
        }
        Ok(())
    }
}
