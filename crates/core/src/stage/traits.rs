//! Trait definitions for the pipeline stages.
//!
//! All stage methods return `anyhow::Result`: the core cannot know the
//! failure shapes of plugin code, and the orchestrator treats stage errors
//! as recoverable (logged and skipped) rather than typed.

use anyhow::Result;
use async_trait::async_trait;

use crate::context::RunContext;
use crate::model::{Media, Metadata};

/// Behavior common to every module instance.
#[async_trait]
pub trait Step: Send + Sync {
    /// The module name, matching its manifest.
    fn name(&self) -> &str;

    /// One-time setup hook (login, warm caches), run by the registry
    /// before the instance is handed out. Failures abort startup.
    async fn setup(&self) -> Result<()> {
        Ok(())
    }
}

/// Produces a lazy, finite sequence of items to archive.
///
/// Implementations use interior mutability; the orchestrator polls through
/// a shared handle, one item at a time.
#[async_trait]
pub trait Feeder: Step {
    /// Returns the next item, or `None` when the feed is exhausted.
    /// Each item is seeded with at least a URL and may carry per-item
    /// context such as a destination folder.
    async fn next_item(&self) -> Result<Option<Metadata>>;
}

/// Downloads content for URLs it understands.
#[async_trait]
pub trait Extractor: Step {
    /// Rewrites a URL before archiving (expand redirects, strip tracking
    /// parameters). The default leaves it untouched.
    async fn sanitize_url(&self, url: &str) -> Result<String> {
        Ok(url.to_string())
    }

    /// Attempts to archive the item. `Ok(None)` means "not applicable to
    /// this URL" and must be used instead of an error for URLs the
    /// extractor does not claim; errors are reserved for genuine
    /// unexpected failures.
    async fn download(&self, item: &Metadata, ctx: &RunContext) -> Result<Option<Metadata>>;
}

/// Adds media or properties to an item after extraction.
#[async_trait]
pub trait Enricher: Step {
    /// Mutates the item in place. Implementations must not remove media
    /// or properties they do not understand.
    async fn enrich(&self, item: &mut Metadata, ctx: &RunContext) -> Result<()>;
}

/// Uploads media to a backend.
///
/// Key assignment and the one-URL-per-backend bookkeeping live in the
/// orchestrator's store step, so implementations only move bytes: `upload`
/// may be called again for a media a re-run already uploaded and should
/// overwrite or skip, never duplicate.
#[async_trait]
pub trait Storage: Step {
    /// Copies the media's local file to the backend under `media.key()`.
    async fn upload(&self, media: &Media, ctx: &RunContext) -> Result<()>;

    /// The externally reachable location of an uploaded media.
    async fn reachable_url(&self, media: &Media) -> Result<String>;
}

/// Records item lifecycle and serves the archive cache.
#[async_trait]
pub trait Database: Step {
    /// Called when work on a non-cached item begins.
    async fn started(&self, item: &Metadata) -> Result<()>;

    /// Called when an item fails with an unexpected error.
    async fn failed(&self, item: &Metadata, reason: &str) -> Result<()>;

    /// Called when a stop request abandons an item mid-flight.
    async fn aborted(&self, item: &Metadata) -> Result<()>;

    /// Cache lookup: a previously archived result for this item, if this
    /// backend has one. The default declines.
    async fn fetch(&self, _item: &Metadata) -> Result<Option<Metadata>> {
        Ok(None)
    }

    /// Called with the final outcome; `cached` marks cache hits.
    async fn done(&self, item: &Metadata, cached: bool) -> Result<()>;
}

/// Renders the one canonical artifact for a fully populated item.
#[async_trait]
pub trait Formatter: Step {
    /// Produces the final media, or `None` when there is nothing to
    /// render.
    async fn format(&self, item: &Metadata, ctx: &RunContext) -> Result<Option<Media>>;
}
