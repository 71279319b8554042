//! Types for the pipeline orchestrator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::registry::RegistryError;
use crate::stage::ModuleKind;

/// Errors that can occur during orchestration.
///
/// Stage-level failures never surface here: they are caught at the stage
/// boundary, logged and skipped. These are the item- and assembly-level
/// errors only.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The feeder handed over an item without a URL.
    #[error("item has no URL; feeders must seed one")]
    MissingUrl,

    /// A stop request abandoned the item at a stage boundary.
    #[error("run stopped before the item completed")]
    Aborted,

    /// The per-item working directory could not be created.
    #[error("failed to create item working directory: {0}")]
    Io(#[from] std::io::Error),

    /// Pipeline assembly failed in the module registry.
    #[error("module registry error: {0}")]
    Registry(#[from] RegistryError),

    /// A configured step names a module that does not serve that stage.
    #[error("module {module} does not serve as a {kind}")]
    WrongKind { module: String, kind: ModuleKind },
}

/// Terminal outcome of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    /// Archived (or explicitly "nothing archived") and persisted.
    Done,
    /// Served from the archive cache; the rest of the pipeline was
    /// skipped.
    Cached,
    /// An unexpected item-level error; databases were told `failed`.
    Failed,
    /// Abandoned by a stop request; databases were told `aborted`.
    Aborted,
}

impl ItemOutcome {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Cached => "cached",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
        }
    }
}

/// Tally of one feeder run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Items pulled from the feeder.
    pub processed: usize,
    /// Items archived (including "nothing archived" terminals).
    pub done: usize,
    /// Items served from the cache.
    pub cached: usize,
    /// Items that failed with an unexpected error.
    pub failed: usize,
    /// Items abandoned by a stop request.
    pub aborted: usize,
}

impl RunSummary {
    /// Records one item outcome.
    pub fn record(&mut self, outcome: ItemOutcome) {
        self.processed += 1;
        match outcome {
            ItemOutcome::Done => self.done += 1,
            ItemOutcome::Cached => self.cached += 1,
            ItemOutcome::Failed => self.failed += 1,
            ItemOutcome::Aborted => self.aborted += 1,
        }
    }
}

/// Requests a stop from outside the run loop (e.g. a signal handler).
///
/// The orchestrator honors it before pulling the next item and at stage
/// boundaries inside the current item; there is no cancellation in the
/// middle of a plugin call. Side effects of an abandoned item (partial
/// uploads, partial enrichments) are accepted as-is and reported through
/// the database `aborted` hook.
#[derive(Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// A fresh, unstopped handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the stop.
    pub fn request_stop(&self) {
        if !self.0.swap(true, Ordering::SeqCst) {
            info!("stop requested; finishing at the next stage boundary");
        }
    }

    /// Whether a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
