//! Prometheus metrics for the pipeline engine.
//!
//! This module provides metrics for:
//! - Items (outcomes, duration, cache hits)
//! - Stage failures (recoverable errors caught at the orchestrator boundary)
//! - Media (uploads, deduplication)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

/// Items processed, by terminal outcome.
pub static ITEMS_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("arkive_items_total", "Total items processed"),
        &["result"], // "done", "cached", "failed", "aborted"
    )
    .unwrap()
});

/// Per-item duration in seconds, by terminal outcome.
pub static ITEM_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "arkive_item_duration_seconds",
            "Duration of one item through the pipeline",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0]),
        &["result"],
    )
    .unwrap()
});

/// Cache hits reported by database backends.
pub static CACHE_HITS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("arkive_cache_hits_total", "Items served from the archive cache").unwrap()
});

/// Recoverable stage failures, by stage.
pub static STAGE_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "arkive_stage_failures_total",
            "Recoverable stage failures caught at the orchestrator boundary",
        ),
        &["stage"], // "sanitize", "cache", "extract", "enrich", "store", "format", "persist"
    )
    .unwrap()
});

/// Media uploads completed across all storage backends.
pub static MEDIA_STORED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("arkive_media_stored_total", "Media uploads completed").unwrap()
});

/// Media dropped by per-item deduplication.
pub static MEDIA_DEDUPLICATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "arkive_media_deduplicated_total",
        "Duplicate media dropped before storage",
    )
    .unwrap()
});

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(ITEMS_PROCESSED.clone()),
        Box::new(ITEM_DURATION.clone()),
        Box::new(CACHE_HITS.clone()),
        Box::new(STAGE_FAILURES.clone()),
        Box::new(MEDIA_STORED.clone()),
        Box::new(MEDIA_DEDUPLICATED.clone()),
    ]
}
