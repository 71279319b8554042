//! Pipeline orchestrator implementation.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::config::{Config, KeysConfig};
use crate::context::RunContext;
use crate::keys::{assign_key, dedupe_media, ensure_hash};
use crate::metrics;
use crate::model::{
    Media, Metadata, FINAL_MEDIA_KEY, ORIGINAL_URL_KEY, STATUS_ABORTED, STATUS_NOTHING_ARCHIVED,
};
use crate::registry::ModuleRegistry;
use crate::stage::{Database, Enricher, Extractor, Feeder, Formatter, ModuleKind, Storage};

use super::config::OrchestratorConfig;
use super::types::{ItemOutcome, OrchestratorError, RunSummary, StopHandle};

/// The assembled stage lists, in configured execution order.
///
/// Module names ride along for logging; the orchestrator dispatches purely
/// through the trait objects.
#[derive(Clone, Default)]
pub struct Pipeline {
    /// Extractors, tried in order until one succeeds. Their
    /// `sanitize_url` hooks also run in this order.
    pub extractors: Vec<(String, Arc<dyn Extractor>)>,
    /// Enrichers, all run in order.
    pub enrichers: Vec<(String, Arc<dyn Enricher>)>,
    /// Storage backends, uploaded to in order.
    pub storages: Vec<(String, Arc<dyn Storage>)>,
    /// Databases, notified of lifecycle and consulted for the cache.
    pub databases: Vec<(String, Arc<dyn Database>)>,
    /// The single optional formatter.
    pub formatter: Option<(String, Arc<dyn Formatter>)>,
}

/// The pipeline orchestrator: pulls items from a feeder and drives each
/// through sanitize, cache-check, extract, enrich, store, format and
/// persist.
pub struct Orchestrator {
    config: OrchestratorConfig,
    keys: KeysConfig,
    pipeline: Pipeline,
    stop: StopHandle,
}

impl Orchestrator {
    /// Creates an orchestrator over an already assembled pipeline.
    pub fn new(config: OrchestratorConfig, keys: KeysConfig, pipeline: Pipeline) -> Self {
        Self {
            config,
            keys,
            pipeline,
            stop: StopHandle::new(),
        }
    }

    /// Instantiates every configured step through the registry and wires
    /// the orchestrator.
    ///
    /// This is the startup phase: any registry error (unknown module,
    /// missing binary dependency, failed setup) aborts assembly before a
    /// single item is processed.
    pub async fn assemble(
        config: &Config,
        registry: &mut ModuleRegistry,
    ) -> Result<(Self, Arc<dyn Feeder>), OrchestratorError> {
        let user = &config.module_config;

        let handles = registry.instantiate(&config.steps.feeder, user).await?;
        let feeder = handles.feeder.ok_or_else(|| OrchestratorError::WrongKind {
            module: config.steps.feeder.clone(),
            kind: ModuleKind::Feeder,
        })?;

        let mut pipeline = Pipeline::default();
        for name in &config.steps.extractors {
            let handles = registry.instantiate(name, user).await?;
            let extractor = handles.extractor.ok_or_else(|| OrchestratorError::WrongKind {
                module: name.clone(),
                kind: ModuleKind::Extractor,
            })?;
            pipeline.extractors.push((name.clone(), extractor));
        }
        for name in &config.steps.enrichers {
            let handles = registry.instantiate(name, user).await?;
            let enricher = handles.enricher.ok_or_else(|| OrchestratorError::WrongKind {
                module: name.clone(),
                kind: ModuleKind::Enricher,
            })?;
            pipeline.enrichers.push((name.clone(), enricher));
        }
        for name in &config.steps.storages {
            let handles = registry.instantiate(name, user).await?;
            let storage = handles.storage.ok_or_else(|| OrchestratorError::WrongKind {
                module: name.clone(),
                kind: ModuleKind::Storage,
            })?;
            pipeline.storages.push((name.clone(), storage));
        }
        for name in &config.steps.databases {
            let handles = registry.instantiate(name, user).await?;
            let database = handles.database.ok_or_else(|| OrchestratorError::WrongKind {
                module: name.clone(),
                kind: ModuleKind::Database,
            })?;
            pipeline.databases.push((name.clone(), database));
        }
        if let Some(name) = &config.steps.formatter {
            let handles = registry.instantiate(name, user).await?;
            let formatter = handles.formatter.ok_or_else(|| OrchestratorError::WrongKind {
                module: name.clone(),
                kind: ModuleKind::Formatter,
            })?;
            pipeline.formatter = Some((name.clone(), formatter));
        }

        info!(
            extractors = pipeline.extractors.len(),
            enrichers = pipeline.enrichers.len(),
            storages = pipeline.storages.len(),
            databases = pipeline.databases.len(),
            "pipeline assembled"
        );
        Ok((
            Self::new(config.orchestrator.clone(), config.keys.clone(), pipeline),
            feeder,
        ))
    }

    /// Uses an externally created stop handle instead of the internal one,
    /// so callers can wire signal handlers before the orchestrator exists.
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    /// A handle external code (signal handlers) can use to request a stop.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Pulls items from the feeder until it is exhausted or a stop is
    /// requested, archiving each in turn.
    ///
    /// Item-level errors are caught here: the item is reported `failed` to
    /// all databases and processing continues with the next one.
    pub async fn run(&self, feeder: Arc<dyn Feeder>) -> RunSummary {
        let mut summary = RunSummary::default();
        info!(feeder = feeder.name(), "run started");

        loop {
            if self.stop.is_stopped() {
                info!("stop requested, no further items will be pulled");
                break;
            }
            let item = match feeder.next_item().await {
                Ok(Some(item)) => item,
                Ok(None) => {
                    debug!("feeder exhausted");
                    break;
                }
                Err(e) => {
                    error!("feeder failed, ending run: {e:#}");
                    break;
                }
            };
            let (outcome, _) = self.archive_item(item).await;
            summary.record(outcome);
        }

        info!(
            processed = summary.processed,
            done = summary.done,
            cached = summary.cached,
            failed = summary.failed,
            aborted = summary.aborted,
            "run finished"
        );
        summary
    }

    /// Archives one item and notifies every database of its terminal
    /// outcome. Returns the outcome and the final item state.
    pub async fn archive_item(&self, mut item: Metadata) -> (ItemOutcome, Metadata) {
        let started = Instant::now();

        let outcome = match self.archive_inner(&mut item).await {
            Ok(outcome) => outcome,
            Err(OrchestratorError::Aborted) => {
                warn!(url = item.url_opt().unwrap_or_default(), "item aborted by stop request");
                item.set_status(STATUS_ABORTED);
                self.notify_aborted(&item).await;
                ItemOutcome::Aborted
            }
            Err(e) => {
                warn!(url = item.url_opt().unwrap_or_default(), "item failed: {e}");
                let reason = e.to_string();
                item.append_error(reason.clone());
                item.set_status(format!("failed: {reason}"));
                self.notify_failed(&item, &reason).await;
                ItemOutcome::Failed
            }
        };

        metrics::ITEMS_PROCESSED
            .with_label_values(&[outcome.as_str()])
            .inc();
        metrics::ITEM_DURATION
            .with_label_values(&[outcome.as_str()])
            .observe(started.elapsed().as_secs_f64());
        (outcome, item)
    }

    async fn archive_inner(
        &self,
        item: &mut Metadata,
    ) -> Result<ItemOutcome, OrchestratorError> {
        if item.url_opt().is_none() {
            return Err(OrchestratorError::MissingUrl);
        }

        // The context owns the item's working directory; dropping it at
        // any return below removes the directory and everything in it.
        let folder = item.folder().unwrap_or(&self.keys.folder).to_string();
        let mut builder = RunContext::builder()
            .folder(folder)
            .hash(self.keys.hash)
            .storage_count(self.pipeline.storages.len());
        if let Some(dir) = &self.config.working_dir {
            builder = builder.parent_dir(dir);
        }
        let ctx = builder.build()?;

        self.check_stop()?;
        self.sanitize_stage(item).await;

        self.check_stop()?;
        if self.cache_stage(item).await {
            metrics::CACHE_HITS.inc();
            self.notify_done(item, true).await;
            return Ok(ItemOutcome::Cached);
        }

        self.notify_started(item).await;

        self.check_stop()?;
        self.extract_stage(item, &ctx).await;

        self.check_stop()?;
        self.enrich_stage(item, &ctx).await;

        self.check_stop()?;
        self.store_stage(item, &ctx).await;

        self.check_stop()?;
        self.format_stage(item, &ctx).await;

        // Never return an ambiguous empty success: an item with no media
        // and no success status is explicitly "nothing archived".
        if item.is_empty() {
            item.set_status(STATUS_NOTHING_ARCHIVED);
        } else if item.status.is_empty() {
            item.set_status("done");
        }
        self.notify_done(item, false).await;
        Ok(ItemOutcome::Done)
    }

    /// Gives every configured extractor a chance to rewrite the URL, in
    /// order, each receiving the previous output. A changed URL preserves
    /// the original for audit.
    async fn sanitize_stage(&self, item: &mut Metadata) {
        let original = item.url().to_string();
        let mut url = original.clone();
        for (name, extractor) in &self.pipeline.extractors {
            match extractor.sanitize_url(&url).await {
                Ok(next) => url = next,
                Err(e) => {
                    warn!(module = %name, "sanitize failed: {e:#}");
                    metrics::STAGE_FAILURES.with_label_values(&["sanitize"]).inc();
                }
            }
        }
        if url != original {
            debug!(from = %original, to = %url, "url sanitized");
            item.set(ORIGINAL_URL_KEY, original);
            item.set_url(url);
        }
    }

    /// Asks every database whether this item was already archived. Any
    /// hit short-circuits the pipeline; all hits are merged, not just the
    /// first.
    async fn cache_stage(&self, item: &mut Metadata) -> bool {
        let mut hit = false;
        for (name, database) in &self.pipeline.databases {
            match database.fetch(item).await {
                Ok(Some(prior)) => {
                    info!(module = %name, url = item.url(), "cache hit");
                    item.merge(prior);
                    hit = true;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(module = %name, "cache fetch failed: {e:#}");
                    metrics::STAGE_FAILURES.with_label_values(&["cache"]).inc();
                }
            }
        }
        hit
    }

    /// Tries extractors in configured order; the first whose merged
    /// result is successful wins and later ones are never invoked.
    async fn extract_stage(&self, item: &mut Metadata, ctx: &RunContext) {
        for (name, extractor) in &self.pipeline.extractors {
            match extractor.download(item, ctx).await {
                Ok(Some(result)) => {
                    item.merge(result);
                    if item.is_success() {
                        info!(module = %name, url = item.url(), "extractor succeeded");
                        break;
                    }
                }
                Ok(None) => debug!(module = %name, "extractor not applicable"),
                Err(e) => {
                    // An extractor blowing up means "no result from this
                    // extractor", never a dead item.
                    warn!(module = %name, "extractor failed: {e:#}");
                    item.append_error(format!("{name}: {e}"));
                    metrics::STAGE_FAILURES.with_label_values(&["extract"]).inc();
                }
            }
        }
    }

    /// Runs every enricher unconditionally, in order. A failing enricher
    /// never blocks the ones after it.
    async fn enrich_stage(&self, item: &mut Metadata, ctx: &RunContext) {
        for (name, enricher) in &self.pipeline.enrichers {
            if let Err(e) = enricher.enrich(item, ctx).await {
                warn!(module = %name, "enricher failed: {e:#}");
                item.append_error(format!("{name}: {e}"));
                metrics::STAGE_FAILURES.with_label_values(&["enrich"]).inc();
            }
        }
    }

    /// Deduplicates the item's media, then uploads each media (and its
    /// nested media, one level) to every backend it is not yet stored in.
    async fn store_stage(&self, item: &mut Metadata, ctx: &RunContext) {
        let dropped = dedupe_media(item, ctx.hash());
        if dropped > 0 {
            metrics::MEDIA_DEDUPLICATED.inc_by(dropped as u64);
        }

        let url = item.url().to_string();
        for media in item.media_mut().iter_mut() {
            self.store_single(media, &url, ctx).await;
            for nested in media.nested_media_mut() {
                self.store_single(nested, &url, ctx).await;
            }
        }
    }

    /// Stores one media in every backend it is missing from.
    ///
    /// URLs are appended in backend order, so `urls.len()` marks how many
    /// backends already hold the media; on upload failure the loop stops
    /// rather than skipping ahead, keeping that bookkeeping aligned for
    /// the next run.
    async fn store_single(&self, media: &mut Media, url: &str, ctx: &RunContext) {
        if self.pipeline.storages.is_empty() {
            return;
        }
        if media.is_stored(ctx.storage_count()) {
            return;
        }

        if let Err(e) = ensure_hash(media, ctx.hash()) {
            warn!(file = %media.filename.display(), "could not hash media: {e}");
        }
        if let Err(e) = assign_key(media, url, ctx, &self.keys.policy) {
            warn!(file = %media.filename.display(), "could not assign storage key: {e}");
            metrics::STAGE_FAILURES.with_label_values(&["store"]).inc();
            return;
        }

        for (idx, (name, storage)) in self.pipeline.storages.iter().enumerate() {
            if media.urls().len() > idx {
                continue;
            }
            match storage.upload(media, ctx).await {
                Ok(()) => match storage.reachable_url(media).await {
                    Ok(reachable) => {
                        debug!(module = %name, key = media.key().unwrap_or_default(), "media stored");
                        media.add_url(reachable);
                        metrics::MEDIA_STORED.inc();
                    }
                    Err(e) => {
                        warn!(module = %name, "no reachable url after upload: {e:#}");
                        metrics::STAGE_FAILURES.with_label_values(&["store"]).inc();
                        break;
                    }
                },
                Err(e) => {
                    warn!(module = %name, "upload failed: {e:#}");
                    metrics::STAGE_FAILURES.with_label_values(&["store"]).inc();
                    break;
                }
            }
        }
    }

    /// Invokes the formatter, stores its artifact and attaches it under
    /// the reserved final-media property.
    async fn format_stage(&self, item: &mut Metadata, ctx: &RunContext) {
        let Some((name, formatter)) = &self.pipeline.formatter else {
            return;
        };
        match formatter.format(item, ctx).await {
            Ok(Some(mut final_media)) => {
                let url = item.url().to_string();
                self.store_single(&mut final_media, &url, ctx).await;
                item.set(FINAL_MEDIA_KEY, final_media);
            }
            Ok(None) => debug!(module = %name, "formatter produced nothing"),
            Err(e) => {
                warn!(module = %name, "formatter failed: {e:#}");
                item.append_error(format!("{name}: {e}"));
                metrics::STAGE_FAILURES.with_label_values(&["format"]).inc();
            }
        }
    }

    async fn notify_started(&self, item: &Metadata) {
        for (name, database) in &self.pipeline.databases {
            if let Err(e) = database.started(item).await {
                warn!(module = %name, "database started hook failed: {e:#}");
                metrics::STAGE_FAILURES.with_label_values(&["persist"]).inc();
            }
        }
    }

    async fn notify_done(&self, item: &Metadata, cached: bool) {
        for (name, database) in &self.pipeline.databases {
            if let Err(e) = database.done(item, cached).await {
                warn!(module = %name, "database done hook failed: {e:#}");
                metrics::STAGE_FAILURES.with_label_values(&["persist"]).inc();
            }
        }
    }

    async fn notify_failed(&self, item: &Metadata, reason: &str) {
        for (name, database) in &self.pipeline.databases {
            if let Err(e) = database.failed(item, reason).await {
                warn!(module = %name, "database failed hook failed: {e:#}");
                metrics::STAGE_FAILURES.with_label_values(&["persist"]).inc();
            }
        }
    }

    async fn notify_aborted(&self, item: &Metadata) {
        for (name, database) in &self.pipeline.databases {
            if let Err(e) = database.aborted(item).await {
                warn!(module = %name, "database aborted hook failed: {e:#}");
                metrics::STAGE_FAILURES.with_label_values(&["persist"]).inc();
            }
        }
    }

    fn check_stop(&self) -> Result<(), OrchestratorError> {
        if self.stop.is_stopped() {
            Err(OrchestratorError::Aborted)
        } else {
            Ok(())
        }
    }
}
