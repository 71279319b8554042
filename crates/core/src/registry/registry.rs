//! The module registry: name to live, configured instance.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::stage::{Database, Enricher, Extractor, Feeder, Formatter, Storage};

use super::manifest::{Descriptor, Manifest, MANIFEST_FILE};
use super::RegistryError;

/// Module dependency chains deeper than this are treated as cycles.
const MAX_DEPENDENCY_DEPTH: usize = 16;

/// Configuration for one module: key to value, one level deep.
pub type StepConfig = BTreeMap<String, toml::Value>;

/// User-supplied configuration for all modules: module name to its table.
pub type ModuleConfigs = BTreeMap<String, StepConfig>;

/// Constructs a module instance from its merged configuration.
pub type ModuleFactory = Arc<dyn Fn(StepConfig) -> anyhow::Result<ModuleHandles> + Send + Sync>;

/// A live module instance, one trait object per stage interface it serves.
///
/// A multi-role module clones one `Arc` into several slots, so the slots
/// share a single instance and the setup hook runs once, through the first
/// populated slot.
#[derive(Clone, Default)]
pub struct ModuleHandles {
    /// Present when the module serves as a feeder.
    pub feeder: Option<Arc<dyn Feeder>>,
    /// Present when the module serves as an extractor.
    pub extractor: Option<Arc<dyn Extractor>>,
    /// Present when the module serves as an enricher.
    pub enricher: Option<Arc<dyn Enricher>>,
    /// Present when the module serves as a storage backend.
    pub storage: Option<Arc<dyn Storage>>,
    /// Present when the module serves as a database backend.
    pub database: Option<Arc<dyn Database>>,
    /// Present when the module serves as a formatter.
    pub formatter: Option<Arc<dyn Formatter>>,
}

impl std::fmt::Debug for ModuleHandles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleHandles")
            .field("feeder", &self.feeder.is_some())
            .field("extractor", &self.extractor.is_some())
            .field("enricher", &self.enricher.is_some())
            .field("storage", &self.storage.is_some())
            .field("database", &self.database.is_some())
            .field("formatter", &self.formatter.is_some())
            .finish()
    }
}

impl ModuleHandles {
    /// Runs the instance's one-time setup hook through the first populated
    /// slot (all slots share the instance).
    pub async fn run_setup(&self) -> anyhow::Result<()> {
        if let Some(feeder) = &self.feeder {
            return feeder.setup().await;
        }
        if let Some(extractor) = &self.extractor {
            return extractor.setup().await;
        }
        if let Some(enricher) = &self.enricher {
            return enricher.setup().await;
        }
        if let Some(storage) = &self.storage {
            return storage.setup().await;
        }
        if let Some(database) = &self.database {
            return database.setup().await;
        }
        if let Some(formatter) = &self.formatter {
            return formatter.setup().await;
        }
        Ok(())
    }
}

/// Maps module names to live, configured instances without compile-time
/// knowledge of module code.
///
/// Factories are registered by entry name at process start (the explicit
/// replacement for import-by-string); manifests bind module names to
/// entries, dependencies and config schemas.
#[derive(Default)]
pub struct ModuleRegistry {
    factories: HashMap<String, ModuleFactory>,
    descriptors: HashMap<String, Descriptor>,
    instances: HashMap<String, ModuleHandles>,
}

impl ModuleRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the given factories.
    pub fn with_factories(factories: HashMap<String, ModuleFactory>) -> Self {
        Self {
            factories,
            ..Self::default()
        }
    }

    /// Registers a factory under an entry name.
    pub fn register_factory(&mut self, entry: impl Into<String>, factory: ModuleFactory) {
        self.factories.insert(entry.into(), factory);
    }

    /// Scans each path's direct subdirectories for `manifest.toml` and
    /// builds descriptors.
    ///
    /// Paths are scanned longest-first with first-discovered-wins inserts:
    /// the longest (most specific) path that defines a name owns it, so
    /// user module directories override bundled ones. Unreadable or
    /// invalid manifests are logged and skipped; they never abort
    /// discovery of other modules.
    ///
    /// Returns the number of descriptors known after the scan.
    pub fn discover(&mut self, paths: &[PathBuf]) -> usize {
        let mut ordered: Vec<&PathBuf> = paths.iter().collect();
        ordered.sort_by_key(|p| std::cmp::Reverse(p.as_os_str().len()));

        for path in ordered {
            self.scan_path(path);
        }
        self.descriptors.len()
    }

    fn scan_path(&mut self, path: &Path) {
        let entries = match std::fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %path.display(), "skipping unreadable module path: {e}");
                return;
            }
        };

        for entry in entries.flatten() {
            let dir = entry.path();
            if !dir.is_dir() || !dir.join(MANIFEST_FILE).is_file() {
                continue;
            }
            match Descriptor::from_dir(&dir) {
                Ok(descriptor) => {
                    let name = descriptor.name().to_string();
                    if self.descriptors.contains_key(&name) {
                        debug!(module = %name, dir = %dir.display(), "duplicate module name, keeping first-discovered");
                    } else {
                        debug!(module = %name, dir = %dir.display(), "discovered module");
                        self.descriptors.insert(name, descriptor);
                    }
                }
                Err(e) => warn!(dir = %dir.display(), "skipping invalid manifest: {e}"),
            }
        }
    }

    /// Looks up a discovered descriptor by name.
    pub fn resolve(&self, name: &str) -> Result<&Descriptor, RegistryError> {
        match self.descriptors.get(name) {
            Some(descriptor) => Ok(descriptor),
            None => {
                error!(module = name, "module not found in any discovery path");
                Err(RegistryError::UnknownModule(name.to_string()))
            }
        }
    }

    /// All discovered descriptors, in name order.
    pub fn descriptors(&self) -> Vec<&Descriptor> {
        let mut all: Vec<&Descriptor> = self.descriptors.values().collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        all
    }

    /// Returns the live instance for `name`, constructing it on first use.
    ///
    /// Construction checks every declared dependency first: module
    /// dependencies are themselves instantiated (live, configured
    /// instances, not just linted for presence) and missing binaries are a
    /// fatal error. Configuration is the manifest defaults overridden by
    /// the user's per-module table, one level deep. The setup hook runs
    /// once when the manifest requires it; setup failures propagate and
    /// are not retried.
    ///
    /// Idempotent: later calls return the cached instance.
    pub async fn instantiate(
        &mut self,
        name: &str,
        user_config: &ModuleConfigs,
    ) -> Result<ModuleHandles, RegistryError> {
        self.instantiate_at(name, user_config, 0).await
    }

    fn instantiate_at<'a>(
        &'a mut self,
        name: &'a str,
        user_config: &'a ModuleConfigs,
        depth: usize,
    ) -> Pin<Box<dyn Future<Output = Result<ModuleHandles, RegistryError>> + Send + 'a>> {
        Box::pin(async move {
            if depth > MAX_DEPENDENCY_DEPTH {
                return Err(RegistryError::DependencyCycle {
                    module: name.to_string(),
                });
            }
            if let Some(existing) = self.instances.get(name) {
                return Ok(existing.clone());
            }

            let descriptor = self.resolve(name)?.clone();
            let manifest = &descriptor.manifest;

            for dep in &manifest.dependencies.modules {
                debug!(module = name, dependency = %dep, "instantiating module dependency");
                self.instantiate_at(dep, user_config, depth + 1).await?;
            }
            for binary in &manifest.dependencies.binaries {
                if which::which(binary).is_err() {
                    return Err(RegistryError::MissingBinary {
                        module: name.to_string(),
                        binary: binary.clone(),
                    });
                }
            }

            let config = merged_config(manifest, user_config.get(name))?;

            let factory = self.factories.get(&manifest.entry).cloned().ok_or_else(|| {
                RegistryError::UnknownEntry {
                    module: name.to_string(),
                    entry: manifest.entry.clone(),
                }
            })?;
            let handles = factory(config).map_err(|source| RegistryError::Construction {
                module: name.to_string(),
                source,
            })?;

            if manifest.requires_setup {
                debug!(module = name, "running module setup");
                handles
                    .run_setup()
                    .await
                    .map_err(|source| RegistryError::SetupFailed {
                        module: name.to_string(),
                        source,
                    })?;
            }

            self.instances.insert(name.to_string(), handles.clone());
            Ok(handles)
        })
    }
}

/// Manifest defaults overridden by the user table, one level deep, with
/// declared choices enforced.
fn merged_config(
    manifest: &Manifest,
    user: Option<&StepConfig>,
) -> Result<StepConfig, RegistryError> {
    let mut config = StepConfig::new();
    for (key, option) in &manifest.config {
        if let Some(default) = &option.default {
            config.insert(key.clone(), default.clone());
        }
    }
    if let Some(user) = user {
        for (key, value) in user {
            if let Some(option) = manifest.config.get(key) {
                if !option.choices.is_empty() && !option.choices.contains(value) {
                    return Err(RegistryError::InvalidConfig {
                        module: manifest.name.clone(),
                        key: key.clone(),
                        reason: format!("value {value:?} is not one of {:?}", option.choices),
                    });
                }
            }
            // Unknown keys pass through untouched; they may be meaningful
            // to the module even when undeclared.
            config.insert(key.clone(), value.clone());
        }
    }
    Ok(config)
}
