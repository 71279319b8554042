//! Built-in reference modules.
//!
//! These are real registry modules (manifests live under `modules/` in the
//! crate root) that exercise every stage contract without network I/O:
//! a list feeder, a hashing enricher, a filesystem storage backend and a
//! tracing-backed database. They double as the reference implementation of
//! the plugin contract for module authors.

mod hash_enricher;
mod local_storage;
mod log_db;
mod url_feeder;

use std::collections::HashMap;
use std::sync::Arc;

use crate::registry::{ModuleFactory, ModuleHandles, StepConfig};

pub use hash_enricher::HashEnricher;
pub use local_storage::LocalStorage;
pub use log_db::LogDb;
pub use url_feeder::UrlFeeder;

/// Factories for the built-in modules, keyed by manifest entry name.
///
/// Pass this to [`ModuleRegistry::with_factories`](crate::registry::ModuleRegistry::with_factories)
/// and register any external module factories on top.
pub fn builtin_factories() -> HashMap<String, ModuleFactory> {
    let mut factories: HashMap<String, ModuleFactory> = HashMap::new();

    factories.insert(
        "url_feeder".to_string(),
        Arc::new(|config: StepConfig| {
            let feeder = Arc::new(UrlFeeder::from_config(&config)?);
            Ok(ModuleHandles {
                feeder: Some(feeder),
                ..Default::default()
            })
        }),
    );
    factories.insert(
        "hash_enricher".to_string(),
        Arc::new(|_config: StepConfig| {
            Ok(ModuleHandles {
                enricher: Some(Arc::new(HashEnricher::new())),
                ..Default::default()
            })
        }),
    );
    factories.insert(
        "local_storage".to_string(),
        Arc::new(|config: StepConfig| {
            let storage = Arc::new(LocalStorage::from_config(&config)?);
            Ok(ModuleHandles {
                storage: Some(storage),
                ..Default::default()
            })
        }),
    );
    factories.insert(
        "log_db".to_string(),
        Arc::new(|_config: StepConfig| {
            Ok(ModuleHandles {
                database: Some(Arc::new(LogDb::new())),
                ..Default::default()
            })
        }),
    );

    factories
}

/// Reads a string value from a module config table.
pub(crate) fn config_str(config: &StepConfig, key: &str) -> Option<String> {
    config
        .get(key)
        .and_then(|value| value.as_str())
        .map(str::to_string)
}

/// Reads a list of strings from a module config table.
pub(crate) fn config_str_list(config: &StepConfig, key: &str) -> Vec<String> {
    config
        .get(key)
        .and_then(|value| value.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
