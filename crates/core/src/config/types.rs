use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::keys::{HashAlgorithm, KeyPolicy};
use crate::orchestrator::OrchestratorConfig;
use crate::registry::ModuleConfigs;

/// Root configuration.
///
/// Per-module configuration lives under `[config.<module>]` tables, two
/// levels deep (module name, then key): the registry merges each table
/// over the module's manifest defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Where to discover module manifests.
    #[serde(default)]
    pub modules: ModulesConfig,

    /// Which modules fill each pipeline stage, in execution order.
    pub steps: StepsConfig,

    /// Storage key derivation and content hashing.
    #[serde(default)]
    pub keys: KeysConfig,

    /// Orchestrator knobs.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Per-module configuration tables.
    #[serde(default, rename = "config")]
    pub module_config: ModuleConfigs,
}

/// Module discovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModulesConfig {
    /// Paths scanned for module manifests. Order them longest-path-last:
    /// the longest path is treated as the most specific and wins duplicate
    /// names.
    #[serde(default = "default_module_paths")]
    pub paths: Vec<PathBuf>,
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            paths: default_module_paths(),
        }
    }
}

fn default_module_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("modules")]
}

/// The modules filling each pipeline stage.
///
/// List order is execution order and must be reproducible from this
/// configuration alone: sanitizers and extractors are priority lists.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StepsConfig {
    /// The feeder producing items.
    pub feeder: String,

    /// Extractors, tried in order until one succeeds.
    #[serde(default)]
    pub extractors: Vec<String>,

    /// Enrichers, all run in order.
    #[serde(default)]
    pub enrichers: Vec<String>,

    /// Storage backends; every media is uploaded to each.
    #[serde(default)]
    pub storages: Vec<String>,

    /// Databases notified of item lifecycle and consulted for the cache.
    #[serde(default)]
    pub databases: Vec<String>,

    /// The single optional formatter.
    #[serde(default)]
    pub formatter: Option<String>,
}

/// Storage key and hashing configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KeysConfig {
    /// Key derivation strategies.
    #[serde(flatten)]
    pub policy: KeyPolicy,

    /// Content-hash algorithm for dedup and `static` filenames.
    #[serde(default)]
    pub hash: HashAlgorithm,

    /// Default destination folder when an item specifies none.
    #[serde(default)]
    pub folder: String,
}
