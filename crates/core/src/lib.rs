//! Arkive core: a pluggable URL-archiving pipeline engine.
//!
//! A feeder hands the orchestrator one item at a time (a [`Metadata`]
//! seeded with a URL); the orchestrator drives it through sanitize,
//! cache-check, extract, enrich, store, format and persist, dispatching to
//! stage implementations resolved by name through the manifest-based
//! [`ModuleRegistry`]. The core performs no network I/O of its own:
//! platform extractors, cloud storage and database adapters are external
//! modules implementing the [`stage`] traits.

pub mod config;
pub mod context;
pub mod keys;
pub mod metrics;
pub mod model;
pub mod modules;
pub mod orchestrator;
pub mod registry;
pub mod retry;
pub mod stage;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, KeysConfig,
    ModulesConfig, StepsConfig,
};
pub use context::RunContext;
pub use keys::{
    assign_key, dedupe_media, ensure_hash, FilenameStyle, HashAlgorithm, KeyError, KeyPolicy,
    PathStyle,
};
pub use model::{Media, Metadata, PropertyValue};
pub use modules::builtin_factories;
pub use orchestrator::{
    ItemOutcome, Orchestrator, OrchestratorConfig, OrchestratorError, Pipeline, RunSummary,
    StopHandle,
};
pub use registry::{
    Descriptor, Manifest, ModuleConfigs, ModuleFactory, ModuleHandles, ModuleRegistry,
    RegistryError, StepConfig,
};
pub use stage::{Database, Enricher, Extractor, Feeder, Formatter, ModuleKind, Step, Storage};
