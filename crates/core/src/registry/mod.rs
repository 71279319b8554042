//! Module discovery and instantiation.
//!
//! Modules are independently deployable pipeline-stage implementations
//! described by a `manifest.toml`. Discovery reads only manifests (cheap,
//! never touches module code); instantiation resolves dependencies, layers
//! configuration, runs the one-time setup hook and caches the instance for
//! the process lifetime.
//!
//! Both discovery and instantiation happen during the single-threaded
//! startup phase, so the registry needs no internal locking.

mod error;
mod manifest;
#[allow(clippy::module_inception)]
mod registry;

pub use error::RegistryError;
pub use manifest::{ConfigOption, Descriptor, Manifest, ManifestDependencies, MANIFEST_FILE};
pub use registry::{
    ModuleConfigs, ModuleFactory, ModuleHandles, ModuleRegistry, StepConfig,
};
