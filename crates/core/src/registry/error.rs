//! Error types for the module registry.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from module discovery and instantiation.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A manifest file could not be read.
    #[error("failed to read manifest {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A manifest file could not be parsed.
    #[error("failed to parse manifest {path}: {reason}")]
    ManifestParse { path: PathBuf, reason: String },

    /// No descriptor with this name was discovered.
    #[error("unknown module: {0}")]
    UnknownModule(String),

    /// The manifest's entry point has no registered factory.
    #[error("module {module} declares entry {entry:?} but no such factory is registered")]
    UnknownEntry { module: String, entry: String },

    /// A declared binary/library dependency is not resolvable on this
    /// host. Fatal: the worker exits before processing any item.
    #[error("module {module} requires binary {binary:?} which was not found on this host")]
    MissingBinary { module: String, binary: String },

    /// Module dependencies form a cycle.
    #[error("dependency cycle while instantiating module {module}")]
    DependencyCycle { module: String },

    /// A user-supplied config value is outside the manifest's choices.
    #[error("invalid config for module {module}, key {key:?}: {reason}")]
    InvalidConfig {
        module: String,
        key: String,
        reason: String,
    },

    /// The module factory failed to construct the instance.
    #[error("failed to construct module {module}: {source}")]
    Construction {
        module: String,
        #[source]
        source: anyhow::Error,
    },

    /// The module's one-time setup hook failed. Fatal: the worker exits
    /// before processing any item.
    #[error("setup failed for module {module}: {source}")]
    SetupFailed {
        module: String,
        #[source]
        source: anyhow::Error,
    },
}

impl RegistryError {
    /// Whether this error must abort the whole run at startup. A missing
    /// codec or CLI tool mid-pipeline is worse than an early crash, so
    /// dependency and setup failures never degrade silently.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MissingBinary { .. } | Self::SetupFailed { .. } | Self::Construction { .. }
        )
    }
}
