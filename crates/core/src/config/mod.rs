//! Engine configuration: loading, types and validation.

mod loader;
mod types;
mod validate;

use thiserror::Error;

pub use loader::{load_config, load_config_from_str};
pub use types::{Config, KeysConfig, ModulesConfig, StepsConfig};
pub use validate::validate_config;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file does not exist.
    #[error("config file not found: {0}")]
    FileNotFound(String),

    /// Config file could not be parsed.
    #[error("failed to parse config: {0}")]
    ParseError(String),

    /// Config parsed but is not usable.
    #[error("invalid config: {0}")]
    ValidationError(String),
}
