//! Orchestrator configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the pipeline orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Parent directory for per-item working directories.
    /// Each item gets an exclusive temp dir underneath, removed when the
    /// item reaches a terminal state. Uses the system temp dir when unset.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_no_working_dir() {
        let config = OrchestratorConfig::default();
        assert!(config.working_dir.is_none());
    }

    #[test]
    fn test_deserialize_with_working_dir() {
        let config: OrchestratorConfig =
            toml::from_str("working_dir = \"/var/arkive/work\"").unwrap();
        assert_eq!(config.working_dir, Some(PathBuf::from("/var/arkive/work")));
    }
}
