//! On-disk module manifests and discovered descriptors.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::stage::ModuleKind;

use super::RegistryError;

/// File name the registry looks for in each module directory.
pub const MANIFEST_FILE: &str = "manifest.toml";

/// The declarative description of a module, parsed from `manifest.toml`.
///
/// Example:
///
/// ```toml
/// name = "screenshot"
/// kinds = ["extractor", "enricher"]
/// entry = "screenshot"
/// requires_setup = true
///
/// [dependencies]
/// modules = ["hash_enricher"]
/// binaries = ["chromium"]
///
/// [config.timeout_secs]
/// default = 30
/// help = "Seconds to wait for the page to settle"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Unique module name; also the key for per-module user config.
    pub name: String,

    /// The stage interfaces this module serves.
    pub kinds: BTreeSet<ModuleKind>,

    /// Factory the registry uses to construct the instance.
    pub entry: String,

    /// One-line description for listings.
    #[serde(default)]
    pub description: String,

    /// Whether the one-time setup hook must run before first use.
    #[serde(default)]
    pub requires_setup: bool,

    /// What this module needs before it can be constructed.
    #[serde(default)]
    pub dependencies: ManifestDependencies,

    /// Declared configuration schema: key to default/help/choices.
    #[serde(default)]
    pub config: BTreeMap<String, ConfigOption>,
}

/// Declared external dependencies, split by how they are checked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestDependencies {
    /// Other module names; instantiated recursively before this module.
    #[serde(default)]
    pub modules: Vec<String>,

    /// Binaries that must resolve on PATH; missing ones are fatal.
    #[serde(default)]
    pub binaries: Vec<String>,
}

/// One declared configuration key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigOption {
    /// Default value when the user supplies none.
    #[serde(default)]
    pub default: Option<toml::Value>,

    /// Help text for listings.
    #[serde(default)]
    pub help: String,

    /// Allowed values; empty means unrestricted.
    #[serde(default)]
    pub choices: Vec<toml::Value>,
}

/// A discovered-but-not-yet-instantiated module.
#[derive(Debug, Clone)]
pub struct Descriptor {
    /// The parsed manifest.
    pub manifest: Manifest,
    /// Directory the manifest was found in.
    pub dir: PathBuf,
}

impl Descriptor {
    /// Reads and parses `<dir>/manifest.toml`. Touches only the manifest,
    /// never module code.
    pub fn from_dir(dir: &Path) -> Result<Self, RegistryError> {
        let path = dir.join(MANIFEST_FILE);
        let raw = std::fs::read_to_string(&path).map_err(|source| RegistryError::ManifestRead {
            path: path.clone(),
            source,
        })?;
        let manifest: Manifest =
            toml::from_str(&raw).map_err(|e| RegistryError::ManifestParse {
                path,
                reason: e.to_string(),
            })?;
        Ok(Self {
            manifest,
            dir: dir.to_path_buf(),
        })
    }

    /// The module name.
    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    /// Whether the module serves the given stage interface.
    pub fn serves(&self, kind: ModuleKind) -> bool {
        self.manifest.kinds.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_manifest(dir: &Path, contents: &str) {
        std::fs::write(dir.join(MANIFEST_FILE), contents).unwrap();
    }

    #[test]
    fn test_parse_full_manifest() {
        let dir = TempDir::new().unwrap();
        write_manifest(
            dir.path(),
            r#"
name = "screenshot"
kinds = ["extractor", "enricher"]
entry = "screenshot"
requires_setup = true
description = "Captures a page screenshot"

[dependencies]
modules = ["hash_enricher"]
binaries = ["chromium"]

[config.timeout_secs]
default = 30
help = "Seconds to wait for the page to settle"

[config.quality]
default = "high"
choices = ["low", "high"]
"#,
        );

        let descriptor = Descriptor::from_dir(dir.path()).unwrap();
        assert_eq!(descriptor.name(), "screenshot");
        assert!(descriptor.serves(ModuleKind::Extractor));
        assert!(descriptor.serves(ModuleKind::Enricher));
        assert!(!descriptor.serves(ModuleKind::Storage));
        assert!(descriptor.manifest.requires_setup);
        assert_eq!(descriptor.manifest.dependencies.modules, vec!["hash_enricher"]);
        assert_eq!(descriptor.manifest.dependencies.binaries, vec!["chromium"]);

        let timeout = &descriptor.manifest.config["timeout_secs"];
        assert_eq!(timeout.default, Some(toml::Value::Integer(30)));
        let quality = &descriptor.manifest.config["quality"];
        assert_eq!(quality.choices.len(), 2);
    }

    #[test]
    fn test_parse_minimal_manifest() {
        let dir = TempDir::new().unwrap();
        write_manifest(
            dir.path(),
            r#"
name = "log_db"
kinds = ["database"]
entry = "log_db"
"#,
        );

        let descriptor = Descriptor::from_dir(dir.path()).unwrap();
        assert!(!descriptor.manifest.requires_setup);
        assert!(descriptor.manifest.dependencies.modules.is_empty());
        assert!(descriptor.manifest.config.is_empty());
    }

    #[test]
    fn test_missing_manifest_is_read_error() {
        let dir = TempDir::new().unwrap();
        let result = Descriptor::from_dir(dir.path());
        assert!(matches!(result, Err(RegistryError::ManifestRead { .. })));
    }

    #[test]
    fn test_invalid_manifest_is_parse_error() {
        let dir = TempDir::new().unwrap();
        write_manifest(dir.path(), "name = \"broken\"\nkinds = [\"not_a_kind\"]\n");
        let result = Descriptor::from_dir(dir.path());
        assert!(matches!(result, Err(RegistryError::ManifestParse { .. })));
    }
}
