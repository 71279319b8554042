//! Stage contracts implemented by pipeline modules.
//!
//! The orchestrator dispatches by interface, never by concrete type: a
//! module advertises the kinds it serves in its manifest and its factory
//! hands back one trait object per kind (the same instance may fill
//! several slots).

mod traits;

use serde::{Deserialize, Serialize};

pub use traits::{Database, Enricher, Extractor, Feeder, Formatter, Step, Storage};

/// The roles a module can serve in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    /// Produces items to archive.
    Feeder,
    /// Downloads content for a URL it understands.
    Extractor,
    /// Adds media or properties to an item in place.
    Enricher,
    /// Uploads media to a backend and serves reachable URLs.
    Storage,
    /// Records item lifecycle and serves the archive cache.
    Database,
    /// Renders the one canonical artifact for an item.
    Formatter,
}

impl ModuleKind {
    /// Human-readable name, matching the manifest spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feeder => "feeder",
            Self::Extractor => "extractor",
            Self::Enricher => "enricher",
            Self::Storage => "storage",
            Self::Database => "database",
            Self::Formatter => "formatter",
        }
    }
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serialization_matches_manifest_spelling() {
        let json = serde_json::to_string(&ModuleKind::Extractor).unwrap();
        assert_eq!(json, "\"extractor\"");
        let kind: ModuleKind = serde_json::from_str("\"storage\"").unwrap();
        assert_eq!(kind, ModuleKind::Storage);
        assert_eq!(kind.to_string(), "storage");
    }
}
