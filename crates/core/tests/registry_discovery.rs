//! Module registry integration tests.
//!
//! Covers manifest discovery (including the path-override ordering rule),
//! instance caching, dependency resolution, config layering and fatal
//! dependency failures.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Mutex;
use tempfile::TempDir;

use arkive_core::{
    testing::MockEnricher,
    Metadata, ModuleConfigs, ModuleHandles, ModuleRegistry, RegistryError, RunContext, StepConfig,
};
use arkive_core::stage::{Enricher, Step};

fn write_module(root: &Path, dir_name: &str, manifest: &str) {
    let dir = root.join(dir_name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("manifest.toml"), manifest).unwrap();
}

fn enricher_manifest(name: &str, entry: &str) -> String {
    format!(
        r#"
name = "{name}"
kinds = ["enricher"]
entry = "{entry}"
"#
    )
}

/// Registers a counting factory producing a mock enricher.
fn counting_factory(registry: &mut ModuleRegistry, entry: &str) -> Arc<AtomicUsize> {
    let constructions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&constructions);
    registry.register_factory(
        entry,
        Arc::new(move |_config: StepConfig| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(ModuleHandles {
                enricher: Some(Arc::new(MockEnricher::new("counted"))),
                ..Default::default()
            })
        }),
    );
    constructions
}

#[tokio::test]
async fn test_discovery_finds_all_manifests() {
    let root = TempDir::new().unwrap();
    write_module(root.path(), "alpha", &enricher_manifest("alpha", "alpha"));
    write_module(root.path(), "beta", &enricher_manifest("beta", "beta"));
    // A directory without a manifest is not a module.
    std::fs::create_dir_all(root.path().join("not_a_module")).unwrap();

    let mut registry = ModuleRegistry::new();
    let discovered = registry.discover(&[root.path().to_path_buf()]);

    assert_eq!(discovered, 2);
    assert!(registry.resolve("alpha").is_ok());
    assert!(registry.resolve("beta").is_ok());
    assert!(matches!(
        registry.resolve("not_a_module"),
        Err(RegistryError::UnknownModule(_))
    ));
}

#[tokio::test]
async fn test_longest_path_owns_duplicate_names() {
    let root = TempDir::new().unwrap();
    let base = root.path().join("modules");
    let community = root.path().join("modules/community");
    write_module(&base, "dup", &enricher_manifest("dup", "base_entry"));
    write_module(&community, "dup", &enricher_manifest("dup", "community_entry"));

    // The longer (more specific) path wins, regardless of argument order.
    let mut registry = ModuleRegistry::new();
    registry.discover(&[base.clone(), community.clone()]);
    assert_eq!(registry.resolve("dup").unwrap().manifest.entry, "community_entry");

    let mut registry = ModuleRegistry::new();
    registry.discover(&[community, base]);
    assert_eq!(registry.resolve("dup").unwrap().manifest.entry, "community_entry");
}

#[tokio::test]
async fn test_invalid_manifest_does_not_abort_discovery() {
    let root = TempDir::new().unwrap();
    write_module(root.path(), "good", &enricher_manifest("good", "good"));
    write_module(root.path(), "broken", "kinds = [this is not toml");

    let mut registry = ModuleRegistry::new();
    let discovered = registry.discover(&[root.path().to_path_buf()]);

    assert_eq!(discovered, 1);
    assert!(registry.resolve("good").is_ok());
}

#[tokio::test]
async fn test_instantiate_returns_the_identical_cached_instance() {
    let root = TempDir::new().unwrap();
    write_module(root.path(), "alpha", &enricher_manifest("alpha", "alpha"));

    let mut registry = ModuleRegistry::new();
    let constructions = counting_factory(&mut registry, "alpha");
    registry.discover(&[root.path().to_path_buf()]);

    let configs = ModuleConfigs::new();
    let first = registry.instantiate("alpha", &configs).await.unwrap();
    let second = registry.instantiate("alpha", &configs).await.unwrap();

    assert_eq!(constructions.load(Ordering::SeqCst), 1);
    let (a, b) = (first.enricher.unwrap(), second.enricher.unwrap());
    assert!(Arc::ptr_eq(&a, &b));
}

#[tokio::test]
async fn test_missing_binary_dependency_is_fatal() {
    let root = TempDir::new().unwrap();
    write_module(
        root.path(),
        "video",
        r#"
name = "video"
kinds = ["enricher"]
entry = "video"

[dependencies]
binaries = ["arkive-test-binary-that-cannot-exist"]
"#,
    );

    let mut registry = ModuleRegistry::new();
    counting_factory(&mut registry, "video");
    registry.discover(&[root.path().to_path_buf()]);

    let result = registry.instantiate("video", &ModuleConfigs::new()).await;
    match result {
        Err(e @ RegistryError::MissingBinary { .. }) => assert!(e.is_fatal()),
        other => panic!("expected MissingBinary, got {other:?}"),
    }
}

#[tokio::test]
async fn test_module_dependencies_are_instantiated_recursively() {
    let root = TempDir::new().unwrap();
    write_module(
        root.path(),
        "parent",
        r#"
name = "parent"
kinds = ["enricher"]
entry = "parent"

[dependencies]
modules = ["child"]
"#,
    );
    write_module(root.path(), "child", &enricher_manifest("child", "child"));

    let mut registry = ModuleRegistry::new();
    let parent_count = counting_factory(&mut registry, "parent");
    let child_count = counting_factory(&mut registry, "child");
    registry.discover(&[root.path().to_path_buf()]);

    registry
        .instantiate("parent", &ModuleConfigs::new())
        .await
        .unwrap();

    // The dependency became a live instance, not a lint.
    assert_eq!(parent_count.load(Ordering::SeqCst), 1);
    assert_eq!(child_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_dependency_cycle_is_detected() {
    let root = TempDir::new().unwrap();
    write_module(
        root.path(),
        "ouro",
        r#"
name = "ouro"
kinds = ["enricher"]
entry = "ouro"

[dependencies]
modules = ["ouro"]
"#,
    );

    let mut registry = ModuleRegistry::new();
    counting_factory(&mut registry, "ouro");
    registry.discover(&[root.path().to_path_buf()]);

    let result = registry.instantiate("ouro", &ModuleConfigs::new()).await;
    assert!(matches!(result, Err(RegistryError::DependencyCycle { .. })));
}

#[tokio::test]
async fn test_config_layering_defaults_then_user() {
    let root = TempDir::new().unwrap();
    write_module(
        root.path(),
        "configurable",
        r#"
name = "configurable"
kinds = ["enricher"]
entry = "configurable"

[config.timeout_secs]
default = 30

[config.quality]
default = "high"
choices = ["low", "high"]
"#,
    );

    let received: Arc<Mutex<Option<StepConfig>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&received);

    let mut registry = ModuleRegistry::new();
    registry.register_factory(
        "configurable",
        Arc::new(move |config: StepConfig| {
            *sink.lock().unwrap() = Some(config);
            Ok(ModuleHandles {
                enricher: Some(Arc::new(MockEnricher::new("configurable"))),
                ..Default::default()
            })
        }),
    );
    registry.discover(&[root.path().to_path_buf()]);

    let mut configs = ModuleConfigs::new();
    let mut table = StepConfig::new();
    table.insert("timeout_secs".to_string(), toml::Value::Integer(5));
    configs.insert("configurable".to_string(), table);

    registry.instantiate("configurable", &configs).await.unwrap();

    let config = received.lock().unwrap().clone().unwrap();
    assert_eq!(config["timeout_secs"], toml::Value::Integer(5));
    assert_eq!(config["quality"], toml::Value::String("high".to_string()));
}

#[tokio::test]
async fn test_config_outside_choices_is_rejected() {
    let root = TempDir::new().unwrap();
    write_module(
        root.path(),
        "choosy",
        r#"
name = "choosy"
kinds = ["enricher"]
entry = "choosy"

[config.quality]
default = "high"
choices = ["low", "high"]
"#,
    );

    let mut registry = ModuleRegistry::new();
    counting_factory(&mut registry, "choosy");
    registry.discover(&[root.path().to_path_buf()]);

    let mut configs = ModuleConfigs::new();
    let mut table = StepConfig::new();
    table.insert("quality".to_string(), toml::Value::String("ultra".to_string()));
    configs.insert("choosy".to_string(), table);

    let result = registry.instantiate("choosy", &configs).await;
    assert!(matches!(result, Err(RegistryError::InvalidConfig { .. })));
}

/// An enricher that counts (and can fail) its setup hook.
struct SetupProbe {
    setups: Arc<AtomicUsize>,
    fail: bool,
}

#[async_trait]
impl Step for SetupProbe {
    fn name(&self) -> &str {
        "setup_probe"
    }

    async fn setup(&self) -> Result<()> {
        self.setups.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(anyhow!("login rejected"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Enricher for SetupProbe {
    async fn enrich(&self, _item: &mut Metadata, _ctx: &RunContext) -> Result<()> {
        Ok(())
    }
}

fn setup_manifest(name: &str) -> String {
    format!(
        r#"
name = "{name}"
kinds = ["enricher"]
entry = "{name}"
requires_setup = true
"#
    )
}

#[tokio::test]
async fn test_setup_runs_once_per_process() {
    let root = TempDir::new().unwrap();
    write_module(root.path(), "probe", &setup_manifest("probe"));

    let setups = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&setups);

    let mut registry = ModuleRegistry::new();
    registry.register_factory(
        "probe",
        Arc::new(move |_config: StepConfig| {
            Ok(ModuleHandles {
                enricher: Some(Arc::new(SetupProbe {
                    setups: Arc::clone(&counter),
                    fail: false,
                })),
                ..Default::default()
            })
        }),
    );
    registry.discover(&[root.path().to_path_buf()]);

    let configs = ModuleConfigs::new();
    registry.instantiate("probe", &configs).await.unwrap();
    registry.instantiate("probe", &configs).await.unwrap();

    assert_eq!(setups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_setup_failure_is_fatal_and_propagates() {
    let root = TempDir::new().unwrap();
    write_module(root.path(), "probe", &setup_manifest("probe"));

    let setups = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&setups);

    let mut registry = ModuleRegistry::new();
    registry.register_factory(
        "probe",
        Arc::new(move |_config: StepConfig| {
            Ok(ModuleHandles {
                enricher: Some(Arc::new(SetupProbe {
                    setups: Arc::clone(&counter),
                    fail: true,
                })),
                ..Default::default()
            })
        }),
    );
    registry.discover(&[root.path().to_path_buf()]);

    let result = registry.instantiate("probe", &ModuleConfigs::new()).await;
    match result {
        Err(e @ RegistryError::SetupFailed { .. }) => assert!(e.is_fatal()),
        other => panic!("expected SetupFailed, got {other:?}"),
    }
    // The failed instance was not cached.
    let retry = registry.instantiate("probe", &ModuleConfigs::new()).await;
    assert!(retry.is_err());
    assert_eq!(setups.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unknown_entry_is_reported() {
    let root = TempDir::new().unwrap();
    write_module(root.path(), "orphan", &enricher_manifest("orphan", "no_such_entry"));

    let mut registry = ModuleRegistry::new();
    registry.discover(&[root.path().to_path_buf()]);

    let result = registry.instantiate("orphan", &ModuleConfigs::new()).await;
    assert!(matches!(result, Err(RegistryError::UnknownEntry { .. })));
}
