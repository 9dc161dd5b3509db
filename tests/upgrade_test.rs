//! Config Upgrade Tests
//!
//! Tests for the version upgrader chain: step ordering, version stamping,
//! skip-below-current and failure reporting.

mod common;

use common::{tree, ServerSettings};
use serde_yaml::Value;
use std::cell::RefCell;
use std::rc::Rc;
use yamlbind::{
    discover, load, Bindable, CoercionRegistry, ConfigVersion, Error, LoadOptions, Upgrader,
    UpgraderChain,
};

/// Rename a top-level key, for simulating schema changes between versions.
fn rename_key(tree: &mut Value, from: &str, to: &str) {
    if let Some(map) = tree.as_mapping_mut() {
        if let Some(value) = map.remove(from) {
            map.insert(Value::String(to.to_string()), value);
        }
    }
}

#[test]
fn test_steps_apply_in_base_order() {
    common::init_logging();
    // Added out of order on purpose
    let chain = UpgraderChain::new(ConfigVersion::new(2, 0, 0))
        .with_upgrader(Upgrader::new(ConfigVersion::new(1, 0, 0), |tree| {
            rename_key(tree, "intermediate", "final");
            Ok(())
        }))
        .with_upgrader(Upgrader::new(ConfigVersion::new(0, 5, 0), |tree| {
            rename_key(tree, "legacy", "intermediate");
            Ok(())
        }));

    // No version marker: treated as 0.0.0, so every step runs
    let mut doc = tree("legacy: 1\n");
    let report = chain.upgrade(&mut doc).unwrap();

    assert_eq!(report.from, ConfigVersion::ZERO);
    assert_eq!(report.to, ConfigVersion::new(2, 0, 0));
    assert_eq!(
        report.applied,
        [ConfigVersion::new(0, 5, 0), ConfigVersion::new(1, 0, 0)]
    );
    assert_eq!(doc["final"], Value::from(1));
    assert_eq!(doc["config-version"], Value::from("2.0.0"));
}

#[test]
fn test_steps_below_current_version_are_skipped() {
    common::init_logging();
    let chain = UpgraderChain::new(ConfigVersion::new(2, 0, 0))
        .with_upgrader(Upgrader::new(ConfigVersion::new(0, 5, 0), |tree| {
            rename_key(tree, "a", "b");
            Ok(())
        }))
        .with_upgrader(Upgrader::new(ConfigVersion::new(1, 0, 0), |tree| {
            rename_key(tree, "c", "d");
            Ok(())
        }));

    let mut doc = tree("config-version: 1.0.0\na: 1\nc: 2\n");
    let report = chain.upgrade(&mut doc).unwrap();

    assert_eq!(report.applied, [ConfigVersion::new(1, 0, 0)]);
    // The 0.5.0 step did not run
    assert_eq!(doc["a"], Value::from(1));
    assert_eq!(doc["d"], Value::from(2));
}

#[test]
fn test_document_at_target_is_untouched() {
    common::init_logging();
    let chain = UpgraderChain::new(ConfigVersion::new(2, 0, 0)).with_upgrader(Upgrader::new(
        ConfigVersion::new(1, 0, 0),
        |tree| {
            rename_key(tree, "a", "b");
            Ok(())
        },
    ));

    let original = tree("config-version: 2.0.0\na: 1\n");
    let mut doc = original.clone();
    let report = chain.upgrade(&mut doc).unwrap();

    assert!(report.applied.is_empty());
    assert_eq!(doc, original);
}

#[test]
fn test_newer_than_target_errors() {
    common::init_logging();
    let chain = UpgraderChain::new(ConfigVersion::new(2, 0, 0));

    let mut doc = tree("config-version: 3.1.0\n");
    let err = chain.upgrade(&mut doc).unwrap_err();
    assert!(matches!(err, Error::VersionMismatch { .. }));
}

#[test]
fn test_failed_step_reports_base_and_skips_stamp() {
    common::init_logging();
    let chain = UpgraderChain::new(ConfigVersion::new(2, 0, 0)).with_upgrader(Upgrader::new(
        ConfigVersion::new(1, 0, 0),
        |_tree| {
            Err(Error::InvalidVersion("simulated step failure".to_string()))
        },
    ));

    let mut doc = tree("config-version: 1.0.0\n");
    let err = chain.upgrade(&mut doc).unwrap_err();

    assert!(matches!(err, Error::UpgradeFailed { ref base, .. } if base == "1.0.0"));
    assert_eq!(doc["config-version"], Value::from("1.0.0"));
}

#[test]
fn test_custom_version_key() {
    common::init_logging();
    let chain = UpgraderChain::new(ConfigVersion::new(1, 0, 0))
        .version_key("meta.schema-version".parse().unwrap());

    let mut doc = tree("meta:\n  schema-version: 0.1.0\n");
    let report = chain.upgrade(&mut doc).unwrap();

    assert_eq!(report.from, ConfigVersion::new(0, 1, 0));
    assert_eq!(doc["meta"]["schema-version"], Value::from("1.0.0"));
}

#[test]
fn test_upgrade_then_load() {
    common::init_logging();
    // 1.0.0 moved the port from the flat key to the server block
    let chain = UpgraderChain::new(ConfigVersion::new(1, 0, 0)).with_upgrader(Upgrader::new(
        ConfigVersion::ZERO,
        |tree| {
            if let Some(map) = tree.as_mapping_mut() {
                if let Some(port) = map.remove("port") {
                    let mut server = serde_yaml::Mapping::new();
                    server.insert(Value::String("port".to_string()), port);
                    map.insert(Value::String("server".to_string()), Value::Mapping(server));
                }
            }
            Ok(())
        },
    ));

    let mut doc = tree("port: 4242\n");
    chain.upgrade(&mut doc).unwrap();

    let rules = CoercionRegistry::with_defaults();
    let settings = ServerSettings::blank();
    let instances: Vec<Rc<RefCell<dyn Bindable>>> = vec![settings.clone()];
    let registry = discover(&rules, &instances).unwrap();
    load(&rules, &registry, &doc, &LoadOptions::new()).unwrap();

    assert_eq!(settings.borrow().port, 4242);
}
