//! Usage test for the generated `Bindable` implementation, driven through
//! the main crate's discovery and load passes.

use std::cell::RefCell;
use std::rc::Rc;
use yamlbind::{discover, load, Bindable, CoercionRegistry, LoadOptions};

#[derive(Debug, Bindable)]
#[settings(root = "cache")]
struct CacheSettings {
    #[setting(default = 1024)]
    capacity: u32,
    #[setting(path = "cache.eviction.policy", default = "lru")]
    policy: String,
    #[setting(skip)]
    hits: u64,
}

#[test]
fn test_generated_bindings_surface() {
    let settings = CacheSettings {
        capacity: 0,
        policy: String::new(),
        hits: 0,
    };

    assert_eq!(settings.type_name(), "CacheSettings");
    let bindings = settings.bindings();
    assert_eq!(bindings.len(), 2);
    assert_eq!(bindings[0].path(), "cache.capacity");
    assert_eq!(bindings[1].path(), "cache.eviction.policy");
    assert!(bindings.iter().all(|b| b.has_default()));
}

#[test]
fn test_generated_accessors_load_end_to_end() {
    let rules = CoercionRegistry::with_defaults();
    let settings = Rc::new(RefCell::new(CacheSettings {
        capacity: 0,
        policy: String::new(),
        hits: 7,
    }));
    let instances: Vec<Rc<RefCell<dyn Bindable>>> = vec![settings.clone()];
    let registry = discover(&rules, &instances).unwrap();

    let doc: serde_yaml::Value = serde_yaml::from_str("cache:\n  capacity: 4096\n").unwrap();
    let report = load(&rules, &registry, &doc, &LoadOptions::new()).unwrap();

    assert!(report.is_success());
    let settings = settings.borrow();
    assert_eq!(settings.capacity, 4096);
    assert_eq!(settings.policy, "lru");
    // Skipped fields are untouched
    assert_eq!(settings.hits, 7);
}
