//! # yamlbind - YAML Settings Binding
//!
//! A library for binding YAML documents to fields of registered Rust structs,
//! with typed coercion, defaults, validation, environment overrides, and
//! write-back that preserves the rest of the document.
//!
//! ## Features
//!
//! - **Path Addressing**: Dot-separated paths with `\` escaping address nested mappings
//! - **Typed Coercion**: A [`CoercionRegistry`] maps YAML nodes to Rust values and back, extensible with custom rules
//! - **Declarative Bindings**: Derive [`Bindable`] (or implement it by hand) to describe which fields bind to which paths
//! - **Defaults & Validation**: Per-field default suppliers and validators
//! - **Environment Overrides**: Values from process environment variables take precedence over the document
//! - **Partial Write-Back**: Saving touches only bound paths, leaving unrelated document content intact
//! - **Version Upgrading**: An [`UpgraderChain`] migrates old documents forward before loading
//!
//! ## Quick Start
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use yamlbind::{discover, load, save, Bindable, CoercionRegistry, LoadOptions, SaveOptions};
//!
//! #[derive(Bindable)]
//! #[settings(root = "server")]
//! struct ServerSettings {
//!     #[setting(default = 8080)]
//!     port: u16,
//!     #[setting(path = "server.host", default = "localhost")]
//!     host: String,
//! }
//!
//! # fn main() -> yamlbind::Result<()> {
//! let settings = Rc::new(RefCell::new(ServerSettings {
//!     port: 0,
//!     host: String::new(),
//! }));
//! let instances: Vec<Rc<RefCell<dyn Bindable>>> = vec![settings.clone()];
//!
//! let rules = CoercionRegistry::with_defaults();
//! let registry = discover(&rules, &instances)?;
//!
//! let mut tree: serde_yaml::Value = serde_yaml::from_str("server:\n  port: 9090\n")?;
//! let report = load(&rules, &registry, &tree, &LoadOptions::new())?;
//! assert!(report.is_success());
//! assert_eq!(settings.borrow().port, 9090);
//! assert_eq!(settings.borrow().host, "localhost"); // defaulted
//!
//! settings.borrow_mut().port = 7000;
//! save(&rules, &registry, &mut tree, &SaveOptions::new())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Strict vs Non-Strict
//!
//! By default a load records per-field failures in the [`LoadReport`] and
//! keeps going; [`LoadOptions::strict`] aborts on the first failure instead.
//! Fields assigned before the abort keep their new values.
//!
//! ## Custom Coercion Rules
//!
//! ```rust
//! use yamlbind::{CoerceError, CoercionRegistry};
//!
//! #[derive(Clone, PartialEq)]
//! struct Port(u16);
//!
//! let mut rules = CoercionRegistry::with_defaults();
//! rules.register::<Port, _, _>(
//!     "port",
//!     |node| {
//!         node.as_u64()
//!             .and_then(|n| u16::try_from(n).ok())
//!             .map(Port)
//!             .ok_or_else(|| CoerceError::mismatch("port", node))
//!     },
//!     |port| Ok(serde_yaml::Value::Number(port.0.into())),
//! );
//! ```

// Core modules
mod binder;
mod binding;
mod coerce;
mod discover;
mod env;
mod error;
mod path;
mod report;
mod upgrade;
mod writer;

// Re-exports from core
pub use binder::{load, LoadOptions};
pub use binding::{Bindable, FieldBinding, FieldBindingBuilder};
pub use coerce::{CoerceError, CoerceResult, CoercionRegistry, CoercionRule};
pub use discover::{discover, SettingDescriptor, SettingRegistry};
pub use env::{EnvOverrides, EnvSource, SystemEnv};
pub use error::{Error, Result};
pub use path::SettingPath;
pub use report::{LoadEntry, LoadOutcome, LoadReport, SaveEntry, SaveOutcome, SaveReport};
pub use upgrade::{ConfigVersion, UpgradeReport, Upgrader, UpgraderChain, DEFAULT_VERSION_KEY};
pub use writer::{save, SaveOptions};

// Derive macro re-export (requires `derive` feature)
/// Derive macro for auto-generating [`Bindable`] implementations.
///
/// Every named field is bound unless marked `#[setting(skip)]`. Paths
/// default to the field name, prefixed by `#[settings(root = "...")]` when
/// present.
///
/// # Example
///
/// ```rust,ignore
/// use yamlbind::Bindable;
///
/// #[derive(Bindable)]
/// #[settings(root = "server")]
/// struct ServerSettings {
///     #[setting(default = 8080, validator = valid_port)]
///     port: u16,
///     #[setting(env = "APP_HOST", default = "localhost")]
///     host: String,
///     #[setting(skip)]
///     connection_count: u32,
/// }
/// ```
#[cfg(feature = "derive")]
pub use yamlbind_derive::Bindable;
