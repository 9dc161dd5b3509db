//! Common test utilities for yamlbind integration tests
//!
//! Provides shared settings fixtures, a fake environment source and YAML
//! helpers.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use yamlbind::{Bindable, EnvSource};

// =============================================================================
// Test Settings Fixtures
// =============================================================================

/// The main fixture: a server block with a validated port, a defaulted host
/// and an explicitly pathed flag.
#[derive(Debug, Bindable)]
#[settings(root = "server")]
pub struct ServerSettings {
    #[setting(default = 8080, validator = valid_port)]
    pub port: u16,
    #[setting(default = "localhost")]
    pub host: String,
    #[setting(path = "server.tls.enabled", default = false)]
    pub tls_enabled: bool,
}

impl ServerSettings {
    /// Zeroed instance, distinguishable from every declared default.
    pub fn blank() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            port: 0,
            host: String::new(),
            tls_enabled: false,
        }))
    }
}

pub fn valid_port(port: &u16) -> Result<(), String> {
    if *port >= 1024 {
        Ok(())
    } else {
        Err(format!("port {port} is reserved"))
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Parse a YAML document for use as the settings tree.
pub fn tree(yaml: &str) -> serde_yaml::Value {
    serde_yaml::from_str(yaml).unwrap()
}

/// An in-memory environment source, so tests never touch the real process
/// environment.
#[derive(Debug, Default)]
pub struct FakeEnv {
    vars: HashMap<String, String>,
    non_unicode: HashSet<String>,
}

impl FakeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    /// Mark a variable as set but undecodable, like a raw-bytes value in a
    /// real environment.
    pub fn set_non_unicode(mut self, name: &str) -> Self {
        self.non_unicode.insert(name.to_string());
        self
    }
}

impl EnvSource for FakeEnv {
    fn var(&self, name: &str) -> Result<String, std::env::VarError> {
        if self.non_unicode.contains(name) {
            return Err(std::env::VarError::NotUnicode(std::ffi::OsString::from(
                name,
            )));
        }
        self.vars
            .get(name)
            .cloned()
            .ok_or(std::env::VarError::NotPresent)
    }
}

/// Initialize test logging once; repeated calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
