//! Environment variable overrides for settings
//!
//! When enabled on [`LoadOptions`](crate::LoadOptions), an environment
//! variable beats the document value for its setting. The variable name is
//! `{PREFIX}_{PATH_SEGMENTS}` upper-cased (e.g. prefix `MYAPP` and path
//! `server.port` consult `MYAPP_SERVER_PORT`), unless the binding declares
//! an explicit variable name, which is used verbatim.

use crate::discover::SettingDescriptor;
use crate::error::{Error, Result};
use crate::path::SettingPath;
use serde_yaml::Value;
use std::env::VarError;
use std::rc::Rc;

/// Source of environment variables. Injectable for tests.
pub trait EnvSource {
    fn var(&self, name: &str) -> std::result::Result<String, std::env::VarError>;
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl EnvSource for SystemEnv {
    fn var(&self, name: &str) -> std::result::Result<String, std::env::VarError> {
        std::env::var(name)
    }
}

/// Environment override configuration: a prefix plus a variable source.
pub struct EnvOverrides {
    prefix: String,
    source: Rc<dyn EnvSource>,
}

impl EnvOverrides {
    /// Overrides from the process environment with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_source(prefix, Rc::new(SystemEnv))
    }

    /// Overrides with a custom variable source.
    pub fn with_source(prefix: impl Into<String>, source: Rc<dyn EnvSource>) -> Self {
        Self {
            prefix: prefix.into(),
            source,
        }
    }

    /// The derived variable name for a setting path.
    #[must_use]
    pub fn var_name(&self, path: &SettingPath) -> String {
        let mut name = self.prefix.clone();
        for segment in path.segments() {
            name.push('_');
            name.push_str(segment);
        }
        name.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// Raw override value for a descriptor, if its variable is set.
    ///
    /// # Errors
    ///
    /// A variable that is set but not valid unicode is a field-scoped
    /// [`Error::TypeMismatch`], not a silent fallthrough to the document.
    pub(crate) fn lookup(&self, descriptor: &SettingDescriptor) -> Result<Option<String>> {
        let name = match &descriptor.env_var {
            Some(explicit) => explicit.clone(),
            None => self.var_name(&descriptor.path),
        };
        match self.source.var(&name) {
            Ok(raw) => Ok(Some(raw)),
            Err(VarError::NotPresent) => Ok(None),
            Err(VarError::NotUnicode(_)) => Err(Error::TypeMismatch {
                path: descriptor.canonical.clone(),
                expected: descriptor.type_name.to_string(),
                actual: format!("non-unicode value in environment variable '{name}'"),
            }),
        }
    }

    /// Parse an override as a YAML scalar so `8080`, `true` and `1.5` type
    /// naturally; anything unparseable stays a string.
    pub(crate) fn parse_scalar(raw: &str) -> Value {
        serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    }

    /// Parse a comma-separated override into a sequence of scalars, for
    /// list-typed settings (`"1, 2, 3"` or `"a,b"`).
    pub(crate) fn parse_list(raw: &str) -> Value {
        Value::Sequence(
            raw.split(',')
                .map(|part| Self::parse_scalar(part.trim()))
                .collect(),
        )
    }
}

impl std::fmt::Debug for EnvOverrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvOverrides")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}
