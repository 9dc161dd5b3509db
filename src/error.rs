//! Error types for the yamlbind library

use thiserror::Error;

/// Result type alias for yamlbind operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for yamlbind
#[derive(Error, Debug)]
pub enum Error {
    // -------------------------------------------------------------------------
    // Document Errors
    // -------------------------------------------------------------------------
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // -------------------------------------------------------------------------
    // Path Errors
    // -------------------------------------------------------------------------
    #[error("Invalid setting path '{raw}': {reason}")]
    InvalidPath { raw: String, reason: String },

    #[error("Structural conflict at '{at}' while writing '{path}': existing {found} node is not a mapping")]
    PathConflict {
        path: String,
        at: String,
        found: &'static str,
    },

    // -------------------------------------------------------------------------
    // Coercion Errors
    // -------------------------------------------------------------------------
    #[error("Type mismatch at '{path}': expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("Value {value} at '{path}' is out of range for {target}")]
    OutOfRange {
        path: String,
        value: String,
        target: String,
    },

    // -------------------------------------------------------------------------
    // Discovery Errors (fail-fast, programmer errors)
    // -------------------------------------------------------------------------
    #[error("No coercion rule registered for type '{type_name}' (field '{owner}.{field}')")]
    UnsupportedType {
        owner: String,
        field: String,
        type_name: String,
    },

    #[error("Duplicate binding for path '{path}' on instance of '{owner}'")]
    DuplicateBinding { owner: String, path: String },

    // -------------------------------------------------------------------------
    // Binding Errors (field-scoped at load/save time)
    // -------------------------------------------------------------------------
    #[error("Required setting '{path}' is missing and has no default")]
    MissingRequiredSetting { path: String },

    #[error("Validation failed for '{path}': {message}")]
    Validation { path: String, message: String },

    #[error("Accessor for '{owner}.{field}' does not match the declared field type")]
    AccessorMismatch { owner: String, field: String },

    #[error("Owning instance for '{path}' was dropped before binding")]
    InstanceDropped { path: String },

    // -------------------------------------------------------------------------
    // Upgrade Errors
    // -------------------------------------------------------------------------
    #[error("Invalid config version '{0}': expected 'major.minor.patch'")]
    InvalidVersion(String),

    #[error("Config version mismatch: document has {found}, target is {expected}")]
    VersionMismatch { expected: String, found: String },

    #[error("Upgrade step from {base} failed: {reason}")]
    UpgradeFailed { base: String, reason: String },
}

impl Error {
    /// Check if this error is field-scoped, i.e. collected per-descriptor in
    /// non-strict load/save passes rather than aborting discovery.
    #[must_use]
    pub fn is_field_scoped(&self) -> bool {
        matches!(
            self,
            Error::TypeMismatch { .. }
                | Error::OutOfRange { .. }
                | Error::MissingRequiredSetting { .. }
                | Error::Validation { .. }
                | Error::AccessorMismatch { .. }
                | Error::InstanceDropped { .. }
                | Error::PathConflict { .. }
        )
    }

    /// Check if this is a "missing value" type error
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Error::MissingRequiredSetting { .. })
    }
}
