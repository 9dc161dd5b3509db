//! The load pass: document tree -> field values
//!
//! [`load`] walks the registry in insertion order and, for each descriptor,
//! resolves its path, decodes the node, runs the validator and assigns the
//! value to the owning instance. Precedence per field: environment override
//! (when enabled) > document value > declared default.
//!
//! Load is not transactional. In strict mode the first failure aborts the
//! pass and already-assigned fields stay mutated; in non-strict mode every
//! failure is recorded in the [`LoadReport`] and the field keeps its prior
//! value.

use crate::binding::Bindable;
use crate::coerce::{CoercionRegistry, CoercionRule};
use crate::discover::{SettingDescriptor, SettingRegistry};
use crate::env::EnvOverrides;
use crate::error::{Error, Result};
use crate::report::{LoadEntry, LoadOutcome, LoadReport};
use log::{debug, info, warn};
use serde_yaml::Value;
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

/// Options controlling a load pass.
#[derive(Debug, Default)]
pub struct LoadOptions {
    /// Abort the whole pass on the first field-level failure.
    pub strict: bool,
    /// Consult environment variables before the document.
    pub env: Option<EnvOverrides>,
}

impl LoadOptions {
    /// Non-strict options, no environment overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Strict options: the first failure aborts the pass.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            strict: true,
            env: None,
        }
    }

    /// Enable environment variable overrides.
    #[must_use]
    pub fn with_env(mut self, env: EnvOverrides) -> Self {
        self.env = Some(env);
        self
    }
}

/// Load every setting in `registry` from `tree` into its owning instance.
///
/// Returns one [`LoadEntry`] per descriptor, in registry order. Repeating
/// the call with a fresh tree reassigns every descriptor from scratch.
///
/// # Errors
///
/// In strict mode, the first field-level failure is returned directly and
/// the pass stops; fields assigned before it stay mutated.
pub fn load(
    rules: &CoercionRegistry,
    registry: &SettingRegistry,
    tree: &Value,
    options: &LoadOptions,
) -> Result<LoadReport> {
    debug!(
        "Loading {} settings (strict: {})",
        registry.len(),
        options.strict
    );
    let mut report = LoadReport::default();

    for descriptor in registry.iter() {
        let outcome = match load_one(rules, descriptor, tree, options) {
            Ok(outcome) => outcome,
            Err(err) if options.strict => {
                warn!("Strict load aborted at '{}': {err}", descriptor.canonical);
                return Err(err);
            }
            Err(err) => {
                warn!("Failed to load '{}': {err}", descriptor.canonical);
                LoadOutcome::Failed(err)
            }
        };
        report.push(LoadEntry {
            owner: descriptor.owner,
            field: descriptor.field,
            path: descriptor.canonical.clone(),
            outcome,
        });
    }

    info!(
        "Load pass complete: {} assigned, {} defaulted, {} overridden, {} failed",
        report.assigned(),
        report.defaulted(),
        report.overridden(),
        report.failed()
    );
    Ok(report)
}

fn load_one(
    rules: &CoercionRegistry,
    descriptor: &SettingDescriptor,
    tree: &Value,
    options: &LoadOptions,
) -> Result<LoadOutcome> {
    let rule = rule_for(rules, descriptor)?;
    let instance = descriptor
        .instance
        .upgrade()
        .ok_or_else(|| Error::InstanceDropped {
            path: descriptor.canonical.clone(),
        })?;

    // Environment override beats the document value.
    if let Some(env) = &options.env {
        if let Some(raw) = env.lookup(descriptor)? {
            debug!("'{}' overridden by environment", descriptor.canonical);
            let value = decode_env(rule, descriptor, &raw)?;
            validate(descriptor, &*value)?;
            assign(descriptor, &instance, value)?;
            return Ok(LoadOutcome::Overridden);
        }
    }

    match descriptor.path.resolve(tree) {
        Some(node) => {
            let value = rule.decode(node, &descriptor.path)?;
            validate(descriptor, &*value)?;
            assign(descriptor, &instance, value)?;
            Ok(LoadOutcome::Assigned)
        }
        None => match &descriptor.default {
            Some(supplier) => {
                assign(descriptor, &instance, supplier())?;
                Ok(LoadOutcome::Defaulted)
            }
            None => Err(Error::MissingRequiredSetting {
                path: descriptor.canonical.clone(),
            }),
        },
    }
}

/// Decode an environment override. Scalar parse first; if that mismatches
/// and the raw value contains commas, retry once as a comma-split sequence
/// so list-typed settings can come from the environment.
fn decode_env(
    rule: &CoercionRule,
    descriptor: &SettingDescriptor,
    raw: &str,
) -> Result<Box<dyn Any>> {
    let scalar = EnvOverrides::parse_scalar(raw);
    match rule.decode(&scalar, &descriptor.path) {
        Ok(value) => Ok(value),
        Err(first) if raw.contains(',') => {
            let sequence = EnvOverrides::parse_list(raw);
            rule.decode(&sequence, &descriptor.path).map_err(|_| first)
        }
        Err(err) => Err(err),
    }
}

pub(crate) fn rule_for<'a>(
    rules: &'a CoercionRegistry,
    descriptor: &SettingDescriptor,
) -> Result<&'a CoercionRule> {
    rules
        .rule_for(descriptor.type_id)
        .ok_or_else(|| Error::UnsupportedType {
            owner: descriptor.owner.to_string(),
            field: descriptor.field.to_string(),
            type_name: descriptor.type_name.to_string(),
        })
}

fn validate(descriptor: &SettingDescriptor, value: &dyn Any) -> Result<()> {
    if let Some(validator) = &descriptor.validator {
        validator(value).map_err(|message| Error::Validation {
            path: descriptor.canonical.clone(),
            message,
        })?;
    }
    Ok(())
}

pub(crate) fn assign(
    descriptor: &SettingDescriptor,
    instance: &Rc<RefCell<dyn Bindable>>,
    value: Box<dyn Any>,
) -> Result<()> {
    let mut guard = instance.borrow_mut();
    if (descriptor.set)(guard.as_any_mut(), value) {
        Ok(())
    } else {
        Err(Error::AccessorMismatch {
            owner: descriptor.owner.to_string(),
            field: descriptor.field.to_string(),
        })
    }
}
