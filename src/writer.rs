//! The save pass: field values -> document tree
//!
//! [`save`] mutates the given tree in place: for each descriptor it reads
//! the current field value, encodes it and overwrites only the target leaf
//! node, creating intermediate mappings where needed. Sibling nodes and
//! mapping order elsewhere are left untouched, and keys not covered by the
//! registry are never deleted — which is what lets a format-preserving
//! document layer keep user comments intact on rewrite.

use crate::binder::rule_for;
use crate::coerce::CoercionRegistry;
use crate::discover::{SettingDescriptor, SettingRegistry};
use crate::error::{Error, Result};
use crate::report::{SaveEntry, SaveOutcome, SaveReport};
use log::{debug, info, warn};
use serde_yaml::Value;

/// Options controlling a save pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct SaveOptions {
    /// Abort the whole pass on the first field-level failure, mirroring
    /// [`LoadOptions::strict`](crate::LoadOptions).
    pub strict: bool,
}

impl SaveOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn strict() -> Self {
        Self { strict: true }
    }
}

/// Write every setting in `registry` into `tree` at its path.
///
/// Returns one [`SaveEntry`] per descriptor, in registry order.
///
/// # Errors
///
/// In strict mode, the first field-level failure is returned directly and
/// the pass stops; leaves written before it stay written.
pub fn save(
    rules: &CoercionRegistry,
    registry: &SettingRegistry,
    tree: &mut Value,
    options: &SaveOptions,
) -> Result<SaveReport> {
    debug!(
        "Saving {} settings (strict: {})",
        registry.len(),
        options.strict
    );
    let mut report = SaveReport::default();

    for descriptor in registry.iter() {
        let outcome = match save_one(rules, descriptor, tree) {
            Ok(()) => SaveOutcome::Written,
            Err(err) if options.strict => {
                warn!("Strict save aborted at '{}': {err}", descriptor.canonical);
                return Err(err);
            }
            Err(err) => {
                warn!("Failed to save '{}': {err}", descriptor.canonical);
                SaveOutcome::Failed(err)
            }
        };
        report.push(SaveEntry {
            owner: descriptor.owner,
            field: descriptor.field,
            path: descriptor.canonical.clone(),
            outcome,
        });
    }

    info!(
        "Save pass complete: {} written, {} failed",
        report.written(),
        report.failed()
    );
    Ok(report)
}

fn save_one(
    rules: &CoercionRegistry,
    descriptor: &SettingDescriptor,
    tree: &mut Value,
) -> Result<()> {
    let rule = rule_for(rules, descriptor)?;
    let instance = descriptor
        .instance
        .upgrade()
        .ok_or_else(|| Error::InstanceDropped {
            path: descriptor.canonical.clone(),
        })?;

    let value = {
        let guard = instance.borrow();
        (descriptor.get)(guard.as_any()).ok_or_else(|| Error::AccessorMismatch {
            owner: descriptor.owner.to_string(),
            field: descriptor.field.to_string(),
        })?
    };

    // Encode before ensure so a coercion failure leaves the tree untouched.
    let node = rule.encode(&*value, &descriptor.path)?;
    *descriptor.path.ensure(tree)? = node;
    Ok(())
}
