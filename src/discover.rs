//! Discovery of bindable fields across a set of instances
//!
//! [`discover`] walks every supplied instance, collects its
//! [`FieldBinding`](crate::FieldBinding)s and compiles them into a
//! [`SettingRegistry`] of immutable [`SettingDescriptor`]s. Discovery
//! validates eagerly: unparseable paths, types without a coercion rule and
//! duplicate bindings abort immediately — a malformed binding is a
//! programmer error, not a runtime condition. Discovery never touches any
//! YAML tree and is idempotent.

use crate::binding::{Bindable, DefaultFn, GetFn, SetFn, ValidateFn};
use crate::coerce::CoercionRegistry;
use crate::error::{Error, Result};
use crate::path::SettingPath;
use log::{debug, info};
use std::any::TypeId;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

/// The compiled, immutable record describing one setting's binding rules.
///
/// Holds only a weak handle to the owning instance; the caller keeps
/// ownership. A descriptor whose owner has been dropped fails field-scoped
/// at load/save time.
pub struct SettingDescriptor {
    pub(crate) instance: Weak<RefCell<dyn Bindable>>,
    pub(crate) owner: &'static str,
    pub(crate) field: &'static str,
    pub(crate) path: SettingPath,
    pub(crate) canonical: String,
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) default: Option<DefaultFn>,
    pub(crate) validator: Option<ValidateFn>,
    pub(crate) env_var: Option<String>,
    pub(crate) get: GetFn,
    pub(crate) set: SetFn,
}

impl SettingDescriptor {
    /// Type name of the owning instance.
    #[must_use]
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    /// Field name on the owning instance.
    #[must_use]
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// The parsed setting path.
    #[must_use]
    pub fn path(&self) -> &SettingPath {
        &self.path
    }

    /// Canonical string form of the path.
    #[must_use]
    pub fn canonical_path(&self) -> &str {
        &self.canonical
    }

    /// Name of the declared value type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether a default supplier is declared for this setting.
    #[must_use]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

impl std::fmt::Debug for SettingDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingDescriptor")
            .field("owner", &self.owner)
            .field("field", &self.field)
            .field("path", &self.canonical)
            .field("type_name", &self.type_name)
            .field("has_default", &self.default.is_some())
            .finish_non_exhaustive()
    }
}

/// Ordered collection of descriptors with a canonical-path index.
///
/// Insertion order is preserved so save passes write deterministically;
/// the index gives O(1) lookup during binding.
#[derive(Debug, Default)]
pub struct SettingRegistry {
    descriptors: Vec<SettingDescriptor>,
    index: HashMap<String, Vec<usize>>,
}

impl SettingRegistry {
    /// Number of descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Descriptors in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &SettingDescriptor> {
        self.descriptors.iter()
    }

    /// All descriptors bound to the given canonical path. Several instances
    /// may legitimately share a path; one instance may not.
    pub fn descriptors_at<'a>(
        &'a self,
        canonical_path: &str,
    ) -> impl Iterator<Item = &'a SettingDescriptor> {
        self.index
            .get(canonical_path)
            .into_iter()
            .flatten()
            .map(|&i| &self.descriptors[i])
    }

    fn push(&mut self, descriptor: SettingDescriptor) {
        let canonical = descriptor.canonical.clone();
        self.descriptors.push(descriptor);
        self.index
            .entry(canonical)
            .or_default()
            .push(self.descriptors.len() - 1);
    }
}

/// Compile the bindings of every supplied instance into a registry.
///
/// # Errors
///
/// Fails fast with [`Error::InvalidPath`] for an unparseable path,
/// [`Error::UnsupportedType`] when a field's declared type has no rule in
/// `rules`, or [`Error::DuplicateBinding`] when one instance binds the same
/// path twice.
pub fn discover(
    rules: &CoercionRegistry,
    instances: &[Rc<RefCell<dyn Bindable>>],
) -> Result<SettingRegistry> {
    let mut registry = SettingRegistry::default();
    let mut seen: HashSet<(usize, String)> = HashSet::new();

    for instance in instances {
        // Identity, not slice position: the same Rc passed twice is still
        // one owning instance.
        let instance_id = Rc::as_ptr(instance).cast::<()>() as usize;
        let guard = instance.borrow();
        let owner = guard.type_name();
        debug!("Discovering bindings on '{owner}'");

        for binding in guard.bindings() {
            let path = SettingPath::parse(&binding.path)?;
            let canonical = path.to_string();

            if !rules.contains(binding.type_id) {
                return Err(Error::UnsupportedType {
                    owner: owner.to_string(),
                    field: binding.field.to_string(),
                    type_name: binding.type_name.to_string(),
                });
            }
            if !seen.insert((instance_id, canonical.clone())) {
                return Err(Error::DuplicateBinding {
                    owner: owner.to_string(),
                    path: canonical,
                });
            }

            debug!(
                "Bound '{owner}.{}' [{}] -> '{canonical}'",
                binding.field, binding.type_name
            );
            registry.push(SettingDescriptor {
                instance: Rc::downgrade(instance),
                owner,
                field: binding.field,
                path,
                canonical,
                type_id: binding.type_id,
                type_name: binding.type_name,
                default: binding.default,
                validator: binding.validator,
                env_var: binding.env_var,
                get: binding.get,
                set: binding.set,
            });
        }
    }

    info!(
        "Discovered {} settings across {} instances",
        registry.len(),
        instances.len()
    );
    Ok(registry)
}
