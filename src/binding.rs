//! The binding contract between application structs and YAML settings
//!
//! A type becomes bindable by implementing [`Bindable`], either through
//! `#[derive(Bindable)]` (with the `derive` feature) or by hand via the
//! [`FieldBinding`] builder. Each [`FieldBinding`] declares one field's
//! contract: a required path, an optional default supplier, an optional
//! validator run post-decode, and a type-erased accessor/mutator pair so
//! ownership of the instance stays with the caller.
//!
//! # Manual implementation
//!
//! ```rust
//! use std::any::Any;
//! use yamlbind::{Bindable, FieldBinding};
//!
//! #[derive(Default)]
//! struct Network {
//!     port: u16,
//! }
//!
//! impl Bindable for Network {
//!     fn type_name(&self) -> &'static str {
//!         std::any::type_name::<Network>()
//!     }
//!
//!     fn bindings(&self) -> Vec<FieldBinding> {
//!         vec![
//!             FieldBinding::new(
//!                 "port",
//!                 "server.port",
//!                 |n: &Network| n.port,
//!                 |n: &mut Network, value: u16| n.port = value,
//!             )
//!             .default_value(8080)
//!             .validate_with(|port| {
//!                 if *port >= 1024 {
//!                     Ok(())
//!                 } else {
//!                     Err(format!("port {port} is reserved"))
//!                 }
//!             })
//!             .build(),
//!         ]
//!     }
//!
//!     fn as_any(&self) -> &dyn Any {
//!         self
//!     }
//!
//!     fn as_any_mut(&mut self) -> &mut dyn Any {
//!         self
//!     }
//! }
//! ```

use std::any::{Any, TypeId};
use std::marker::PhantomData;

pub(crate) type GetFn = Box<dyn Fn(&dyn Any) -> Option<Box<dyn Any>>>;
pub(crate) type SetFn = Box<dyn Fn(&mut dyn Any, Box<dyn Any>) -> bool>;
pub(crate) type DefaultFn = Box<dyn Fn() -> Box<dyn Any>>;
pub(crate) type ValidateFn = Box<dyn Fn(&dyn Any) -> std::result::Result<(), String>>;

/// A type whose fields can be bound to YAML settings.
///
/// Implemented by `#[derive(Bindable)]` or by hand (see the module docs).
pub trait Bindable: Any {
    /// Name of the implementing type, used in reports and error messages.
    fn type_name(&self) -> &'static str;

    /// The field contracts declared by this type.
    fn bindings(&self) -> Vec<FieldBinding>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// One field's binding contract: path, declared type, default, validator
/// and accessor/mutator pair.
pub struct FieldBinding {
    pub(crate) field: &'static str,
    pub(crate) path: String,
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) default: Option<DefaultFn>,
    pub(crate) validator: Option<ValidateFn>,
    pub(crate) env_var: Option<String>,
    pub(crate) get: GetFn,
    pub(crate) set: SetFn,
}

impl FieldBinding {
    /// Start building a binding for field `field` of `S`, bound to the raw
    /// dotted path `path`, with a typed accessor/mutator pair.
    pub fn new<S, T, G, M>(
        field: &'static str,
        path: impl Into<String>,
        get: G,
        set: M,
    ) -> FieldBindingBuilder<S, T>
    where
        S: Any,
        T: Any,
        G: Fn(&S) -> T + 'static,
        M: Fn(&mut S, T) + 'static,
    {
        let get: GetFn = Box::new(move |owner| {
            owner
                .downcast_ref::<S>()
                .map(|owner| Box::new(get(owner)) as Box<dyn Any>)
        });
        let set: SetFn = Box::new(move |owner, value| {
            match (owner.downcast_mut::<S>(), value.downcast::<T>()) {
                (Some(owner), Ok(value)) => {
                    set(owner, *value);
                    true
                }
                _ => false,
            }
        });

        FieldBindingBuilder {
            binding: FieldBinding {
                field,
                path: path.into(),
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                default: None,
                validator: None,
                env_var: None,
                get,
                set,
            },
            _marker: PhantomData,
        }
    }

    /// Field name on the owning struct.
    #[must_use]
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Raw (unparsed) dotted path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Name of the declared value type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether a default supplier is declared.
    #[must_use]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

impl std::fmt::Debug for FieldBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldBinding")
            .field("field", &self.field)
            .field("path", &self.path)
            .field("type_name", &self.type_name)
            .field("has_default", &self.default.is_some())
            .field("has_validator", &self.validator.is_some())
            .field("env_var", &self.env_var)
            .finish_non_exhaustive()
    }
}

/// Typed builder returned by [`FieldBinding::new`].
pub struct FieldBindingBuilder<S, T> {
    binding: FieldBinding,
    _marker: PhantomData<fn(S, T)>,
}

impl<S: Any, T: Any> FieldBindingBuilder<S, T> {
    /// Use a fixed value as the default when the path is missing at load
    /// time.
    #[must_use]
    pub fn default_value(self, value: T) -> Self
    where
        T: Clone,
    {
        self.default_with(move || value.clone())
    }

    /// Use a supplier as the default when the path is missing at load time.
    #[must_use]
    pub fn default_with(mut self, supplier: impl Fn() -> T + 'static) -> Self {
        self.binding.default = Some(Box::new(move || Box::new(supplier())));
        self
    }

    /// Run a validator on every decoded value before assignment. The
    /// returned message becomes the [`Validation`](crate::Error::Validation)
    /// error for this field.
    #[must_use]
    pub fn validate_with(
        mut self,
        validator: impl Fn(&T) -> std::result::Result<(), String> + 'static,
    ) -> Self {
        self.binding.validator = Some(Box::new(move |value| match value.downcast_ref::<T>() {
            Some(value) => validator(value),
            None => Err("validator received a value of the wrong type".to_string()),
        }));
        self
    }

    /// Override the environment variable consulted for this field. Used
    /// verbatim, without the configured prefix.
    #[must_use]
    pub fn env_var(mut self, name: impl Into<String>) -> Self {
        self.binding.env_var = Some(name.into());
        self
    }

    #[must_use]
    pub fn build(self) -> FieldBinding {
        self.binding
    }
}
