//! Type coercion between YAML nodes and field values
//!
//! A [`CoercionRegistry`] pairs each target type with a `(decode, encode)`
//! rule keyed by [`TypeId`]. The registry is an open extension point: build
//! it once at the composition root (usually via
//! [`CoercionRegistry::with_defaults`]), register any custom rules, then
//! pass it by shared reference into discovery, load and save. Registering
//! rules after binding has started is unsupported.
//!
//! Decoding is strict about node shape: a mapping node requested as an
//! integer is a [`CoerceError::Mismatch`], and integer values outside the
//! declared width are a [`CoerceError::OutOfRange`] rather than a silent
//! truncation.

use crate::error::{Error, Result};
use crate::path::SettingPath;
use serde_yaml::Value;
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};

/// Result type for individual coercion rules.
pub type CoerceResult<T> = std::result::Result<T, CoerceError>;

/// Rule-local coercion failure. The registry attaches the setting path when
/// surfacing it as a crate [`Error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoerceError {
    /// The node's runtime shape cannot represent the target type.
    Mismatch { expected: String, actual: String },
    /// The value is representable in YAML but not in the declared width.
    OutOfRange { value: String, target: String },
}

impl CoerceError {
    pub fn mismatch(expected: impl Into<String>, node: &Value) -> Self {
        CoerceError::Mismatch {
            expected: expected.into(),
            actual: node_kind(node).to_string(),
        }
    }

    pub fn out_of_range(value: impl Into<String>, target: impl Into<String>) -> Self {
        CoerceError::OutOfRange {
            value: value.into(),
            target: target.into(),
        }
    }

    /// Scope this failure to a concrete setting path.
    pub(crate) fn at(self, path: &SettingPath) -> Error {
        match self {
            CoerceError::Mismatch { expected, actual } => Error::TypeMismatch {
                path: path.to_string(),
                expected,
                actual,
            },
            CoerceError::OutOfRange { value, target } => Error::OutOfRange {
                path: path.to_string(),
                value,
                target,
            },
        }
    }
}

/// Runtime shape of a YAML node, for error messages.
pub(crate) fn node_kind(node: &Value) -> &'static str {
    match node {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged",
    }
}

type DecodeFn = Box<dyn Fn(&Value) -> CoerceResult<Box<dyn Any>>>;
type EncodeFn = Box<dyn Fn(&dyn Any) -> CoerceResult<Value>>;

/// A `(decode, encode)` pair for one target type.
pub struct CoercionRule {
    type_name: String,
    decode: DecodeFn,
    encode: EncodeFn,
}

impl CoercionRule {
    /// Human-readable name of the target type.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Decode a node into a boxed value of the rule's target type, scoping
    /// failures to `path`.
    pub fn decode(&self, node: &Value, path: &SettingPath) -> Result<Box<dyn Any>> {
        (self.decode)(node).map_err(|e| e.at(path))
    }

    /// Encode a value of the rule's target type into a node, scoping
    /// failures to `path`.
    pub fn encode(&self, value: &dyn Any, path: &SettingPath) -> Result<Value> {
        (self.encode)(value).map_err(|e| e.at(path))
    }
}

impl std::fmt::Debug for CoercionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoercionRule")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Registry of coercion rules, keyed by target [`TypeId`].
#[derive(Debug, Default)]
pub struct CoercionRegistry {
    rules: HashMap<TypeId, CoercionRule>,
}

impl CoercionRegistry {
    /// An empty registry with no rules at all.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the built-in rules: `bool`, all integer
    /// widths, `f32`/`f64`, `String`, `Vec<String>`, `Vec<i64>`, `Vec<f64>`,
    /// `Vec<bool>` and `BTreeMap<String, String>`.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register::<bool, _, _>("bool", decode_bool, |v| Ok(Value::Bool(*v)));
        registry.register::<String, _, _>("String", decode_string, |v| {
            Ok(Value::String(v.clone()))
        });

        macro_rules! int_rules {
            ($($t:ty),*) => {$(
                registry.register::<$t, _, _>(
                    stringify!($t),
                    |node| decode_int::<$t>(stringify!($t), node),
                    |v| Ok(Value::Number(serde_yaml::Number::from(i64::from(*v)))),
                );
            )*};
        }
        int_rules!(i8, i16, i32, i64, u8, u16, u32);

        registry.register::<u64, _, _>("u64", decode_u64, |v| {
            Ok(Value::Number(serde_yaml::Number::from(*v)))
        });
        registry.register::<usize, _, _>("usize", decode_usize, |v| {
            Ok(Value::Number(serde_yaml::Number::from(*v as u64)))
        });
        registry.register::<isize, _, _>(
            "isize",
            |node| decode_int::<isize>("isize", node),
            |v| Ok(Value::Number(serde_yaml::Number::from(*v as i64))),
        );

        registry.register::<f64, _, _>("f64", decode_f64, |v| {
            Ok(Value::Number(serde_yaml::Number::from(*v)))
        });
        registry.register::<f32, _, _>("f32", decode_f32, |v| {
            Ok(Value::Number(serde_yaml::Number::from(f64::from(*v))))
        });

        registry.register_sequence::<String, _, _>("String", decode_string, |v| {
            Ok(Value::String(v.clone()))
        });
        registry.register_sequence::<i64, _, _>(
            "i64",
            |node| decode_int::<i64>("i64", node),
            |v| Ok(Value::Number(serde_yaml::Number::from(*v))),
        );
        registry.register_sequence::<f64, _, _>("f64", decode_f64, |v| {
            Ok(Value::Number(serde_yaml::Number::from(*v)))
        });
        registry.register_sequence::<bool, _, _>("bool", decode_bool, |v| Ok(Value::Bool(*v)));

        registry.register_string_map::<String, _, _>("String", decode_string, |v| {
            Ok(Value::String(v.clone()))
        });

        registry
    }

    /// Register a rule for `T`, replacing any existing one.
    pub fn register<T, D, E>(&mut self, type_name: &str, decode: D, encode: E)
    where
        T: Any,
        D: Fn(&Value) -> CoerceResult<T> + 'static,
        E: Fn(&T) -> CoerceResult<Value> + 'static,
    {
        let type_name = type_name.to_string();
        let expected = type_name.clone();
        let rule = CoercionRule {
            type_name,
            decode: Box::new(move |node| decode(node).map(|v| Box::new(v) as Box<dyn Any>)),
            encode: Box::new(move |value| {
                let typed = value.downcast_ref::<T>().ok_or_else(|| CoerceError::Mismatch {
                    expected: expected.clone(),
                    actual: "non-matching runtime value".to_string(),
                })?;
                encode(typed)
            }),
        };
        self.rules.insert(TypeId::of::<T>(), rule);
    }

    /// Register a rule for `Vec<T>` built element-wise from the given pair.
    pub fn register_sequence<T, D, E>(&mut self, elem_name: &str, decode_elem: D, encode_elem: E)
    where
        T: Any,
        D: Fn(&Value) -> CoerceResult<T> + 'static,
        E: Fn(&T) -> CoerceResult<Value> + 'static,
    {
        let name = format!("sequence of {elem_name}");
        let expected = name.clone();
        self.register::<Vec<T>, _, _>(
            &name,
            move |node| match node {
                Value::Sequence(items) => items.iter().map(&decode_elem).collect(),
                other => Err(CoerceError::mismatch(expected.clone(), other)),
            },
            move |values| {
                values
                    .iter()
                    .map(&encode_elem)
                    .collect::<CoerceResult<Vec<Value>>>()
                    .map(Value::Sequence)
            },
        );
    }

    /// Register a rule for `BTreeMap<String, T>` built entry-wise from the
    /// given pair. Mapping keys must be string nodes.
    pub fn register_string_map<T, D, E>(&mut self, elem_name: &str, decode_elem: D, encode_elem: E)
    where
        T: Any,
        D: Fn(&Value) -> CoerceResult<T> + 'static,
        E: Fn(&T) -> CoerceResult<Value> + 'static,
    {
        let name = format!("mapping of string to {elem_name}");
        let expected = name.clone();
        self.register::<BTreeMap<String, T>, _, _>(
            &name,
            move |node| match node {
                Value::Mapping(map) => map
                    .iter()
                    .map(|(key, value)| {
                        let key = key
                            .as_str()
                            .ok_or_else(|| CoerceError::mismatch(expected.clone(), key))?;
                        Ok((key.to_string(), decode_elem(value)?))
                    })
                    .collect(),
                other => Err(CoerceError::mismatch(expected.clone(), other)),
            },
            move |values| {
                let mut map = serde_yaml::Mapping::new();
                for (key, value) in values {
                    map.insert(Value::String(key.clone()), encode_elem(value)?);
                }
                Ok(Value::Mapping(map))
            },
        );
    }

    /// Look up the rule for a target type.
    #[must_use]
    pub fn rule_for(&self, type_id: TypeId) -> Option<&CoercionRule> {
        self.rules.get(&type_id)
    }

    /// Whether a rule is registered for the given type.
    #[must_use]
    pub fn contains(&self, type_id: TypeId) -> bool {
        self.rules.contains_key(&type_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// =============================================================================
// Built-in decoders
// =============================================================================

fn decode_bool(node: &Value) -> CoerceResult<bool> {
    node.as_bool().ok_or_else(|| CoerceError::mismatch("bool", node))
}

fn decode_string(node: &Value) -> CoerceResult<String> {
    node.as_str()
        .map(str::to_string)
        .ok_or_else(|| CoerceError::mismatch("String", node))
}

fn decode_int<T: TryFrom<i64>>(target: &'static str, node: &Value) -> CoerceResult<T> {
    match node.as_i64() {
        Some(n) => T::try_from(n).map_err(|_| CoerceError::out_of_range(n.to_string(), target)),
        // A u64 beyond i64::MAX is a number, just not one this width can hold.
        None => match node.as_u64() {
            Some(u) => Err(CoerceError::out_of_range(u.to_string(), target)),
            None => Err(CoerceError::mismatch(target, node)),
        },
    }
}

// Unsigned-first so values above i64::MAX stay in range on 64-bit targets.
fn decode_usize(node: &Value) -> CoerceResult<usize> {
    match node.as_u64() {
        Some(n) => {
            usize::try_from(n).map_err(|_| CoerceError::out_of_range(n.to_string(), "usize"))
        }
        None => match node.as_i64() {
            Some(n) => Err(CoerceError::out_of_range(n.to_string(), "usize")),
            None => Err(CoerceError::mismatch("usize", node)),
        },
    }
}

fn decode_u64(node: &Value) -> CoerceResult<u64> {
    match node.as_u64() {
        Some(n) => Ok(n),
        None => match node.as_i64() {
            Some(n) => Err(CoerceError::out_of_range(n.to_string(), "u64")),
            None => Err(CoerceError::mismatch("u64", node)),
        },
    }
}

fn decode_f64(node: &Value) -> CoerceResult<f64> {
    node.as_f64().ok_or_else(|| CoerceError::mismatch("f64", node))
}

fn decode_f32(node: &Value) -> CoerceResult<f32> {
    let wide = decode_f64(node)?;
    if wide.is_finite() && wide.abs() > f64::from(f32::MAX) {
        return Err(CoerceError::out_of_range(wide.to_string(), "f32"));
    }
    Ok(wide as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::TypeId;

    fn node(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn path() -> SettingPath {
        SettingPath::parse("test.value").unwrap()
    }

    fn roundtrip<T: Any + Clone + PartialEq + std::fmt::Debug>(
        registry: &CoercionRegistry,
        value: T,
    ) {
        let rule = registry.rule_for(TypeId::of::<T>()).unwrap();
        let encoded = rule.encode(&value, &path()).unwrap();
        let decoded = rule.decode(&encoded, &path()).unwrap();
        assert_eq!(*decoded.downcast_ref::<T>().unwrap(), value);
    }

    #[test]
    fn test_roundtrip_builtins() {
        let registry = CoercionRegistry::with_defaults();

        roundtrip(&registry, true);
        roundtrip(&registry, -42i32);
        roundtrip(&registry, 65_535u16);
        roundtrip(&registry, u64::MAX);
        roundtrip(&registry, 1.5f64);
        roundtrip(&registry, "hello".to_string());
        roundtrip(&registry, vec![1i64, 2, 3]);
        roundtrip(&registry, vec!["a".to_string(), "b".to_string()]);
        roundtrip(
            &registry,
            BTreeMap::from([("k".to_string(), "v".to_string())]),
        );
    }

    #[test]
    fn test_decode_shape_mismatch() {
        let registry = CoercionRegistry::with_defaults();
        let rule = registry.rule_for(TypeId::of::<i64>()).unwrap();

        let err = rule.decode(&node("key: value"), &path()).unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch { ref actual, .. } if actual == "mapping"
        ));

        let err = rule.decode(&node("\"abc\""), &path()).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_decode_out_of_range() {
        let registry = CoercionRegistry::with_defaults();

        let rule = registry.rule_for(TypeId::of::<u8>()).unwrap();
        let err = rule.decode(&node("300"), &path()).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { .. }));

        let rule = registry.rule_for(TypeId::of::<u16>()).unwrap();
        let err = rule.decode(&node("-1"), &path()).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { .. }));
    }

    #[test]
    fn test_usize_roundtrips_above_i64_max() {
        let registry = CoercionRegistry::with_defaults();

        let value = usize::try_from(i64::MAX as u64 + 1).unwrap();
        roundtrip(&registry, value);

        let rule = registry.rule_for(TypeId::of::<usize>()).unwrap();
        let err = rule.decode(&node("-1"), &path()).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { .. }));
    }

    #[test]
    fn test_string_decoding_is_strict() {
        let registry = CoercionRegistry::with_defaults();
        let rule = registry.rule_for(TypeId::of::<String>()).unwrap();

        // Numbers do not stringify implicitly
        let err = rule.decode(&node("42"), &path()).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_integer_node_decodes_as_float() {
        let registry = CoercionRegistry::with_defaults();
        let rule = registry.rule_for(TypeId::of::<f64>()).unwrap();

        let decoded = rule.decode(&node("7"), &path()).unwrap();
        assert_eq!(*decoded.downcast_ref::<f64>().unwrap(), 7.0);
    }

    #[test]
    fn test_sequence_element_mismatch() {
        let registry = CoercionRegistry::with_defaults();
        let rule = registry.rule_for(TypeId::of::<Vec<i64>>()).unwrap();

        let err = rule.decode(&node("[1, two, 3]"), &path()).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_custom_rule_registration() {
        #[derive(Debug, Clone, PartialEq)]
        struct Port(u16);

        let mut registry = CoercionRegistry::with_defaults();
        registry.register::<Port, _, _>(
            "Port",
            |node| decode_int::<u16>("Port", node).map(Port),
            |port| Ok(Value::Number(serde_yaml::Number::from(i64::from(port.0)))),
        );

        roundtrip(&registry, Port(8080));
    }
}
