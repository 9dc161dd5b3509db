//! Path addressing for nested YAML mappings
//!
//! A [`SettingPath`] locates one value inside a nested mapping tree, e.g.
//! `server.port` addresses `tree["server"]["port"]`. The delimiter is `.`;
//! a literal dot inside a segment is written as `\.`. Segments are
//! case-sensitive and kept exactly as parsed.

use crate::coerce::node_kind;
use crate::error::{Error, Result};
use serde_yaml::{Mapping, Value};

/// An ordered, non-empty sequence of mapping keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SettingPath {
    segments: Vec<String>,
}

impl SettingPath {
    /// Parse a raw dotted path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] if the string is empty, contains an
    /// empty segment (leading, trailing or doubled delimiter), or ends with
    /// an unfinished escape.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(invalid(raw, "path is empty"));
        }

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = raw.chars();

        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => current.push(escaped),
                    None => return Err(invalid(raw, "trailing escape character")),
                },
                '.' => {
                    if current.is_empty() {
                        return Err(invalid(raw, "empty path segment"));
                    }
                    segments.push(std::mem::take(&mut current));
                }
                other => current.push(other),
            }
        }

        if current.is_empty() {
            return Err(invalid(raw, "empty path segment"));
        }
        segments.push(current);

        Ok(Self { segments })
    }

    /// Infallible constructor for known-good single-segment paths.
    pub(crate) fn from_segment(segment: impl Into<String>) -> Self {
        Self {
            segments: vec![segment.into()],
        }
    }

    /// The ordered key segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments. Always at least 1.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Walk child mappings by successive segments.
    ///
    /// Returns `None` when any segment is absent or an intermediate node is
    /// not a mapping. Absence is a normal state for optional settings, not
    /// an error.
    #[must_use]
    pub fn resolve<'a>(&self, tree: &'a Value) -> Option<&'a Value> {
        let mut node = tree;
        for segment in &self.segments {
            node = node.as_mapping()?.get(segment.as_str())?;
        }
        Some(node)
    }

    /// Mutable variant of [`resolve`](Self::resolve).
    #[must_use]
    pub fn resolve_mut<'a>(&self, tree: &'a mut Value) -> Option<&'a mut Value> {
        let mut node = tree;
        for segment in &self.segments {
            node = node.as_mapping_mut()?.get_mut(segment.as_str())?;
        }
        Some(node)
    }

    /// Walk to this path for writing, creating intermediate mappings as
    /// needed. `Null` nodes along the way (including the root of an empty
    /// document) are promoted to empty mappings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PathConflict`] when an existing non-mapping node sits
    /// mid-path. Existing nodes are never overwritten to make room.
    pub fn ensure<'a>(&self, tree: &'a mut Value) -> Result<&'a mut Value> {
        let mut node = tree;
        for (depth, segment) in self.segments.iter().enumerate() {
            if node.is_null() {
                *node = Value::Mapping(Mapping::new());
            }
            let map = match node {
                Value::Mapping(map) => map,
                other => {
                    return Err(Error::PathConflict {
                        path: self.to_string(),
                        at: self.prefix(depth),
                        found: node_kind(other),
                    });
                }
            };
            node = map
                .entry(Value::String(segment.clone()))
                .or_insert(Value::Null);
        }
        Ok(node)
    }

    /// Canonical form of the first `depth` segments, used for error context.
    fn prefix(&self, depth: usize) -> String {
        self.segments[..depth]
            .iter()
            .map(|s| escape(s))
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl std::fmt::Display for SettingPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.prefix(self.segments.len()))
    }
}

impl std::str::FromStr for SettingPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn escape(segment: &str) -> String {
    segment.replace('\\', "\\\\").replace('.', "\\.")
}

fn invalid(raw: &str, reason: &str) -> Error {
    Error::InvalidPath {
        raw: raw.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_parse_simple() {
        let path = SettingPath::parse("server.port").unwrap();
        assert_eq!(path.segments(), ["server", "port"]);
        assert_eq!(path.to_string(), "server.port");
    }

    #[test]
    fn test_parse_escaped_dot() {
        let path = SettingPath::parse(r"hosts.example\.com").unwrap();
        assert_eq!(path.segments(), ["hosts", "example.com"]);
        // Display round-trips through parse
        assert_eq!(
            SettingPath::parse(&path.to_string()).unwrap(),
            path
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(SettingPath::parse("").is_err());
        assert!(SettingPath::parse(".leading").is_err());
        assert!(SettingPath::parse("trailing.").is_err());
        assert!(SettingPath::parse("a..b").is_err());
        assert!(SettingPath::parse("oops\\").is_err());
    }

    #[test]
    fn test_resolve_present_and_missing() {
        let doc = tree("server:\n  port: 9090\n");
        let port = SettingPath::parse("server.port").unwrap();
        let host = SettingPath::parse("server.host").unwrap();
        let deep = SettingPath::parse("a.b.c").unwrap();

        assert_eq!(port.resolve(&doc), Some(&Value::from(9090)));
        assert_eq!(host.resolve(&doc), None);
        assert_eq!(deep.resolve(&doc), None);
    }

    #[test]
    fn test_resolve_through_scalar_is_missing() {
        let doc = tree("server: 42\n");
        let path = SettingPath::parse("server.port").unwrap();
        assert_eq!(path.resolve(&doc), None);
    }

    #[test]
    fn test_ensure_creates_intermediate_mappings() {
        let mut doc = Value::Null;
        let path = SettingPath::parse("a.b.c").unwrap();

        *path.ensure(&mut doc).unwrap() = Value::from(1);

        // Idempotent re-resolution returns the node just written
        assert_eq!(path.resolve(&doc), Some(&Value::from(1)));
    }

    #[test]
    fn test_ensure_conflict_on_scalar_mid_path() {
        let mut doc = tree("server: not-a-mapping\n");
        let path = SettingPath::parse("server.port").unwrap();

        let err = path.ensure(&mut doc).unwrap_err();
        assert!(matches!(err, Error::PathConflict { .. }));
        // Existing node untouched
        assert_eq!(doc, tree("server: not-a-mapping\n"));
    }

    #[test]
    fn test_ensure_preserves_siblings() {
        let mut doc = tree("server:\n  host: localhost\nother: 1\n");
        let path = SettingPath::parse("server.port").unwrap();

        *path.ensure(&mut doc).unwrap() = Value::from(8080);

        assert_eq!(
            SettingPath::parse("server.host").unwrap().resolve(&doc),
            Some(&Value::from("localhost"))
        );
        assert_eq!(
            SettingPath::parse("other").unwrap().resolve(&doc),
            Some(&Value::from(1))
        );
    }
}
