//! Config version upgrading
//!
//! Settings files outlive the code that wrote them. An [`UpgraderChain`]
//! carries a target [`ConfigVersion`] plus a set of [`Upgrader`] steps, each
//! anchored at the version it upgrades *from*. Running the chain on a
//! document applies every applicable step in ascending order, then stamps
//! the target version at the version key. Run it on the parsed tree before
//! the load pass.

use crate::coerce::node_kind;
use crate::error::{Error, Result};
use crate::path::SettingPath;
use log::{debug, info};
use serde_yaml::Value;

/// Default path of the version marker inside the document.
pub const DEFAULT_VERSION_KEY: &str = "config-version";

/// A `major.minor.patch` document version with total ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ConfigVersion {
    /// The version assumed for documents without a version marker.
    pub const ZERO: Self = Self::new(0, 0, 0);

    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl std::fmt::Display for ConfigVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl std::str::FromStr for ConfigVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let part = |p: Option<&str>| {
            p.and_then(|p| p.parse::<u32>().ok())
                .ok_or_else(|| Error::InvalidVersion(s.to_string()))
        };
        let mut parts = s.trim().split('.');
        let major = part(parts.next())?;
        let minor = part(parts.next())?;
        let patch = part(parts.next())?;
        if parts.next().is_some() {
            return Err(Error::InvalidVersion(s.to_string()));
        }
        Ok(Self::new(major, minor, patch))
    }
}

type ApplyFn = Box<dyn Fn(&mut Value) -> Result<()>>;

/// One upgrade step: a base version and a tree transform applied to
/// documents at that version.
pub struct Upgrader {
    base: ConfigVersion,
    apply: ApplyFn,
}

impl Upgrader {
    pub fn new(base: ConfigVersion, apply: impl Fn(&mut Value) -> Result<()> + 'static) -> Self {
        Self {
            base,
            apply: Box::new(apply),
        }
    }

    /// The version this step upgrades from.
    #[must_use]
    pub fn base(&self) -> ConfigVersion {
        self.base
    }
}

impl std::fmt::Debug for Upgrader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upgrader")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

/// Result of an upgrade run.
#[derive(Debug)]
pub struct UpgradeReport {
    /// Version found in the document (or [`ConfigVersion::ZERO`]).
    pub from: ConfigVersion,
    /// Version stamped into the document.
    pub to: ConfigVersion,
    /// Base versions of the steps that ran, in order.
    pub applied: Vec<ConfigVersion>,
}

/// An ordered chain of upgrade steps toward a target version.
#[derive(Debug)]
pub struct UpgraderChain {
    version_key: SettingPath,
    target: ConfigVersion,
    upgraders: Vec<Upgrader>,
}

impl UpgraderChain {
    /// A chain targeting `target`, using [`DEFAULT_VERSION_KEY`].
    #[must_use]
    pub fn new(target: ConfigVersion) -> Self {
        Self {
            version_key: SettingPath::from_segment(DEFAULT_VERSION_KEY),
            target,
            upgraders: Vec::new(),
        }
    }

    /// Use a custom path for the version marker.
    #[must_use]
    pub fn version_key(mut self, key: SettingPath) -> Self {
        self.version_key = key;
        self
    }

    /// Add an upgrade step. Steps may be added in any order; the chain
    /// sorts by base version when it runs.
    #[must_use]
    pub fn with_upgrader(mut self, upgrader: Upgrader) -> Self {
        self.upgraders.push(upgrader);
        self
    }

    /// Read the version marker from a document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVersion`] when the marker exists but is not
    /// a well-formed version string.
    pub fn current_version(&self, tree: &Value) -> Result<Option<ConfigVersion>> {
        match self.version_key.resolve(tree) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => s.parse().map(Some),
            Some(other) => Err(Error::InvalidVersion(node_kind(other).to_string())),
        }
    }

    /// Bring the document up to the target version.
    ///
    /// Applies every step with `current <= base < target` in ascending
    /// order, then stamps the target version. A document without a marker
    /// is treated as [`ConfigVersion::ZERO`]. A document already at the
    /// target is left untouched.
    ///
    /// # Errors
    ///
    /// [`Error::VersionMismatch`] when the document is newer than the
    /// target, or [`Error::UpgradeFailed`] when a step fails; the tree may
    /// then be partially upgraded but the version marker is not advanced.
    pub fn upgrade(&self, tree: &mut Value) -> Result<UpgradeReport> {
        let from = self.current_version(tree)?.unwrap_or(ConfigVersion::ZERO);
        if from > self.target {
            return Err(Error::VersionMismatch {
                expected: self.target.to_string(),
                found: from.to_string(),
            });
        }

        let mut applied = Vec::new();
        if from < self.target {
            let mut steps: Vec<&Upgrader> = self
                .upgraders
                .iter()
                .filter(|u| u.base >= from && u.base < self.target)
                .collect();
            steps.sort_by_key(|u| u.base);

            for step in steps {
                debug!("Applying upgrade step from {}", step.base);
                (step.apply)(tree).map_err(|e| Error::UpgradeFailed {
                    base: step.base.to_string(),
                    reason: e.to_string(),
                })?;
                applied.push(step.base);
            }

            *self.version_key.ensure(tree)? = Value::String(self.target.to_string());
            info!(
                "Upgraded document from {from} to {} ({} steps)",
                self.target,
                applied.len()
            );
        }

        Ok(UpgradeReport {
            from,
            to: self.target,
            applied,
        })
    }
}
