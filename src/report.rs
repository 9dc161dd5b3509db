//! Per-field outcome reports for load and save passes
//!
//! Every descriptor processed by a pass gets exactly one entry; failures
//! are attached to the descriptor that produced them and never swallowed.

use crate::error::Error;

/// Outcome of loading one setting.
#[derive(Debug)]
pub enum LoadOutcome {
    /// Decoded from the document and assigned.
    Assigned,
    /// Path missing; the declared default was assigned.
    Defaulted,
    /// An environment variable override was assigned.
    Overridden,
    /// The field failed and kept its prior value (non-strict mode only).
    Failed(Error),
}

impl LoadOutcome {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, LoadOutcome::Failed(_))
    }
}

/// One load-report entry.
#[derive(Debug)]
pub struct LoadEntry {
    pub owner: &'static str,
    pub field: &'static str,
    pub path: String,
    pub outcome: LoadOutcome,
}

/// Report of a whole load pass, one entry per descriptor in registry order.
#[derive(Debug, Default)]
pub struct LoadReport {
    entries: Vec<LoadEntry>,
}

impl LoadReport {
    pub(crate) fn push(&mut self, entry: LoadEntry) {
        self.entries.push(entry);
    }

    #[must_use]
    pub fn entries(&self) -> &[LoadEntry] {
        &self.entries
    }

    /// Whether every field loaded without a failure.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.entries.iter().any(|e| e.outcome.is_failure())
    }

    /// Entries that failed, in registry order.
    pub fn failures(&self) -> impl Iterator<Item = &LoadEntry> {
        self.entries.iter().filter(|e| e.outcome.is_failure())
    }

    /// First entry for the given canonical path, if any.
    #[must_use]
    pub fn outcome_for(&self, canonical_path: &str) -> Option<&LoadOutcome> {
        self.entries
            .iter()
            .find(|e| e.path == canonical_path)
            .map(|e| &e.outcome)
    }

    #[must_use]
    pub fn assigned(&self) -> usize {
        self.count(|o| matches!(o, LoadOutcome::Assigned))
    }

    #[must_use]
    pub fn defaulted(&self) -> usize {
        self.count(|o| matches!(o, LoadOutcome::Defaulted))
    }

    #[must_use]
    pub fn overridden(&self) -> usize {
        self.count(|o| matches!(o, LoadOutcome::Overridden))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(LoadOutcome::is_failure)
    }

    fn count(&self, p: impl Fn(&LoadOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| p(&e.outcome)).count()
    }
}

/// Outcome of saving one setting.
#[derive(Debug)]
pub enum SaveOutcome {
    /// Encoded and written at the setting's path.
    Written,
    /// The field failed; the tree was not modified at its path
    /// (non-strict mode only).
    Failed(Error),
}

impl SaveOutcome {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, SaveOutcome::Failed(_))
    }
}

/// One save-report entry.
#[derive(Debug)]
pub struct SaveEntry {
    pub owner: &'static str,
    pub field: &'static str,
    pub path: String,
    pub outcome: SaveOutcome,
}

/// Report of a whole save pass, one entry per descriptor in registry order.
#[derive(Debug, Default)]
pub struct SaveReport {
    entries: Vec<SaveEntry>,
}

impl SaveReport {
    pub(crate) fn push(&mut self, entry: SaveEntry) {
        self.entries.push(entry);
    }

    #[must_use]
    pub fn entries(&self) -> &[SaveEntry] {
        &self.entries
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.entries.iter().any(|e| e.outcome.is_failure())
    }

    pub fn failures(&self) -> impl Iterator<Item = &SaveEntry> {
        self.entries.iter().filter(|e| e.outcome.is_failure())
    }

    #[must_use]
    pub fn written(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, SaveOutcome::Written))
            .count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome.is_failure())
            .count()
    }
}
