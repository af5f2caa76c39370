//! Common types for link bookkeeping

use chrono::{DateTime, Utc};

/// A named slot in the document that holds one external reference.
///
/// Keeping the name stable across versions lets a version switch relocate
/// the reference in place instead of creating a duplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub name: String,
    /// File inside the extracted content root, e.g. `LS Cherry.local.blend`
    pub source_file: String,
    /// Object linked out of `source_file`
    pub object_name: String,
}

impl Anchor {
    pub fn new(
        name: impl Into<String>,
        source_file: impl Into<String>,
        object_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source_file: source_file.into(),
            object_name: object_name.into(),
        }
    }
}

/// One live external reference held by the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    /// Subsystem owning the record, e.g. `LSCherry` or `lsregistry:<namespace>`
    pub owner: String,
    pub anchor_name: String,
    pub identifier: String,
    pub source_file: String,
    pub object_name: String,
    /// Backing file in stored notation (`//` = relative to the document)
    pub backing_path: String,
    /// Host-side handle of the reference
    pub host_ref: String,
    pub linked_at: DateTime<Utc>,
}

impl LinkRecord {
    pub fn anchor(&self) -> Anchor {
        Anchor::new(&self.anchor_name, &self.source_file, &self.object_name)
    }
}

/// An item that repair did not fix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairIssue {
    pub anchor_name: String,
    pub identifier: String,
    pub reason: String,
}

/// Outcome of a repair pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub repaired: usize,
    /// Records whose identifier could not be resolved
    pub skipped: Vec<RepairIssue>,
    /// Records that were resolvable but could not be re-linked
    pub failed: Vec<RepairIssue>,
}

impl RepairReport {
    pub fn merge(&mut self, other: RepairReport) {
        self.repaired += other.repaired;
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
    }

    pub fn is_clean(&self) -> bool {
        self.repaired == 0 && self.skipped.is_empty() && self.failed.is_empty()
    }
}
