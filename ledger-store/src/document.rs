//! Versioned documents and write batches

use ledger_core::{DocPath, Document, Timestamp};
use serde::Serialize;

/// A document as held by the store
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    pub path: DocPath,
    pub data: Document,
    /// Starts at 1, bumped by every write
    pub version: u64,
    pub create_time: Timestamp,
    pub update_time: Timestamp,
}

/// Condition on the current state of a document for a write to apply
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Precondition {
    #[default]
    None,
    MustNotExist,
    /// Stored version must equal this one
    Version(u64),
}

impl Precondition {
    /// Check against the current version (`None` when absent)
    pub fn holds(&self, current: Option<u64>) -> bool {
        match (self, current) {
            (Precondition::None, _) => true,
            (Precondition::MustNotExist, current) => current.is_none(),
            (Precondition::Version(expected), Some(actual)) => *expected == actual,
            (Precondition::Version(_), None) => false,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Precondition::None => "any".to_string(),
            Precondition::MustNotExist => "absent".to_string(),
            Precondition::Version(v) => format!("version {}", v),
        }
    }
}

/// One full-document write in a batch
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentWrite {
    pub path: DocPath,
    /// Full proposed state; may contain server timestamp sentinels
    pub data: Document,
    pub precondition: Precondition,
}

impl DocumentWrite {
    pub fn set(path: DocPath, data: Document) -> Self {
        Self {
            path,
            data,
            precondition: Precondition::None,
        }
    }

    pub fn create(path: DocPath, data: Document) -> Self {
        Self {
            path,
            data,
            precondition: Precondition::MustNotExist,
        }
    }

    pub fn update(path: DocPath, data: Document, version: u64) -> Self {
        Self {
            path,
            data,
            precondition: Precondition::Version(version),
        }
    }
}

/// Result of an applied batch
#[derive(Clone, Debug, PartialEq)]
pub struct CommitResult {
    pub commit_time: Timestamp,
    /// New version of each written document, in batch order
    pub versions: Vec<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_holds() {
        assert!(Precondition::None.holds(None));
        assert!(Precondition::None.holds(Some(3)));
        assert!(Precondition::MustNotExist.holds(None));
        assert!(!Precondition::MustNotExist.holds(Some(1)));
        assert!(Precondition::Version(2).holds(Some(2)));
        assert!(!Precondition::Version(2).holds(Some(3)));
        assert!(!Precondition::Version(2).holds(None));
    }
}
