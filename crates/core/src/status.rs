//! Staging status shared by zones and positions.
//!
//! Every staged record carries one of four tags describing how it differs
//! from the last synced baseline. Transitions are centralised here so that
//! mutations on zones and positions follow identical rules.

use serde::{Deserialize, Serialize};

/// How a staged record relates to the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StagingStatus {
    /// Matches the backing store.
    Existing,
    /// Exists only locally.
    New,
    /// Exists in the store but has changed fields.
    Modified,
    /// Marked for removal on the next reconciliation.
    Deleted,
}

impl StagingStatus {
    /// Status after a field edit. New records stay new.
    pub fn after_edit(self) -> Self {
        match self {
            Self::New => Self::New,
            Self::Deleted => Self::Deleted,
            Self::Existing | Self::Modified => Self::Modified,
        }
    }

    /// Status after a delete, or `None` when the record should be dropped
    /// outright because it was never persisted.
    pub fn after_delete(self) -> Option<Self> {
        match self {
            Self::New => None,
            Self::Existing | Self::Modified | Self::Deleted => Some(Self::Deleted),
        }
    }

    /// `true` for anything other than [`StagingStatus::Existing`].
    pub fn is_pending(self) -> bool {
        self != Self::Existing
    }

    /// `true` unless the record is marked deleted.
    pub fn is_live(self) -> bool {
        self != Self::Deleted
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Existing => "existing",
            Self::New => "new",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for StagingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
