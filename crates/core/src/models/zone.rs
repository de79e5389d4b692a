//! Zone entity model and DTOs.

use serde::{Deserialize, Serialize};

use crate::status::StagingStatus;
use crate::types::EntityId;

/// A node in the storage hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: EntityId,
    /// Short mnemonic, not guaranteed globally unique.
    pub code: String,
    pub name: String,
    /// `None` for root zones.
    pub parent_id: Option<EntityId>,
    /// Depth in the tree, root = 0.
    pub level: i32,
    pub status: StagingStatus,
}

impl Zone {
    /// A zone freshly minted in this editing session.
    pub fn new_local(
        code: String,
        name: String,
        parent_id: Option<EntityId>,
        level: i32,
    ) -> Self {
        Self {
            id: crate::types::new_id(),
            code,
            name,
            parent_id,
            level,
            status: StagingStatus::New,
        }
    }

    pub fn is_live(&self) -> bool {
        self.status.is_live()
    }
}

/// DTO for a field-level zone update. All fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZonePatch {
    pub code: Option<String>,
    pub name: Option<String>,
}

impl From<&Zone> for ZonePatch {
    fn from(zone: &Zone) -> Self {
        Self {
            code: Some(zone.code.clone()),
            name: Some(zone.name.clone()),
        }
    }
}
