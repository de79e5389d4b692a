//! Position entity model and DTOs.

use serde::{Deserialize, Serialize};

use crate::status::StagingStatus;
use crate::types::EntityId;

/// A leaf storage slot owned by exactly one zone through a
/// [`ZonePositionLink`](super::ZonePositionLink).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: EntityId,
    pub code: String,
    /// Used for generation numbering and sort.
    pub display_order: i32,
    /// Free-text provenance tag, e.g. which bulk action produced the row.
    pub batch_label: Option<String>,
    /// Lot currently stored in this slot. Occupied positions cannot be deleted.
    pub lot_id: Option<EntityId>,
    pub status: StagingStatus,
}

impl Position {
    pub fn new_local(code: String, display_order: i32, batch_label: Option<String>) -> Self {
        Self {
            id: crate::types::new_id(),
            code,
            display_order,
            batch_label,
            lot_id: None,
            status: StagingStatus::New,
        }
    }

    pub fn is_live(&self) -> bool {
        self.status.is_live()
    }

    pub fn is_occupied(&self) -> bool {
        self.lot_id.is_some()
    }
}

/// DTO for a field-level position update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionPatch {
    pub code: Option<String>,
}

impl From<&Position> for PositionPatch {
    fn from(position: &Position) -> Self {
        Self {
            code: Some(position.code.clone()),
        }
    }
}
