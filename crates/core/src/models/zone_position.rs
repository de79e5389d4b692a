//! Zone ↔ position association.

use serde::{Deserialize, Serialize};

use crate::types::EntityId;

/// Binds a position to its owning zone. Created and removed together with
/// the position; never edited on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZonePositionLink {
    pub id: EntityId,
    pub zone_id: EntityId,
    pub position_id: EntityId,
}

impl ZonePositionLink {
    pub fn new_local(zone_id: EntityId, position_id: EntityId) -> Self {
        Self {
            id: crate::types::new_id(),
            zone_id,
            position_id,
        }
    }
}
