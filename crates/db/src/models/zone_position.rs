//! Row struct for the `zone_positions` link table.

use serde::Serialize;
use sqlx::FromRow;
use zonemap_core::models::ZonePositionLink;
use zonemap_core::types::{EntityId, Timestamp};

/// Links one position to its owning zone.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ZonePositionRow {
    pub id: EntityId,
    pub zone_id: EntityId,
    pub position_id: EntityId,
    pub created_at: Timestamp,
}

impl From<ZonePositionRow> for ZonePositionLink {
    fn from(row: ZonePositionRow) -> Self {
        ZonePositionLink {
            id: row.id,
            zone_id: row.zone_id,
            position_id: row.position_id,
        }
    }
}
