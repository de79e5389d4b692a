//! Row struct for the `positions` table.

use serde::Serialize;
use sqlx::FromRow;
use zonemap_core::models::Position;
use zonemap_core::types::{EntityId, Timestamp};
use zonemap_core::StagingStatus;

/// A storage position row. `lot_id` is written by the stock subsystem.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PositionRow {
    pub id: EntityId,
    pub scope: String,
    pub code: String,
    pub display_order: i32,
    pub batch_label: Option<String>,
    pub lot_id: Option<EntityId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<PositionRow> for Position {
    fn from(row: PositionRow) -> Self {
        Position {
            id: row.id,
            code: row.code,
            display_order: row.display_order,
            batch_label: row.batch_label,
            lot_id: row.lot_id,
            status: StagingStatus::Existing,
        }
    }
}
