//! Row struct for the `zones` table.

use serde::Serialize;
use sqlx::FromRow;
use zonemap_core::models::Zone;
use zonemap_core::types::{EntityId, Timestamp};
use zonemap_core::StagingStatus;

/// A zone row from the `zones` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ZoneRow {
    pub id: EntityId,
    pub scope: String,
    pub code: String,
    pub name: String,
    pub parent_id: Option<EntityId>,
    pub level: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<ZoneRow> for Zone {
    fn from(row: ZoneRow) -> Self {
        Zone {
            id: row.id,
            code: row.code,
            name: row.name,
            parent_id: row.parent_id,
            level: row.level,
            status: StagingStatus::Existing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_converts_to_existing_zone() {
        let now = chrono::Utc::now();
        let parent = zonemap_core::types::new_id();
        let row = ZoneRow {
            id: zonemap_core::types::new_id(),
            scope: "default".to_string(),
            code: "KA".to_string(),
            name: "Kệ A".to_string(),
            parent_id: Some(parent),
            level: 1,
            created_at: now,
            updated_at: now,
        };

        let zone = Zone::from(row.clone());
        assert_eq!(zone.id, row.id);
        assert_eq!(zone.parent_id, Some(parent));
        assert_eq!(zone.level, 1);
        assert_eq!(zone.status, StagingStatus::Existing);
    }
}
