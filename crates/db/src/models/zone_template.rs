//! Row struct for the `zone_templates` table.

use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use zonemap_core::models::{Template, TemplateNode};
use zonemap_core::types::{EntityId, Timestamp};

/// A saved template. `structure` is stored as JSONB.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ZoneTemplateRow {
    pub id: EntityId,
    pub scope: String,
    pub name: String,
    pub structure: Json<TemplateNode>,
    pub created_at: Timestamp,
}

impl From<ZoneTemplateRow> for Template {
    fn from(row: ZoneTemplateRow) -> Self {
        Template {
            id: row.id,
            name: row.name,
            structure: row.structure.0,
            created_at: row.created_at,
        }
    }
}
