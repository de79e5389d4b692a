//! Repository for the `zone_templates` table.

use sqlx::types::Json;
use sqlx::PgPool;
use zonemap_core::models::Template;
use zonemap_core::types::EntityId;

use crate::models::ZoneTemplateRow;

/// Column list for zone_templates queries.
const COLUMNS: &str = "id, scope, name, structure, created_at";

/// Provides storage for saved zone templates.
pub struct ZoneTemplateRepo;

impl ZoneTemplateRepo {
    /// List templates in a scope, newest first.
    pub async fn list_by_scope(
        pool: &PgPool,
        scope: &str,
    ) -> Result<Vec<ZoneTemplateRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM zone_templates
             WHERE scope = $1
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, ZoneTemplateRow>(&query)
            .bind(scope)
            .fetch_all(pool)
            .await
    }

    /// Store a captured template. Re-inserting the same id is a no-op.
    pub async fn create(pool: &PgPool, scope: &str, template: &Template) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO zone_templates (id, scope, name, structure, created_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(template.id)
        .bind(scope)
        .bind(&template.name)
        .bind(Json(&template.structure))
        .bind(template.created_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Delete a template. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: EntityId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM zone_templates WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
