//! Repository for the `zones` table.

use sqlx::PgPool;
use zonemap_core::models::{Zone, ZonePatch};
use zonemap_core::types::EntityId;

use crate::models::ZoneRow;

/// Column list for zones queries.
const COLUMNS: &str = "id, scope, code, name, parent_id, level, created_at, updated_at";

/// Provides table operations for warehouse zones.
pub struct ZoneRepo;

impl ZoneRepo {
    /// List every zone in a scope, shallowest level first.
    pub async fn list_by_scope(pool: &PgPool, scope: &str) -> Result<Vec<ZoneRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM zones
             WHERE scope = $1
             ORDER BY level ASC, code ASC"
        );
        sqlx::query_as::<_, ZoneRow>(&query)
            .bind(scope)
            .fetch_all(pool)
            .await
    }

    /// Batch-insert zones. Ids that already exist are skipped.
    ///
    /// Returns the number of rows actually inserted.
    pub async fn insert_many(
        pool: &PgPool,
        scope: &str,
        zones: &[Zone],
    ) -> Result<u64, sqlx::Error> {
        if zones.is_empty() {
            return Ok(0);
        }

        let ids: Vec<EntityId> = zones.iter().map(|z| z.id).collect();
        let codes: Vec<String> = zones.iter().map(|z| z.code.clone()).collect();
        let names: Vec<String> = zones.iter().map(|z| z.name.clone()).collect();
        let parent_ids: Vec<Option<EntityId>> = zones.iter().map(|z| z.parent_id).collect();
        let levels: Vec<i32> = zones.iter().map(|z| z.level).collect();

        let result = sqlx::query(
            "INSERT INTO zones (id, scope, code, name, parent_id, level) \
             SELECT u.id, $1, u.code, u.name, u.parent_id, u.level \
             FROM UNNEST($2::uuid[], $3::text[], $4::text[], $5::uuid[], $6::int4[]) \
                AS u(id, code, name, parent_id, level) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(scope)
        .bind(&ids)
        .bind(&codes)
        .bind(&names)
        .bind(&parent_ids)
        .bind(&levels)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Update a zone's code and/or name. Returns `true` if a row matched.
    pub async fn update(pool: &PgPool, id: EntityId, patch: &ZonePatch) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE zones SET
                code = COALESCE($1, code),
                name = COALESCE($2, name),
                updated_at = NOW()
             WHERE id = $3",
        )
        .bind(&patch.code)
        .bind(&patch.name)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete zones by id. Returns the number of rows removed.
    pub async fn delete_many(pool: &PgPool, ids: &[EntityId]) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM zones WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
