//! Repository for the `zone_positions` link table.

use sqlx::PgPool;
use zonemap_core::models::ZonePositionLink;
use zonemap_core::types::EntityId;

use crate::models::ZonePositionRow;

/// Provides table operations for zone/position links.
pub struct ZonePositionRepo;

impl ZonePositionRepo {
    /// List links whose zone belongs to `scope`.
    pub async fn list_by_scope(
        pool: &PgPool,
        scope: &str,
    ) -> Result<Vec<ZonePositionRow>, sqlx::Error> {
        sqlx::query_as::<_, ZonePositionRow>(
            "SELECT zp.id, zp.zone_id, zp.position_id, zp.created_at
             FROM zone_positions zp
             JOIN zones z ON z.id = zp.zone_id
             WHERE z.scope = $1",
        )
        .bind(scope)
        .fetch_all(pool)
        .await
    }

    /// Batch-insert links. Ids that already exist are skipped.
    pub async fn insert_many(
        pool: &PgPool,
        links: &[ZonePositionLink],
    ) -> Result<u64, sqlx::Error> {
        if links.is_empty() {
            return Ok(0);
        }

        let ids: Vec<EntityId> = links.iter().map(|l| l.id).collect();
        let zone_ids: Vec<EntityId> = links.iter().map(|l| l.zone_id).collect();
        let position_ids: Vec<EntityId> = links.iter().map(|l| l.position_id).collect();

        let result = sqlx::query(
            "INSERT INTO zone_positions (id, zone_id, position_id) \
             SELECT * FROM UNNEST($1::uuid[], $2::uuid[], $3::uuid[]) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(&ids)
        .bind(&zone_ids)
        .bind(&position_ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete links by id. Returns the number of rows removed.
    pub async fn delete_many(pool: &PgPool, ids: &[EntityId]) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM zone_positions WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
