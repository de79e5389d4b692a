//! Repository for the `positions` table.

use sqlx::PgPool;
use zonemap_core::models::{Position, PositionPatch};
use zonemap_core::types::EntityId;

use crate::models::PositionRow;

/// Column list for positions queries.
const COLUMNS: &str = "id, scope, code, display_order, batch_label, lot_id, \
    created_at, updated_at";

/// Provides table operations for storage positions.
pub struct PositionRepo;

impl PositionRepo {
    /// List every position in a scope.
    pub async fn list_by_scope(
        pool: &PgPool,
        scope: &str,
    ) -> Result<Vec<PositionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM positions
             WHERE scope = $1
             ORDER BY display_order ASC, code ASC"
        );
        sqlx::query_as::<_, PositionRow>(&query)
            .bind(scope)
            .fetch_all(pool)
            .await
    }

    /// Batch-insert positions. Ids that already exist are skipped.
    ///
    /// `lot_id` is never written here; occupancy belongs to the stock
    /// subsystem.
    pub async fn insert_many(
        pool: &PgPool,
        scope: &str,
        positions: &[Position],
    ) -> Result<u64, sqlx::Error> {
        if positions.is_empty() {
            return Ok(0);
        }

        let ids: Vec<EntityId> = positions.iter().map(|p| p.id).collect();
        let codes: Vec<String> = positions.iter().map(|p| p.code.clone()).collect();
        let orders: Vec<i32> = positions.iter().map(|p| p.display_order).collect();
        let labels: Vec<Option<String>> = positions.iter().map(|p| p.batch_label.clone()).collect();

        let result = sqlx::query(
            "INSERT INTO positions (id, scope, code, display_order, batch_label) \
             SELECT u.id, $1, u.code, u.display_order, u.batch_label \
             FROM UNNEST($2::uuid[], $3::text[], $4::int4[], $5::text[]) \
                AS u(id, code, display_order, batch_label) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(scope)
        .bind(&ids)
        .bind(&codes)
        .bind(&orders)
        .bind(&labels)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Update a position's code. Returns `true` if a row matched.
    pub async fn update(
        pool: &PgPool,
        id: EntityId,
        patch: &PositionPatch,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE positions SET
                code = COALESCE($1, code),
                updated_at = NOW()
             WHERE id = $2",
        )
        .bind(&patch.code)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete positions by id. Returns the number of rows removed.
    pub async fn delete_many(pool: &PgPool, ids: &[EntityId]) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM positions WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
