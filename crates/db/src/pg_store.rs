//! [`WarehouseStore`] over PostgreSQL.

use async_trait::async_trait;
use zonemap_core::models::{Position, PositionPatch, Template, Zone, ZonePatch, ZonePositionLink};
use zonemap_core::store::{StoreError, StoreResult, WarehouseStore};
use zonemap_core::types::EntityId;

use crate::repositories::{PositionRepo, ZonePositionRepo, ZoneRepo, ZoneTemplateRepo};
use crate::DbPool;

/// Database-backed store. Every call runs as its own statement; there is
/// no transaction spanning several calls.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Map a driver error onto the store contract.
fn store_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            StoreError::ForeignKey(db.message().to_string())
        }
        _ => StoreError::Backend(err.to_string()),
    }
}

#[async_trait]
impl WarehouseStore for PgStore {
    async fn fetch_zones(&self, scope: &str) -> StoreResult<Vec<Zone>> {
        let rows = ZoneRepo::list_by_scope(&self.pool, scope)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(Zone::from).collect())
    }

    async fn insert_zones(&self, scope: &str, zones: &[Zone]) -> StoreResult<()> {
        let inserted = ZoneRepo::insert_many(&self.pool, scope, zones)
            .await
            .map_err(store_error)?;
        tracing::debug!(scope, requested = zones.len(), inserted, "Inserted zones");
        Ok(())
    }

    async fn update_zone(&self, id: EntityId, patch: &ZonePatch) -> StoreResult<()> {
        ZoneRepo::update(&self.pool, id, patch)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn delete_zones(&self, ids: &[EntityId]) -> StoreResult<()> {
        let deleted = ZoneRepo::delete_many(&self.pool, ids)
            .await
            .map_err(store_error)?;
        tracing::debug!(requested = ids.len(), deleted, "Deleted zones");
        Ok(())
    }

    async fn fetch_positions(&self, scope: &str) -> StoreResult<Vec<Position>> {
        let rows = PositionRepo::list_by_scope(&self.pool, scope)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(Position::from).collect())
    }

    async fn insert_positions(&self, scope: &str, positions: &[Position]) -> StoreResult<()> {
        let inserted = PositionRepo::insert_many(&self.pool, scope, positions)
            .await
            .map_err(store_error)?;
        tracing::debug!(scope, requested = positions.len(), inserted, "Inserted positions");
        Ok(())
    }

    async fn update_position(&self, id: EntityId, patch: &PositionPatch) -> StoreResult<()> {
        PositionRepo::update(&self.pool, id, patch)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn delete_positions(&self, ids: &[EntityId]) -> StoreResult<()> {
        PositionRepo::delete_many(&self.pool, ids)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn fetch_links(&self, scope: &str) -> StoreResult<Vec<ZonePositionLink>> {
        let rows = ZonePositionRepo::list_by_scope(&self.pool, scope)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(ZonePositionLink::from).collect())
    }

    async fn insert_links(&self, links: &[ZonePositionLink]) -> StoreResult<()> {
        ZonePositionRepo::insert_many(&self.pool, links)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn delete_links(&self, ids: &[EntityId]) -> StoreResult<()> {
        ZonePositionRepo::delete_many(&self.pool, ids)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn fetch_templates(&self, scope: &str) -> StoreResult<Vec<Template>> {
        let rows = ZoneTemplateRepo::list_by_scope(&self.pool, scope)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(Template::from).collect())
    }

    async fn insert_template(&self, scope: &str, template: &Template) -> StoreResult<()> {
        ZoneTemplateRepo::create(&self.pool, scope, template)
            .await
            .map_err(store_error)
    }

    async fn delete_template(&self, id: EntityId) -> StoreResult<()> {
        ZoneTemplateRepo::delete(&self.pool, id)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}
