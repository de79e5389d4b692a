//! Backing-store contract and an in-memory implementation.
//!
//! The reconciliation engine talks to storage only through
//! [`WarehouseStore`]. Each entity type is fetched, inserted, updated and
//! deleted independently; there is no cross-entity transaction.
//!
//! # Idempotence
//!
//! Implementations must make partial-failure retries safe:
//!
//! - deleting ids that no longer exist succeeds as a no-op
//! - inserting a record whose id already exists is ignored, not an error
//! - updating a missing id affects nothing and succeeds

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::models::{Position, PositionPatch, Template, Zone, ZonePatch, ZonePositionLink};
use crate::status::StagingStatus;
use crate::types::EntityId;

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// Failure reported by a store call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The write would break a parent/child or zone/position reference.
    #[error("Foreign key violation: {0}")]
    ForeignKey(String),

    /// Any other backend failure (connection, query, serialization).
    #[error("Backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Per-entity table operations consumed by the editor and the
/// reconciliation engine. Records returned by `fetch_*` carry
/// [`StagingStatus::Existing`].
#[async_trait]
pub trait WarehouseStore: Send + Sync {
    async fn fetch_zones(&self, scope: &str) -> StoreResult<Vec<Zone>>;
    async fn insert_zones(&self, scope: &str, zones: &[Zone]) -> StoreResult<()>;
    async fn update_zone(&self, id: EntityId, patch: &ZonePatch) -> StoreResult<()>;
    async fn delete_zones(&self, ids: &[EntityId]) -> StoreResult<()>;

    async fn fetch_positions(&self, scope: &str) -> StoreResult<Vec<Position>>;
    async fn insert_positions(&self, scope: &str, positions: &[Position]) -> StoreResult<()>;
    async fn update_position(&self, id: EntityId, patch: &PositionPatch) -> StoreResult<()>;
    async fn delete_positions(&self, ids: &[EntityId]) -> StoreResult<()>;

    async fn fetch_links(&self, scope: &str) -> StoreResult<Vec<ZonePositionLink>>;
    async fn insert_links(&self, links: &[ZonePositionLink]) -> StoreResult<()>;
    async fn delete_links(&self, ids: &[EntityId]) -> StoreResult<()>;

    async fn fetch_templates(&self, scope: &str) -> StoreResult<Vec<Template>>;
    async fn insert_template(&self, scope: &str, template: &Template) -> StoreResult<()>;
    async fn delete_template(&self, id: EntityId) -> StoreResult<()>;
}

// ---------------------------------------------------------------------------
// Call log
// ---------------------------------------------------------------------------

/// Kind of store operation, used for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    FetchZones,
    InsertZones,
    UpdateZone,
    DeleteZones,
    FetchPositions,
    InsertPositions,
    UpdatePosition,
    DeletePositions,
    FetchLinks,
    InsertLinks,
    DeleteLinks,
    FetchTemplates,
    InsertTemplate,
    DeleteTemplate,
}

/// One recorded call with the ids it carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    FetchZones,
    InsertZones(Vec<EntityId>),
    UpdateZone(EntityId),
    DeleteZones(Vec<EntityId>),
    FetchPositions,
    InsertPositions(Vec<EntityId>),
    UpdatePosition(EntityId),
    DeletePositions(Vec<EntityId>),
    FetchLinks,
    InsertLinks(Vec<EntityId>),
    DeleteLinks(Vec<EntityId>),
    FetchTemplates,
    InsertTemplate(EntityId),
    DeleteTemplate(EntityId),
}

impl StoreCall {
    pub fn op(&self) -> StoreOp {
        match self {
            Self::FetchZones => StoreOp::FetchZones,
            Self::InsertZones(_) => StoreOp::InsertZones,
            Self::UpdateZone(_) => StoreOp::UpdateZone,
            Self::DeleteZones(_) => StoreOp::DeleteZones,
            Self::FetchPositions => StoreOp::FetchPositions,
            Self::InsertPositions(_) => StoreOp::InsertPositions,
            Self::UpdatePosition(_) => StoreOp::UpdatePosition,
            Self::DeletePositions(_) => StoreOp::DeletePositions,
            Self::FetchLinks => StoreOp::FetchLinks,
            Self::InsertLinks(_) => StoreOp::InsertLinks,
            Self::DeleteLinks(_) => StoreOp::DeleteLinks,
            Self::FetchTemplates => StoreOp::FetchTemplates,
            Self::InsertTemplate(_) => StoreOp::InsertTemplate,
            Self::DeleteTemplate(_) => StoreOp::DeleteTemplate,
        }
    }

    /// `true` for calls that change stored data.
    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            Self::FetchZones | Self::FetchPositions | Self::FetchLinks | Self::FetchTemplates
        )
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryState {
    zones: Vec<(String, Zone)>,
    positions: Vec<(String, Position)>,
    links: Vec<ZonePositionLink>,
    templates: Vec<(String, Template)>,
    calls: Vec<StoreCall>,
    failures: HashMap<StoreOp, usize>,
}

impl MemoryState {
    /// Record `call`; fail if a failure was scheduled for its operation.
    fn record(&mut self, call: StoreCall) -> StoreResult<()> {
        let op = call.op();
        self.calls.push(call);
        if let Some(remaining) = self.failures.get_mut(&op) {
            *remaining -= 1;
            if *remaining == 0 {
                self.failures.remove(&op);
            }
            return Err(StoreError::Backend(format!("injected failure on {op:?}")));
        }
        Ok(())
    }

    fn zone_exists(&self, id: EntityId) -> bool {
        self.zones.iter().any(|(_, z)| z.id == id)
    }

    fn position_exists(&self, id: EntityId) -> bool {
        self.positions.iter().any(|(_, p)| p.id == id)
    }
}

/// A [`WarehouseStore`] held in memory.
///
/// Enforces the same foreign keys as the relational schema (a zone's parent
/// must exist, a zone with children or links cannot be removed, a linked
/// position cannot be removed), records every call, and can be told to fail
/// specific operations.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `times` calls of `op` fail with a backend error.
    pub async fn fail_next(&self, op: StoreOp, times: usize) {
        if times > 0 {
            self.state.lock().await.failures.insert(op, times);
        }
    }

    /// Every call recorded so far.
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    /// Put a lot into (or take it out of) a stored position.
    pub async fn set_lot(&self, position_id: EntityId, lot_id: Option<EntityId>) {
        let mut state = self.state.lock().await;
        if let Some((_, position)) = state.positions.iter_mut().find(|(_, p)| p.id == position_id) {
            position.lot_id = lot_id;
        }
    }
}

fn stored<T: Clone>(rows: &[(String, T)], scope: &str) -> Vec<T> {
    rows.iter()
        .filter(|(s, _)| s == scope)
        .map(|(_, row)| row.clone())
        .collect()
}

#[async_trait]
impl WarehouseStore for MemoryStore {
    async fn fetch_zones(&self, scope: &str) -> StoreResult<Vec<Zone>> {
        let mut state = self.state.lock().await;
        state.record(StoreCall::FetchZones)?;
        Ok(stored(&state.zones, scope))
    }

    async fn insert_zones(&self, scope: &str, zones: &[Zone]) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.record(StoreCall::InsertZones(zones.iter().map(|z| z.id).collect()))?;

        let mut known: HashSet<EntityId> = state.zones.iter().map(|(_, z)| z.id).collect();
        let mut fresh = Vec::new();
        for zone in zones {
            if known.contains(&zone.id) {
                continue;
            }
            if let Some(parent) = zone.parent_id {
                if !known.contains(&parent) {
                    return Err(StoreError::ForeignKey(format!(
                        "zone {} references missing parent {parent}",
                        zone.id
                    )));
                }
            }
            known.insert(zone.id);
            let mut row = zone.clone();
            row.status = StagingStatus::Existing;
            fresh.push((scope.to_string(), row));
        }
        state.zones.extend(fresh);
        Ok(())
    }

    async fn update_zone(&self, id: EntityId, patch: &ZonePatch) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.record(StoreCall::UpdateZone(id))?;
        if let Some((_, zone)) = state.zones.iter_mut().find(|(_, z)| z.id == id) {
            if let Some(code) = &patch.code {
                zone.code = code.clone();
            }
            if let Some(name) = &patch.name {
                zone.name = name.clone();
            }
        }
        Ok(())
    }

    async fn delete_zones(&self, ids: &[EntityId]) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.record(StoreCall::DeleteZones(ids.to_vec()))?;

        let doomed: HashSet<EntityId> = ids.iter().copied().collect();
        for (_, zone) in &state.zones {
            if let Some(parent) = zone.parent_id {
                if doomed.contains(&parent) && !doomed.contains(&zone.id) {
                    return Err(StoreError::ForeignKey(format!(
                        "zone {parent} still has child {}",
                        zone.id
                    )));
                }
            }
        }
        if let Some(link) = state.links.iter().find(|l| doomed.contains(&l.zone_id)) {
            return Err(StoreError::ForeignKey(format!(
                "zone {} still has linked position {}",
                link.zone_id, link.position_id
            )));
        }
        state.zones.retain(|(_, z)| !doomed.contains(&z.id));
        Ok(())
    }

    async fn fetch_positions(&self, scope: &str) -> StoreResult<Vec<Position>> {
        let mut state = self.state.lock().await;
        state.record(StoreCall::FetchPositions)?;
        Ok(stored(&state.positions, scope))
    }

    async fn insert_positions(&self, scope: &str, positions: &[Position]) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.record(StoreCall::InsertPositions(
            positions.iter().map(|p| p.id).collect(),
        ))?;
        for position in positions {
            if state.position_exists(position.id) {
                continue;
            }
            let mut row = position.clone();
            row.status = StagingStatus::Existing;
            state.positions.push((scope.to_string(), row));
        }
        Ok(())
    }

    async fn update_position(&self, id: EntityId, patch: &PositionPatch) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.record(StoreCall::UpdatePosition(id))?;
        if let Some((_, position)) = state.positions.iter_mut().find(|(_, p)| p.id == id) {
            if let Some(code) = &patch.code {
                position.code = code.clone();
            }
        }
        Ok(())
    }

    async fn delete_positions(&self, ids: &[EntityId]) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.record(StoreCall::DeletePositions(ids.to_vec()))?;

        let doomed: HashSet<EntityId> = ids.iter().copied().collect();
        if let Some(link) = state.links.iter().find(|l| doomed.contains(&l.position_id)) {
            return Err(StoreError::ForeignKey(format!(
                "position {} is still linked to zone {}",
                link.position_id, link.zone_id
            )));
        }
        state.positions.retain(|(_, p)| !doomed.contains(&p.id));
        Ok(())
    }

    async fn fetch_links(&self, scope: &str) -> StoreResult<Vec<ZonePositionLink>> {
        let mut state = self.state.lock().await;
        state.record(StoreCall::FetchLinks)?;
        let in_scope: HashSet<EntityId> = state
            .zones
            .iter()
            .filter(|(s, _)| s == scope)
            .map(|(_, z)| z.id)
            .collect();
        Ok(state
            .links
            .iter()
            .filter(|l| in_scope.contains(&l.zone_id))
            .cloned()
            .collect())
    }

    async fn insert_links(&self, links: &[ZonePositionLink]) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.record(StoreCall::InsertLinks(links.iter().map(|l| l.id).collect()))?;

        for link in links {
            if !state.zone_exists(link.zone_id) {
                return Err(StoreError::ForeignKey(format!(
                    "link {} references missing zone {}",
                    link.id, link.zone_id
                )));
            }
            if !state.position_exists(link.position_id) {
                return Err(StoreError::ForeignKey(format!(
                    "link {} references missing position {}",
                    link.id, link.position_id
                )));
            }
        }
        for link in links {
            if !state.links.iter().any(|l| l.id == link.id) {
                state.links.push(link.clone());
            }
        }
        Ok(())
    }

    async fn delete_links(&self, ids: &[EntityId]) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.record(StoreCall::DeleteLinks(ids.to_vec()))?;
        let doomed: HashSet<EntityId> = ids.iter().copied().collect();
        state.links.retain(|l| !doomed.contains(&l.id));
        Ok(())
    }

    async fn fetch_templates(&self, scope: &str) -> StoreResult<Vec<Template>> {
        let mut state = self.state.lock().await;
        state.record(StoreCall::FetchTemplates)?;
        let mut templates = stored(&state.templates, scope);
        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(templates)
    }

    async fn insert_template(&self, scope: &str, template: &Template) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.record(StoreCall::InsertTemplate(template.id))?;
        if !state.templates.iter().any(|(_, t)| t.id == template.id) {
            state.templates.push((scope.to_string(), template.clone()));
        }
        Ok(())
    }

    async fn delete_template(&self, id: EntityId) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.record(StoreCall::DeleteTemplate(id))?;
        state.templates.retain(|(_, t)| t.id != id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
