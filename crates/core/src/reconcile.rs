//! Reconciliation: turn staged statuses into ordered store calls.
//!
//! A run moves through
//! `Idle → Diffing → Deleting → Updating → Inserting → Rebaselining → Idle`,
//! or to `Failed` on the first error. Foreign keys dictate the ordering:
//! zones are deleted deepest level first and inserted shallowest level
//! first, links go before the positions they reference on delete and after
//! them on insert.
//!
//! Staged state is never modified by a run. On success the caller receives a
//! freshly fetched [`StagingStore`]; on failure the old one stays dirty and a
//! retry recomputes the plan against the unchanged baseline.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tokio::sync::watch;

use crate::error::CoreError;
use crate::models::{Position, PositionPatch, Zone, ZonePatch, ZonePositionLink};
use crate::staging::StagingStore;
use crate::status::StagingStatus;
use crate::store::{StoreError, WarehouseStore};
use crate::types::EntityId;

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// Where a reconciliation run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    Diffing,
    Deleting,
    Updating,
    Inserting,
    Rebaselining,
    Failed,
}

impl SyncPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Diffing => "diffing",
            Self::Deleting => "deleting",
            Self::Updating => "updating",
            Self::Inserting => "inserting",
            Self::Rebaselining => "rebaselining",
            Self::Failed => "failed",
        }
    }

    /// `true` while a run is in progress.
    pub fn is_busy(self) -> bool {
        !matches!(self, Self::Idle | Self::Failed)
    }
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// The ordered set of writes one run will issue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    /// Persisted zones to delete, grouped by level, deepest first.
    pub zone_deletes: Vec<(i32, Vec<EntityId>)>,
    /// Persisted positions deleted one by one by the operator.
    pub position_deletes: Vec<EntityId>,
    pub zone_updates: Vec<(EntityId, ZonePatch)>,
    pub position_updates: Vec<(EntityId, PositionPatch)>,
    /// New zones grouped by level, shallowest first.
    pub zone_inserts: Vec<(i32, Vec<Zone>)>,
    pub position_inserts: Vec<Position>,
    pub link_inserts: Vec<ZonePositionLink>,
}

impl SyncPlan {
    /// Diff staged state against its baseline.
    pub fn from_staging(staging: &StagingStore) -> Self {
        let deleted_zones: HashSet<EntityId> = staging
            .zones
            .iter()
            .filter(|z| z.status == StagingStatus::Deleted)
            .map(|z| z.id)
            .collect();

        let mut deletes_by_level: BTreeMap<i32, Vec<EntityId>> = BTreeMap::new();
        let mut inserts_by_level: BTreeMap<i32, Vec<Zone>> = BTreeMap::new();
        let mut zone_updates = Vec::new();

        for zone in &staging.zones {
            match zone.status {
                StagingStatus::Deleted if staging.baseline.zone_ids.contains(&zone.id) => {
                    deletes_by_level.entry(zone.level).or_default().push(zone.id);
                }
                StagingStatus::Modified => zone_updates.push((zone.id, ZonePatch::from(zone))),
                StagingStatus::New => inserts_by_level
                    .entry(zone.level)
                    .or_default()
                    .push(zone.clone()),
                _ => {}
            }
        }

        // Positions inside a deleted zone are handled by the zone cascade.
        let owner = |position_id: EntityId| staging.zone_of_position(position_id);
        let in_surviving_zone = |position_id: EntityId| {
            owner(position_id).is_some_and(|zid| {
                !deleted_zones.contains(&zid) && staging.zone(zid).is_some()
            })
        };
        let in_deleted_zone = |position_id: EntityId| {
            owner(position_id).is_some_and(|zid| deleted_zones.contains(&zid))
        };

        let mut position_deletes = Vec::new();
        let mut position_updates = Vec::new();
        let mut position_inserts = Vec::new();

        for position in &staging.positions {
            match position.status {
                StagingStatus::Deleted
                    if staging.baseline.position_ids.contains(&position.id)
                        && !in_deleted_zone(position.id) =>
                {
                    position_deletes.push(position.id);
                }
                StagingStatus::Modified if in_surviving_zone(position.id) => {
                    position_updates.push((position.id, PositionPatch::from(position)));
                }
                StagingStatus::New if in_surviving_zone(position.id) => {
                    position_inserts.push(position.clone());
                }
                _ => {}
            }
        }

        let inserted: HashSet<EntityId> = position_inserts.iter().map(|p| p.id).collect();
        let link_inserts = staging
            .links
            .iter()
            .filter(|l| inserted.contains(&l.position_id))
            .cloned()
            .collect();

        Self {
            zone_deletes: deletes_by_level.into_iter().rev().collect(),
            position_deletes,
            zone_updates,
            position_updates,
            zone_inserts: inserts_by_level.into_iter().collect(),
            position_inserts,
            link_inserts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.zone_deletes.is_empty()
            && self.position_deletes.is_empty()
            && self.zone_updates.is_empty()
            && self.position_updates.is_empty()
            && self.zone_inserts.is_empty()
            && self.position_inserts.is_empty()
    }

    /// All zone ids scheduled for deletion.
    pub fn deleted_zone_ids(&self) -> HashSet<EntityId> {
        self.zone_deletes
            .iter()
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect()
    }

    fn has_deletes(&self) -> bool {
        !self.zone_deletes.is_empty() || !self.position_deletes.is_empty()
    }
}

/// Store rows affected by deletions, read from the store right before
/// writing.
#[derive(Debug, Default)]
struct DeleteSet {
    /// Links owned by deleted zones.
    cascade_links: Vec<EntityId>,
    /// Positions those links pointed to.
    cascade_positions: Vec<EntityId>,
    /// Links of explicitly deleted positions.
    explicit_links: Vec<EntityId>,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Counts of what a successful run wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub zones_deleted: usize,
    pub positions_deleted: usize,
    pub links_deleted: usize,
    pub zones_updated: usize,
    pub positions_updated: usize,
    pub zones_inserted: usize,
    pub positions_inserted: usize,
    pub links_inserted: usize,
    /// Best-effort cascade cleanups that failed without aborting the run.
    pub warnings: Vec<String>,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Fetch authoritative state for `scope` as a clean staging store.
pub async fn fetch_snapshot<S>(store: &S, scope: &str) -> Result<StagingStore, CoreError>
where
    S: WarehouseStore + ?Sized,
{
    let fail = |e: StoreError| CoreError::persistence(SyncPhase::Rebaselining, e);
    let zones = store.fetch_zones(scope).await.map_err(fail)?;
    let positions = store.fetch_positions(scope).await.map_err(fail)?;
    let links = store.fetch_links(scope).await.map_err(fail)?;
    Ok(StagingStore::from_synced(zones, positions, links))
}

/// Executes one reconciliation run against a store.
pub struct Reconciler<'a, S: ?Sized> {
    store: &'a S,
    scope: &'a str,
    chunk_size: usize,
    phase: &'a watch::Sender<SyncPhase>,
}

impl<'a, S> Reconciler<'a, S>
where
    S: WarehouseStore + ?Sized,
{
    pub fn new(
        store: &'a S,
        scope: &'a str,
        chunk_size: usize,
        phase: &'a watch::Sender<SyncPhase>,
    ) -> Self {
        Self {
            store,
            scope,
            chunk_size: chunk_size.max(1),
            phase,
        }
    }

    fn enter(&self, phase: SyncPhase) {
        tracing::debug!(phase = %phase, scope = self.scope, "Reconciliation phase");
        self.phase.send_replace(phase);
    }

    /// Apply the staged delta and return the re-fetched staging store.
    pub async fn run(
        &self,
        staging: &StagingStore,
    ) -> Result<(SyncReport, StagingStore), CoreError> {
        match self.execute(staging).await {
            Ok(result) => {
                self.enter(SyncPhase::Idle);
                Ok(result)
            }
            Err(err) => {
                tracing::error!(error = %err, scope = self.scope, "Reconciliation failed");
                self.enter(SyncPhase::Failed);
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        staging: &StagingStore,
    ) -> Result<(SyncReport, StagingStore), CoreError> {
        self.enter(SyncPhase::Diffing);
        let plan = SyncPlan::from_staging(staging);
        let deletes = if plan.has_deletes() {
            self.preflight(&plan).await?
        } else {
            DeleteSet::default()
        };
        tracing::info!(
            scope = self.scope,
            zone_deletes = plan.deleted_zone_ids().len(),
            position_deletes = plan.position_deletes.len(),
            zone_updates = plan.zone_updates.len(),
            position_updates = plan.position_updates.len(),
            position_inserts = plan.position_inserts.len(),
            "Computed reconciliation plan"
        );

        let mut report = SyncReport::default();

        self.enter(SyncPhase::Deleting);
        self.apply_deletes(&plan, &deletes, &mut report).await?;

        self.enter(SyncPhase::Updating);
        self.apply_updates(&plan, &mut report).await?;

        self.enter(SyncPhase::Inserting);
        self.apply_inserts(&plan, &mut report).await?;

        self.enter(SyncPhase::Rebaselining);
        let rebased = fetch_snapshot(self.store, self.scope).await?;

        tracing::info!(
            scope = self.scope,
            zones_deleted = report.zones_deleted,
            zones_inserted = report.zones_inserted,
            positions_inserted = report.positions_inserted,
            warnings = report.warnings.len(),
            "Reconciliation complete"
        );
        Ok((report, rebased))
    }

    /// Read links and positions from the store, work out what the deletes
    /// will touch, and refuse to continue if any of it holds stock.
    async fn preflight(&self, plan: &SyncPlan) -> Result<DeleteSet, CoreError> {
        let fail = |e: StoreError| CoreError::persistence(SyncPhase::Diffing, e);
        let links = self.store.fetch_links(self.scope).await.map_err(fail)?;
        let positions = self.store.fetch_positions(self.scope).await.map_err(fail)?;

        let doomed_zones = plan.deleted_zone_ids();
        let explicit: HashSet<EntityId> = plan.position_deletes.iter().copied().collect();

        let mut set = DeleteSet::default();
        for link in &links {
            if doomed_zones.contains(&link.zone_id) {
                set.cascade_links.push(link.id);
                set.cascade_positions.push(link.position_id);
            } else if explicit.contains(&link.position_id) {
                set.explicit_links.push(link.id);
            }
        }

        let checked: HashSet<EntityId> = set
            .cascade_positions
            .iter()
            .chain(plan.position_deletes.iter())
            .copied()
            .collect();
        let mut occupied: Vec<&str> = positions
            .iter()
            .filter(|p| checked.contains(&p.id) && p.is_occupied())
            .map(|p| p.code.as_str())
            .collect();

        if !occupied.is_empty() {
            occupied.sort_unstable();
            return Err(CoreError::Conflict(format!(
                "Cannot delete positions that still hold stock: {}. Move the stock out first.",
                occupied.join(", ")
            )));
        }
        Ok(set)
    }

    async fn apply_deletes(
        &self,
        plan: &SyncPlan,
        deletes: &DeleteSet,
        report: &mut SyncReport,
    ) -> Result<(), CoreError> {
        let fail = |e: StoreError| CoreError::persistence(SyncPhase::Deleting, e);

        // Cascade cleanup is best effort: the store may already have removed
        // these rows through its own cascading deletes.
        if !deletes.cascade_links.is_empty() {
            match self.store.delete_links(&deletes.cascade_links).await {
                Ok(()) => report.links_deleted += deletes.cascade_links.len(),
                Err(e) => self.warn(report, format!("cascade link cleanup failed: {e}")),
            }
        }
        if !deletes.cascade_positions.is_empty() {
            match self.store.delete_positions(&deletes.cascade_positions).await {
                Ok(()) => report.positions_deleted += deletes.cascade_positions.len(),
                Err(e) => self.warn(report, format!("cascade position cleanup failed: {e}")),
            }
        }

        if !plan.position_deletes.is_empty() {
            if !deletes.explicit_links.is_empty() {
                self.store
                    .delete_links(&deletes.explicit_links)
                    .await
                    .map_err(fail)?;
                report.links_deleted += deletes.explicit_links.len();
            }
            self.store
                .delete_positions(&plan.position_deletes)
                .await
                .map_err(fail)?;
            report.positions_deleted += plan.position_deletes.len();
        }

        for (level, ids) in &plan.zone_deletes {
            tracing::debug!(level, count = ids.len(), "Deleting zones");
            self.store.delete_zones(ids).await.map_err(fail)?;
            report.zones_deleted += ids.len();
        }
        Ok(())
    }

    async fn apply_updates(
        &self,
        plan: &SyncPlan,
        report: &mut SyncReport,
    ) -> Result<(), CoreError> {
        let fail = |e: StoreError| CoreError::persistence(SyncPhase::Updating, e);

        for (id, patch) in &plan.zone_updates {
            self.store.update_zone(*id, patch).await.map_err(fail)?;
            report.zones_updated += 1;
        }
        for (id, patch) in &plan.position_updates {
            self.store.update_position(*id, patch).await.map_err(fail)?;
            report.positions_updated += 1;
        }
        Ok(())
    }

    async fn apply_inserts(
        &self,
        plan: &SyncPlan,
        report: &mut SyncReport,
    ) -> Result<(), CoreError> {
        let fail = |e: StoreError| CoreError::persistence(SyncPhase::Inserting, e);

        for (level, zones) in &plan.zone_inserts {
            tracing::debug!(level, count = zones.len(), "Inserting zones");
            self.store
                .insert_zones(self.scope, zones)
                .await
                .map_err(fail)?;
            report.zones_inserted += zones.len();
        }

        for (i, chunk) in plan.position_inserts.chunks(self.chunk_size).enumerate() {
            self.store
                .insert_positions(self.scope, chunk)
                .await
                .map_err(|e| {
                    CoreError::persistence(
                        SyncPhase::Inserting,
                        format!("position chunk {}: {e}", i + 1),
                    )
                })?;
            report.positions_inserted += chunk.len();
        }

        for (i, chunk) in plan.link_inserts.chunks(self.chunk_size).enumerate() {
            self.store.insert_links(chunk).await.map_err(|e| {
                CoreError::persistence(
                    SyncPhase::Inserting,
                    format!("link chunk {}: {e}", i + 1),
                )
            })?;
            report.links_inserted += chunk.len();
        }
        Ok(())
    }

    fn warn(&self, report: &mut SyncReport, message: String) {
        tracing::warn!(scope = self.scope, "{message}");
        report.warnings.push(message);
    }

    /// Remove every link, position and zone in the scope, then re-fetch.
    ///
    /// Refuses to run while any position holds stock.
    pub async fn purge(&self) -> Result<StagingStore, CoreError> {
        let result = self.execute_purge().await;
        match &result {
            Ok(_) => self.enter(SyncPhase::Idle),
            Err(err) => {
                tracing::error!(error = %err, scope = self.scope, "Purge failed");
                self.enter(SyncPhase::Failed);
            }
        }
        result
    }

    async fn execute_purge(&self) -> Result<StagingStore, CoreError> {
        self.enter(SyncPhase::Diffing);
        let current = fetch_snapshot(self.store, self.scope).await?;

        let mut occupied: Vec<&str> = current
            .positions
            .iter()
            .filter(|p| p.is_occupied())
            .map(|p| p.code.as_str())
            .collect();
        if !occupied.is_empty() {
            occupied.sort_unstable();
            return Err(CoreError::Conflict(format!(
                "Cannot delete positions that still hold stock: {}",
                occupied.join(", ")
            )));
        }

        self.enter(SyncPhase::Deleting);
        let fail = |e: StoreError| CoreError::persistence(SyncPhase::Deleting, e);

        let link_ids: Vec<EntityId> = current.links.iter().map(|l| l.id).collect();
        if !link_ids.is_empty() {
            self.store.delete_links(&link_ids).await.map_err(fail)?;
        }
        let position_ids: Vec<EntityId> = current.positions.iter().map(|p| p.id).collect();
        if !position_ids.is_empty() {
            self.store.delete_positions(&position_ids).await.map_err(fail)?;
        }

        let mut by_level: BTreeMap<i32, Vec<EntityId>> = BTreeMap::new();
        for zone in &current.zones {
            by_level.entry(zone.level).or_default().push(zone.id);
        }
        for (_, ids) in by_level.into_iter().rev() {
            self.store.delete_zones(&ids).await.map_err(fail)?;
        }

        tracing::info!(
            scope = self.scope,
            zones = current.zones.len(),
            positions = position_ids.len(),
            "Purged zone structure"
        );

        self.enter(SyncPhase::Rebaselining);
        fetch_snapshot(self.store, self.scope).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreCall, StoreOp};
    use assert_matches::assert_matches;

    fn zone(code: &str, parent: Option<&Zone>) -> Zone {
        Zone::new_local(
            code.to_string(),
            code.to_string(),
            parent.map(|p| p.id),
            parent.map_or(0, |p| p.level + 1),
        )
    }

    /// Seed a three-level chain `L0 > L1 > L2` with one position on `L2`.
    async fn seeded() -> (MemoryStore, Vec<Zone>, Position, ZonePositionLink) {
        let store = MemoryStore::new();
        let l0 = zone("L0", None);
        let l1 = zone("L1", Some(&l0));
        let l2 = zone("L2", Some(&l1));
        let position = Position::new_local("L2.V1".to_string(), 1, None);
        let link = ZonePositionLink::new_local(l2.id, position.id);

        store
            .insert_zones("s", &[l0.clone(), l1.clone(), l2.clone()])
            .await
            .unwrap();
        store.insert_positions("s", &[position.clone()]).await.unwrap();
        store.insert_links(&[link.clone()]).await.unwrap();
        store.clear_calls().await;
        (store, vec![l0, l1, l2], position, link)
    }

    async fn run(
        store: &MemoryStore,
        staging: &StagingStore,
    ) -> Result<(SyncReport, StagingStore), CoreError> {
        let (tx, _rx) = watch::channel(SyncPhase::Idle);
        Reconciler::new(store, "s", 500, &tx).run(staging).await
    }

    async fn writes(store: &MemoryStore) -> Vec<StoreCall> {
        store
            .calls()
            .await
            .into_iter()
            .filter(StoreCall::is_write)
            .collect()
    }

    #[test]
    fn plan_orders_levels() {
        let mut staging = StagingStore::new();
        let a = staging.add_zones(None, "A", "A", 1).unwrap()[0];
        let b = staging.add_zones(Some(a), "B", "B", 1).unwrap()[0];
        staging.add_zones(Some(b), "C", "C", 2).unwrap();

        let plan = SyncPlan::from_staging(&staging);
        let levels: Vec<i32> = plan.zone_inserts.iter().map(|(l, _)| *l).collect();
        assert_eq!(levels, vec![0, 1, 2]);
        assert_eq!(plan.zone_inserts[2].1.len(), 2);
        assert!(plan.zone_deletes.is_empty());
    }

    #[test]
    fn empty_staging_yields_empty_plan() {
        assert!(SyncPlan::from_staging(&StagingStore::new()).is_empty());
    }

    #[tokio::test]
    async fn deletes_run_deepest_level_first_after_cascade() {
        let (store, zones, position, link) = seeded().await;
        let mut staging = fetch_snapshot(&store, "s").await.unwrap();
        staging.delete_zone(zones[0].id).unwrap();
        store.clear_calls().await;

        let (report, rebased) = run(&store, &staging).await.unwrap();
        assert_eq!(report.zones_deleted, 3);
        assert_eq!(report.positions_deleted, 1);
        assert_eq!(report.links_deleted, 1);
        assert!(rebased.zones().is_empty());
        assert!(rebased.positions().is_empty());

        assert_eq!(
            writes(&store).await,
            vec![
                StoreCall::DeleteLinks(vec![link.id]),
                StoreCall::DeletePositions(vec![position.id]),
                StoreCall::DeleteZones(vec![zones[2].id]),
                StoreCall::DeleteZones(vec![zones[1].id]),
                StoreCall::DeleteZones(vec![zones[0].id]),
            ]
        );
    }

    #[tokio::test]
    async fn occupied_positions_block_the_run_before_any_write() {
        let (store, zones, position, _) = seeded().await;
        store.set_lot(position.id, Some(crate::types::new_id())).await;
        let mut staging = fetch_snapshot(&store, "s").await.unwrap();
        staging.delete_zone(zones[1].id).unwrap();
        store.clear_calls().await;

        let err = run(&store, &staging).await.unwrap_err();
        assert_matches!(&err, CoreError::Conflict(msg) if msg.contains("L2.V1"));
        assert!(writes(&store).await.is_empty());
    }

    #[tokio::test]
    async fn cascade_failures_are_warnings_only() {
        let (store, zones, position, _) = seeded().await;
        let mut staging = fetch_snapshot(&store, "s").await.unwrap();
        staging.delete_zone(zones[2].id).unwrap();
        store.fail_next(StoreOp::DeletePositions, 1).await;

        let (report, rebased) = run(&store, &staging).await.unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("cascade position cleanup"));
        assert_eq!(report.zones_deleted, 1);
        assert_eq!(report.positions_deleted, 0);
        assert_eq!(rebased.zones().len(), 2);
        // The orphaned row is left for a later cleanup.
        assert!(rebased.position(position.id).is_some());
    }

    #[tokio::test]
    async fn failed_step_names_its_phase() {
        let (store, zones, _, _) = seeded().await;
        let mut staging = fetch_snapshot(&store, "s").await.unwrap();
        staging.add_zones(Some(zones[2].id), "N", "N", 1).unwrap();
        store.fail_next(StoreOp::InsertZones, 1).await;

        let (tx, rx) = watch::channel(SyncPhase::Idle);
        let err = Reconciler::new(&store, "s", 500, &tx)
            .run(&staging)
            .await
            .unwrap_err();
        assert_matches!(
            err,
            CoreError::Persistence {
                phase: SyncPhase::Inserting,
                ..
            }
        );
        assert_eq!(*rx.borrow(), SyncPhase::Failed);
    }

    #[tokio::test]
    async fn positions_insert_in_chunks_after_zones() {
        let store = MemoryStore::new();
        let mut staging = StagingStore::new();
        let a = staging.add_zones(None, "A", "A", 1).unwrap()[0];
        staging.create_positions_manual(a, "A.V", 1, 5).unwrap();

        let (tx, _rx) = watch::channel(SyncPhase::Idle);
        let (report, rebased) = Reconciler::new(&store, "s", 2, &tx)
            .run(&staging)
            .await
            .unwrap();
        assert_eq!(report.positions_inserted, 5);
        assert_eq!(report.links_inserted, 5);
        assert_eq!(rebased.positions_in_zone(a).len(), 5);
        assert!(!rebased.has_pending_changes());

        let ops: Vec<StoreOp> = store
            .calls()
            .await
            .iter()
            .filter(|c| c.is_write())
            .map(StoreCall::op)
            .collect();
        assert_eq!(
            ops,
            vec![
                StoreOp::InsertZones,
                StoreOp::InsertPositions,
                StoreOp::InsertPositions,
                StoreOp::InsertPositions,
                StoreOp::InsertLinks,
                StoreOp::InsertLinks,
                StoreOp::InsertLinks,
            ]
        );
    }

    #[tokio::test]
    async fn explicit_position_delete_removes_link_first() {
        let (store, _, position, _) = seeded().await;
        let mut staging = fetch_snapshot(&store, "s").await.unwrap();
        staging.delete_position(position.id).unwrap();
        store.clear_calls().await;

        let (report, rebased) = run(&store, &staging).await.unwrap();
        assert_eq!(report.positions_deleted, 1);
        assert_eq!(report.links_deleted, 1);
        assert!(rebased.positions().is_empty());
        assert_eq!(rebased.zones().len(), 3);
    }

    #[tokio::test]
    async fn deleted_position_inside_deleted_zone_is_counted_once() {
        let (store, zones, position, _) = seeded().await;
        let mut staging = fetch_snapshot(&store, "s").await.unwrap();
        staging.delete_position(position.id).unwrap();
        staging.delete_zone(zones[2].id).unwrap();

        let plan = SyncPlan::from_staging(&staging);
        assert!(plan.position_deletes.is_empty());

        store.clear_calls().await;
        let (report, rebased) = run(&store, &staging).await.unwrap();
        assert_eq!(report.positions_deleted, 1);
        assert_eq!(report.links_deleted, 1);
        assert!(rebased.positions().is_empty());
        let position_deletes = writes(&store)
            .await
            .into_iter()
            .filter(|c| c.op() == StoreOp::DeletePositions)
            .count();
        assert_eq!(position_deletes, 1);
    }

    #[tokio::test]
    async fn purge_removes_everything() {
        let (store, _, _, _) = seeded().await;
        let (tx, _rx) = watch::channel(SyncPhase::Idle);
        let rebased = Reconciler::new(&store, "s", 500, &tx).purge().await.unwrap();
        assert!(rebased.zones().is_empty());
        assert!(store.fetch_links("s").await.unwrap().is_empty());
    }
}
