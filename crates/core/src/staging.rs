//! The staging store: every zone, position and link of one editing session.
//!
//! Mutations here are pure in-memory operations. Nothing touches the backing
//! store until a reconciliation run turns the accumulated statuses into an
//! ordered plan (see [`crate::reconcile`]).

use std::collections::HashSet;

use serde::Serialize;

use crate::error::CoreError;
use crate::models::{Position, Zone, ZonePositionLink};
use crate::status::StagingStatus;
use crate::tree::{natural_cmp, TreeIndex};
use crate::types::EntityId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Appended to the root code of a duplicated subtree.
pub const COPY_CODE_SUFFIX: &str = "_COPY";

/// Appended to the root name of a duplicated subtree.
pub const COPY_NAME_SUFFIX: &str = " (copy)";

/// Maximum number of sibling zones or positions created by one command.
pub const MAX_BATCH_COUNT: u32 = 10_000;

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Trim and uppercase a code, rejecting blank input.
pub(crate) fn normalize_code(code: &str) -> Result<String, CoreError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(CoreError::Validation("Code must not be empty".to_string()));
    }
    Ok(code.to_uppercase())
}

/// Trim a display name, rejecting blank input.
pub(crate) fn normalize_name(name: &str) -> Result<String, CoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::Validation("Name must not be empty".to_string()));
    }
    Ok(name.to_string())
}

pub(crate) fn validate_count(count: u32) -> Result<(), CoreError> {
    if count < 1 {
        return Err(CoreError::Validation(
            "Count must be at least 1".to_string(),
        ));
    }
    if count > MAX_BATCH_COUNT {
        return Err(CoreError::Validation(format!(
            "Count {count} exceeds maximum of {MAX_BATCH_COUNT}"
        )));
    }
    Ok(())
}

/// Validate `count` and check that `start + count - 1` fits in an `i32`.
pub(crate) fn validate_sequence(start: i32, count: u32) -> Result<(), CoreError> {
    validate_count(count)?;
    // count <= MAX_BATCH_COUNT, so the cast is lossless.
    if start.checked_add(count as i32 - 1).is_none() {
        return Err(CoreError::Validation(format!(
            "Sequence starting at {start} with count {count} overflows"
        )));
    }
    Ok(())
}

/// Label the `index`-th (0-based) member of a sibling batch.
///
/// A base ending in digits continues counting from that number, keeping its
/// zero padding (`"A1.1"` → `"A1.1"`, `"A1.2"`, ...). Any other base gets
/// `separator` plus a 1-based counter (`"Tầng"` → `"Tầng 1"`, `"Tầng 2"`).
/// A trailing number too large to continue also falls back to the counter.
pub fn sequence_label(base: &str, index: u32, separator: &str) -> String {
    let stem = base.trim_end_matches(|c: char| c.is_ascii_digit());
    let width = base.len() - stem.len();
    if width > 0 {
        let next = base[stem.len()..]
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_add(u64::from(index)));
        if let Some(n) = next {
            return format!("{stem}{n:0width$}");
        }
    }
    format!("{base}{separator}{}", index + 1)
}

/// Provenance tag for a batch of generated positions.
pub(crate) fn batch_label(kind: &str, zone_name: &str) -> String {
    format!(
        "{kind} {} - {zone_name}",
        chrono::Utc::now().format("%H:%M:%S")
    )
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Ids present in the backing store at the last fetch.
#[derive(Debug, Clone, Default)]
pub(crate) struct Baseline {
    pub(crate) zone_ids: HashSet<EntityId>,
    pub(crate) position_ids: HashSet<EntityId>,
}

/// What a cascading zone delete did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    /// Persisted zones now flagged [`StagingStatus::Deleted`].
    pub flagged: usize,
    /// Session-local zones dropped outright.
    pub removed: usize,
}

/// Flat, explicitly passed collections of staged records plus the baseline
/// they were loaded from.
#[derive(Debug, Clone, Default)]
pub struct StagingStore {
    pub(crate) zones: Vec<Zone>,
    pub(crate) positions: Vec<Position>,
    pub(crate) links: Vec<ZonePositionLink>,
    pub(crate) baseline: Baseline,
}

impl StagingStore {
    /// An empty session with nothing persisted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session from authoritative store contents. Every record is
    /// reset to [`StagingStatus::Existing`].
    pub fn from_synced(
        mut zones: Vec<Zone>,
        mut positions: Vec<Position>,
        links: Vec<ZonePositionLink>,
    ) -> Self {
        for zone in &mut zones {
            zone.status = StagingStatus::Existing;
        }
        for position in &mut positions {
            position.status = StagingStatus::Existing;
        }
        zones.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| natural_cmp(&a.code, &b.code)));

        let baseline = Baseline {
            zone_ids: zones.iter().map(|z| z.id).collect(),
            position_ids: positions.iter().map(|p| p.id).collect(),
        };

        Self {
            zones,
            positions,
            links,
            baseline,
        }
    }

    // -- Read access ---------------------------------------------------------

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn links(&self) -> &[ZonePositionLink] {
        &self.links
    }

    /// Build a [`TreeIndex`] over the current zones.
    pub fn tree(&self) -> TreeIndex<'_> {
        TreeIndex::new(&self.zones)
    }

    /// `true` when any zone or position differs from the baseline.
    ///
    /// Computed by a scan on every call; there is no incremental dirty flag.
    pub fn has_pending_changes(&self) -> bool {
        self.zones.iter().any(|z| z.status.is_pending())
            || self.positions.iter().any(|p| p.status.is_pending())
    }

    pub fn zone(&self, id: EntityId) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == id)
    }

    pub fn position(&self, id: EntityId) -> Option<&Position> {
        self.positions.iter().find(|p| p.id == id)
    }

    /// A zone that exists and is not marked deleted.
    pub fn live_zone(&self, id: EntityId) -> Result<&Zone, CoreError> {
        self.zone(id)
            .filter(|z| z.is_live())
            .ok_or(CoreError::NotFound { entity: "zone", id })
    }

    fn live_position(&self, id: EntityId) -> Result<&Position, CoreError> {
        self.position(id)
            .filter(|p| p.is_live())
            .ok_or(CoreError::NotFound {
                entity: "position",
                id,
            })
    }

    /// Owning zone of a position.
    pub fn zone_of_position(&self, position_id: EntityId) -> Option<EntityId> {
        self.links
            .iter()
            .find(|l| l.position_id == position_id)
            .map(|l| l.zone_id)
    }

    /// Live positions linked to `zone_id`, in natural code order.
    pub fn positions_in_zone(&self, zone_id: EntityId) -> Vec<&Position> {
        let ids: HashSet<EntityId> = self
            .links
            .iter()
            .filter(|l| l.zone_id == zone_id)
            .map(|l| l.position_id)
            .collect();
        let mut out: Vec<&Position> = self
            .positions
            .iter()
            .filter(|p| p.is_live() && ids.contains(&p.id))
            .collect();
        out.sort_by(|a, b| natural_cmp(&a.code, &b.code));
        out
    }

    // -- Zone mutations ------------------------------------------------------

    /// Add `count` sibling zones under `parent_id` (`None` = root).
    ///
    /// With `count > 1` codes and names are numbered with [`sequence_label`].
    /// A name that already ends in a number continues it, so `"Kệ 1"` ×3
    /// yields `"Kệ 1"`, `"Kệ 2"`, `"Kệ 3"` rather than `"Kệ 1 1"`,
    /// `"Kệ 1 2"`, `"Kệ 1 3"`; the same rule numbers codes. Returns the ids
    /// of the created zones.
    pub fn add_zones(
        &mut self,
        parent_id: Option<EntityId>,
        code: &str,
        name: &str,
        count: u32,
    ) -> Result<Vec<EntityId>, CoreError> {
        let code = normalize_code(code)?;
        let name = normalize_name(name)?;
        validate_count(count)?;

        let level = match parent_id {
            Some(pid) => self.live_zone(pid)?.level + 1,
            None => 0,
        };

        let created: Vec<Zone> = (0..count)
            .map(|i| {
                let (code, name) = if count > 1 {
                    (sequence_label(&code, i, ""), sequence_label(&name, i, " "))
                } else {
                    (code.clone(), name.clone())
                };
                Zone::new_local(code, name, parent_id, level)
            })
            .collect();

        let ids = created.iter().map(|z| z.id).collect();
        self.zones.extend(created);
        Ok(ids)
    }

    /// Change a zone's code and name.
    pub fn rename_zone(&mut self, id: EntityId, code: &str, name: &str) -> Result<(), CoreError> {
        let code = normalize_code(code)?;
        let name = normalize_name(name)?;
        self.live_zone(id)?;

        if let Some(zone) = self.zones.iter_mut().find(|z| z.id == id) {
            zone.code = code;
            zone.name = name;
            zone.status = zone.status.after_edit();
        }
        Ok(())
    }

    /// Deep-copy the zone subtree at `id` as a sibling of the original.
    ///
    /// Only zones are copied, never positions. The copy's root gets
    /// [`COPY_CODE_SUFFIX`] / [`COPY_NAME_SUFFIX`]; descendants keep their
    /// labels. Returns the id of the new root.
    pub fn duplicate_zone(&mut self, id: EntityId) -> Result<EntityId, CoreError> {
        self.live_zone(id)?;

        let copies = {
            let index = self.tree();
            let mut remap = std::collections::HashMap::new();
            let mut copies = Vec::new();

            for original in index.subtree(id) {
                let is_root = original.id == id;
                let parent_id = if is_root {
                    original.parent_id
                } else {
                    original.parent_id.and_then(|p| remap.get(&p).copied())
                };
                let (code, name) = if is_root {
                    (
                        format!("{}{COPY_CODE_SUFFIX}", original.code),
                        format!("{}{COPY_NAME_SUFFIX}", original.name),
                    )
                } else {
                    (original.code.clone(), original.name.clone())
                };
                let copy = Zone::new_local(code, name, parent_id, original.level);
                remap.insert(original.id, copy.id);
                copies.push(copy);
            }
            copies
        };

        let root_id = copies
            .first()
            .map(|z| z.id)
            .ok_or_else(|| CoreError::Internal("duplicate produced no zones".to_string()))?;
        self.zones.extend(copies);
        Ok(root_id)
    }

    /// Delete the zone at `id` and its whole live subtree.
    ///
    /// Persisted zones are flagged deleted; their positions are left for the
    /// cascade cleanup at reconciliation time. Zones created in this session
    /// are dropped outright together with any positions staged under them.
    pub fn delete_zone(&mut self, id: EntityId) -> Result<DeleteOutcome, CoreError> {
        self.live_zone(id)?;

        let targets: HashSet<EntityId> = self.tree().subtree(id).iter().map(|z| z.id).collect();
        let mut outcome = DeleteOutcome::default();
        let mut dropped = HashSet::new();

        for zone in self.zones.iter_mut().filter(|z| targets.contains(&z.id)) {
            match zone.status.after_delete() {
                Some(status) => {
                    zone.status = status;
                    outcome.flagged += 1;
                }
                None => {
                    dropped.insert(zone.id);
                    outcome.removed += 1;
                }
            }
        }

        if !dropped.is_empty() {
            self.zones.retain(|z| !dropped.contains(&z.id));
            let orphaned: HashSet<EntityId> = self
                .links
                .iter()
                .filter(|l| dropped.contains(&l.zone_id))
                .map(|l| l.position_id)
                .collect();
            self.links.retain(|l| !dropped.contains(&l.zone_id));
            self.positions.retain(|p| !orphaned.contains(&p.id));
        }

        Ok(outcome)
    }

    // -- Position mutations --------------------------------------------------

    /// Stage new positions and their links under `zone_id`.
    pub(crate) fn attach_positions(&mut self, zone_id: EntityId, positions: Vec<Position>) {
        self.links.extend(
            positions
                .iter()
                .map(|p| ZonePositionLink::new_local(zone_id, p.id)),
        );
        self.positions.extend(positions);
    }

    /// Create `count` positions coded `prefix + (start + i)` in one zone.
    pub fn create_positions_manual(
        &mut self,
        zone_id: EntityId,
        prefix: &str,
        start: i32,
        count: u32,
    ) -> Result<Vec<EntityId>, CoreError> {
        validate_sequence(start, count)?;
        let zone_name = self.live_zone(zone_id)?.name.clone();
        let label = batch_label("Batch", &zone_name);
        let prefix = prefix.trim();

        let positions: Vec<Position> = (0..count)
            .map(|i| {
                let order = start + i as i32;
                Position::new_local(
                    format!("{prefix}{order}").to_uppercase(),
                    order,
                    Some(label.clone()),
                )
            })
            .collect();

        let ids = positions.iter().map(|p| p.id).collect();
        self.attach_positions(zone_id, positions);
        Ok(ids)
    }

    /// Change a position's code.
    pub fn rename_position(&mut self, id: EntityId, code: &str) -> Result<(), CoreError> {
        let code = normalize_code(code)?;
        self.live_position(id)?;

        if let Some(position) = self.positions.iter_mut().find(|p| p.id == id) {
            position.code = code;
            position.status = position.status.after_edit();
        }
        Ok(())
    }

    /// Delete one position. Session-local positions are dropped with their
    /// link; persisted ones are flagged deleted.
    pub fn delete_position(&mut self, id: EntityId) -> Result<(), CoreError> {
        let status = self.live_position(id)?.status;

        match status.after_delete() {
            Some(next) => {
                if let Some(position) = self.positions.iter_mut().find(|p| p.id == id) {
                    position.status = next;
                }
            }
            None => {
                self.positions.retain(|p| p.id != id);
                self.links.retain(|l| l.position_id != id);
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
