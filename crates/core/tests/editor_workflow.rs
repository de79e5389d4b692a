//! Integration tests for the zone editor against the in-memory store.
//!
//! Each test loads a [`ZoneEditor`] over a fresh [`MemoryStore`], stages a
//! sequence of commands, saves, and checks both the re-baselined session and
//! the store contents.

use std::sync::Arc;

use assert_matches::assert_matches;
use zonemap_core::store::{StoreCall, StoreOp};
use zonemap_core::{
    CoreError, EditorConfig, MemoryStore, StagingStatus, StagingStore, SyncPhase,
    WarehouseStore, ZoneEditor,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const SCOPE: &str = "wh-test";

async fn editor() -> (Arc<MemoryStore>, ZoneEditor<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let config = EditorConfig::default().with_scope(SCOPE);
    let editor = ZoneEditor::load(Arc::clone(&store), config)
        .await
        .expect("load should succeed");
    (store, editor)
}

/// Every zone's level matches its parent's, and no live zone hangs under a
/// deleted or missing parent.
fn assert_tree_invariant(staging: &StagingStore) {
    for zone in staging.zones() {
        match zone.parent_id {
            None => assert_eq!(zone.level, 0, "root {} must be level 0", zone.code),
            Some(pid) => {
                let parent = staging
                    .zone(pid)
                    .unwrap_or_else(|| panic!("zone {} has a missing parent", zone.code));
                assert_eq!(zone.level, parent.level + 1, "zone {}", zone.code);
                if zone.is_live() {
                    assert!(parent.is_live(), "live zone {} under deleted parent", zone.code);
                }
            }
        }
    }
}

fn codes_of(staging: &StagingStore, ids: &[zonemap_core::types::EntityId]) -> Vec<String> {
    ids.iter()
        .map(|id| staging.zone(*id).expect("zone present").code.clone())
        .collect()
}

async fn writes(store: &MemoryStore) -> Vec<StoreCall> {
    store
        .calls()
        .await
        .into_iter()
        .filter(StoreCall::is_write)
        .collect()
}

// ---------------------------------------------------------------------------
// Test: end-to-end scenario
// ---------------------------------------------------------------------------

/// A root, three numbered shelves and five positions all land in the store
/// and come back as `existing`.
#[tokio::test]
async fn build_and_save_a_small_warehouse() {
    let (store, editor) = editor().await;

    let root = editor.add(None, "A1", "Khu A", 1).await.unwrap()[0];
    let shelves = editor.add(Some(root), "A1.1", "Kệ 1", 3).await.unwrap();
    let staged = editor.snapshot().await;
    assert_eq!(codes_of(&staged, &shelves), vec!["A1.1", "A1.2", "A1.3"]);
    assert_eq!(staged.zone(shelves[2]).unwrap().name, "Kệ 3");

    let positions = editor
        .create_positions_manual(shelves[0], "V", 1, 5)
        .await
        .unwrap();
    assert_eq!(positions.len(), 5);
    assert!(editor.has_pending_changes().await);

    let report = editor.save().await.expect("save should succeed");
    assert_eq!(report.zones_inserted, 4);
    assert_eq!(report.positions_inserted, 5);
    assert_eq!(report.links_inserted, 5);
    assert!(report.warnings.is_empty());

    let synced = editor.snapshot().await;
    assert!(!synced.has_pending_changes());
    assert!(synced
        .zones()
        .iter()
        .all(|z| z.status == StagingStatus::Existing));
    let codes: Vec<_> = synced
        .positions_in_zone(shelves[0])
        .iter()
        .map(|p| p.code.clone())
        .collect();
    assert_eq!(codes, vec!["V1", "V2", "V3", "V4", "V5"]);
    assert_tree_invariant(&synced);

    assert_eq!(store.fetch_zones(SCOPE).await.unwrap().len(), 4);
    assert_eq!(store.fetch_links(SCOPE).await.unwrap().len(), 5);
    assert_eq!(editor.phase(), SyncPhase::Idle);
}

/// A second save with nothing staged does not touch the store.
#[tokio::test]
async fn clean_save_makes_no_store_calls() {
    let (store, editor) = editor().await;
    editor.add(None, "A", "A", 1).await.unwrap();
    editor.save().await.unwrap();
    store.clear_calls().await;

    let report = editor.save().await.unwrap();
    assert!(report.is_noop());
    assert!(store.calls().await.is_empty());
}

// ---------------------------------------------------------------------------
// Test: ordering and cascade
// ---------------------------------------------------------------------------

/// Zones are inserted shallowest level first and deleted deepest first.
#[tokio::test]
async fn store_calls_follow_level_order() {
    let (store, editor) = editor().await;
    let l0 = editor.add(None, "L0", "L0", 1).await.unwrap()[0];
    let l1 = editor.add(Some(l0), "L1", "L1", 1).await.unwrap()[0];
    let l2 = editor.add(Some(l1), "L2", "L2", 1).await.unwrap()[0];
    editor.save().await.unwrap();

    let inserts: Vec<_> = writes(&store)
        .await
        .into_iter()
        .filter(|c| c.op() == StoreOp::InsertZones)
        .collect();
    assert_eq!(
        inserts,
        vec![
            StoreCall::InsertZones(vec![l0]),
            StoreCall::InsertZones(vec![l1]),
            StoreCall::InsertZones(vec![l2]),
        ]
    );

    store.clear_calls().await;
    editor.delete(l0).await.unwrap();
    editor.save().await.unwrap();

    assert_eq!(
        writes(&store).await,
        vec![
            StoreCall::DeleteZones(vec![l2]),
            StoreCall::DeleteZones(vec![l1]),
            StoreCall::DeleteZones(vec![l0]),
        ]
    );
}

/// Deleting a zone removes every position and link underneath it.
#[tokio::test]
async fn zone_delete_cascades_to_positions() {
    let (store, editor) = editor().await;
    let root = editor.add(None, "NK1", "Kho 1", 1).await.unwrap()[0];
    let aisles = editor.add(Some(root), "KA", "Kệ", 2).await.unwrap();
    editor
        .create_positions_auto(root, None, 1, 4)
        .await
        .unwrap();
    editor.save().await.unwrap();
    assert_eq!(store.fetch_positions(SCOPE).await.unwrap().len(), 8);

    editor.delete(aisles[0]).await.unwrap();
    let report = editor.save().await.unwrap();
    assert_eq!(report.zones_deleted, 1);
    assert_eq!(report.positions_deleted, 4);

    let links = store.fetch_links(SCOPE).await.unwrap();
    assert_eq!(links.len(), 4);
    assert!(links.iter().all(|l| l.zone_id == aisles[1]));
    assert_eq!(store.fetch_positions(SCOPE).await.unwrap().len(), 4);
    assert_tree_invariant(&editor.snapshot().await);
}

// ---------------------------------------------------------------------------
// Test: failure handling
// ---------------------------------------------------------------------------

/// A failed run keeps the session dirty and the next save completes it.
#[tokio::test]
async fn failed_save_can_be_retried() {
    let (store, editor) = editor().await;
    let root = editor.add(None, "A", "A", 1).await.unwrap()[0];
    editor
        .create_positions_manual(root, "A.V", 1, 3)
        .await
        .unwrap();
    store.fail_next(StoreOp::InsertPositions, 1).await;

    let err = editor.save().await.unwrap_err();
    assert_matches!(
        err,
        CoreError::Persistence {
            phase: SyncPhase::Inserting,
            ..
        }
    );
    assert_eq!(editor.phase(), SyncPhase::Failed);
    assert!(editor.has_pending_changes().await);

    let report = editor.save().await.expect("retry should succeed");
    assert_eq!(report.positions_inserted, 3);
    assert_eq!(editor.phase(), SyncPhase::Idle);
    assert_eq!(store.fetch_zones(SCOPE).await.unwrap().len(), 1);
    assert_eq!(store.fetch_positions(SCOPE).await.unwrap().len(), 3);
    assert!(!editor.has_pending_changes().await);
}

/// A position holding a lot blocks the delete before anything is written.
#[tokio::test]
async fn occupied_position_blocks_zone_delete() {
    let (store, editor) = editor().await;
    let root = editor.add(None, "A", "A", 1).await.unwrap()[0];
    let ids = editor
        .create_positions_manual(root, "A.V", 1, 2)
        .await
        .unwrap();
    editor.save().await.unwrap();
    store
        .set_lot(ids[1], Some(zonemap_core::types::new_id()))
        .await;

    editor.delete(root).await.unwrap();
    store.clear_calls().await;

    let err = editor.save().await.unwrap_err();
    assert_matches!(&err, CoreError::Conflict(msg) if msg.contains("A.V2"));
    assert!(writes(&store).await.is_empty());
    assert!(editor.has_pending_changes().await);

    // Once the stock is moved out the same staged delete goes through.
    store.set_lot(ids[1], None).await;
    editor.save().await.unwrap();
    assert!(store.fetch_zones(SCOPE).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Test: templates
// ---------------------------------------------------------------------------

/// A saved template can be stamped elsewhere and removed again.
#[tokio::test]
async fn template_lifecycle() {
    let (store, editor) = editor().await;
    let root = editor.add(None, "NK1", "Kho 1", 1).await.unwrap()[0];
    let aisle = editor.add(Some(root), "KA", "Kệ A", 1).await.unwrap()[0];
    editor.add(Some(aisle), "D", "Dãy", 3).await.unwrap();

    assert_matches!(
        editor.save_template(aisle, "   ").await,
        Err(CoreError::Validation(_))
    );
    let template = editor.save_template(aisle, "Standard aisle").await.unwrap();
    assert_eq!(template.structure.node_count(), 4);
    assert_eq!(editor.templates().await.len(), 1);

    let ids = editor
        .instantiate_saved_template(Some(root), template.id, "KB", "Kệ B")
        .await
        .unwrap();
    assert_eq!(ids.len(), 4);
    let copy = editor.snapshot_template(ids[0]).await.unwrap();
    assert_eq!(copy.code, "KB");
    assert_eq!(copy.children, template.structure.children);
    assert_tree_invariant(&editor.snapshot().await);

    assert_eq!(store.fetch_templates(SCOPE).await.unwrap().len(), 1);
    editor.delete_template(template.id).await.unwrap();
    assert!(editor.templates().await.is_empty());
    assert!(editor.refresh_templates().await.unwrap().is_empty());

    assert_matches!(
        editor
            .instantiate_saved_template(Some(root), template.id, "KC", "Kệ C")
            .await,
        Err(CoreError::NotFound {
            entity: "template",
            ..
        })
    );
}

// ---------------------------------------------------------------------------
// Test: generation, discard, delete-all
// ---------------------------------------------------------------------------

/// The default pattern prefixes each code with the leaf's zone path.
#[tokio::test]
async fn auto_positions_use_zone_path() {
    let (_, editor) = editor().await;
    let nk = editor.add(None, "NK1", "Kho", 1).await.unwrap()[0];
    let ka = editor.add(Some(nk), "KA", "Kệ", 1).await.unwrap()[0];
    let d1 = editor.add(Some(ka), "D1", "Dãy", 1).await.unwrap()[0];

    assert_eq!(
        editor.default_position_prefix(d1).await.unwrap(),
        "NK1.KA.D1.V"
    );

    let report = editor.create_positions_auto(nk, None, 1, 3).await.unwrap();
    assert_eq!(report.leaf_ids, vec![d1]);
    assert_eq!(report.created, 3);

    let staged = editor.snapshot().await;
    let codes: Vec<_> = staged
        .positions_in_zone(d1)
        .iter()
        .map(|p| p.code.clone())
        .collect();
    assert_eq!(codes, vec!["NK1.KA.D1.V1", "NK1.KA.D1.V2", "NK1.KA.D1.V3"]);

    let custom = editor
        .create_positions_auto(nk, Some("{NK}.{KA}.V{#}"), 1, 1)
        .await
        .unwrap();
    assert_eq!(custom.created, 1);
    let staged = editor.snapshot().await;
    assert!(staged.positions().iter().any(|p| p.code == "NK1.KA.V1"));
}

/// Discard drops staged edits and restores the stored structure.
#[tokio::test]
async fn discard_restores_baseline() {
    let (_, editor) = editor().await;
    let root = editor.add(None, "A", "A", 1).await.unwrap()[0];
    editor.save().await.unwrap();

    editor.rename(root, "B", "B").await.unwrap();
    editor.add(Some(root), "C", "C", 2).await.unwrap();
    assert!(editor.has_pending_changes().await);

    editor.discard().await.unwrap();
    let staged = editor.snapshot().await;
    assert!(!staged.has_pending_changes());
    assert_eq!(staged.zones().len(), 1);
    assert_eq!(staged.zone(root).unwrap().code, "A");
}

/// Delete-all empties the scope unless stock is still stored.
#[tokio::test]
async fn delete_all_wipes_scope() {
    let (store, editor) = editor().await;
    let root = editor.add(None, "A", "A", 1).await.unwrap()[0];
    let child = editor.add(Some(root), "B", "B", 1).await.unwrap()[0];
    let ids = editor
        .create_positions_manual(child, "B.V", 1, 2)
        .await
        .unwrap();
    editor.save().await.unwrap();

    store
        .set_lot(ids[0], Some(zonemap_core::types::new_id()))
        .await;
    assert_matches!(editor.delete_all().await, Err(CoreError::Conflict(_)));
    assert_eq!(store.fetch_zones(SCOPE).await.unwrap().len(), 2);

    store.set_lot(ids[0], None).await;
    editor.delete_all().await.unwrap();
    assert!(store.fetch_zones(SCOPE).await.unwrap().is_empty());
    assert!(store.fetch_positions(SCOPE).await.unwrap().is_empty());
    assert!(editor.snapshot().await.zones().is_empty());
}

/// The editor also runs over a type-erased store.
#[tokio::test]
async fn editor_accepts_trait_object_store() {
    let store: Arc<dyn WarehouseStore> = Arc::new(MemoryStore::new());
    let editor = ZoneEditor::load(Arc::clone(&store), EditorConfig::default())
        .await
        .unwrap();
    editor.add(None, "A", "A", 2).await.unwrap();
    editor.save().await.unwrap();
    assert_eq!(store.fetch_zones("default").await.unwrap().len(), 2);
}
