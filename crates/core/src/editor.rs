//! Single-writer command surface over a staging session.
//!
//! [`ZoneEditor`] owns the staged collections for one scope and routes every
//! operator command to the pure mutations in [`crate::staging`],
//! [`crate::template`] and [`crate::pattern`]. Persistence goes through
//! [`ZoneEditor::save`], which runs one reconciliation pass at a time.
//!
//! The current [`SyncPhase`] is published on a [`tokio::sync::watch`]
//! channel. Call [`ZoneEditor::subscribe_phase`] to follow it.

use std::sync::Arc;

use tokio::sync::{watch, Mutex, MutexGuard, RwLock};

use crate::config::EditorConfig;
use crate::error::CoreError;
use crate::models::{Template, TemplateNode};
use crate::pattern::{CodePattern, GenerationReport};
use crate::reconcile::{fetch_snapshot, Reconciler, SyncPhase, SyncReport};
use crate::staging::{DeleteOutcome, StagingStore};
use crate::store::WarehouseStore;
use crate::types::EntityId;

/// Editing session for one warehouse scope.
///
/// Mutations take the staging write lock, so they wait for an in-flight
/// save to finish. A second `save`, `discard` or `delete_all` while one is
/// running fails with [`CoreError::Conflict`] instead of queueing.
pub struct ZoneEditor<S: ?Sized> {
    store: Arc<S>,
    config: EditorConfig,
    staging: RwLock<StagingStore>,
    /// Saved templates, newest first.
    templates: RwLock<Vec<Template>>,
    sync_gate: Mutex<()>,
    phase: watch::Sender<SyncPhase>,
}

impl<S> ZoneEditor<S>
where
    S: WarehouseStore + ?Sized,
{
    /// Fetch the scope's zones, positions, links and templates and start a
    /// clean session.
    pub async fn load(store: Arc<S>, config: EditorConfig) -> Result<Self, CoreError> {
        let staging = fetch_snapshot(store.as_ref(), &config.scope).await?;
        let templates = store.fetch_templates(&config.scope).await?;

        tracing::info!(
            scope = %config.scope,
            zones = staging.zones().len(),
            positions = staging.positions().len(),
            templates = templates.len(),
            "Loaded zone structure",
        );

        let (phase, _) = watch::channel(SyncPhase::Idle);
        Ok(Self {
            store,
            config,
            staging: RwLock::new(staging),
            templates: RwLock::new(templates),
            sync_gate: Mutex::new(()),
            phase,
        })
    }

    pub fn scope(&self) -> &str {
        &self.config.scope
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Follow reconciliation phase changes.
    pub fn subscribe_phase(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    /// A read-only copy of the staged state.
    pub async fn snapshot(&self) -> StagingStore {
        self.staging.read().await.clone()
    }

    pub async fn has_pending_changes(&self) -> bool {
        self.staging.read().await.has_pending_changes()
    }

    // -- Zones ---------------------------------------------------------------

    pub async fn add(
        &self,
        parent_id: Option<EntityId>,
        code: &str,
        name: &str,
        count: u32,
    ) -> Result<Vec<EntityId>, CoreError> {
        self.staging
            .write()
            .await
            .add_zones(parent_id, code, name, count)
    }

    pub async fn rename(&self, id: EntityId, code: &str, name: &str) -> Result<(), CoreError> {
        self.staging.write().await.rename_zone(id, code, name)
    }

    pub async fn duplicate(&self, id: EntityId) -> Result<EntityId, CoreError> {
        self.staging.write().await.duplicate_zone(id)
    }

    pub async fn delete(&self, id: EntityId) -> Result<DeleteOutcome, CoreError> {
        let outcome = self.staging.write().await.delete_zone(id)?;
        tracing::debug!(
            zone_id = %id,
            flagged = outcome.flagged,
            removed = outcome.removed,
            "Staged zone delete"
        );
        Ok(outcome)
    }

    // -- Templates -----------------------------------------------------------

    pub async fn snapshot_template(&self, zone_id: EntityId) -> Result<TemplateNode, CoreError> {
        self.staging.read().await.snapshot_template(zone_id)
    }

    /// Capture the subtree at `zone_id` and store it as a named template.
    pub async fn save_template(&self, zone_id: EntityId, name: &str) -> Result<Template, CoreError> {
        let structure = self.snapshot_template(zone_id).await?;
        let template = Template::capture(name, structure)?;
        self.store
            .insert_template(&self.config.scope, &template)
            .await?;

        tracing::info!(
            template_id = %template.id,
            name = %template.name,
            nodes = template.structure.node_count(),
            "Saved zone template",
        );
        self.templates.write().await.insert(0, template.clone());
        Ok(template)
    }

    /// Cached templates, newest first.
    pub async fn templates(&self) -> Vec<Template> {
        self.templates.read().await.clone()
    }

    /// Reload the template list from the store.
    pub async fn refresh_templates(&self) -> Result<Vec<Template>, CoreError> {
        let fetched = self.store.fetch_templates(&self.config.scope).await?;
        *self.templates.write().await = fetched.clone();
        Ok(fetched)
    }

    pub async fn delete_template(&self, id: EntityId) -> Result<(), CoreError> {
        self.store.delete_template(id).await?;
        self.templates.write().await.retain(|t| t.id != id);
        Ok(())
    }

    pub async fn instantiate_template(
        &self,
        parent_id: Option<EntityId>,
        structure: &TemplateNode,
        root_code: &str,
        root_name: &str,
    ) -> Result<Vec<EntityId>, CoreError> {
        self.staging
            .write()
            .await
            .instantiate_template(parent_id, structure, root_code, root_name)
    }

    /// Instantiate a stored template by id.
    pub async fn instantiate_saved_template(
        &self,
        parent_id: Option<EntityId>,
        template_id: EntityId,
        root_code: &str,
        root_name: &str,
    ) -> Result<Vec<EntityId>, CoreError> {
        let structure = self
            .templates
            .read()
            .await
            .iter()
            .find(|t| t.id == template_id)
            .map(|t| t.structure.clone())
            .ok_or(CoreError::NotFound {
                entity: "template",
                id: template_id,
            })?;
        self.instantiate_template(parent_id, &structure, root_code, root_name)
            .await
    }

    // -- Positions -----------------------------------------------------------

    /// Default prefix offered for manual creation: the zone path plus `.V`.
    pub async fn default_position_prefix(&self, zone_id: EntityId) -> Result<String, CoreError> {
        let staging = self.staging.read().await;
        staging.live_zone(zone_id)?;
        Ok(staging.tree().default_position_prefix(zone_id))
    }

    pub async fn create_positions_manual(
        &self,
        zone_id: EntityId,
        prefix: &str,
        start: i32,
        count: u32,
    ) -> Result<Vec<EntityId>, CoreError> {
        self.staging
            .write()
            .await
            .create_positions_manual(zone_id, prefix, start, count)
    }

    /// Generate positions in every leaf under `zone_id`. A blank or missing
    /// `pattern` falls back to `{zone}.<suffix>{#}` with the configured
    /// suffix.
    pub async fn create_positions_auto(
        &self,
        zone_id: EntityId,
        pattern: Option<&str>,
        start: i32,
        count: u32,
    ) -> Result<GenerationReport, CoreError> {
        let pattern = CodePattern::new(pattern, &self.config.position_suffix);
        self.staging
            .write()
            .await
            .generate_positions(zone_id, &pattern, start, count)
    }

    pub async fn rename_position(&self, id: EntityId, code: &str) -> Result<(), CoreError> {
        self.staging.write().await.rename_position(id, code)
    }

    pub async fn delete_position(&self, id: EntityId) -> Result<(), CoreError> {
        self.staging.write().await.delete_position(id)
    }

    // -- Persistence ---------------------------------------------------------

    fn acquire_gate(&self) -> Result<MutexGuard<'_, ()>, CoreError> {
        self.sync_gate
            .try_lock()
            .map_err(|_| CoreError::Conflict("A save is already in progress".to_string()))
    }

    fn reconciler(&self) -> Reconciler<'_, S> {
        Reconciler::new(
            self.store.as_ref(),
            &self.config.scope,
            self.config.chunk_size,
            &self.phase,
        )
    }

    /// Push every staged change to the store and re-baseline.
    ///
    /// A clean session returns an empty report without touching the store.
    /// On failure the staged state is kept as it was; calling `save` again
    /// recomputes the plan and retries.
    pub async fn save(&self) -> Result<SyncReport, CoreError> {
        let _gate = self.acquire_gate()?;
        let mut staging = self.staging.write().await;

        if !staging.has_pending_changes() {
            tracing::debug!(scope = %self.config.scope, "Nothing to save");
            return Ok(SyncReport::default());
        }

        let (report, rebased) = self.reconciler().run(&staging).await?;
        *staging = rebased;
        Ok(report)
    }

    /// Drop every staged change and re-fetch from the store.
    pub async fn discard(&self) -> Result<(), CoreError> {
        let _gate = self.acquire_gate()?;
        let mut staging = self.staging.write().await;
        *staging = fetch_snapshot(self.store.as_ref(), &self.config.scope).await?;
        self.phase.send_replace(SyncPhase::Idle);
        tracing::info!(scope = %self.config.scope, "Discarded staged changes");
        Ok(())
    }

    /// Remove the scope's whole structure from the store.
    ///
    /// Staged edits are dropped along with it. Fails with
    /// [`CoreError::Conflict`] while any position holds stock.
    pub async fn delete_all(&self) -> Result<(), CoreError> {
        let _gate = self.acquire_gate()?;
        let mut staging = self.staging.write().await;
        *staging = self.reconciler().purge().await?;
        Ok(())
    }
}
