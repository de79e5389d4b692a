use crate::reconcile::SyncPhase;
use crate::store::StoreError;
use crate::types::EntityId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: EntityId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A store call failed while a reconciliation run was in `phase`.
    #[error("Persistence failed during {phase}: {message}")]
    Persistence { phase: SyncPhase, message: String },

    /// A store call outside a reconciliation run (template storage) failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn persistence(phase: SyncPhase, err: impl std::fmt::Display) -> Self {
        CoreError::Persistence {
            phase,
            message: err.to_string(),
        }
    }
}
