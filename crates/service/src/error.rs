use opsdeck_core::error::CoreError;
use opsdeck_core::types::ScriptId;
use opsdeck_store::StoreError;

/// Service-level error type for the operation surface.
///
/// Only `NotFound` signals a caller-side request error; everything the
/// orchestrator treats as an operational outcome is folded into the
/// returned report instead of surfacing here.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: ScriptId },

    /// A domain-level error from `opsdeck_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A persistence error from the catalog store.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience type alias for orchestrator return values.
pub type ServiceResult<T> = Result<T, ServiceError>;
