use sea_orm::DbErr;
use thiserror::Error;

/// Errors surfaced by the storage layer and the todo store.
///
/// Validation problems (blank titles, unknown ids) are not errors: the
/// mutations treat them as no-ops.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Db(#[from] DbErr),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
