pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("db error: {0}")]
    Db(#[from] sea_orm::DbErr),
    #[error("serde json error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("vault error: {0}")]
    Vault(#[from] gproxy_common::VaultError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("{0} would create a circular proxy chain")]
    CircularChain(String),
}
