pub type OAuthResult<T> = Result<T, OAuthError>;

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("storage error: {0}")]
    Storage(#[from] gproxy_storage::StorageError),
    #[error("vault error: {0}")]
    Vault(#[from] gproxy_common::VaultError),
    #[error("http error: {0}")]
    Http(#[from] wreq::Error),
    #[error("serde json error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("oauth state mismatch")]
    StateMismatch,
    #[error("oauth callback timed out")]
    Timeout,
    #[error("token exchange failed: {0}")]
    TokenExchange(String),
    #[error("account {0} not found")]
    AccountNotFound(String),
    #[error("no pooled account available for provider {0}")]
    PoolExhausted(String),
    #[error("{0}")]
    Other(String),
}
