pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("storage error: {0}")]
    Storage(#[from] gproxy_storage::StorageError),
    #[error("oauth error: {0}")]
    OAuth(#[from] gproxy_oauth::OAuthError),
    #[error("vault error: {0}")]
    Vault(#[from] gproxy_common::VaultError),
    #[error("adapter error: {0}")]
    Adapter(#[from] gproxy_adapters::AdapterError),
    #[error("http error: {0}")]
    Http(#[from] wreq::Error),
    #[error("route not found: {0}")]
    RouteNotFound(String),
    #[error("proxy chain would exceed the maximum outbound depth")]
    ChainTooDeep,
    #[error("circuit open for {0}")]
    CircuitOpen(String),
    #[error("upstream request timed out")]
    Timeout,
    #[error("client disconnected")]
    ClientClosed,
    #[error("{0}")]
    Other(String),
}
