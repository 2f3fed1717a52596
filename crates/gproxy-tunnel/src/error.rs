pub type TunnelResult<T> = Result<T, TunnelError>;

#[derive(Debug, thiserror::Error)]
pub enum TunnelError {
    #[error("storage error: {0}")]
    Storage(#[from] gproxy_storage::StorageError),
    #[error("http error: {0}")]
    Http(#[from] wreq::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no helper binary available for this platform")]
    UnsupportedPlatform,
    #[error("helper binary not found and auto-download is disabled")]
    HelperMissing,
    #[error("helper registration timed out after {0}s")]
    RegistrationTimeout(u64),
    #[error("tunnel api returned status {0}: {1}")]
    ApiStatus(u16, String),
    #[error("tunnel is not active")]
    NotActive,
    #[error("tunnel is already {0}")]
    AlreadyInState(&'static str),
    #[error("{0}")]
    Other(String),
}
