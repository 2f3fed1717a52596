pub type PresetResult<T> = Result<T, PresetError>;

#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("http error: {0}")]
    Http(#[from] wreq::Error),
    #[error("remote catalog returned status {0}")]
    RemoteStatus(u16),
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
}
