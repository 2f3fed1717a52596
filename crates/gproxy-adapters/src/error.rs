use gproxy_ir::ErrorIr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("malformed request body: {0}")]
    MalformedRequest(#[from] serde_json::Error),
    #[error("unsupported feature for this dialect: {0}")]
    Unsupported(String),
    #[error("upstream returned an error: {0:?}")]
    Upstream(ErrorIr),
}

pub type AdapterResult<T> = Result<T, AdapterError>;
