use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

pub type HttpResult<T> = Result<T, HttpError>;

/// The admin/API surface's single error type. Carries the IR error taxonomy's HTTP status
/// mapping (§7) so every service method converts at one boundary rather than scattering
/// `StatusCode` literals through handlers.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("storage error: {0}")]
    Storage(#[from] gproxy_storage::StorageError),
    #[error("bridge error: {0}")]
    Bridge(#[from] gproxy_bridge::BridgeError),
    #[error("oauth error: {0}")]
    OAuth(#[from] gproxy_oauth::OAuthError),
    #[error("tunnel error: {0}")]
    Tunnel(#[from] gproxy_tunnel::TunnelError),
    #[error("vault error: {0}")]
    Vault(#[from] gproxy_common::VaultError),
    #[error("adapter error: {0}")]
    Adapter(#[from] gproxy_adapters::AdapterError),
    #[error("http client error: {0}")]
    Upstream(#[from] wreq::Error),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Other(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorBodyInner,
}

#[derive(Serialize)]
struct ErrorBodyInner {
    message: String,
}

impl HttpError {
    fn status(&self) -> StatusCode {
        match self {
            HttpError::Validation(_) => StatusCode::BAD_REQUEST,
            HttpError::Unauthorized => StatusCode::UNAUTHORIZED,
            HttpError::NotFound(_) => StatusCode::NOT_FOUND,
            HttpError::Storage(gproxy_storage::StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
            HttpError::Storage(gproxy_storage::StorageError::CircularChain(_)) => StatusCode::BAD_REQUEST,
            HttpError::Bridge(gproxy_bridge::BridgeError::RouteNotFound(_)) => StatusCode::NOT_FOUND,
            HttpError::Bridge(gproxy_bridge::BridgeError::CircuitOpen(_)) => StatusCode::BAD_GATEWAY,
            HttpError::Bridge(gproxy_bridge::BridgeError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            HttpError::Bridge(gproxy_bridge::BridgeError::ClientClosed) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        if !status.is_server_error() {
            tracing::warn!(error = %self, "request rejected");
        } else {
            tracing::error!(error = %self, "request failed");
        }
        (
            status,
            Json(ErrorBody {
                error: ErrorBodyInner { message: self.to_string() },
            }),
        )
            .into_response()
    }
}
