use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use tokio::sync::oneshot;

use crate::error::{OAuthError, OAuthResult};

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(10 * 60);

const SUCCESS_PAGE: &str = "<html><body><h1>Authorization complete</h1><p>You can close this tab.</p></body></html>";
const FAILURE_PAGE: &str = "<html><body><h1>Authorization failed</h1><p>Please try again.</p></body></html>";

#[derive(Debug, Clone)]
pub struct CallbackResult {
    pub code: String,
    pub state: Option<String>,
}

struct ListenerState {
    tx: tokio::sync::Mutex<Option<oneshot::Sender<CallbackResult>>>,
}

/// Starts a loopback listener on `port` exposing `/oauth/<provider>/callback` plus the
/// provider-specific legacy paths (`/auth/callback` for Codex, `/google/callback` for
/// Antigravity), and waits up to ten minutes for a single callback hit.
pub async fn await_authorization_code(
    port: u16,
    provider: &str,
    legacy_path: Option<&str>,
) -> OAuthResult<CallbackResult> {
    let (tx, rx) = oneshot::channel();
    let state = Arc::new(ListenerState {
        tx: tokio::sync::Mutex::new(Some(tx)),
    });

    let provider_path = format!("/oauth/{provider}/callback");
    let mut router = Router::new().route(&provider_path, get(handle_callback));
    if let Some(legacy_path) = legacy_path {
        router = router.route(legacy_path, get(handle_callback));
    }
    let router = router.with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| OAuthError::Other(format!("failed to bind loopback listener: {err}")))?;

    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    let result = tokio::time::timeout(CALLBACK_TIMEOUT, rx)
        .await
        .map_err(|_| OAuthError::Timeout)?
        .map_err(|_| OAuthError::Other("callback channel closed".to_string()))?;

    server.abort();
    Ok(result)
}

async fn handle_callback(
    State(state): State<Arc<ListenerState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Html<&'static str> {
    let code = params.get("code").cloned();
    let callback_state = params.get("state").cloned();

    let Some(code) = code else {
        return Html(FAILURE_PAGE);
    };

    let mut guard = state.tx.lock().await;
    if let Some(tx) = guard.take() {
        let _ = tx.send(CallbackResult {
            code,
            state: callback_state,
        });
        Html(SUCCESS_PAGE)
    } else {
        Html(FAILURE_PAGE)
    }
}
