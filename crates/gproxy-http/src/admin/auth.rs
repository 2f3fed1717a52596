use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode, header};
use axum::middleware::Next;
use axum::response::Response;

use crate::state::AppState;

/// Guards the entire `/admin` surface. Distinct from the tenant [`ApiKey`](gproxy_storage) table
/// used by `/v1/...` traffic: this is the single operator-held admin key the (out-of-scope) UI
/// shell authenticates with, stored only as a hash on [`gproxy_common::GlobalConfig`].
pub async fn admin_auth(State(state): State<AppState>, req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let presented = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .unwrap_or("");

    if !state.admin_key_matches(presented) {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(req).await)
}
