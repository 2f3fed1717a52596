use std::convert::Infallible;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, post};
use bytes::Bytes;
use futures_util::StreamExt;
use gproxy_bridge::PipelineResponse;

use crate::error::{HttpError, HttpResult};
use crate::heartbeat::wrap_with_heartbeat;
use crate::state::AppState;

const SSE_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Routes a tenant client speaks to: the aggregate `/v1/...` paths (bound to the proxy whose
/// `proxy_path` is empty), the per-proxy `/<proxyPath>/v1/...` paths, and per-provider
/// passthrough paths that mount the upstream verbatim under a slug.
pub fn proxy_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(aggregate_handler))
        .route("/v1/responses", post(aggregate_handler))
        .route("/v1/messages", post(aggregate_handler))
        .route("/{*proxy_path_and_rest}", any(routed_handler))
        .layer(middleware::from_fn_with_state(state.clone(), tenant_auth))
        .layer(middleware::from_fn_with_state(state.clone(), proxy_service_gate))
        .with_state(state)
}

/// Gates the whole tenant-facing surface on the admin-controlled proxy-service switch, answering
/// 503 while stopped, and records every admitted request's outcome for `proxy-service: metrics`.
async fn proxy_service_gate(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    if !state.proxy_service.is_running() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    let response = next.run(req).await;
    state.proxy_service.record_request(response.status().as_u16());
    response
}

async fn tenant_auth(State(state): State<AppState>, mut req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let required = state
        .storage
        .get_setting::<bool>("security.unifiedApiKey.enabled")
        .await
        .ok()
        .flatten()
        .unwrap_or(false);

    if required {
        let presented = extract_bearer(req.headers());
        let Some(presented) = presented else {
            return Err(StatusCode::UNAUTHORIZED);
        };
        match state.storage.find_api_key_by_value(&presented).await {
            Ok(Some(key)) if key.enabled => {
                let _ = state.storage.touch_api_key(&key.id).await;
            }
            _ => return Err(StatusCode::UNAUTHORIZED),
        }
    }

    req.extensions_mut().insert(());
    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|value| value.trim().to_string())
}

async fn aggregate_handler(State(state): State<AppState>, body: Bytes) -> HttpResult<Response> {
    bridge_response(&state, "", &body).await
}

/// Splits `/<segment>/...` and first tries it as a proxy path; if no proxy owns that path, falls
/// back to a provider passthrough slug, forwarding the request verbatim with no dialect
/// translation (the defining trait of a passthrough mount).
async fn routed_handler(
    State(state): State<AppState>,
    Path(proxy_path_and_rest): Path<String>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> HttpResult<Response> {
    let full_path = format!("/{proxy_path_and_rest}");
    if let Some((prefix, _rest)) = split_known_suffix(&full_path) {
        if state.storage.find_proxy_by_path(prefix).await?.is_some() {
            return bridge_response(&state, prefix, &body).await;
        }
    }

    let Some((slug, rest)) = full_path.strip_prefix('/').and_then(|p| p.split_once('/')) else {
        return Err(HttpError::NotFound(full_path));
    };
    let provider = state
        .storage
        .find_provider_by_passthrough_slug(slug)
        .await?
        .filter(|provider| provider.passthrough && provider.enabled)
        .ok_or_else(|| HttpError::NotFound(full_path.clone()))?;

    passthrough(&state, &provider, rest, method, headers, body).await
}

/// Recognizes the well-known suffixes a bridged proxy serves, so `/<proxyPath>/v1/chat/
/// completions` is distinguished from `/<slug>/<anything>` passthrough mounts.
fn split_known_suffix(path: &str) -> Option<(&str, &str)> {
    for suffix in ["/v1/chat/completions", "/v1/responses", "/v1/messages"] {
        if let Some(prefix) = path.strip_suffix(suffix) {
            return Some((prefix, suffix));
        }
    }
    None
}

async fn bridge_response(state: &AppState, proxy_path: &str, body: &[u8]) -> HttpResult<Response> {
    let response = state.bridge.handle(proxy_path, body).await?;
    Ok(to_axum_response(response))
}

fn to_axum_response(response: PipelineResponse) -> Response {
    match response {
        PipelineResponse::Once { status, body } => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            (status, body).into_response()
        }
        PipelineResponse::Stream { status, body } => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            let body = wrap_with_heartbeat(body, SSE_HEARTBEAT_INTERVAL);
            let body = Body::from_stream(body.map(|chunk| chunk.map_err(|err| -> Infallible {
                tracing::error!(error = %err, "streaming chunk error reached body sink");
                unreachable!("axum stream body errors are infallible by construction")
            })));
            let mut builder = Response::builder()
                .status(status)
                .header(header::CONTENT_TYPE, "text/event-stream")
                .header(header::CACHE_CONTROL, "no-cache")
                .header(HeaderName::from_static("x-accel-buffering"), HeaderValue::from_static("no"));
            builder.body(body).unwrap_or_else(|_| {
                (StatusCode::INTERNAL_SERVER_ERROR, "response_build_failed").into_response()
            })
        }
    }
}

async fn passthrough(
    state: &AppState,
    provider: &gproxy_storage::entities::provider::Model,
    rest: &str,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> HttpResult<Response> {
    let api_key = if provider.api_key_encrypted.is_empty() {
        String::new()
    } else {
        state.vault.decrypt(&provider.api_key_encrypted)?
    };
    let url = format!("{}/{}", provider.base_url.trim_end_matches('/'), rest.trim_start_matches('/'));

    let mut builder = state.client.request(method, &url).body(body.to_vec());
    for (name, value) in headers.iter() {
        if is_hop_by_hop(name.as_str()) || name.as_str().eq_ignore_ascii_case(header::HOST.as_str()) {
            continue;
        }
        if let Ok(value) = value.to_str() {
            builder = builder.header(name.as_str(), value);
        }
    }
    if !api_key.is_empty() {
        builder = builder.header("authorization", format!("Bearer {api_key}"));
    }

    let upstream = builder.send().await?;
    let status = StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let bytes = upstream.bytes().await?;
    Ok((status, bytes).into_response())
}

fn is_hop_by_hop(name: &str) -> bool {
    name.eq_ignore_ascii_case("content-length")
        || name.eq_ignore_ascii_case("transfer-encoding")
        || name.eq_ignore_ascii_case("connection")
        || name.eq_ignore_ascii_case("keep-alive")
}
