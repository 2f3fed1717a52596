use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::Json;
use gproxy_oauth::providers::antigravity::AntigravityTokenRefresher;
use gproxy_oauth::providers::codex::CodexTokenRefresher;
use gproxy_oauth::refresh::TokenRefresher;
use serde::Deserialize;
use serde_json::Value;

use crate::admin::auth::admin_auth;
use crate::admin::ws::events_ws;
use crate::error::HttpResult;
use crate::services::api_key::ApiKeyService;
use crate::services::chat::ChatService;
use crate::services::config::{ConfigBundle, ConfigService, ImportStrategy};
use crate::services::logs::LogService;
use crate::services::oauth::OAuthService;
use crate::services::preset::PresetService;
use crate::services::provider::{ProviderInput, ProviderService};
use crate::services::proxy::{MappingInput, ProxyInput, ProxyService};
use crate::services::proxy_service::ProxyServiceService;
use crate::services::settings::SettingsService;
use crate::services::tunnel::TunnelService;
use crate::state::AppState;

pub fn admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/health", get(health))
        .route("/admin/global", get(get_global_config))
        .route("/admin/events/ws", get(events_ws))
        .route("/admin/providers", get(list_providers).post(create_provider))
        .route(
            "/admin/providers/{id}",
            get(get_provider).put(update_provider).delete(delete_provider),
        )
        .route("/admin/providers/{id}/toggle", post(toggle_provider))
        .route("/admin/providers/{id}/test", post(test_provider))
        .route("/admin/providers/{id}/fetch-models", post(fetch_models))
        .route("/admin/providers/generate-proxy-path", post(generate_proxy_path))
        .route("/admin/proxies", get(list_proxies).post(create_proxy))
        .route("/admin/proxies/{id}", get(get_proxy).put(update_proxy).delete(delete_proxy))
        .route("/admin/proxies/{id}/toggle", post(toggle_proxy))
        .route("/admin/proxies/{id}/mappings", get(get_mappings).put(set_mappings))
        .route("/admin/api-keys", get(list_api_keys).post(create_api_key))
        .route("/admin/api-keys/{id}", delete(delete_api_key))
        .route("/admin/api-keys/{id}/toggle", post(toggle_api_key))
        .route("/admin/api-keys/{id}/rename", post(rename_api_key))
        .route("/admin/settings", get(get_all_settings).post(set_many_settings))
        .route("/admin/settings/{key}", get(get_setting).put(set_setting))
        .route("/admin/logs", get(query_logs))
        .route("/admin/logs/export", get(export_logs))
        .route("/admin/logs/stats", get(log_stats))
        .route("/admin/logs/clear", post(clear_logs))
        .route("/admin/logs/cleanup", post(cleanup_logs))
        .route("/admin/oauth/accounts", get(list_oauth_accounts))
        .route("/admin/oauth/accounts/{id}", delete(delete_oauth_account))
        .route("/admin/oauth/authorize", post(authorize_oauth))
        .route("/admin/oauth/accounts/{id}/refresh", post(refresh_oauth_token))
        .route("/admin/oauth/accounts/{id}/toggle-pool", post(toggle_oauth_pool))
        .route("/admin/oauth/accounts/{id}/quota", post(update_oauth_quota))
        .route("/admin/tunnel/start", post(tunnel_start))
        .route("/admin/tunnel/stop", post(tunnel_stop))
        .route("/admin/tunnel/status", get(tunnel_status))
        .route("/admin/tunnel/stats", get(tunnel_stats))
        .route("/admin/tunnel/logs", get(tunnel_logs))
        .route("/admin/tunnel/system-logs", get(tunnel_system_logs))
        .route("/admin/presets/providers", get(preset_providers))
        .route("/admin/presets/adapters", get(preset_adapters))
        .route("/admin/presets/refresh", post(preset_refresh))
        .route("/admin/config/export", get(config_export))
        .route("/admin/config/import", post(config_import))
        .route("/admin/chat/conversations", get(list_conversations).post(create_conversation))
        .route(
            "/admin/chat/conversations/{id}",
            get(get_conversation).put(update_conversation).delete(delete_conversation),
        )
        .route("/admin/chat/conversations/{id}/messages", get(get_messages).post(send_message))
        .route("/admin/chat/conversations/{id}/stop", post(stop_streaming))
        .route("/admin/chat/conversations/{id}/regenerate", post(regenerate))
        .route("/admin/chat/messages/{id}", delete(delete_message))
        .route("/admin/chat/messages/{id}/pair", delete(delete_message_pair))
        .route("/admin/proxy-service/start", post(proxy_service_start))
        .route("/admin/proxy-service/stop", post(proxy_service_stop))
        .route("/admin/proxy-service/restart", post(proxy_service_restart))
        .route("/admin/proxy-service/status", get(proxy_service_status))
        .route("/admin/proxy-service/metrics", get(proxy_service_metrics))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

async fn get_global_config(State(state): State<AppState>) -> impl IntoResponse {
    Json((*state.config.load_full()).clone())
}

// --- providers ---

async fn list_providers(State(state): State<AppState>) -> HttpResult<impl IntoResponse> {
    Ok(Json(provider_service(&state).list().await?))
}

async fn get_provider(State(state): State<AppState>, Path(id): Path<String>) -> HttpResult<impl IntoResponse> {
    Ok(Json(provider_service(&state).get(&id).await?))
}

async fn create_provider(State(state): State<AppState>, Json(input): Json<ProviderInput>) -> HttpResult<impl IntoResponse> {
    let id = uuid::Uuid::new_v4().to_string();
    Ok(Json(provider_service(&state).create(id, input).await?))
}

async fn update_provider(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ProviderInput>,
) -> HttpResult<impl IntoResponse> {
    Ok(Json(provider_service(&state).update(&id, input).await?))
}

async fn delete_provider(State(state): State<AppState>, Path(id): Path<String>) -> HttpResult<impl IntoResponse> {
    provider_service(&state).delete(&id).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

#[derive(Deserialize)]
struct TogglePayload {
    enabled: bool,
}

async fn toggle_provider(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<TogglePayload>,
) -> HttpResult<impl IntoResponse> {
    provider_service(&state).toggle(&id, payload.enabled).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

async fn test_provider(State(state): State<AppState>, Path(id): Path<String>) -> HttpResult<impl IntoResponse> {
    Ok(Json(serde_json::json!({"reachable": provider_service(&state).test(&id).await?})))
}

async fn fetch_models(State(state): State<AppState>, Path(id): Path<String>) -> HttpResult<impl IntoResponse> {
    Ok(Json(provider_service(&state).fetch_models(&id).await?))
}

#[derive(Deserialize)]
struct GenerateProxyPathPayload {
    preferred: String,
}

async fn generate_proxy_path(
    State(state): State<AppState>,
    Json(payload): Json<GenerateProxyPathPayload>,
) -> HttpResult<impl IntoResponse> {
    Ok(Json(serde_json::json!({"proxyPath": provider_service(&state).generate_proxy_path(&payload.preferred).await?})))
}

fn provider_service(state: &AppState) -> ProviderService {
    ProviderService::new(state.storage.clone(), state.vault.clone(), state.client.clone())
}

// --- proxies ---

async fn list_proxies(State(state): State<AppState>) -> HttpResult<impl IntoResponse> {
    Ok(Json(ProxyService::new(state.storage.clone()).list().await?))
}

async fn get_proxy(State(state): State<AppState>, Path(id): Path<String>) -> HttpResult<impl IntoResponse> {
    Ok(Json(ProxyService::new(state.storage.clone()).get(&id).await?))
}

async fn create_proxy(State(state): State<AppState>, Json(input): Json<ProxyInput>) -> HttpResult<impl IntoResponse> {
    let id = uuid::Uuid::new_v4().to_string();
    Ok(Json(ProxyService::new(state.storage.clone()).create(id, input).await?))
}

async fn update_proxy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ProxyInput>,
) -> HttpResult<impl IntoResponse> {
    Ok(Json(ProxyService::new(state.storage.clone()).update(&id, input).await?))
}

async fn delete_proxy(State(state): State<AppState>, Path(id): Path<String>) -> HttpResult<impl IntoResponse> {
    ProxyService::new(state.storage.clone()).delete(&id).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

async fn toggle_proxy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<TogglePayload>,
) -> HttpResult<impl IntoResponse> {
    ProxyService::new(state.storage.clone()).toggle(&id, payload.enabled).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

async fn get_mappings(State(state): State<AppState>, Path(id): Path<String>) -> HttpResult<impl IntoResponse> {
    Ok(Json(ProxyService::new(state.storage.clone()).get_mappings(&id).await?))
}

async fn set_mappings(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mappings): Json<Vec<MappingInput>>,
) -> HttpResult<impl IntoResponse> {
    ProxyService::new(state.storage.clone()).set_mappings(&id, mappings).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// --- api keys ---

async fn list_api_keys(State(state): State<AppState>) -> HttpResult<impl IntoResponse> {
    Ok(Json(ApiKeyService::new(state.storage.clone()).list().await?))
}

#[derive(Deserialize)]
struct CreateApiKeyPayload {
    label: Option<String>,
}

async fn create_api_key(State(state): State<AppState>, Json(payload): Json<CreateApiKeyPayload>) -> HttpResult<impl IntoResponse> {
    Ok(Json(ApiKeyService::new(state.storage.clone()).create(payload.label).await?))
}

async fn delete_api_key(State(state): State<AppState>, Path(id): Path<String>) -> HttpResult<impl IntoResponse> {
    ApiKeyService::new(state.storage.clone()).delete(&id).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

async fn toggle_api_key(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<TogglePayload>,
) -> HttpResult<impl IntoResponse> {
    ApiKeyService::new(state.storage.clone()).toggle(&id, payload.enabled).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

async fn rename_api_key(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<CreateApiKeyPayload>,
) -> HttpResult<impl IntoResponse> {
    ApiKeyService::new(state.storage.clone()).rename(&id, payload.label).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// --- settings ---

async fn get_all_settings(State(state): State<AppState>) -> HttpResult<impl IntoResponse> {
    Ok(Json(SettingsService::new(state.storage.clone()).get_all().await?))
}

async fn set_many_settings(State(state): State<AppState>, Json(entries): Json<Vec<(String, Value)>>) -> HttpResult<impl IntoResponse> {
    SettingsService::new(state.storage.clone()).set_many(entries).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

async fn get_setting(State(state): State<AppState>, Path(key): Path<String>) -> HttpResult<impl IntoResponse> {
    Ok(Json(SettingsService::new(state.storage.clone()).get(&key).await?))
}

async fn set_setting(State(state): State<AppState>, Path(key): Path<String>, Json(value): Json<Value>) -> HttpResult<impl IntoResponse> {
    SettingsService::new(state.storage.clone()).set(&key, value).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// --- logs ---

#[derive(Deserialize, Default)]
struct LogQuery {
    #[serde(rename = "proxyId")]
    proxy_id: Option<String>,
}

async fn query_logs(State(state): State<AppState>, Query(q): Query<LogQuery>) -> HttpResult<impl IntoResponse> {
    Ok(Json(
        LogService::new(state.storage.clone())
            .query(gproxy_storage::RequestLogFilter { proxy_id: q.proxy_id, ..Default::default() })
            .await?,
    ))
}

async fn export_logs(State(state): State<AppState>, Query(q): Query<LogQuery>) -> HttpResult<impl IntoResponse> {
    Ok(Json(LogService::new(state.storage.clone()).export(q.proxy_id).await?))
}

async fn log_stats(State(state): State<AppState>, Query(q): Query<LogQuery>) -> HttpResult<impl IntoResponse> {
    Ok(Json(LogService::new(state.storage.clone()).get_stats(q.proxy_id).await?))
}

async fn clear_logs(State(state): State<AppState>) -> HttpResult<impl IntoResponse> {
    LogService::new(state.storage.clone()).clear().await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

async fn cleanup_logs(State(state): State<AppState>) -> HttpResult<impl IntoResponse> {
    Ok(Json(serde_json::json!({"removed": LogService::new(state.storage.clone()).cleanup().await?})))
}

// --- oauth ---

fn token_refreshers(client: wreq::Client) -> HashMap<String, Arc<dyn TokenRefresher>> {
    let mut map: HashMap<String, Arc<dyn TokenRefresher>> = HashMap::new();
    map.insert("codex".to_string(), Arc::new(CodexTokenRefresher::new(client.clone())));
    map.insert("antigravity".to_string(), Arc::new(AntigravityTokenRefresher::new(client)));
    map
}

fn oauth_service(state: &AppState) -> OAuthService {
    OAuthService::new(state.storage.clone(), state.vault.clone(), state.client.clone(), token_refreshers(state.client.clone()))
}

async fn list_oauth_accounts(State(state): State<AppState>) -> HttpResult<impl IntoResponse> {
    Ok(Json(oauth_service(&state).list_accounts().await?))
}

#[derive(Deserialize)]
struct AuthorizePayload {
    #[serde(rename = "providerType")]
    provider_type: String,
}

async fn authorize_oauth(State(state): State<AppState>, Json(payload): Json<AuthorizePayload>) -> HttpResult<impl IntoResponse> {
    Ok(Json(oauth_service(&state).authorize(&payload.provider_type).await?))
}

async fn delete_oauth_account(State(state): State<AppState>, Path(id): Path<String>) -> HttpResult<impl IntoResponse> {
    oauth_service(&state).delete(&id).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

async fn refresh_oauth_token(State(state): State<AppState>, Path(id): Path<String>) -> HttpResult<impl IntoResponse> {
    oauth_service(&state).refresh_token(&id).await?;
    state.events.publish(crate::events::AdminEvent::new(
        "oauth:health-changed",
        serde_json::json!({"accountId": id, "reason": "manual_refresh"}),
    ));
    Ok(Json(serde_json::json!({"ok": true})))
}

async fn toggle_oauth_pool(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<TogglePayload>,
) -> HttpResult<impl IntoResponse> {
    oauth_service(&state).toggle_pool_enabled(&id, payload.enabled).await?;
    state.events.publish(crate::events::AdminEvent::new(
        "oauth:health-changed",
        serde_json::json!({"accountId": id, "reason": "pool_toggled", "enabled": payload.enabled}),
    ));
    Ok(Json(serde_json::json!({"ok": true})))
}

#[derive(Deserialize)]
struct QuotaPayload {
    #[serde(rename = "poolWeight")]
    pool_weight: i32,
}

async fn update_oauth_quota(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<QuotaPayload>,
) -> HttpResult<impl IntoResponse> {
    oauth_service(&state).update_quota(&id, payload.pool_weight).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// --- tunnel ---

fn tunnel_service(state: &AppState) -> TunnelService {
    TunnelService::new(state.storage.clone(), state.tunnel.clone())
}

async fn tunnel_start(State(state): State<AppState>) -> HttpResult<impl IntoResponse> {
    let status = tunnel_service(&state).start().await?;
    state.events.publish(crate::events::AdminEvent::new("tunnel:status-changed", &status));
    Ok(Json(status))
}

async fn tunnel_stop(State(state): State<AppState>) -> HttpResult<impl IntoResponse> {
    let status = tunnel_service(&state).stop().await?;
    state.events.publish(crate::events::AdminEvent::new("tunnel:status-changed", &status));
    Ok(Json(status))
}

async fn tunnel_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(tunnel_service(&state).get_status())
}

async fn tunnel_stats(State(state): State<AppState>) -> HttpResult<impl IntoResponse> {
    Ok(Json(tunnel_service(&state).get_stats().await?))
}

async fn tunnel_logs(State(state): State<AppState>) -> HttpResult<impl IntoResponse> {
    Ok(Json(tunnel_service(&state).get_logs(None).await?))
}

async fn tunnel_system_logs(State(state): State<AppState>) -> HttpResult<impl IntoResponse> {
    Ok(Json(tunnel_service(&state).get_system_logs(None).await?))
}

// --- presets ---

fn preset_service(state: &AppState) -> PresetService {
    PresetService::new(state.presets.clone(), state.adapters.clone(), state.client.clone())
}

async fn preset_providers(State(state): State<AppState>) -> impl IntoResponse {
    Json(preset_service(&state).get_providers())
}

async fn preset_adapters(State(state): State<AppState>) -> impl IntoResponse {
    Json(preset_service(&state).get_adapters())
}

async fn preset_refresh(State(state): State<AppState>) -> HttpResult<impl IntoResponse> {
    preset_service(&state).refresh().await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// --- proxy-service ---

fn proxy_service_service(state: &AppState) -> ProxyServiceService {
    ProxyServiceService::new(state.proxy_service.clone())
}

async fn proxy_service_start(State(state): State<AppState>) -> impl IntoResponse {
    Json(proxy_service_service(&state).start())
}

async fn proxy_service_stop(State(state): State<AppState>) -> impl IntoResponse {
    Json(proxy_service_service(&state).stop())
}

async fn proxy_service_restart(State(state): State<AppState>) -> impl IntoResponse {
    Json(proxy_service_service(&state).restart())
}

async fn proxy_service_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(proxy_service_service(&state).status())
}

async fn proxy_service_metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(proxy_service_service(&state).metrics())
}

// --- config ---

async fn config_export(State(state): State<AppState>) -> HttpResult<impl IntoResponse> {
    Ok(Json(ConfigService::new(state.storage.clone()).export().await?))
}

#[derive(Deserialize)]
struct ConfigImportPayload {
    bundle: ConfigBundle,
    strategy: ImportStrategy,
}

async fn config_import(State(state): State<AppState>, Json(payload): Json<ConfigImportPayload>) -> HttpResult<impl IntoResponse> {
    ConfigService::new(state.storage.clone()).import(payload.bundle, payload.strategy).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// --- chat ---

fn chat_service(state: &AppState) -> HttpResult<ChatService> {
    Ok(ChatService::new(state.storage.clone(), state.vault.clone(), state.adapters.clone(), state.events.clone())?)
}

async fn list_conversations(State(state): State<AppState>) -> HttpResult<impl IntoResponse> {
    Ok(Json(chat_service(&state)?.list_conversations().await?))
}

async fn get_conversation(State(state): State<AppState>, Path(id): Path<String>) -> HttpResult<impl IntoResponse> {
    Ok(Json(chat_service(&state)?.get_conversation(&id).await?))
}

#[derive(Deserialize)]
struct CreateConversationPayload {
    title: Option<String>,
    #[serde(rename = "providerId")]
    provider_id: Option<String>,
    #[serde(rename = "proxyId")]
    proxy_id: Option<String>,
    model: String,
}

async fn create_conversation(
    State(state): State<AppState>,
    Json(payload): Json<CreateConversationPayload>,
) -> HttpResult<impl IntoResponse> {
    Ok(Json(
        chat_service(&state)?
            .create_conversation(payload.title, payload.provider_id, payload.proxy_id, payload.model)
            .await?,
    ))
}

#[derive(Deserialize)]
struct UpdateConversationPayload {
    title: Option<String>,
}

async fn update_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateConversationPayload>,
) -> HttpResult<impl IntoResponse> {
    chat_service(&state)?.update_conversation(&id, payload.title).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

async fn delete_conversation(State(state): State<AppState>, Path(id): Path<String>) -> HttpResult<impl IntoResponse> {
    chat_service(&state)?.delete_conversation(&id).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

async fn get_messages(State(state): State<AppState>, Path(id): Path<String>) -> HttpResult<impl IntoResponse> {
    Ok(Json(chat_service(&state)?.get_messages(&id).await?))
}

#[derive(Deserialize)]
struct SendMessagePayload {
    content: String,
}

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<SendMessagePayload>,
) -> HttpResult<impl IntoResponse> {
    chat_service(&state)?.send_message(&id, payload.content).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

async fn stop_streaming(State(state): State<AppState>, Path(id): Path<String>) -> HttpResult<impl IntoResponse> {
    let stopped = chat_service(&state)?.stop_streaming(&id);
    Ok(Json(serde_json::json!({"stopped": stopped})))
}

async fn regenerate(State(state): State<AppState>, Path(id): Path<String>) -> HttpResult<impl IntoResponse> {
    chat_service(&state)?.regenerate(&id).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

async fn delete_message(State(state): State<AppState>, Path(id): Path<String>) -> HttpResult<impl IntoResponse> {
    chat_service(&state)?.delete_message(&id).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}

async fn delete_message_pair(State(state): State<AppState>, Path(id): Path<String>) -> HttpResult<impl IntoResponse> {
    chat_service(&state)?.delete_message_pair(&id).await?;
    Ok(Json(serde_json::json!({"ok": true})))
}
