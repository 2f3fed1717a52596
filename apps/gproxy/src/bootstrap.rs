use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwap;
use gproxy_bridge::Bridge;
use gproxy_bridge::registry::AdapterRegistry;
use gproxy_common::{GlobalConfig, GlobalConfigPatch, Vault};
use gproxy_http::events::EventBus;
use gproxy_http::services::chat::ChatCancellations;
use gproxy_http::state::AppState;
use gproxy_oauth::RefreshScheduler;
use gproxy_oauth::providers::antigravity::AntigravityTokenRefresher;
use gproxy_oauth::providers::codex::CodexTokenRefresher;
use gproxy_oauth::refresh::TokenRefresher;
use gproxy_presets::PresetStore;
use gproxy_storage::Storage;
use gproxy_tunnel::TunnelSupervisor;

use crate::cli::Cli;
use crate::data_dir::resolve_data_dir;
use crate::dsn::resolve_dsn;

const SETTING_KEY: &str = "global_config";
const DEFAULT_TUNNEL_API_BASE_URL: &str = "https://tunnel.gproxy.leenhawk.com";

pub(crate) struct Bootstrap {
    pub(crate) state: AppState,
    pub(crate) refresh_scheduler: Arc<RefreshScheduler>,
}

/// Resolves the three-way config merge, connects storage (which runs pending migrations), opens
/// the vault, and assembles every long-lived service into one [`AppState`].
pub(crate) async fn bootstrap(cli: &Cli) -> Result<Bootstrap> {
    let data_dir = resolve_data_dir(cli.data_dir.as_deref().unwrap_or(""));
    let dsn = resolve_dsn(cli.dsn.as_deref().unwrap_or(""), &data_dir)?;

    let db = gproxy_storage::db::connect_shared(&dsn).await?;
    let storage = Storage::new(db);

    let admin_key_hash = cli.admin_key.as_deref().map(gproxy_http::state::hash_admin_key);
    let global = merge_global_config(&storage, cli, &data_dir, &dsn, admin_key_hash).await?;
    storage.set_setting(SETTING_KEY, &GlobalConfigPatch::from(global.clone())).await?;

    let vault = Arc::new(match cli.vault_passphrase.as_deref() {
        Some(passphrase) => Vault::open_with_passphrase(passphrase),
        None => Vault::open(None)?,
    });

    let client = wreq::Client::new();
    let bridge = Arc::new(Bridge::new(storage.clone(), vault.clone())?);
    let adapters = Arc::new(AdapterRegistry::new());
    let presets = Arc::new(PresetStore::new(cli.presets_remote_url.clone()));
    presets.spawn_auto_update(client.clone());

    let tunnel = TunnelSupervisor::new(
        storage.clone(),
        client.clone(),
        PathBuf::from(&data_dir),
        None,
        cli.tunnel_api_base_url.clone().unwrap_or_else(|| DEFAULT_TUNNEL_API_BASE_URL.to_string()),
        global.host.clone(),
        global.port,
    );

    let events = Arc::new(EventBus::new());
    let config = Arc::new(ArcSwap::from_pointee(global));

    let refreshers = token_refreshers(client.clone());
    let refresh_scheduler = RefreshScheduler::new(storage.clone(), vault.clone(), refreshers);
    refresh_scheduler.start().await;

    let state = AppState {
        storage,
        vault,
        bridge,
        adapters,
        client,
        presets,
        tunnel,
        events,
        config,
        chat_cancellations: ChatCancellations::new(),
        proxy_service: gproxy_http::proxy_service::ProxyServiceSupervisor::new(),
    };

    Ok(Bootstrap { state, refresh_scheduler })
}

fn token_refreshers(client: wreq::Client) -> HashMap<String, Arc<dyn TokenRefresher>> {
    let mut map: HashMap<String, Arc<dyn TokenRefresher>> = HashMap::new();
    map.insert("codex".to_string(), Arc::new(CodexTokenRefresher::new(client.clone())));
    map.insert("antigravity".to_string(), Arc::new(AntigravityTokenRefresher::new(client)));
    map
}

/// Merge order: CLI/env (`cli.as_patch`) > persisted `global_config` setting row > built-in
/// defaults (`GlobalConfigPatch::into_config`'s fallbacks), matching `GlobalConfigPatch::overlay`'s
/// documented precedence.
async fn merge_global_config(
    storage: &Storage,
    cli: &Cli,
    data_dir: &str,
    dsn: &str,
    admin_key_hash: Option<String>,
) -> Result<GlobalConfig> {
    let mut merged = storage.get_setting::<GlobalConfigPatch>(SETTING_KEY).await?.unwrap_or_default();
    merged.overlay(cli.as_patch(admin_key_hash));
    if merged.dsn.is_none() {
        merged.dsn = Some(dsn.to_string());
    }
    if merged.data_dir.is_none() {
        merged.data_dir = Some(data_dir.to_string());
    }
    if merged.admin_key_hash.is_none() {
        // No admin key set yet on a fresh install: leaves the hash empty, which
        // `AppState::admin_key_matches` treats as "unauthenticated until configured".
        merged.admin_key_hash = Some(String::new());
    }
    Ok(merged.into_config()?)
}
