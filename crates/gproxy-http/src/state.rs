use std::sync::Arc;

use arc_swap::ArcSwap;
use gproxy_bridge::Bridge;
use gproxy_bridge::registry::AdapterRegistry;
use gproxy_common::{GlobalConfig, Vault};
use gproxy_presets::PresetStore;
use gproxy_storage::Storage;
use gproxy_tunnel::TunnelSupervisor;

use crate::events::EventBus;
use crate::proxy_service::ProxyServiceSupervisor;
use crate::services::chat::ChatCancellations;

/// Everything a handler or service needs, cloned cheaply per request (every field is an `Arc` or
/// already `Clone`).
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub vault: Arc<Vault>,
    pub bridge: Arc<Bridge>,
    pub adapters: Arc<AdapterRegistry>,
    pub client: wreq::Client,
    pub presets: Arc<PresetStore>,
    pub tunnel: TunnelSupervisor,
    pub events: Arc<EventBus>,
    pub config: Arc<ArcSwap<GlobalConfig>>,
    pub chat_cancellations: ChatCancellations,
    pub proxy_service: ProxyServiceSupervisor,
}

impl AppState {
    pub fn admin_key_matches(&self, presented: &str) -> bool {
        let expected = &self.config.load().admin_key_hash;
        if expected.is_empty() {
            // No admin key configured yet: the admin surface is unauthenticated until one is set,
            // matching first-boot setup flows elsewhere in the codebase.
            return true;
        }
        hash_admin_key(presented) == *expected
    }
}

pub fn hash_admin_key(raw: &str) -> String {
    blake3::hash(raw.as_bytes()).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_admin_key_is_deterministic_and_key_sensitive() {
        assert_eq!(hash_admin_key("secret"), hash_admin_key("secret"));
        assert_ne!(hash_admin_key("secret"), hash_admin_key("different"));
    }
}
