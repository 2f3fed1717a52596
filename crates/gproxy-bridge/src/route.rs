use gproxy_common::Vault;
use gproxy_storage::Storage;
use gproxy_storage::entities::bridge_proxy::Model as ProxyModel;
use gproxy_storage::entities::model_mapping::Model as MappingModel;
use gproxy_storage::entities::provider::Model as ProviderModel;

use crate::client::UpstreamTarget;
use crate::error::{BridgeError, BridgeResult};

/// Depth the outbound chain walk gives up at; mirrors the limit storage enforces at write time
/// so a chain that somehow bypassed that check still fails closed here.
const MAX_CHAIN_DEPTH: usize = 16;

/// A fully resolved inbound proxy: the dialect the client is speaking, the mappings that rewrite
/// the requested model, and the provider the request ultimately lands on.
pub struct ResolvedRoute {
    pub proxy: ProxyModel,
    pub mappings: Vec<MappingModel>,
    pub provider: ProviderModel,
}

/// Looks up the proxy bound to `path` and walks its outbound chain to the terminal provider,
/// decrypting that provider's API key along the way. Pool providers (`is_pool`) resolve their
/// credential per-call instead, via the oauth pool selector, so their `api_key` comes back empty.
pub async fn resolve_by_path(storage: &Storage, path: &str) -> BridgeResult<ResolvedRoute> {
    let proxy = storage
        .find_proxy_by_path(path)
        .await?
        .ok_or_else(|| BridgeError::RouteNotFound(path.to_string()))?;
    if !proxy.enabled {
        return Err(BridgeError::RouteNotFound(path.to_string()));
    }

    let mappings = storage.get_mappings(&proxy.id).await?;
    let provider = resolve_outbound(storage, &proxy.outbound_kind, &proxy.outbound_id).await?;

    Ok(ResolvedRoute {
        proxy,
        mappings,
        provider,
    })
}

async fn resolve_outbound(
    storage: &Storage,
    outbound_kind: &str,
    outbound_id: &str,
) -> BridgeResult<ProviderModel> {
    let mut kind = outbound_kind.to_string();
    let mut id = outbound_id.to_string();

    for _ in 0..MAX_CHAIN_DEPTH {
        match kind.as_str() {
            "provider" => {
                return storage
                    .get_provider(&id)
                    .await?
                    .ok_or_else(|| BridgeError::RouteNotFound(id.clone()));
            }
            "proxy" => {
                let next = storage
                    .get_proxy(&id)
                    .await?
                    .ok_or_else(|| BridgeError::RouteNotFound(id.clone()))?;
                if !next.enabled {
                    return Err(BridgeError::RouteNotFound(id));
                }
                kind = next.outbound_kind;
                id = next.outbound_id;
            }
            other => return Err(BridgeError::RouteNotFound(format!("unknown outbound kind '{other}'"))),
        }
    }

    Err(BridgeError::ChainTooDeep)
}

/// Builds the upstream target for a non-pool provider, decrypting its stored API key.
pub fn target_for_provider(provider: &ProviderModel, vault: &Vault) -> BridgeResult<UpstreamTarget> {
    let api_key = if provider.api_key_encrypted.is_empty() {
        String::new()
    } else {
        vault.decrypt(&provider.api_key_encrypted)?
    };
    Ok(UpstreamTarget {
        base_url: provider.base_url.clone(),
        chat_path: provider.chat_path.clone(),
        adapter_type: provider.adapter_type.clone(),
        api_key,
    })
}
