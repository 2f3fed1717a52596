use gproxy_storage::{MappingDraft, ProviderDraft, ProxyDraft, Storage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::HttpResult;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStrategy {
    /// Leaves an existing row with the same id untouched.
    Skip,
    /// Replaces an existing row with the same id wholesale.
    Overwrite,
    /// Inserts rows whose id is absent; existing rows are left untouched (distinct from
    /// `Overwrite` only in that it never clobbers a pre-existing id).
    Merge,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderExport {
    pub id: String,
    pub display_name: String,
    pub adapter_type: String,
    pub api_key_encrypted: String,
    pub base_url: String,
    pub chat_path: String,
    pub models_path: String,
    pub enabled: bool,
    pub sort_order: i32,
    pub logo: Option<String>,
    pub color: Option<String>,
    pub passthrough: bool,
    pub passthrough_slug: Option<String>,
    pub is_pool: bool,
    pub pool_strategy: Option<String>,
    pub oauth_account_id: Option<String>,
    pub oauth_provider_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProxyExport {
    pub id: String,
    pub name: String,
    pub inbound_adapter_id: String,
    pub outbound_kind: String,
    pub outbound_id: String,
    pub proxy_path: String,
    pub enabled: bool,
    pub sort_order: i32,
    pub mappings: Vec<MappingExport>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MappingExport {
    pub source_model: Option<String>,
    pub target_model: String,
    pub is_default: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigBundle {
    pub providers: Vec<ProviderExport>,
    pub proxies: Vec<ProxyExport>,
    pub settings: Vec<(String, Value)>,
}

/// Implements `config: export | import(filePath, strategy)`. The actual file read/write is the
/// caller's concern (the admin transport layer); this service works on the in-memory bundle.
pub struct ConfigService {
    storage: Storage,
}

impl ConfigService {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub async fn export(&self) -> HttpResult<ConfigBundle> {
        let providers = self
            .storage
            .list_providers()
            .await?
            .into_iter()
            .map(|model| ProviderExport {
                id: model.id,
                display_name: model.display_name,
                adapter_type: model.adapter_type,
                api_key_encrypted: model.api_key_encrypted,
                base_url: model.base_url,
                chat_path: model.chat_path,
                models_path: model.models_path,
                enabled: model.enabled,
                sort_order: model.sort_order,
                logo: model.logo,
                color: model.color,
                passthrough: model.passthrough,
                passthrough_slug: model.passthrough_slug,
                is_pool: model.is_pool,
                pool_strategy: model.pool_strategy,
                oauth_account_id: model.oauth_account_id,
                oauth_provider_type: model.oauth_provider_type,
            })
            .collect();

        let mut proxies = Vec::new();
        for proxy in self.storage.list_proxies().await? {
            let mappings = self
                .storage
                .get_mappings(&proxy.id)
                .await?
                .into_iter()
                .map(|mapping| MappingExport {
                    source_model: mapping.source_model,
                    target_model: mapping.target_model,
                    is_default: mapping.is_default,
                })
                .collect();
            proxies.push(ProxyExport {
                id: proxy.id,
                name: proxy.name,
                inbound_adapter_id: proxy.inbound_adapter_id,
                outbound_kind: proxy.outbound_kind,
                outbound_id: proxy.outbound_id,
                proxy_path: proxy.proxy_path,
                enabled: proxy.enabled,
                sort_order: proxy.sort_order,
                mappings,
            });
        }

        let settings = self.storage.get_all_settings().await?;

        Ok(ConfigBundle { providers, proxies, settings })
    }

    /// Applies `bundle` per `strategy`. Each entity write commits independently (the storage
    /// layer exposes no cross-domain transaction handle); a failure partway through leaves
    /// earlier writes in place rather than rolling back the whole import.
    pub async fn import(&self, bundle: ConfigBundle, strategy: ImportStrategy) -> HttpResult<()> {
        for provider in bundle.providers {
            let exists = self.storage.get_provider(&provider.id).await?.is_some();
            if exists && matches!(strategy, ImportStrategy::Skip | ImportStrategy::Merge) {
                continue;
            }
            let draft = ProviderDraft {
                display_name: provider.display_name,
                adapter_type: provider.adapter_type,
                api_key_encrypted: provider.api_key_encrypted,
                base_url: provider.base_url,
                chat_path: provider.chat_path,
                models_path: provider.models_path,
                enabled: provider.enabled,
                sort_order: provider.sort_order,
                logo: provider.logo,
                color: provider.color,
                passthrough: provider.passthrough,
                passthrough_slug: provider.passthrough_slug,
                is_pool: provider.is_pool,
                pool_strategy: provider.pool_strategy,
                oauth_account_id: provider.oauth_account_id,
                oauth_provider_type: provider.oauth_provider_type,
            };
            if exists {
                self.storage.update_provider(&provider.id, draft).await?;
            } else {
                self.storage.create_provider(provider.id, draft).await?;
            }
        }

        for proxy in bundle.proxies {
            let exists = self.storage.get_proxy(&proxy.id).await?.is_some();
            if exists && matches!(strategy, ImportStrategy::Skip | ImportStrategy::Merge) {
                continue;
            }
            let draft = ProxyDraft {
                name: proxy.name,
                inbound_adapter_id: proxy.inbound_adapter_id,
                outbound_kind: proxy.outbound_kind,
                outbound_id: proxy.outbound_id,
                proxy_path: proxy.proxy_path,
                enabled: proxy.enabled,
                sort_order: proxy.sort_order,
            };
            let id = proxy.id.clone();
            if exists {
                self.storage.update_proxy(&id, draft).await?;
            } else {
                self.storage.create_proxy(id.clone(), draft).await?;
            }
            let mappings = proxy
                .mappings
                .into_iter()
                .map(|mapping| {
                    (
                        Uuid::new_v4().to_string(),
                        MappingDraft {
                            source_model: mapping.source_model,
                            target_model: mapping.target_model,
                            is_default: mapping.is_default,
                        },
                    )
                })
                .collect();
            self.storage.set_mappings(&id, mappings).await?;
        }

        for (key, value) in bundle.settings {
            let exists = self.storage.get_setting_raw(&key).await?.is_some();
            if exists && matches!(strategy, ImportStrategy::Skip | ImportStrategy::Merge) {
                continue;
            }
            self.storage.set_setting(&key, &value).await?;
        }

        Ok(())
    }
}
