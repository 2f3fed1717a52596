use gproxy_common::slug::validate_slug;
use gproxy_storage::entities::bridge_proxy::Model as ProxyModel;
use gproxy_storage::entities::model_mapping::Model as MappingModel;
use gproxy_storage::{MappingDraft, ProxyDraft, Storage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{HttpError, HttpResult};

#[derive(Debug, Deserialize)]
pub struct ProxyInput {
    pub name: String,
    pub inbound_adapter_id: String,
    pub outbound_kind: String,
    pub outbound_id: String,
    pub proxy_path: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Serialize)]
pub struct ProxyView {
    pub id: String,
    pub name: String,
    pub inbound_adapter_id: String,
    pub outbound_kind: String,
    pub outbound_id: String,
    pub proxy_path: String,
    pub enabled: bool,
    pub sort_order: i32,
}

impl From<ProxyModel> for ProxyView {
    fn from(model: ProxyModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            inbound_adapter_id: model.inbound_adapter_id,
            outbound_kind: model.outbound_kind,
            outbound_id: model.outbound_id,
            proxy_path: model.proxy_path,
            enabled: model.enabled,
            sort_order: model.sort_order,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MappingView {
    pub id: String,
    pub source_model: Option<String>,
    pub target_model: String,
    pub is_default: bool,
}

impl From<MappingModel> for MappingView {
    fn from(model: MappingModel) -> Self {
        Self {
            id: model.id,
            source_model: model.source_model,
            target_model: model.target_model,
            is_default: model.is_default,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MappingInput {
    pub source_model: Option<String>,
    pub target_model: String,
    pub is_default: bool,
}

/// Implements the `proxies: list | get | create | update | delete | toggle | validate-path |
/// check-circular | get-mappings | set-mappings` operations.
pub struct ProxyService {
    storage: Storage,
}

impl ProxyService {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub async fn list(&self) -> HttpResult<Vec<ProxyView>> {
        Ok(self.storage.list_proxies().await?.into_iter().map(ProxyView::from).collect())
    }

    pub async fn get(&self, id: &str) -> HttpResult<ProxyView> {
        Ok(self.storage.get_proxy(id).await?.ok_or_else(|| HttpError::NotFound(id.to_string()))?.into())
    }

    pub async fn create(&self, id: String, input: ProxyInput) -> HttpResult<ProxyView> {
        let draft = Self::draft_from_input(input)?;
        Ok(self.storage.create_proxy(id, draft).await?.into())
    }

    pub async fn update(&self, id: &str, input: ProxyInput) -> HttpResult<ProxyView> {
        let draft = Self::draft_from_input(input)?;
        Ok(self.storage.update_proxy(id, draft).await?.into())
    }

    pub async fn delete(&self, id: &str) -> HttpResult<()> {
        Ok(self.storage.delete_proxy(id).await?)
    }

    pub async fn toggle(&self, id: &str, enabled: bool) -> HttpResult<()> {
        Ok(self.storage.toggle_proxy(id, enabled).await?)
    }

    pub fn validate_path(&self, path: &str) -> bool {
        path.is_empty() || validate_slug(path.trim_start_matches('/')).is_ok()
    }

    /// Mirrors `Storage::check_circular_chain` for a proxy being edited in-place, before the
    /// caller commits the change via `update`.
    pub async fn check_circular(&self, id: &str, outbound_kind: &str, outbound_id: &str) -> HttpResult<bool> {
        Ok(self.storage.check_circular_chain(id, outbound_kind, outbound_id).await.is_ok())
    }

    pub async fn get_mappings(&self, proxy_id: &str) -> HttpResult<Vec<MappingView>> {
        Ok(self.storage.get_mappings(proxy_id).await?.into_iter().map(MappingView::from).collect())
    }

    pub async fn set_mappings(&self, proxy_id: &str, mappings: Vec<MappingInput>) -> HttpResult<()> {
        let drafts = mappings
            .into_iter()
            .map(|input| {
                (
                    Uuid::new_v4().to_string(),
                    MappingDraft {
                        source_model: input.source_model,
                        target_model: input.target_model,
                        is_default: input.is_default,
                    },
                )
            })
            .collect();
        Ok(self.storage.set_mappings(proxy_id, drafts).await?)
    }

    fn draft_from_input(input: ProxyInput) -> HttpResult<ProxyDraft> {
        Ok(ProxyDraft {
            name: input.name,
            inbound_adapter_id: input.inbound_adapter_id,
            outbound_kind: input.outbound_kind,
            outbound_id: input.outbound_id,
            proxy_path: input.proxy_path,
            enabled: input.enabled,
            sort_order: input.sort_order,
        })
    }
}
