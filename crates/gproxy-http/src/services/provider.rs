use std::time::Duration;

use gproxy_common::Vault;
use gproxy_common::slug::{ensure_unique_slug, validate_slug};
use gproxy_storage::entities::provider::Model as ProviderModel;
use gproxy_storage::{ProviderDraft, Storage};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{HttpError, HttpResult};

const MODEL_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
pub struct ProviderInput {
    pub display_name: String,
    pub adapter_type: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_path: String,
    pub models_path: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub sort_order: i32,
    pub logo: Option<String>,
    pub color: Option<String>,
    #[serde(default)]
    pub passthrough: bool,
    pub passthrough_slug: Option<String>,
    #[serde(default)]
    pub is_pool: bool,
    pub pool_strategy: Option<String>,
    pub oauth_account_id: Option<String>,
    pub oauth_provider_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProviderView {
    pub id: String,
    pub display_name: String,
    pub adapter_type: String,
    pub has_api_key: bool,
    pub base_url: String,
    pub chat_path: String,
    pub models_path: String,
    pub cached_model_ids: Vec<String>,
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

impl From<ProviderModel> for ProviderView {
    fn from(model: ProviderModel) -> Self {
        let cached_model_ids = serde_json::from_value(model.cached_model_ids_json).unwrap_or_default();
        Self {
            id: model.id,
            display_name: model.display_name,
            adapter_type: model.adapter_type,
            has_api_key: !model.api_key_encrypted.is_empty(),
            base_url: model.base_url,
            chat_path: model.chat_path,
            models_path: model.models_path,
            cached_model_ids,
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
        }
    }
}

/// Implements the `providers: list | get | create | update | delete | toggle | test |
/// fetch-models | fetch-models-oauth | validate-proxy-path | generate-proxy-path` operations.
pub struct ProviderService {
    storage: Storage,
    vault: Arc<Vault>,
    client: wreq::Client,
}

impl ProviderService {
    pub fn new(storage: Storage, vault: Arc<Vault>, client: wreq::Client) -> Self {
        Self { storage, vault, client }
    }

    pub async fn list(&self) -> HttpResult<Vec<ProviderView>> {
        Ok(self.storage.list_providers().await?.into_iter().map(ProviderView::from).collect())
    }

    pub async fn get(&self, id: &str) -> HttpResult<ProviderView> {
        let model = self.storage.get_provider(id).await?.ok_or_else(|| HttpError::NotFound(id.to_string()))?;
        Ok(model.into())
    }

    pub async fn create(&self, id: String, input: ProviderInput) -> HttpResult<ProviderView> {
        let draft = self.draft_from_input(input)?;
        Ok(self.storage.create_provider(id, draft).await?.into())
    }

    pub async fn update(&self, id: &str, input: ProviderInput) -> HttpResult<ProviderView> {
        let draft = self.draft_from_input(input)?;
        Ok(self.storage.update_provider(id, draft).await?.into())
    }

    pub async fn delete(&self, id: &str) -> HttpResult<()> {
        Ok(self.storage.delete_provider(id).await?)
    }

    pub async fn toggle(&self, id: &str, enabled: bool) -> HttpResult<()> {
        Ok(self.storage.toggle_provider(id, enabled).await?)
    }

    /// Probes the provider's `models_path` to confirm the base URL and credential are reachable,
    /// within the 10s model-listing probe budget (§5).
    pub async fn test(&self, id: &str) -> HttpResult<bool> {
        let model = self.storage.get_provider(id).await?.ok_or_else(|| HttpError::NotFound(id.to_string()))?;
        let fetched = self.fetch_models_inner(&model).await;
        Ok(fetched.is_ok())
    }

    pub async fn fetch_models(&self, id: &str) -> HttpResult<Vec<String>> {
        let model = self.storage.get_provider(id).await?.ok_or_else(|| HttpError::NotFound(id.to_string()))?;
        let ids = self.fetch_models_inner(&model).await?;
        self.storage.set_provider_cached_models(id, ids.clone()).await?;
        Ok(ids)
    }

    /// Like [`Self::fetch_models`] but authenticates with an already-resolved OAuth access token
    /// rather than the provider's own stored API key, for pool providers probing on behalf of a
    /// specific account.
    pub async fn fetch_models_oauth(&self, id: &str, access_token: &str) -> HttpResult<Vec<String>> {
        let model = self.storage.get_provider(id).await?.ok_or_else(|| HttpError::NotFound(id.to_string()))?;
        let url = format!("{}{}", model.base_url.trim_end_matches('/'), model.models_path);
        let ids = self.probe_models(&url, access_token).await?;
        self.storage.set_provider_cached_models(id, ids.clone()).await?;
        Ok(ids)
    }

    async fn fetch_models_inner(&self, model: &ProviderModel) -> HttpResult<Vec<String>> {
        let url = format!("{}{}", model.base_url.trim_end_matches('/'), model.models_path);
        let api_key = if model.api_key_encrypted.is_empty() {
            String::new()
        } else {
            self.vault.decrypt(&model.api_key_encrypted)?
        };
        self.probe_models(&url, &api_key).await
    }

    async fn probe_models(&self, url: &str, api_key: &str) -> HttpResult<Vec<String>> {
        let mut builder = self.client.get(url);
        if !api_key.is_empty() {
            builder = builder.header("authorization", format!("Bearer {api_key}"));
        }
        let response = tokio::time::timeout(MODEL_PROBE_TIMEOUT, builder.send())
            .await
            .map_err(|_| HttpError::Other("model probe timed out".to_string()))??;
        let bytes = response.bytes().await?;
        let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(|err| HttpError::Other(err.to_string()))?;
        Ok(extract_model_ids(&value))
    }

    pub fn validate_proxy_path(&self, path: &str) -> bool {
        validate_slug(path.trim_start_matches('/')).is_ok()
    }

    pub async fn generate_proxy_path(&self, preferred: &str) -> HttpResult<String> {
        let existing: HashSet<String> = self
            .storage
            .list_proxies()
            .await?
            .into_iter()
            .map(|proxy| proxy.proxy_path.trim_start_matches('/').to_string())
            .collect();
        Ok(ensure_unique_slug(preferred, &existing))
    }

    fn draft_from_input(&self, input: ProviderInput) -> HttpResult<ProviderDraft> {
        let api_key_encrypted = match input.api_key {
            Some(key) if !key.is_empty() => self.vault.encrypt(&key)?,
            _ => String::new(),
        };
        Ok(ProviderDraft {
            display_name: input.display_name,
            adapter_type: input.adapter_type,
            api_key_encrypted,
            base_url: input.base_url,
            chat_path: input.chat_path,
            models_path: input.models_path,
            enabled: input.enabled,
            sort_order: input.sort_order,
            logo: input.logo,
            color: input.color,
            passthrough: input.passthrough,
            passthrough_slug: input.passthrough_slug,
            is_pool: input.is_pool,
            pool_strategy: input.pool_strategy,
            oauth_account_id: input.oauth_account_id,
            oauth_provider_type: input.oauth_provider_type,
        })
    }
}

fn extract_model_ids(value: &serde_json::Value) -> Vec<String> {
    // OpenAI-shaped `{"data": [{"id": "..."}]}` and Gemini-shaped `{"models": [{"name": "..."}]}`
    // cover the adapters this proxy ships; anything else yields no cached models.
    if let Some(data) = value.get("data").and_then(|v| v.as_array()) {
        return data.iter().filter_map(|entry| entry.get("id").and_then(|v| v.as_str()).map(str::to_string)).collect();
    }
    if let Some(models) = value.get("models").and_then(|v| v.as_array()) {
        return models.iter().filter_map(|entry| entry.get("name").and_then(|v| v.as_str()).map(str::to_string)).collect();
    }
    Vec::new()
}
