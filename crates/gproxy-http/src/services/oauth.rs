use std::collections::HashMap;
use std::sync::Arc;

use gproxy_common::Vault;
use gproxy_oauth::flow;
use gproxy_oauth::refresh::TokenRefresher;
use gproxy_storage::entities::oauth_account::Model as OAuthAccountModel;
use gproxy_storage::Storage;
use serde::Serialize;
use time::OffsetDateTime;

use crate::error::{HttpError, HttpResult};

#[derive(Debug, Serialize)]
pub struct OAuthAccountView {
    pub id: String,
    pub provider_type: String,
    pub email: String,
    pub is_active: bool,
    pub health_status: String,
    pub consecutive_failures: i32,
    pub error_message: Option<String>,
    pub pool_enabled: bool,
    pub pool_weight: i32,
    pub last_used_at: Option<OffsetDateTime>,
    pub last_refresh_at: Option<OffsetDateTime>,
}

impl From<OAuthAccountModel> for OAuthAccountView {
    fn from(model: OAuthAccountModel) -> Self {
        Self {
            id: model.id,
            provider_type: model.provider_type,
            email: model.email,
            is_active: model.is_active,
            health_status: model.health_status,
            consecutive_failures: model.consecutive_failures,
            error_message: model.error_message,
            pool_enabled: model.pool_enabled,
            pool_weight: model.pool_weight,
            last_used_at: model.last_used_at,
            last_refresh_at: model.last_refresh_at,
        }
    }
}

/// Implements `oauth: list-accounts | authorize | delete | refresh-token | toggle-pool-enabled |
/// update-quota | get-account-stats`.
pub struct OAuthService {
    storage: Storage,
    vault: Arc<Vault>,
    client: wreq::Client,
    refreshers: HashMap<String, Arc<dyn TokenRefresher>>,
}

impl OAuthService {
    pub fn new(
        storage: Storage,
        vault: Arc<Vault>,
        client: wreq::Client,
        refreshers: HashMap<String, Arc<dyn TokenRefresher>>,
    ) -> Self {
        Self { storage, vault, client, refreshers }
    }

    pub async fn list_accounts(&self) -> HttpResult<Vec<OAuthAccountView>> {
        Ok(self.storage.list_oauth_accounts().await?.into_iter().map(OAuthAccountView::from).collect())
    }

    /// Drives the full authorization-code round trip (opens the system browser, waits up to
    /// 10 minutes on the loopback callback listener) and persists the resulting account.
    pub async fn authorize(&self, provider_type: &str) -> HttpResult<OAuthAccountView> {
        let (id, _email) = flow::authorize(&self.storage, &self.vault, &self.client, provider_type).await?;
        self.storage.get_oauth_account(&id).await?.map(Into::into).ok_or_else(|| HttpError::NotFound(id))
    }

    pub async fn delete(&self, id: &str) -> HttpResult<()> {
        Ok(self.storage.delete_oauth_account(id).await?)
    }

    /// Forces an immediate refresh outside the scheduler's own timer, for an operator-triggered
    /// "refresh now" action. Provider-specific refresh implementations are selected by the
    /// account's `provider_type`.
    pub async fn refresh_token(&self, id: &str) -> HttpResult<()> {
        let account = self.storage.get_oauth_account(id).await?.ok_or_else(|| HttpError::NotFound(id.to_string()))?;
        let refresher = self
            .refreshers
            .get(&account.provider_type)
            .ok_or_else(|| HttpError::Validation(format!("no refresher registered for {}", account.provider_type)))?;
        let refresh_token = self.vault.decrypt(&account.refresh_token_encrypted)?;
        let refreshed = refresher.refresh(&refresh_token).await?;
        self.storage
            .record_token_refresh(
                id,
                self.vault.encrypt(&refreshed.access_token)?,
                self.vault.encrypt(&refreshed.refresh_token)?,
                refreshed.expires_at,
            )
            .await?;
        Ok(())
    }

    pub async fn toggle_pool_enabled(&self, id: &str, enabled: bool) -> HttpResult<()> {
        Ok(self.storage.toggle_oauth_pool_enabled(id, enabled).await?)
    }

    pub async fn update_quota(&self, id: &str, pool_weight: i32) -> HttpResult<()> {
        Ok(self.storage.update_oauth_quota(id, pool_weight).await?)
    }

    pub async fn get_account_stats(&self, id: &str) -> HttpResult<OAuthAccountView> {
        self.storage.get_oauth_account(id).await?.map(Into::into).ok_or_else(|| HttpError::NotFound(id.to_string()))
    }
}
