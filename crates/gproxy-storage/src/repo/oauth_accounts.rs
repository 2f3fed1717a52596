use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use time::OffsetDateTime;

use crate::entities::oauth_account::{ActiveModel, Column, Entity, Model};
use crate::error::{StorageError, StorageResult};

use super::Storage;

#[derive(Debug, Clone)]
pub struct OAuthAccountDraft {
    pub provider_type: String,
    pub email: String,
    pub access_token_encrypted: String,
    pub refresh_token_encrypted: String,
    pub expires_at: OffsetDateTime,
    pub token_type: String,
    pub pool_enabled: bool,
    pub pool_weight: i32,
    pub metadata_json: serde_json::Value,
}

impl Storage {
    pub async fn list_oauth_accounts(&self) -> StorageResult<Vec<Model>> {
        Ok(Entity::find()
            .order_by_asc(Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn list_pooled_oauth_accounts(
        &self,
        provider_type: &str,
    ) -> StorageResult<Vec<Model>> {
        Ok(Entity::find()
            .filter(Column::ProviderType.eq(provider_type))
            .filter(Column::PoolEnabled.eq(true))
            .filter(Column::IsActive.eq(true))
            .all(&self.db)
            .await?)
    }

    pub async fn get_oauth_account(&self, id: &str) -> StorageResult<Option<Model>> {
        Ok(Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn create_oauth_account(
        &self,
        id: String,
        draft: OAuthAccountDraft,
    ) -> StorageResult<Model> {
        let now = OffsetDateTime::now_utc();
        let model = ActiveModel {
            id: Set(id),
            provider_type: Set(draft.provider_type),
            email: Set(draft.email),
            access_token_encrypted: Set(draft.access_token_encrypted),
            refresh_token_encrypted: Set(draft.refresh_token_encrypted),
            expires_at: Set(draft.expires_at),
            token_type: Set(draft.token_type),
            is_active: Set(true),
            health_status: Set("active".to_string()),
            consecutive_failures: Set(0),
            error_message: Set(None),
            pool_enabled: Set(draft.pool_enabled),
            pool_weight: Set(draft.pool_weight),
            last_used_at: Set(None),
            last_refresh_at: Set(Some(now)),
            metadata_json: Set(draft.metadata_json),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(model.insert(&self.db).await?)
    }

    /// Persists a refreshed token pair and clears any failure state, restoring the `active`
    /// health status per the account's documented invariants.
    pub async fn record_token_refresh(
        &self,
        id: &str,
        access_token_encrypted: String,
        refresh_token_encrypted: String,
        expires_at: OffsetDateTime,
    ) -> StorageResult<()> {
        let existing = self
            .get_oauth_account(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("oauth account {id}")))?;
        let mut model: ActiveModel = existing.into();
        let now = OffsetDateTime::now_utc();
        model.access_token_encrypted = Set(access_token_encrypted);
        model.refresh_token_encrypted = Set(refresh_token_encrypted);
        model.expires_at = Set(expires_at);
        model.health_status = Set("active".to_string());
        model.is_active = Set(true);
        model.consecutive_failures = Set(0);
        model.error_message = Set(None);
        model.last_refresh_at = Set(Some(now));
        model.updated_at = Set(now);
        model.update(&self.db).await?;
        Ok(())
    }

    /// Applies the health transition resulting from an upstream failure: advances
    /// `consecutive_failures`, sets `health_status`, and deactivates once the failure threshold
    /// or a terminal status (`expired`/`forbidden`) is reached.
    pub async fn record_oauth_failure(
        &self,
        id: &str,
        health_status: &str,
        error_message: Option<String>,
    ) -> StorageResult<()> {
        let existing = self
            .get_oauth_account(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("oauth account {id}")))?;
        let mut model: ActiveModel = existing.clone().into();
        let failures = existing.consecutive_failures + 1;
        let terminal = matches!(health_status, "expired" | "forbidden") || failures >= 3;
        model.consecutive_failures = Set(failures);
        model.health_status = Set(health_status.to_string());
        model.error_message = Set(error_message);
        model.is_active = Set(!terminal);
        model.updated_at = Set(OffsetDateTime::now_utc());
        model.update(&self.db).await?;
        Ok(())
    }

    pub async fn touch_oauth_account_used(&self, id: &str) -> StorageResult<()> {
        let Some(existing) = self.get_oauth_account(id).await? else {
            return Ok(());
        };
        let mut model: ActiveModel = existing.into();
        model.last_used_at = Set(Some(OffsetDateTime::now_utc()));
        model.update(&self.db).await?;
        Ok(())
    }

    pub async fn toggle_oauth_pool_enabled(&self, id: &str, enabled: bool) -> StorageResult<()> {
        let existing = self
            .get_oauth_account(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("oauth account {id}")))?;
        let mut model: ActiveModel = existing.into();
        model.pool_enabled = Set(enabled);
        model.updated_at = Set(OffsetDateTime::now_utc());
        model.update(&self.db).await?;
        Ok(())
    }

    pub async fn update_oauth_quota(&self, id: &str, pool_weight: i32) -> StorageResult<()> {
        let existing = self
            .get_oauth_account(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("oauth account {id}")))?;
        let mut model: ActiveModel = existing.into();
        model.pool_weight = Set(pool_weight);
        model.updated_at = Set(OffsetDateTime::now_utc());
        model.update(&self.db).await?;
        Ok(())
    }

    pub async fn delete_oauth_account(&self, id: &str) -> StorageResult<()> {
        Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }
}
