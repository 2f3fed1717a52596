use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use time::OffsetDateTime;

use crate::entities::provider::{ActiveModel, Column, Entity, Model};
use crate::error::{StorageError, StorageResult};

use super::Storage;

#[derive(Debug, Clone, Default)]
pub struct ProviderDraft {
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

impl Storage {
    pub async fn list_providers(&self) -> StorageResult<Vec<Model>> {
        Ok(Entity::find()
            .order_by_asc(Column::SortOrder)
            .all(&self.db)
            .await?)
    }

    pub async fn get_provider(&self, id: &str) -> StorageResult<Option<Model>> {
        Ok(Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn find_provider_by_passthrough_slug(
        &self,
        slug: &str,
    ) -> StorageResult<Option<Model>> {
        Ok(Entity::find()
            .filter(Column::PassthroughSlug.eq(slug))
            .one(&self.db)
            .await?)
    }

    pub async fn create_provider(&self, id: String, draft: ProviderDraft) -> StorageResult<Model> {
        let now = OffsetDateTime::now_utc();
        let model = ActiveModel {
            id: Set(id),
            display_name: Set(draft.display_name),
            adapter_type: Set(draft.adapter_type),
            api_key_encrypted: Set(draft.api_key_encrypted),
            base_url: Set(draft.base_url),
            chat_path: Set(draft.chat_path),
            models_path: Set(draft.models_path),
            cached_model_ids_json: Set(serde_json::Value::Array(vec![])),
            enabled: Set(draft.enabled),
            sort_order: Set(draft.sort_order),
            logo: Set(draft.logo),
            color: Set(draft.color),
            passthrough: Set(draft.passthrough),
            passthrough_slug: Set(draft.passthrough_slug),
            is_pool: Set(draft.is_pool),
            pool_strategy: Set(draft.pool_strategy),
            oauth_account_id: Set(draft.oauth_account_id),
            oauth_provider_type: Set(draft.oauth_provider_type),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(model.insert(&self.db).await?)
    }

    pub async fn update_provider(&self, id: &str, draft: ProviderDraft) -> StorageResult<Model> {
        let existing = self
            .get_provider(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("provider {id}")))?;
        let mut model: ActiveModel = existing.into();
        model.display_name = Set(draft.display_name);
        model.adapter_type = Set(draft.adapter_type);
        model.api_key_encrypted = Set(draft.api_key_encrypted);
        model.base_url = Set(draft.base_url);
        model.chat_path = Set(draft.chat_path);
        model.models_path = Set(draft.models_path);
        model.enabled = Set(draft.enabled);
        model.sort_order = Set(draft.sort_order);
        model.logo = Set(draft.logo);
        model.color = Set(draft.color);
        model.passthrough = Set(draft.passthrough);
        model.passthrough_slug = Set(draft.passthrough_slug);
        model.is_pool = Set(draft.is_pool);
        model.pool_strategy = Set(draft.pool_strategy);
        model.oauth_account_id = Set(draft.oauth_account_id);
        model.oauth_provider_type = Set(draft.oauth_provider_type);
        model.updated_at = Set(OffsetDateTime::now_utc());
        Ok(model.update(&self.db).await?)
    }

    pub async fn set_provider_cached_models(
        &self,
        id: &str,
        model_ids: Vec<String>,
    ) -> StorageResult<()> {
        let existing = self
            .get_provider(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("provider {id}")))?;
        let mut model: ActiveModel = existing.into();
        model.cached_model_ids_json = Set(serde_json::to_value(model_ids)?);
        model.updated_at = Set(OffsetDateTime::now_utc());
        model.update(&self.db).await?;
        Ok(())
    }

    pub async fn toggle_provider(&self, id: &str, enabled: bool) -> StorageResult<()> {
        let existing = self
            .get_provider(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("provider {id}")))?;
        let mut model: ActiveModel = existing.into();
        model.enabled = Set(enabled);
        model.updated_at = Set(OffsetDateTime::now_utc());
        model.update(&self.db).await?;
        Ok(())
    }

    pub async fn delete_provider(&self, id: &str) -> StorageResult<()> {
        Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }
}
