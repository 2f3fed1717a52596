use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use time::OffsetDateTime;

use crate::entities::api_key::{ActiveModel, Column, Entity, Model};
use crate::error::{StorageError, StorageResult};

use super::Storage;

impl Storage {
    pub async fn list_api_keys(&self) -> StorageResult<Vec<Model>> {
        Ok(Entity::find()
            .order_by_asc(Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn find_api_key_by_value(&self, key_value: &str) -> StorageResult<Option<Model>> {
        Ok(Entity::find()
            .filter(Column::KeyValue.eq(key_value))
            .one(&self.db)
            .await?)
    }

    pub async fn create_api_key(
        &self,
        id: String,
        key_value: String,
        label: Option<String>,
    ) -> StorageResult<Model> {
        let model = ActiveModel {
            id: Set(id),
            key_value: Set(key_value),
            label: Set(label),
            enabled: Set(true),
            created_at: Set(OffsetDateTime::now_utc()),
            last_used_at: Set(None),
        };
        Ok(model.insert(&self.db).await?)
    }

    pub async fn rename_api_key(&self, id: &str, label: Option<String>) -> StorageResult<()> {
        let existing = Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("api key {id}")))?;
        let mut model: ActiveModel = existing.into();
        model.label = Set(label);
        model.update(&self.db).await?;
        Ok(())
    }

    pub async fn toggle_api_key(&self, id: &str, enabled: bool) -> StorageResult<()> {
        let existing = Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("api key {id}")))?;
        let mut model: ActiveModel = existing.into();
        model.enabled = Set(enabled);
        model.update(&self.db).await?;
        Ok(())
    }

    pub async fn touch_api_key(&self, id: &str) -> StorageResult<()> {
        let Some(existing) = Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(());
        };
        let mut model: ActiveModel = existing.into();
        model.last_used_at = Set(Some(OffsetDateTime::now_utc()));
        model.update(&self.db).await?;
        Ok(())
    }

    pub async fn delete_api_key(&self, id: &str) -> StorageResult<()> {
        Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }
}
