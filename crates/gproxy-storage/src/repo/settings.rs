use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::entities::setting::{ActiveModel, Entity};
use crate::error::StorageResult;

use super::Storage;

impl Storage {
    pub async fn get_setting_raw(&self, key: &str) -> StorageResult<Option<serde_json::Value>> {
        Ok(Entity::find_by_id(key)
            .one(&self.db)
            .await?
            .map(|row| row.value_json))
    }

    pub async fn get_setting<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.get_setting_raw(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub async fn get_all_settings(&self) -> StorageResult<Vec<(String, serde_json::Value)>> {
        Ok(Entity::find()
            .all(&self.db)
            .await?
            .into_iter()
            .map(|row| (row.key, row.value_json))
            .collect())
    }

    pub async fn set_setting<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        let value_json = serde_json::to_value(value)?;
        let model = ActiveModel {
            key: Set(key.to_string()),
            value_json: Set(value_json),
        };
        Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(crate::entities::setting::Column::Key)
                    .update_column(crate::entities::setting::Column::ValueJson)
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;
        Ok(())
    }

    pub async fn set_many_settings(
        &self,
        entries: Vec<(String, serde_json::Value)>,
    ) -> StorageResult<()> {
        use sea_orm::TransactionTrait;

        let tx = self.db.begin().await?;
        for (key, value_json) in entries {
            let model = ActiveModel {
                key: Set(key),
                value_json: Set(value_json),
            };
            Entity::insert(model)
                .on_conflict(
                    sea_orm::sea_query::OnConflict::column(crate::entities::setting::Column::Key)
                        .update_column(crate::entities::setting::Column::ValueJson)
                        .to_owned(),
                )
                .exec(&tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
