use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use time::OffsetDateTime;

use crate::entities::code_model_mapping::{
    ActiveModel as MappingActiveModel, Column as MappingColumn, Entity as MappingEntity,
    Model as MappingModel,
};
use crate::entities::code_switch_config::{
    ActiveModel as ConfigActiveModel, Column as ConfigColumn, Entity as ConfigEntity,
    Model as ConfigModel,
};
use crate::error::{StorageError, StorageResult};

use super::Storage;

impl Storage {
    pub async fn list_code_switch_configs(&self, cli: &str) -> StorageResult<Vec<ConfigModel>> {
        Ok(ConfigEntity::find()
            .filter(ConfigColumn::Cli.eq(cli))
            .all(&self.db)
            .await?)
    }

    pub async fn get_active_code_switch_config(
        &self,
        cli: &str,
    ) -> StorageResult<Option<ConfigModel>> {
        Ok(ConfigEntity::find()
            .filter(ConfigColumn::Cli.eq(cli))
            .filter(ConfigColumn::Active.eq(true))
            .one(&self.db)
            .await?)
    }

    pub async fn create_code_switch_config(
        &self,
        id: String,
        cli: String,
        provider_id: String,
    ) -> StorageResult<ConfigModel> {
        let now = OffsetDateTime::now_utc();
        let model = ConfigActiveModel {
            id: Set(id),
            cli: Set(cli),
            provider_id: Set(provider_id),
            active: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(model.insert(&self.db).await?)
    }

    /// Activates `id` and deactivates every other config sharing its `cli`, so at most one is
    /// active at a time.
    pub async fn activate_code_switch_config(&self, id: &str) -> StorageResult<()> {
        use sea_orm::TransactionTrait;

        let target = ConfigEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("code switch config {id}")))?;

        let tx = self.db.begin().await?;
        let siblings = ConfigEntity::find()
            .filter(ConfigColumn::Cli.eq(target.cli.clone()))
            .all(&tx)
            .await?;
        let now = OffsetDateTime::now_utc();
        for sibling in siblings {
            let is_target = sibling.id == id;
            let mut model: ConfigActiveModel = sibling.into();
            model.active = Set(is_target);
            model.updated_at = Set(now);
            model.update(&tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_code_model_mappings(
        &self,
        code_switch_id: &str,
    ) -> StorageResult<Vec<MappingModel>> {
        Ok(MappingEntity::find()
            .filter(MappingColumn::CodeSwitchId.eq(code_switch_id))
            .all(&self.db)
            .await?)
    }

    pub async fn upsert_code_model_mapping(
        &self,
        id: String,
        code_switch_id: String,
        provider_id: String,
        source_model: String,
        mapping_type: String,
        target_model: String,
    ) -> StorageResult<MappingModel> {
        let existing = MappingEntity::find()
            .filter(MappingColumn::CodeSwitchId.eq(code_switch_id.clone()))
            .filter(MappingColumn::ProviderId.eq(provider_id.clone()))
            .filter(MappingColumn::SourceModel.eq(source_model.clone()))
            .filter(MappingColumn::MappingType.eq(mapping_type.clone()))
            .one(&self.db)
            .await?;

        if let Some(existing) = existing {
            let mut model: MappingActiveModel = existing.into();
            model.target_model = Set(target_model);
            Ok(model.update(&self.db).await?)
        } else {
            let model = MappingActiveModel {
                id: Set(id),
                code_switch_id: Set(code_switch_id),
                provider_id: Set(provider_id),
                source_model: Set(source_model),
                mapping_type: Set(mapping_type),
                target_model: Set(target_model),
            };
            Ok(model.insert(&self.db).await?)
        }
    }
}
