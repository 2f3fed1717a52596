use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use time::OffsetDateTime;

use crate::entities::bridge_proxy::{ActiveModel, Column, Entity, Model};
use crate::entities::model_mapping::{
    ActiveModel as MappingActiveModel, Column as MappingColumn, Entity as MappingEntity,
    Model as MappingModel,
};
use crate::error::{StorageError, StorageResult};

use super::Storage;

#[derive(Debug, Clone, Default)]
pub struct ProxyDraft {
    pub name: String,
    pub inbound_adapter_id: String,
    pub outbound_kind: String,
    pub outbound_id: String,
    pub proxy_path: String,
    pub enabled: bool,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct MappingDraft {
    pub source_model: Option<String>,
    pub target_model: String,
    pub is_default: bool,
}

/// Depth the breadth-first chain walk gives up at. Chains longer than this are almost certainly
/// pathological and are rejected the same as a true cycle.
const MAX_CHAIN_DEPTH: usize = 16;

impl Storage {
    pub async fn list_proxies(&self) -> StorageResult<Vec<Model>> {
        Ok(Entity::find()
            .order_by_asc(Column::SortOrder)
            .all(&self.db)
            .await?)
    }

    pub async fn get_proxy(&self, id: &str) -> StorageResult<Option<Model>> {
        Ok(Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn find_proxy_by_path(&self, path: &str) -> StorageResult<Option<Model>> {
        Ok(Entity::find()
            .filter(Column::ProxyPath.eq(path))
            .one(&self.db)
            .await?)
    }

    /// Walks the outbound chain breadth-first starting from `outbound_kind`/`outbound_id`. The
    /// walk stops at a `provider` leaf or a dangling reference; it rejects if `mutated_id` is
    /// revisited, or if the chain exceeds [`MAX_CHAIN_DEPTH`].
    pub async fn check_circular_chain(
        &self,
        mutated_id: &str,
        outbound_kind: &str,
        outbound_id: &str,
    ) -> StorageResult<()> {
        let mut kind = outbound_kind.to_string();
        let mut id = outbound_id.to_string();

        for _ in 0..MAX_CHAIN_DEPTH {
            if kind != "proxy" {
                return Ok(());
            }
            if id == mutated_id {
                return Err(StorageError::CircularChain(mutated_id.to_string()));
            }
            let Some(next) = self.get_proxy(&id).await? else {
                return Ok(());
            };
            kind = next.outbound_kind;
            id = next.outbound_id;
        }

        Err(StorageError::CircularChain(mutated_id.to_string()))
    }

    pub async fn create_proxy(&self, id: String, draft: ProxyDraft) -> StorageResult<Model> {
        self.check_circular_chain(&id, &draft.outbound_kind, &draft.outbound_id)
            .await?;
        let now = OffsetDateTime::now_utc();
        let model = ActiveModel {
            id: Set(id),
            name: Set(draft.name),
            inbound_adapter_id: Set(draft.inbound_adapter_id),
            outbound_kind: Set(draft.outbound_kind),
            outbound_id: Set(draft.outbound_id),
            proxy_path: Set(draft.proxy_path),
            enabled: Set(draft.enabled),
            sort_order: Set(draft.sort_order),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(model.insert(&self.db).await?)
    }

    pub async fn update_proxy(&self, id: &str, draft: ProxyDraft) -> StorageResult<Model> {
        self.check_circular_chain(id, &draft.outbound_kind, &draft.outbound_id)
            .await?;
        let existing = self
            .get_proxy(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("proxy {id}")))?;
        let mut model: ActiveModel = existing.into();
        model.name = Set(draft.name);
        model.inbound_adapter_id = Set(draft.inbound_adapter_id);
        model.outbound_kind = Set(draft.outbound_kind);
        model.outbound_id = Set(draft.outbound_id);
        model.proxy_path = Set(draft.proxy_path);
        model.enabled = Set(draft.enabled);
        model.sort_order = Set(draft.sort_order);
        model.updated_at = Set(OffsetDateTime::now_utc());
        Ok(model.update(&self.db).await?)
    }

    pub async fn toggle_proxy(&self, id: &str, enabled: bool) -> StorageResult<()> {
        let existing = self
            .get_proxy(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("proxy {id}")))?;
        let mut model: ActiveModel = existing.into();
        model.enabled = Set(enabled);
        model.updated_at = Set(OffsetDateTime::now_utc());
        model.update(&self.db).await?;
        Ok(())
    }

    pub async fn delete_proxy(&self, id: &str) -> StorageResult<()> {
        Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }

    pub async fn get_mappings(&self, proxy_id: &str) -> StorageResult<Vec<MappingModel>> {
        Ok(MappingEntity::find()
            .filter(MappingColumn::ProxyId.eq(proxy_id))
            .all(&self.db)
            .await?)
    }

    /// Replaces every mapping row for `proxy_id` with `mappings` inside one transaction, so a
    /// partial write never leaves stale and fresh rows mixed together.
    pub async fn set_mappings(
        &self,
        proxy_id: &str,
        mappings: Vec<(String, MappingDraft)>,
    ) -> StorageResult<()> {
        use sea_orm::TransactionTrait;

        let tx = self.db.begin().await?;
        MappingEntity::delete_many()
            .filter(MappingColumn::ProxyId.eq(proxy_id))
            .exec(&tx)
            .await?;

        for (id, draft) in mappings {
            let model = MappingActiveModel {
                id: Set(id),
                proxy_id: Set(proxy_id.to_string()),
                source_model: Set(draft.source_model),
                target_model: Set(draft.target_model),
                is_default: Set(draft.is_default),
            };
            model.insert(&tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
