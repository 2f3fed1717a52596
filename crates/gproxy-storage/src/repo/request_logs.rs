use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use time::OffsetDateTime;

use crate::entities::request_log::{ActiveModel, Column, Entity, Model};
use crate::error::StorageResult;

use super::Storage;

#[derive(Debug, Clone, Default)]
pub struct RequestLogDraft {
    pub proxy_id: Option<String>,
    pub proxy_path: String,
    pub source_model: Option<String>,
    pub target_model: Option<String>,
    pub http_status: Option<i32>,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    pub latency_ms: Option<i64>,
    pub request_body: Option<Vec<u8>>,
    pub response_body: Option<Vec<u8>>,
    pub error: Option<String>,
    pub source: String,
}

#[derive(Debug, Clone, Default)]
pub struct RequestLogFilter {
    pub proxy_id: Option<String>,
    pub since: Option<OffsetDateTime>,
    pub until: Option<OffsetDateTime>,
    pub limit: u64,
    pub offset: u64,
}

impl Storage {
    pub async fn insert_request_log(
        &self,
        id: String,
        draft: RequestLogDraft,
    ) -> StorageResult<Model> {
        let model = ActiveModel {
            id: Set(id),
            proxy_id: Set(draft.proxy_id),
            proxy_path: Set(draft.proxy_path),
            source_model: Set(draft.source_model),
            target_model: Set(draft.target_model),
            http_status: Set(draft.http_status),
            input_tokens: Set(draft.input_tokens),
            output_tokens: Set(draft.output_tokens),
            latency_ms: Set(draft.latency_ms),
            request_body: Set(draft.request_body),
            response_body: Set(draft.response_body),
            error: Set(draft.error),
            source: Set(draft.source),
            created_at: Set(OffsetDateTime::now_utc()),
        };
        Ok(model.insert(&self.db).await?)
    }

    pub async fn query_request_logs(&self, filter: RequestLogFilter) -> StorageResult<Vec<Model>> {
        let mut query = Entity::find().order_by(Column::CreatedAt, Order::Desc);
        if let Some(proxy_id) = &filter.proxy_id {
            query = query.filter(Column::ProxyId.eq(proxy_id.clone()));
        }
        if let Some(since) = filter.since {
            query = query.filter(Column::CreatedAt.gte(since));
        }
        if let Some(until) = filter.until {
            query = query.filter(Column::CreatedAt.lte(until));
        }
        Ok(query
            .offset(filter.offset)
            .limit(filter.limit.max(1))
            .all(&self.db)
            .await?)
    }

    /// Deletes every row, used by `logs.clear`.
    pub async fn clear_request_logs(&self) -> StorageResult<()> {
        Entity::delete_many().exec(&self.db).await?;
        Ok(())
    }

    /// Deletes rows older than `retention`, used by `logs.cleanup`'s age-based rotation.
    pub async fn cleanup_request_logs_older_than(
        &self,
        retention: OffsetDateTime,
    ) -> StorageResult<u64> {
        let result = Entity::delete_many()
            .filter(Column::CreatedAt.lt(retention))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Trims down to `max_entries` by deleting the oldest rows beyond that count, used by
    /// `logs.cleanup`'s count-based rotation.
    pub async fn trim_request_logs_to(&self, max_entries: u64) -> StorageResult<u64> {
        let total = Entity::find().count(&self.db).await?;
        if total <= max_entries {
            return Ok(0);
        }
        let overflow = total - max_entries;
        let stale: Vec<String> = Entity::find()
            .order_by(Column::CreatedAt, Order::Asc)
            .limit(overflow)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|row| row.id)
            .collect();
        let deleted = stale.len() as u64;
        Entity::delete_many()
            .filter(Column::Id.is_in(stale))
            .exec(&self.db)
            .await?;
        Ok(deleted)
    }
}
