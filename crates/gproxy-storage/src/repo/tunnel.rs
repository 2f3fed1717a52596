use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder, Set};
use time::{Date, OffsetDateTime};

use crate::entities::tunnel_access_log::{
    ActiveModel as AccessLogActiveModel, Column as AccessLogColumn, Entity as AccessLogEntity,
    Model as AccessLogModel,
};
use crate::entities::tunnel_config::{ActiveModel as ConfigActiveModel, Entity as ConfigEntity, Model as ConfigModel};
use crate::entities::tunnel_stats::{
    ActiveModel as StatsActiveModel, Column as StatsColumn, Entity as StatsEntity, Model as StatsModel,
};
use crate::entities::tunnel_system_log::{
    ActiveModel as SystemLogActiveModel, Column as SystemLogColumn, Entity as SystemLogEntity,
    Model as SystemLogModel,
};
use crate::error::StorageResult;

use super::Storage;

#[derive(Debug, Clone, Default)]
pub struct AccessLogEntry {
    pub source_ip: Option<String>,
    pub method: String,
    pub path: String,
    pub status: i32,
    pub latency_ms: i64,
    pub bytes_up: i64,
    pub bytes_down: i64,
}

impl Storage {
    pub async fn get_tunnel_config(&self) -> StorageResult<Option<ConfigModel>> {
        Ok(ConfigEntity::find().one(&self.db).await?)
    }

    /// Creates the singleton tunnel config row on first use; `device_id` is generated once by
    /// the caller and never changes afterward.
    pub async fn ensure_tunnel_config(&self, id: String, device_id: String) -> StorageResult<ConfigModel> {
        if let Some(existing) = self.get_tunnel_config().await? {
            return Ok(existing);
        }
        let now = OffsetDateTime::now_utc();
        let model = ConfigActiveModel {
            id: Set(id),
            device_id: Set(device_id),
            tunnel_id: Set(None),
            subdomain: Set(None),
            domain: Set(None),
            hostname: Set(None),
            credentials_encrypted: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(model.insert(&self.db).await?)
    }

    pub async fn record_tunnel_registration(
        &self,
        id: &str,
        tunnel_id: String,
        subdomain: String,
        domain: String,
        hostname: String,
        credentials_encrypted: String,
    ) -> StorageResult<()> {
        let Some(existing) = ConfigEntity::find_by_id(id).one(&self.db).await? else {
            return Ok(());
        };
        let mut model: ConfigActiveModel = existing.into();
        model.tunnel_id = Set(Some(tunnel_id));
        model.subdomain = Set(Some(subdomain));
        model.domain = Set(Some(domain));
        model.hostname = Set(Some(hostname));
        model.credentials_encrypted = Set(Some(credentials_encrypted));
        model.updated_at = Set(OffsetDateTime::now_utc());
        model.update(&self.db).await?;
        Ok(())
    }

    /// Folds `batch` into today's stats row using a request-weighted average for latency:
    /// `(old_avg * old_requests + batch_avg * batch_requests) / (old_requests + batch_requests)`.
    pub async fn fold_tunnel_stats(&self, day: Date, batch: AccessLogEntry) -> StorageResult<()> {
        let existing = StatsEntity::find()
            .filter(StatsColumn::Day.eq(day))
            .one(&self.db)
            .await?;

        match existing {
            Some(row) => {
                let total_requests = row.requests + 1;
                let weighted_latency = (row.avg_latency_ms * row.requests as f64
                    + batch.latency_ms as f64)
                    / total_requests as f64;
                let bytes_up = row.bytes_up + batch.bytes_up;
                let bytes_down = row.bytes_down + batch.bytes_down;
                let errors = row.errors + if batch.status >= 400 { 1 } else { 0 };
                let unique_ips = row.unique_ips + if batch.source_ip.is_some() { 1 } else { 0 };

                let mut model: StatsActiveModel = row.into();
                model.requests = Set(total_requests);
                model.bytes_up = Set(bytes_up);
                model.bytes_down = Set(bytes_down);
                model.errors = Set(errors);
                model.avg_latency_ms = Set(weighted_latency);
                model.unique_ips = Set(unique_ips);
                model.update(&self.db).await?;
            }
            None => {
                let model = StatsActiveModel {
                    id: Set(uuid::Uuid::new_v4().to_string()),
                    day: Set(day),
                    requests: Set(1),
                    bytes_up: Set(batch.bytes_up),
                    bytes_down: Set(batch.bytes_down),
                    errors: Set(if batch.status >= 400 { 1 } else { 0 }),
                    avg_latency_ms: Set(batch.latency_ms as f64),
                    unique_ips: Set(if batch.source_ip.is_some() { 1 } else { 0 }),
                };
                model.insert(&self.db).await?;
            }
        }
        Ok(())
    }

    pub async fn list_tunnel_stats(&self) -> StorageResult<Vec<StatsModel>> {
        Ok(StatsEntity::find()
            .order_by_desc(StatsColumn::Day)
            .all(&self.db)
            .await?)
    }

    pub async fn insert_tunnel_access_log(&self, id: String, entry: AccessLogEntry) -> StorageResult<()> {
        let model = AccessLogActiveModel {
            id: Set(id),
            at: Set(OffsetDateTime::now_utc()),
            source_ip: Set(entry.source_ip),
            method: Set(entry.method),
            path: Set(entry.path),
            status: Set(entry.status),
            latency_ms: Set(entry.latency_ms),
            bytes_up: Set(entry.bytes_up),
            bytes_down: Set(entry.bytes_down),
        };
        model.insert(&self.db).await?;
        Ok(())
    }

    pub async fn list_tunnel_access_logs(&self, limit: u64) -> StorageResult<Vec<AccessLogModel>> {
        use sea_orm::QuerySelect;
        Ok(AccessLogEntity::find()
            .order_by(AccessLogColumn::At, Order::Desc)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    pub async fn insert_tunnel_system_log(&self, id: String, level: String, message: String) -> StorageResult<()> {
        let model = SystemLogActiveModel {
            id: Set(id),
            at: Set(OffsetDateTime::now_utc()),
            level: Set(level),
            message: Set(message),
        };
        model.insert(&self.db).await?;
        Ok(())
    }

    pub async fn list_tunnel_system_logs(&self, limit: u64) -> StorageResult<Vec<SystemLogModel>> {
        use sea_orm::QuerySelect;
        Ok(SystemLogEntity::find()
            .order_by(SystemLogColumn::At, Order::Desc)
            .limit(limit)
            .all(&self.db)
            .await?)
    }
}
