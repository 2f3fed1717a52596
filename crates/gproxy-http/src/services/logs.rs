use std::collections::BTreeMap;

use gproxy_storage::entities::request_log::Model as RequestLogModel;
use gproxy_storage::{RequestLogFilter, Storage};
use serde::Serialize;
use time::macros::format_description;
use time::{Duration as TimeDuration, OffsetDateTime};

use crate::error::HttpResult;

const DEFAULT_RETENTION_DAYS: i64 = 30;
const DEFAULT_MAX_ENTRIES: u64 = 10_000;
/// `logs.export`/time-series aggregation pulls at most this many rows into memory; there is no
/// dedicated SQL aggregate query for request logs, so aggregation happens over this page.
const AGGREGATE_PAGE_SIZE: u64 = 50_000;

#[derive(Debug, Serialize)]
pub struct RequestLogView {
    pub id: String,
    pub proxy_id: Option<String>,
    pub proxy_path: String,
    pub source_model: Option<String>,
    pub target_model: Option<String>,
    pub http_status: Option<i32>,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    pub latency_ms: Option<i64>,
    pub error: Option<String>,
    pub source: String,
    pub created_at: OffsetDateTime,
}

impl From<RequestLogModel> for RequestLogView {
    fn from(model: RequestLogModel) -> Self {
        Self {
            id: model.id,
            proxy_id: model.proxy_id,
            proxy_path: model.proxy_path,
            source_model: model.source_model,
            target_model: model.target_model,
            http_status: model.http_status,
            input_tokens: model.input_tokens,
            output_tokens: model.output_tokens,
            latency_ms: model.latency_ms,
            error: model.error,
            source: model.source,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogStats {
    pub total: u64,
    pub success: u64,
    pub failed: u64,
    pub avg_latency_ms: f64,
    pub total_input_tokens: i64,
    pub total_output_tokens: i64,
}

#[derive(Debug, Serialize)]
pub struct TimeSeriesBucket {
    pub day: String,
    pub count: u64,
    pub avg_latency_ms: f64,
}

/// Implements `logs: query | get-stats | export | clear | cleanup | get-time-series-stats`.
pub struct LogService {
    storage: Storage,
}

impl LogService {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub async fn query(&self, filter: RequestLogFilter) -> HttpResult<Vec<RequestLogView>> {
        Ok(self.storage.query_request_logs(filter).await?.into_iter().map(RequestLogView::from).collect())
    }

    pub async fn export(&self, proxy_id: Option<String>) -> HttpResult<Vec<RequestLogView>> {
        self.query(RequestLogFilter {
            proxy_id,
            limit: AGGREGATE_PAGE_SIZE,
            ..Default::default()
        })
        .await
    }

    pub async fn get_stats(&self, proxy_id: Option<String>) -> HttpResult<LogStats> {
        let rows = self
            .storage
            .query_request_logs(RequestLogFilter {
                proxy_id,
                limit: AGGREGATE_PAGE_SIZE,
                ..Default::default()
            })
            .await?;

        let total = rows.len() as u64;
        let success = rows.iter().filter(|row| matches!(row.http_status, Some(200..=299))).count() as u64;
        let failed = total - success;
        let latency_sum: i64 = rows.iter().filter_map(|row| row.latency_ms).sum();
        let latency_count = rows.iter().filter(|row| row.latency_ms.is_some()).count() as f64;
        let avg_latency_ms = if latency_count > 0.0 { latency_sum as f64 / latency_count } else { 0.0 };
        let total_input_tokens = rows.iter().filter_map(|row| row.input_tokens).sum();
        let total_output_tokens = rows.iter().filter_map(|row| row.output_tokens).sum();

        Ok(LogStats {
            total,
            success,
            failed,
            avg_latency_ms,
            total_input_tokens,
            total_output_tokens,
        })
    }

    pub async fn get_time_series_stats(&self, proxy_id: Option<String>, since: OffsetDateTime) -> HttpResult<Vec<TimeSeriesBucket>> {
        let rows = self
            .storage
            .query_request_logs(RequestLogFilter {
                proxy_id,
                since: Some(since),
                limit: AGGREGATE_PAGE_SIZE,
                ..Default::default()
            })
            .await?;

        let day_format = format_description!("[year]-[month]-[day]");
        let mut buckets: BTreeMap<String, (u64, i64, u64)> = BTreeMap::new();
        for row in &rows {
            let day = row.created_at.format(&day_format).unwrap_or_default();
            let entry = buckets.entry(day).or_insert((0, 0, 0));
            entry.0 += 1;
            if let Some(latency) = row.latency_ms {
                entry.1 += latency;
                entry.2 += 1;
            }
        }

        Ok(buckets
            .into_iter()
            .map(|(day, (count, latency_sum, latency_count))| TimeSeriesBucket {
                day,
                count,
                avg_latency_ms: if latency_count > 0 { latency_sum as f64 / latency_count as f64 } else { 0.0 },
            })
            .collect())
    }

    pub async fn clear(&self) -> HttpResult<()> {
        Ok(self.storage.clear_request_logs().await?)
    }

    /// Rotates logs by both age and count, per the `logs.retentionDays`/`logs.maxEntries`
    /// settings (falling back to their catalog defaults when unset).
    pub async fn cleanup(&self) -> HttpResult<u64> {
        let retention_days = self.storage.get_setting::<i64>("logs.retentionDays").await?.unwrap_or(DEFAULT_RETENTION_DAYS);
        let max_entries = self.storage.get_setting::<u64>("logs.maxEntries").await?.unwrap_or(DEFAULT_MAX_ENTRIES);
        let cutoff = OffsetDateTime::now_utc() - TimeDuration::days(retention_days);
        let by_age = self.storage.cleanup_request_logs_older_than(cutoff).await?;
        let by_count = self.storage.trim_request_logs_to(max_entries).await?;
        Ok(by_age + by_count)
    }
}
