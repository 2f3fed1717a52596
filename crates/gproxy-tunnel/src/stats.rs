use gproxy_storage::{AccessLogEntry, Storage};
use time::OffsetDateTime;

use crate::error::TunnelResult;

/// One inbound request observed through the tunnel, as handed to the supervisor by the HTTP
/// front-end's access-log middleware.
#[derive(Debug, Clone)]
pub struct TunnelRequestObserved {
    pub source_ip: Option<String>,
    pub method: String,
    pub path: String,
    pub status: i32,
    pub latency_ms: i64,
    pub bytes_up: i64,
    pub bytes_down: i64,
}

/// Persists an access-log row and folds it into today's daily stats row.
pub async fn record_request(storage: &Storage, id: String, request: TunnelRequestObserved) -> TunnelResult<()> {
    let entry = AccessLogEntry {
        source_ip: request.source_ip,
        method: request.method,
        path: request.path,
        status: request.status,
        latency_ms: request.latency_ms,
        bytes_up: request.bytes_up,
        bytes_down: request.bytes_down,
    };
    storage.insert_tunnel_access_log(id, entry.clone()).await?;
    storage.fold_tunnel_stats(OffsetDateTime::now_utc().date(), entry).await?;
    Ok(())
}

pub async fn log_system_event(storage: &Storage, level: &str, message: impl Into<String>) -> TunnelResult<()> {
    storage
        .insert_tunnel_system_log(uuid::Uuid::new_v4().to_string(), level.to_string(), message.into())
        .await?;
    Ok(())
}
