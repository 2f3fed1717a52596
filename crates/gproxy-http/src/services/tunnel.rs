use gproxy_storage::Storage;
use gproxy_tunnel::TunnelSupervisor;

use crate::error::HttpResult;

const DEFAULT_LOG_LIMIT: u64 = 200;

/// Implements `tunnel: start | stop | get-status | check-helper | download-helper | get-stats |
/// get-logs | get-system-logs`.
pub struct TunnelService {
    storage: Storage,
    supervisor: TunnelSupervisor,
}

impl TunnelService {
    pub fn new(storage: Storage, supervisor: TunnelSupervisor) -> Self {
        Self { storage, supervisor }
    }

    pub async fn start(&self) -> HttpResult<gproxy_tunnel::TunnelStatus> {
        Ok(self.supervisor.start().await?)
    }

    pub async fn stop(&self) -> HttpResult<gproxy_tunnel::TunnelStatus> {
        Ok(self.supervisor.stop().await?)
    }

    pub fn get_status(&self) -> gproxy_tunnel::TunnelStatus {
        self.supervisor.status()
    }

    pub fn check_helper(&self, bundled_resources_dir: Option<&std::path::Path>, data_dir: &std::path::Path) -> bool {
        gproxy_tunnel::helper::locate_helper(bundled_resources_dir, data_dir).is_some()
    }

    pub async fn download_helper(&self, client: &wreq::Client, data_dir: &std::path::Path) -> HttpResult<std::path::PathBuf> {
        Ok(gproxy_tunnel::helper::download_helper(client, data_dir).await?)
    }

    pub async fn get_stats(&self) -> HttpResult<Vec<gproxy_storage::entities::tunnel_stats::Model>> {
        Ok(self.storage.list_tunnel_stats().await?)
    }

    pub async fn get_logs(&self, limit: Option<u64>) -> HttpResult<Vec<gproxy_storage::entities::tunnel_access_log::Model>> {
        Ok(self.storage.list_tunnel_access_logs(limit.unwrap_or(DEFAULT_LOG_LIMIT)).await?)
    }

    pub async fn get_system_logs(&self, limit: Option<u64>) -> HttpResult<Vec<gproxy_storage::entities::tunnel_system_log::Model>> {
        Ok(self.storage.list_tunnel_system_logs(limit.unwrap_or(DEFAULT_LOG_LIMIT)).await?)
    }
}
