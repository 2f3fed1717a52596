use std::path::PathBuf;
use std::sync::{Arc, Mutex as SyncMutex};
use std::time::Duration;

use gproxy_storage::Storage;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::timeout;

use crate::api::{self, TunnelRegistration};
use crate::config;
use crate::error::{TunnelError, TunnelResult};
use crate::helper;
use crate::status::{TunnelState, TunnelStatus};

const STARTUP_TIMEOUT: Duration = Duration::from_secs(30);
const STOP_GRACE: Duration = Duration::from_secs(5);
const RESTART_DELAY: Duration = Duration::from_secs(5);
const MAX_RESTART_ATTEMPTS: u32 = 3;
const REGISTRATION_LINE: &str = "Registered tunnel connection";

/// Owns the tunnel helper's lifecycle: locating or downloading the binary, registering the
/// device with the tunnel API, writing its config, and spawning/monitoring/restarting/stopping
/// the subprocess. One instance per process; the helper PID is owned exclusively by it.
#[derive(Clone)]
pub struct TunnelSupervisor {
    storage: Storage,
    client: wreq::Client,
    data_dir: PathBuf,
    bundled_resources_dir: Option<PathBuf>,
    tunnel_api_base_url: String,
    local_host: String,
    local_port: u16,
    status: Arc<SyncMutex<TunnelStatus>>,
    child: Arc<AsyncMutex<Option<Child>>>,
}

impl TunnelSupervisor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        storage: Storage,
        client: wreq::Client,
        data_dir: PathBuf,
        bundled_resources_dir: Option<PathBuf>,
        tunnel_api_base_url: String,
        local_host: String,
        local_port: u16,
    ) -> Self {
        Self {
            storage,
            client,
            data_dir,
            bundled_resources_dir,
            tunnel_api_base_url,
            local_host,
            local_port,
            status: Arc::new(SyncMutex::new(TunnelStatus::inactive())),
            child: Arc::new(AsyncMutex::new(None)),
        }
    }

    pub fn status(&self) -> TunnelStatus {
        self.status.lock().unwrap().clone()
    }

    fn set_state(&self, state: TunnelState) {
        self.status.lock().unwrap().state = state;
    }

    fn set_error(&self, message: String) {
        let mut status = self.status.lock().unwrap();
        status.state = TunnelState::Error;
        status.error = Some(message);
    }

    /// Ensures the helper binary, tunnel registration, and config files are in place, spawns the
    /// helper, and resolves once its stderr reports the registration line (or the startup
    /// timeout elapses).
    pub async fn start(&self) -> TunnelResult<TunnelStatus> {
        {
            let current = self.status.lock().unwrap().state;
            if matches!(current, TunnelState::Active | TunnelState::Starting) {
                return Err(TunnelError::AlreadyInState(current.as_str()));
            }
        }
        self.set_state(TunnelState::Starting);

        match self.start_inner().await {
            Ok(status) => Ok(status),
            Err(err) => {
                self.set_error(err.to_string());
                Err(err)
            }
        }
    }

    async fn start_inner(&self) -> TunnelResult<TunnelStatus> {
        let device_id = self.ensure_device_id().await?;

        let helper_path = match helper::locate_helper(self.bundled_resources_dir.as_deref(), &self.data_dir) {
            Some(path) => path,
            None => helper::download_helper(&self.client, &self.data_dir).await?,
        };

        let registration = self.ensure_registration(&device_id).await?;
        config::write_helper_config(&self.data_dir, &registration, &self.local_host, self.local_port)?;

        self.spawn_and_await_registration(&helper_path, &registration).await?;

        {
            let mut status = self.status.lock().unwrap();
            status.state = TunnelState::Active;
            status.tunnel_id = Some(registration.tunnel_id.clone());
            status.subdomain = Some(registration.subdomain.clone());
            status.domain = Some(registration.domain.clone());
            status.hostname = Some(format!("{}.{}", registration.subdomain, registration.domain));
            status.error = None;
        }
        Ok(self.status())
    }

    async fn ensure_device_id(&self) -> TunnelResult<String> {
        if let Some(existing) = self.storage.get_tunnel_config().await? {
            return Ok(existing.device_id);
        }
        let row_id = uuid::Uuid::new_v4().to_string();
        let device_id = uuid::Uuid::new_v4().to_string();
        let config = self.storage.ensure_tunnel_config(row_id, device_id).await?;
        Ok(config.device_id)
    }

    /// Reuses this device's prior tunnel registration if one exists; otherwise registers a new
    /// one against the tunnel API and persists it.
    async fn ensure_registration(&self, device_id: &str) -> TunnelResult<TunnelRegistration> {
        let existing = self.storage.get_tunnel_config().await?;
        if let Some(cfg) = &existing
            && let (Some(tunnel_id), Some(subdomain), Some(domain)) =
                (&cfg.tunnel_id, &cfg.subdomain, &cfg.domain)
        {
            let credentials = cfg
                .credentials_encrypted
                .as_deref()
                .and_then(|raw| serde_json::from_str(raw).ok())
                .unwrap_or(serde_json::Value::Null);
            return Ok(TunnelRegistration {
                tunnel_id: tunnel_id.clone(),
                subdomain: subdomain.clone(),
                domain: domain.clone(),
                credentials,
            });
        }

        let registration = api::register_tunnel(&self.client, &self.tunnel_api_base_url, device_id).await?;
        let row_id = existing.map(|cfg| cfg.id).unwrap_or_else(|| device_id.to_string());
        self.storage
            .record_tunnel_registration(
                &row_id,
                registration.tunnel_id.clone(),
                registration.subdomain.clone(),
                registration.domain.clone(),
                format!("{}.{}", registration.subdomain, registration.domain),
                registration.credentials.to_string(),
            )
            .await?;
        Ok(registration)
    }

    async fn spawn_and_await_registration(
        &self,
        helper_path: &std::path::Path,
        registration: &TunnelRegistration,
    ) -> TunnelResult<()> {
        let mut child = Command::new(helper_path)
            .arg("tunnel")
            .arg("--config")
            .arg(config::yaml_config_path(&self.data_dir))
            .arg("run")
            .arg(&registration.tunnel_id)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child.stderr.take().expect("stderr was piped at spawn");
        let mut lines = BufReader::new(stderr).lines();

        {
            let mut status = self.status.lock().unwrap();
            status.pid = child.id();
        }
        *self.child.lock().await = Some(child);

        let wait_for_registration = async {
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(line = %line, "tunnel helper stderr");
                if line.contains(REGISTRATION_LINE) {
                    return Ok(());
                }
            }
            Err(TunnelError::Other("helper exited before registering".to_string()))
        };

        match timeout(STARTUP_TIMEOUT, wait_for_registration).await {
            Ok(result) => result?,
            Err(_) => return Err(TunnelError::RegistrationTimeout(STARTUP_TIMEOUT.as_secs())),
        }

        self.spawn_exit_watcher(lines);
        Ok(())
    }

    /// Keeps draining the helper's stderr after registration and, if it exits unexpectedly while
    /// the supervisor still believes it is `active`, restarts it with a delay, up to a fixed
    /// number of attempts.
    fn spawn_exit_watcher(&self, mut lines: Lines<BufReader<ChildStderr>>) {
        let supervisor = self.clone();

        tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(line = %line, "tunnel helper stderr");
            }

            let still_active = supervisor.status.lock().unwrap().state == TunnelState::Active;
            if !still_active {
                return;
            }

            *supervisor.child.lock().await = None;

            let mut attempt = 0u32;
            loop {
                attempt += 1;
                if attempt > MAX_RESTART_ATTEMPTS {
                    supervisor.set_error(
                        "tunnel helper exited unexpectedly and exhausted restart attempts".to_string(),
                    );
                    return;
                }
                tokio::time::sleep(RESTART_DELAY).await;
                match supervisor.start_inner().await {
                    Ok(_) => return,
                    Err(err) => {
                        tracing::warn!(error = %err, attempt, "tunnel helper restart attempt failed");
                    }
                }
            }
        });
    }

    /// Sends graceful termination (`SIGTERM` on Unix), then forced termination after a
    /// 5-second grace window.
    pub async fn stop(&self) -> TunnelResult<TunnelStatus> {
        self.set_state(TunnelState::Stopping);

        let mut guard = self.child.lock().await;
        if let Some(mut child) = guard.take() {
            #[cfg(unix)]
            if let Some(pid) = child.id() {
                unsafe {
                    libc::kill(pid as libc::pid_t, libc::SIGTERM);
                }
            }
            #[cfg(not(unix))]
            let _ = child.start_kill();

            if timeout(STOP_GRACE, child.wait()).await.is_err() {
                let _ = child.start_kill();
                let _ = child.wait().await;
            }
        }
        drop(guard);

        let mut status = self.status.lock().unwrap();
        status.state = TunnelState::Inactive;
        status.pid = None;
        status.error = None;
        Ok(status.clone())
    }
}
