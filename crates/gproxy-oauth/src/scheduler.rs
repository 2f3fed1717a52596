use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use gproxy_common::Vault;
use gproxy_storage::Storage;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::health::{CallOutcome, HealthState};
use crate::refresh::TokenRefresher;

const REFRESH_LEAD_TIME: Duration = Duration::from_secs(15 * 60);
const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Maintains one one-shot timer per account, firing `expires_at - 15min` before expiry, plus an
/// hourly re-sweep that catches accounts missed by a restart or a clock jump.
pub struct RefreshScheduler {
    storage: Storage,
    vault: Arc<Vault>,
    refreshers: HashMap<String, Arc<dyn TokenRefresher>>,
    timers: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl RefreshScheduler {
    pub fn new(
        storage: Storage,
        vault: Arc<Vault>,
        refreshers: HashMap<String, Arc<dyn TokenRefresher>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            storage,
            vault,
            refreshers,
            timers: Mutex::new(HashMap::new()),
        })
    }

    /// Examines every account once at startup, scheduling or firing immediately, then spawns the
    /// hourly re-sweep loop.
    pub async fn start(self: &Arc<Self>) {
        self.sweep_once().await;
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            interval.tick().await;
            loop {
                interval.tick().await;
                this.sweep_once().await;
            }
        });
    }

    async fn sweep_once(self: &Arc<Self>) {
        let Ok(accounts) = self.storage.list_oauth_accounts().await else {
            return;
        };
        for account in accounts {
            if !account.is_active {
                continue;
            }
            self.schedule_for(account.id, account.expires_at).await;
        }
    }

    async fn schedule_for(self: &Arc<Self>, account_id: String, expires_at: OffsetDateTime) {
        let now = OffsetDateTime::now_utc();
        let lead = time::Duration::try_from(REFRESH_LEAD_TIME).unwrap_or(time::Duration::ZERO);
        let fire_at = expires_at - lead;
        let delay = if fire_at <= now {
            Duration::ZERO
        } else {
            Duration::try_from(fire_at - now).unwrap_or(Duration::ZERO)
        };

        let this = Arc::clone(self);
        let id = account_id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.refresh_account(&id).await;
        });

        let mut timers = self.timers.lock().await;
        if let Some(previous) = timers.insert(account_id, handle) {
            previous.abort();
        }
    }

    async fn refresh_account(self: &Arc<Self>, account_id: &str) {
        let Ok(Some(account)) = self.storage.get_oauth_account(account_id).await else {
            return;
        };
        let Some(refresher) = self.refreshers.get(&account.provider_type) else {
            return;
        };

        let refresh_token = match self.vault.decrypt(&account.refresh_token_encrypted) {
            Ok(token) => token,
            Err(_) => {
                let _ = self
                    .storage
                    .record_oauth_failure(account_id, "forbidden", Some("decrypt failure".into()))
                    .await;
                return;
            }
        };

        match refresher.refresh(&refresh_token).await {
            Ok(tokens) => {
                let access_encrypted = self.vault.encrypt(&tokens.access_token).unwrap_or_default();
                let refresh_encrypted =
                    self.vault.encrypt(&tokens.refresh_token).unwrap_or_default();
                let _ = self
                    .storage
                    .record_token_refresh(
                        account_id,
                        access_encrypted,
                        refresh_encrypted,
                        tokens.expires_at,
                    )
                    .await;
                self.schedule_for(account_id.to_string(), tokens.expires_at)
                    .await;
            }
            Err(err) => {
                let health = HealthState {
                    status: account.health_status.clone(),
                    is_active: account.is_active,
                    consecutive_failures: account.consecutive_failures,
                    error_message: account.error_message.clone(),
                }
                .apply(CallOutcome::OtherFailure, Some(err.to_string()));
                let _ = self
                    .storage
                    .record_oauth_failure(account_id, &health.status, health.error_message)
                    .await;
            }
        }
    }
}
