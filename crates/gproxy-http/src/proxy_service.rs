use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use serde::Serialize;
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize)]
pub struct ProxyServiceStatus {
    pub running: bool,
    pub started_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProxyServiceMetrics {
    pub total_requests: u64,
    pub total_errors: u64,
    pub uptime_seconds: i64,
}

struct Inner {
    running: AtomicBool,
    started_at: Mutex<Option<OffsetDateTime>>,
    total_requests: AtomicU64,
    total_errors: AtomicU64,
}

/// Runtime on/off switch for the tenant-facing `/v1/...` surface, gated independently of the
/// admin surface. Mirrors [`gproxy_tunnel::TunnelSupervisor`]'s start/stop/status shape for a
/// service that, unlike the tunnel helper, never leaves this process: "stopped" means the gate
/// middleware in `proxy_routes` answers 503 to every tenant request, not that a listener unbinds.
#[derive(Clone)]
pub struct ProxyServiceSupervisor {
    inner: Arc<Inner>,
}

impl Default for ProxyServiceSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxyServiceSupervisor {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                running: AtomicBool::new(true),
                started_at: Mutex::new(Some(OffsetDateTime::now_utc())),
                total_requests: AtomicU64::new(0),
                total_errors: AtomicU64::new(0),
            }),
        }
    }

    pub fn start(&self) -> ProxyServiceStatus {
        self.inner.running.store(true, Ordering::SeqCst);
        *self.inner.started_at.lock().unwrap() = Some(OffsetDateTime::now_utc());
        self.status()
    }

    pub fn stop(&self) -> ProxyServiceStatus {
        self.inner.running.store(false, Ordering::SeqCst);
        *self.inner.started_at.lock().unwrap() = None;
        self.status()
    }

    pub fn restart(&self) -> ProxyServiceStatus {
        self.stop();
        self.start()
    }

    pub fn status(&self) -> ProxyServiceStatus {
        let started_at = *self.inner.started_at.lock().unwrap();
        ProxyServiceStatus {
            running: self.inner.running.load(Ordering::SeqCst),
            started_at: started_at
                .and_then(|at| at.format(&time::format_description::well_known::Rfc3339).ok()),
        }
    }

    pub fn metrics(&self) -> ProxyServiceMetrics {
        let started_at = *self.inner.started_at.lock().unwrap();
        let uptime_seconds = started_at.map(|at| (OffsetDateTime::now_utc() - at).whole_seconds()).unwrap_or(0);
        ProxyServiceMetrics {
            total_requests: self.inner.total_requests.load(Ordering::Relaxed),
            total_errors: self.inner.total_errors.load(Ordering::Relaxed),
            uptime_seconds,
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub fn record_request(&self, status: u16) {
        self.inner.total_requests.fetch_add(1, Ordering::Relaxed);
        if status == 0 || status >= 500 {
            self.inner.total_errors.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_running_and_tracks_uptime() {
        let supervisor = ProxyServiceSupervisor::new();
        assert!(supervisor.is_running());
        assert!(supervisor.status().started_at.is_some());
    }

    #[test]
    fn stop_gates_requests_until_started_again() {
        let supervisor = ProxyServiceSupervisor::new();
        supervisor.stop();
        assert!(!supervisor.is_running());
        assert!(supervisor.status().started_at.is_none());

        supervisor.start();
        assert!(supervisor.is_running());
    }

    #[test]
    fn metrics_count_requests_and_server_errors() {
        let supervisor = ProxyServiceSupervisor::new();
        supervisor.record_request(200);
        supervisor.record_request(502);
        supervisor.record_request(404);

        let metrics = supervisor.metrics();
        assert_eq!(metrics.total_requests, 3);
        assert_eq!(metrics.total_errors, 1);
    }

    #[test]
    fn restart_resets_started_at() {
        let supervisor = ProxyServiceSupervisor::new();
        let first = supervisor.status().started_at;
        supervisor.restart();
        assert!(supervisor.is_running());
        assert!(supervisor.status().started_at.is_some());
        let _ = first;
    }
}
