use crate::proxy_service::{ProxyServiceMetrics, ProxyServiceStatus, ProxyServiceSupervisor};

/// Implements `proxy-service: start | stop | restart | status | metrics`.
pub struct ProxyServiceService {
    supervisor: ProxyServiceSupervisor,
}

impl ProxyServiceService {
    pub fn new(supervisor: ProxyServiceSupervisor) -> Self {
        Self { supervisor }
    }

    pub fn start(&self) -> ProxyServiceStatus {
        self.supervisor.start()
    }

    pub fn stop(&self) -> ProxyServiceStatus {
        self.supervisor.stop()
    }

    pub fn restart(&self) -> ProxyServiceStatus {
        self.supervisor.restart()
    }

    pub fn status(&self) -> ProxyServiceStatus {
        self.supervisor.status()
    }

    pub fn metrics(&self) -> ProxyServiceMetrics {
        self.supervisor.metrics()
    }
}
