use serde::{Deserialize, Serialize};

/// Lifecycle of the tunnel supervisor. Any unexpected failure from the helper process or the
/// tunnel API moves the supervisor to `Error` regardless of which state it was in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TunnelState {
    Inactive,
    Starting,
    Active,
    Stopping,
    Error,
}

impl TunnelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TunnelState::Inactive => "inactive",
            TunnelState::Starting => "starting",
            TunnelState::Active => "active",
            TunnelState::Stopping => "stopping",
            TunnelState::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TunnelStatus {
    pub state: TunnelState,
    pub tunnel_id: Option<String>,
    pub subdomain: Option<String>,
    pub domain: Option<String>,
    pub hostname: Option<String>,
    pub pid: Option<u32>,
    pub error: Option<String>,
}

impl TunnelStatus {
    pub fn inactive() -> Self {
        Self {
            state: TunnelState::Inactive,
            tunnel_id: None,
            subdomain: None,
            domain: None,
            hostname: None,
            pid: None,
            error: None,
        }
    }
}
