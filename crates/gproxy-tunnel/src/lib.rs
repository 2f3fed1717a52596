//! Supervises the external tunnel helper: locating or downloading its binary, registering the
//! device with the tunnel API, writing its config, and spawning/monitoring/restarting/stopping
//! the subprocess. Also folds access logs into daily stats for the tunnel UI surfaces.

pub mod api;
pub mod config;
pub mod error;
pub mod helper;
pub mod stats;
pub mod status;
pub mod supervisor;

pub use error::{TunnelError, TunnelResult};
pub use stats::{record_request, TunnelRequestObserved};
pub use status::{TunnelState, TunnelStatus};
pub use supervisor::TunnelSupervisor;
