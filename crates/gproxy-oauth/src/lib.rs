pub mod callback;
pub mod error;
pub mod flow;
pub mod health;
pub mod jwt;
pub mod pkce;
pub mod pool;
pub mod providers;
pub mod refresh;
pub mod scheduler;

pub use callback::{await_authorization_code, CallbackResult};
pub use error::{OAuthError, OAuthResult};
pub use flow::authorize;
pub use health::{CallOutcome, HealthState};
pub use pool::PoolSelector;
pub use refresh::{RefreshedTokens, TokenRefresher};
pub use scheduler::RefreshScheduler;
