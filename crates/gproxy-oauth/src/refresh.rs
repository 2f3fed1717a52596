use async_trait::async_trait;
use time::OffsetDateTime;

use crate::error::OAuthResult;

pub struct RefreshedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: OffsetDateTime,
    pub id_token: Option<String>,
}

/// Implemented once per provider specialization (Codex, Antigravity); the scheduler and pool
/// selector are provider-agnostic and only depend on this trait.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> OAuthResult<RefreshedTokens>;
}
