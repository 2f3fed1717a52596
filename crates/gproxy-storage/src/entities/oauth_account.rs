use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

/// Invariants (enforced in the repository layer, not the schema): `consecutive_failures >= 0`;
/// `is_active = false` whenever `health_status` is `expired`/`forbidden` or
/// `consecutive_failures >= 3`; `health_status = active` implies `error_message` is null and
/// `consecutive_failures = 0`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "oauth_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// `codex | antigravity`.
    pub provider_type: String,
    pub email: String,
    pub access_token_encrypted: String,
    pub refresh_token_encrypted: String,
    pub expires_at: OffsetDateTime,
    pub token_type: String,
    pub is_active: bool,
    /// `active | rate_limited | expired | forbidden | error`.
    pub health_status: String,
    pub consecutive_failures: i32,
    pub error_message: Option<String>,
    pub pool_enabled: bool,
    pub pool_weight: i32,
    pub last_used_at: Option<OffsetDateTime>,
    pub last_refresh_at: Option<OffsetDateTime>,
    pub metadata_json: Json,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl ActiveModelBehavior for ActiveModel {}
