use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

/// Diagnostic log for the tunnel supervisor's own lifecycle (start/stop/crash/restart), distinct
/// from the public-facing [`super::tunnel_access_log`].
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tunnel_system_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub at: OffsetDateTime,
    /// `debug | info | warn | error`.
    pub level: String,
    pub message: String,
}

impl ActiveModelBehavior for ActiveModel {}
