use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

/// Singleton row (one per install); the device id is generated once and persisted forever.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tunnel_configs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique_key = "tunnel_config_device_id")]
    pub device_id: String,
    pub tunnel_id: Option<String>,
    pub subdomain: Option<String>,
    pub domain: Option<String>,
    pub hostname: Option<String>,
    pub credentials_encrypted: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl ActiveModelBehavior for ActiveModel {}
