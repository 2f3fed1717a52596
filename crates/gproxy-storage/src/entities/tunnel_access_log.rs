use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tunnel_access_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub at: OffsetDateTime,
    pub source_ip: Option<String>,
    pub method: String,
    pub path: String,
    pub status: i32,
    pub latency_ms: i64,
    pub bytes_up: i64,
    pub bytes_down: i64,
}

impl ActiveModelBehavior for ActiveModel {}
