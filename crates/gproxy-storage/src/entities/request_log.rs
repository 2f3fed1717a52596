use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "request_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Null for passthrough requests, which have no owning [`super::bridge_proxy`] row.
    pub proxy_id: Option<String>,
    pub proxy_path: String,
    pub source_model: Option<String>,
    pub target_model: Option<String>,
    pub http_status: Option<i32>,
    pub input_tokens: Option<i64>,
    pub output_tokens: Option<i64>,
    pub latency_ms: Option<i64>,
    pub request_body: Option<Vec<u8>>,
    pub response_body: Option<Vec<u8>>,
    pub error: Option<String>,
    pub source: String,
    pub created_at: OffsetDateTime,
    #[sea_orm(belongs_to, from = "proxy_id", to = "id", on_delete = "SetNull")]
    pub proxy: HasOne<super::bridge_proxy::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
