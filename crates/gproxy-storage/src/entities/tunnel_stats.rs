use sea_orm::entity::prelude::*;
use time::Date;

/// One row per calendar day; `avg_latency_ms` is request-weighted when a new batch is folded in.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tunnel_stats")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique_key = "tunnel_stats_day")]
    pub day: Date,
    pub requests: i64,
    pub bytes_up: i64,
    pub bytes_down: i64,
    pub errors: i64,
    pub avg_latency_ms: f64,
    pub unique_ips: i64,
}

impl ActiveModelBehavior for ActiveModel {}
