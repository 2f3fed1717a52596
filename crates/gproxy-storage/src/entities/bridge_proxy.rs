use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

/// `outbound_kind` discriminates whether `outbound_id` names a [`super::provider`] row or
/// another `BridgeProxy` row; the FK is polymorphic and not enforced at the schema level.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "bridge_proxies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub inbound_adapter_id: String,
    pub outbound_kind: String,
    pub outbound_id: String,
    #[sea_orm(unique_key = "bridge_proxy_path")]
    pub proxy_path: String,
    pub enabled: bool,
    pub sort_order: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    #[sea_orm(has_many)]
    pub model_mappings: HasMany<super::model_mapping::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
