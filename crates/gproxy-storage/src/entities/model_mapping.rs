use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "model_mappings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub proxy_id: String,
    /// `None` marks this row as the proxy's default (catch-all) mapping.
    pub source_model: Option<String>,
    pub target_model: String,
    pub is_default: bool,
    #[sea_orm(belongs_to, from = "proxy_id", to = "id", on_delete = "Cascade")]
    pub proxy: HasOne<super::bridge_proxy::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
