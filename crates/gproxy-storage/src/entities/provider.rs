use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "providers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub display_name: String,
    pub adapter_type: String,
    /// AES-GCM ciphertext from `gproxy_common::Vault`; empty for pool providers.
    pub api_key_encrypted: String,
    pub base_url: String,
    pub chat_path: String,
    pub models_path: String,
    pub cached_model_ids_json: Json,
    pub enabled: bool,
    pub sort_order: i32,
    pub logo: Option<String>,
    pub color: Option<String>,
    pub passthrough: bool,
    #[sea_orm(unique_key = "provider_passthrough_slug")]
    pub passthrough_slug: Option<String>,
    pub is_pool: bool,
    pub pool_strategy: Option<String>,
    pub oauth_account_id: Option<String>,
    pub oauth_provider_type: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl ActiveModelBehavior for ActiveModel {}
