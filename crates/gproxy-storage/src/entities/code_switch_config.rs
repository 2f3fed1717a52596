use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

/// Per-CLI (`claude-code` / `codex`) binding of a provider and its source→target model map.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "code_switch_configs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// `claude-code | codex`.
    pub cli: String,
    pub provider_id: String,
    pub active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    #[sea_orm(has_many)]
    pub mappings: HasMany<super::code_model_mapping::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
