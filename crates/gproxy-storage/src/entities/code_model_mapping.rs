use sea_orm::entity::prelude::*;

/// Unique on `(code_switch_id, provider_id, source_model, mapping_type)`. Deactivating a
/// [`super::code_switch_config`] set never deletes its historical mapping rows.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "code_model_mappings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique_key = "code_model_mapping_key")]
    pub code_switch_id: String,
    #[sea_orm(unique_key = "code_model_mapping_key")]
    pub provider_id: String,
    #[sea_orm(unique_key = "code_model_mapping_key")]
    pub source_model: String,
    /// `exact | family | reasoning | default`.
    #[sea_orm(unique_key = "code_model_mapping_key")]
    pub mapping_type: String,
    pub target_model: String,
    #[sea_orm(belongs_to, from = "code_switch_id", to = "id", on_delete = "Cascade")]
    pub code_switch: HasOne<super::code_switch_config::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
