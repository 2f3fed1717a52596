use sea_orm::entity::prelude::*;

/// Typed key/value store; `value_json` holds the JSON-encoded setting value. Keys are the
/// dotted names enumerated under the local HTTP front-end's `Enumerated setting keys`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    pub value_json: Json,
}

impl ActiveModelBehavior for ActiveModel {}
