use sea_orm::entity::prelude::*;
use time::OffsetDateTime;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "messages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub conversation_id: String,
    /// `user | assistant | system`.
    pub role: String,
    pub content: String,
    pub reasoning_content: Option<String>,
    pub created_at: OffsetDateTime,
    #[sea_orm(belongs_to, from = "conversation_id", to = "id", on_delete = "Cascade")]
    pub conversation: HasOne<super::conversation::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
