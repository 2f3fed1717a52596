use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use time::OffsetDateTime;

use crate::entities::conversation::{
    ActiveModel as ConversationActiveModel, Column as ConversationColumn,
    Entity as ConversationEntity, Model as ConversationModel,
};
use crate::entities::message::{
    ActiveModel as MessageActiveModel, Column as MessageColumn, Entity as MessageEntity,
    Model as MessageModel,
};
use crate::error::{StorageError, StorageResult};

use super::Storage;

impl Storage {
    pub async fn list_conversations(&self) -> StorageResult<Vec<ConversationModel>> {
        Ok(ConversationEntity::find()
            .order_by_desc(ConversationColumn::UpdatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn get_conversation(&self, id: &str) -> StorageResult<Option<ConversationModel>> {
        Ok(ConversationEntity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn create_conversation(
        &self,
        id: String,
        title: Option<String>,
        provider_id: Option<String>,
        proxy_id: Option<String>,
        model: String,
    ) -> StorageResult<ConversationModel> {
        let now = OffsetDateTime::now_utc();
        let active = ConversationActiveModel {
            id: Set(id),
            title: Set(title),
            provider_id: Set(provider_id),
            proxy_id: Set(proxy_id),
            model: Set(model),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(active.insert(&self.db).await?)
    }

    pub async fn update_conversation_title(
        &self,
        id: &str,
        title: Option<String>,
    ) -> StorageResult<()> {
        let existing = self
            .get_conversation(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("conversation {id}")))?;
        let mut active: ConversationActiveModel = existing.into();
        active.title = Set(title);
        active.updated_at = Set(OffsetDateTime::now_utc());
        active.update(&self.db).await?;
        Ok(())
    }

    pub async fn touch_conversation(&self, id: &str) -> StorageResult<()> {
        let Some(existing) = self.get_conversation(id).await? else {
            return Ok(());
        };
        let mut active: ConversationActiveModel = existing.into();
        active.updated_at = Set(OffsetDateTime::now_utc());
        active.update(&self.db).await?;
        Ok(())
    }

    pub async fn delete_conversation(&self, id: &str) -> StorageResult<()> {
        ConversationEntity::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }

    pub async fn get_messages(&self, conversation_id: &str) -> StorageResult<Vec<MessageModel>> {
        Ok(MessageEntity::find()
            .filter(MessageColumn::ConversationId.eq(conversation_id))
            .order_by_asc(MessageColumn::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn insert_message(
        &self,
        id: String,
        conversation_id: String,
        role: String,
        content: String,
        reasoning_content: Option<String>,
    ) -> StorageResult<MessageModel> {
        let active = MessageActiveModel {
            id: Set(id),
            conversation_id: Set(conversation_id),
            role: Set(role),
            content: Set(content),
            reasoning_content: Set(reasoning_content),
            created_at: Set(OffsetDateTime::now_utc()),
        };
        Ok(active.insert(&self.db).await?)
    }

    pub async fn delete_message(&self, id: &str) -> StorageResult<()> {
        MessageEntity::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }

    /// Deletes `id` and whichever message immediately follows it in the same conversation
    /// (the user/assistant turn it produced), used by `chat.delete-message-pair`.
    pub async fn delete_message_pair(&self, id: &str) -> StorageResult<()> {
        let Some(target) = MessageEntity::find_by_id(id).one(&self.db).await? else {
            return Ok(());
        };
        let next = MessageEntity::find()
            .filter(MessageColumn::ConversationId.eq(target.conversation_id.clone()))
            .filter(MessageColumn::CreatedAt.gt(target.created_at))
            .order_by_asc(MessageColumn::CreatedAt)
            .one(&self.db)
            .await?;

        MessageEntity::delete_by_id(id).exec(&self.db).await?;
        if let Some(next) = next {
            MessageEntity::delete_by_id(next.id).exec(&self.db).await?;
        }
        Ok(())
    }

    pub async fn messages_before(
        &self,
        conversation_id: &str,
        before: OffsetDateTime,
    ) -> StorageResult<Vec<MessageModel>> {
        Ok(MessageEntity::find()
            .filter(MessageColumn::ConversationId.eq(conversation_id))
            .filter(MessageColumn::CreatedAt.lt(before))
            .order_by_asc(MessageColumn::CreatedAt)
            .all(&self.db)
            .await?)
    }
}
