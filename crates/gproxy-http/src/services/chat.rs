use std::collections::HashMap;
use std::sync::{Arc, Mutex as SyncMutex};

use futures_util::StreamExt;
use gproxy_bridge::client::{UpstreamClient, UpstreamTarget};
use gproxy_bridge::registry::AdapterRegistry;
use gproxy_common::Vault;
use gproxy_ir::{GenerationConfig, Message, MessageContent, RequestIr, Role, StreamEvent};
use gproxy_oauth::PoolSelector;
use gproxy_protocol::sse::SseParser;
use gproxy_storage::entities::conversation::Model as ConversationModel;
use gproxy_storage::entities::message::Model as MessageModel;
use gproxy_storage::Storage;
use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::{HttpError, HttpResult};
use crate::events::{AdminEvent, EventBus};

/// Mirrors the depth the storage layer enforces on proxy chains at write time
/// (`gproxy_storage::repo::proxies::MAX_CHAIN_DEPTH`).
const MAX_CHAIN_DEPTH: usize = 16;

#[derive(Debug, Serialize)]
pub struct ConversationView {
    pub id: String,
    pub title: Option<String>,
    pub provider_id: Option<String>,
    pub proxy_id: Option<String>,
    pub model: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<ConversationModel> for ConversationView {
    fn from(model: ConversationModel) -> Self {
        Self {
            id: model.id,
            title: model.title,
            provider_id: model.provider_id,
            proxy_id: model.proxy_id,
            model: model.model,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageView {
    pub id: String,
    pub conversation_id: String,
    pub role: String,
    pub content: String,
    pub reasoning_content: Option<String>,
    pub created_at: OffsetDateTime,
}

impl From<MessageModel> for MessageView {
    fn from(model: MessageModel) -> Self {
        Self {
            id: model.id,
            conversation_id: model.conversation_id,
            role: model.role,
            content: model.content,
            reasoning_content: model.reasoning_content,
            created_at: model.created_at,
        }
    }
}

/// One outstanding stop signal per conversation with an in-flight stream. Registering a new
/// stream for a conversation replaces any stale sender left by a prior stream.
#[derive(Clone, Default)]
pub struct ChatCancellations {
    inner: Arc<SyncMutex<HashMap<String, watch::Sender<bool>>>>,
}

impl ChatCancellations {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, conversation_id: &str) -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(false);
        self.inner.lock().unwrap().insert(conversation_id.to_string(), tx);
        rx
    }

    fn clear(&self, conversation_id: &str) {
        self.inner.lock().unwrap().remove(conversation_id);
    }

    pub fn stop(&self, conversation_id: &str) -> bool {
        match self.inner.lock().unwrap().get(conversation_id) {
            Some(tx) => {
                let _ = tx.send(true);
                true
            }
            None => false,
        }
    }
}

/// Implements `chat: list-conversations | get-conversation | create-conversation |
/// update-conversation | delete-conversation | get-messages | send-message | stop-streaming |
/// delete-message | delete-message-pair | regenerate`.
///
/// Unlike the tenant-facing bridge, this drives its own minimal IR pipeline: conversation turns
/// are built straight from stored messages (never parsed from a vendor dialect), and upstream
/// stream events are forwarded to the admin surface as named push events instead of being
/// re-encoded into wire-format SSE.
pub struct ChatService {
    storage: Storage,
    vault: Arc<Vault>,
    adapters: Arc<AdapterRegistry>,
    client: UpstreamClient,
    events: Arc<EventBus>,
    pool_selector: PoolSelector,
    pub cancellations: ChatCancellations,
}

impl ChatService {
    pub fn new(storage: Storage, vault: Arc<Vault>, adapters: Arc<AdapterRegistry>, events: Arc<EventBus>) -> HttpResult<Self> {
        Ok(Self {
            storage,
            vault,
            adapters,
            client: UpstreamClient::new()?,
            events,
            pool_selector: PoolSelector::new(),
            cancellations: ChatCancellations::new(),
        })
    }

    pub async fn list_conversations(&self) -> HttpResult<Vec<ConversationView>> {
        Ok(self.storage.list_conversations().await?.into_iter().map(Into::into).collect())
    }

    pub async fn get_conversation(&self, id: &str) -> HttpResult<ConversationView> {
        self.storage.get_conversation(id).await?.map(Into::into).ok_or_else(|| HttpError::NotFound(id.to_string()))
    }

    /// Exactly one of `provider_id`/`proxy_id` must be set; the caller (admin route handler)
    /// validates this before calling through.
    pub async fn create_conversation(
        &self,
        title: Option<String>,
        provider_id: Option<String>,
        proxy_id: Option<String>,
        model: String,
    ) -> HttpResult<ConversationView> {
        if provider_id.is_some() == proxy_id.is_some() {
            return Err(HttpError::Validation("exactly one of provider_id/proxy_id is required".to_string()));
        }
        let id = Uuid::new_v4().to_string();
        Ok(self.storage.create_conversation(id, title, provider_id, proxy_id, model).await?.into())
    }

    pub async fn update_conversation(&self, id: &str, title: Option<String>) -> HttpResult<()> {
        Ok(self.storage.update_conversation_title(id, title).await?)
    }

    pub async fn delete_conversation(&self, id: &str) -> HttpResult<()> {
        Ok(self.storage.delete_conversation(id).await?)
    }

    pub async fn get_messages(&self, conversation_id: &str) -> HttpResult<Vec<MessageView>> {
        Ok(self.storage.get_messages(conversation_id).await?.into_iter().map(Into::into).collect())
    }

    pub async fn delete_message(&self, id: &str) -> HttpResult<()> {
        Ok(self.storage.delete_message(id).await?)
    }

    pub async fn delete_message_pair(&self, id: &str) -> HttpResult<()> {
        Ok(self.storage.delete_message_pair(id).await?)
    }

    /// Persists the user's message, then drives the upstream call and streams IR events to the
    /// admin event bus under `chat:stream-*` names keyed by conversation id.
    pub async fn send_message(&self, conversation_id: &str, user_text: String) -> HttpResult<()> {
        let conversation = self
            .storage
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| HttpError::NotFound(conversation_id.to_string()))?;

        self.storage
            .insert_message(Uuid::new_v4().to_string(), conversation_id.to_string(), "user".to_string(), user_text, None)
            .await?;

        self.run_completion(conversation).await
    }

    /// Deletes the most recent assistant/user turn and re-runs the call with the same history.
    pub async fn regenerate(&self, conversation_id: &str) -> HttpResult<()> {
        let conversation = self
            .storage
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| HttpError::NotFound(conversation_id.to_string()))?;
        let messages = self.storage.get_messages(conversation_id).await?;
        if let Some(last) = messages.last() {
            if last.role == "assistant" {
                self.storage.delete_message(&last.id).await?;
            }
        }
        self.run_completion(conversation).await
    }

    pub fn stop_streaming(&self, conversation_id: &str) -> bool {
        self.cancellations.stop(conversation_id)
    }

    async fn run_completion(&self, conversation: ConversationModel) -> HttpResult<()> {
        let conversation_id = conversation.id.clone();
        let history = self.storage.get_messages(&conversation_id).await?;
        let messages = history
            .iter()
            .map(|row| Message {
                role: match row.role.as_str() {
                    "assistant" => Role::Assistant,
                    "system" => Role::System,
                    "tool" => Role::Tool,
                    _ => Role::User,
                },
                content: MessageContent::Text(row.content.clone()),
                tool_calls: None,
                tool_call_id: None,
            })
            .collect();

        let ir = RequestIr {
            model: conversation.model.clone(),
            messages,
            system: None,
            tools: None,
            tool_choice: None,
            stream: true,
            generation: GenerationConfig::default(),
            metadata: Default::default(),
            extensions: Default::default(),
        };

        let (adapter_type, target) = self.resolve_target(&conversation).await?;
        let adapter = self.adapters.get(&adapter_type).map_err(|_| HttpError::Validation(format!("unknown adapter '{adapter_type}'")))?;
        let body = adapter
            .build_request(&ir)
            .map_err(|err| HttpError::Validation(err.to_string()))?;

        let response = self.client.send(&target, &ir.model, body).await?;
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let bytes = response.bytes().await.unwrap_or_default();
            let error = adapter.parse_error(&bytes, status);
            self.events.publish(AdminEvent::new(
                "chat:stream-error",
                serde_json::json!({"conversationId": conversation_id, "message": error.message}),
            ));
            return Err(HttpError::Validation(error.message));
        }

        let mut cancel_rx = self.cancellations.register(&conversation_id);
        let cancellations = self.cancellations.clone();
        let storage = self.storage.clone();
        let events = Arc::clone(&self.events);
        let pool_account_id = self.pool_provider_account(&conversation).await;

        tokio::spawn(async move {
            let mut parser = SseParser::new();
            let mut byte_stream = response.bytes_stream();
            let mut content = String::new();
            let mut reasoning = String::new();

            'pump: loop {
                tokio::select! {
                    _ = cancel_rx.changed() => {
                        if *cancel_rx.borrow() {
                            break 'pump;
                        }
                    }
                    item = byte_stream.next() => {
                        let Some(item) = item else { break };
                        let Ok(chunk) = item else { break };
                        for frame in parser.push_bytes(&chunk) {
                            let Ok(Some(ir_events)) = adapter.parse_stream_event(&frame) else { continue };
                            for event in ir_events {
                                match &event {
                                    StreamEvent::Start { .. } => {
                                        events.publish(AdminEvent::new(
                                            "chat:stream-start",
                                            serde_json::json!({"conversationId": conversation_id}),
                                        ));
                                    }
                                    StreamEvent::Content { delta, .. } => {
                                        content.push_str(delta);
                                        events.publish(AdminEvent::new(
                                            "chat:stream-content",
                                            serde_json::json!({"conversationId": conversation_id, "delta": delta}),
                                        ));
                                    }
                                    StreamEvent::Reasoning { delta, .. } => {
                                        reasoning.push_str(delta);
                                        events.publish(AdminEvent::new(
                                            "chat:stream-reasoning",
                                            serde_json::json!({"conversationId": conversation_id, "delta": delta}),
                                        ));
                                    }
                                    StreamEvent::ToolCall { .. } => {
                                        // No named push event for tool calls in the admin test-chat surface.
                                    }
                                    StreamEvent::End { finish_reason, usage, .. } => {
                                        events.publish(AdminEvent::new(
                                            "chat:stream-end",
                                            serde_json::json!({
                                                "conversationId": conversation_id,
                                                "finishReason": finish_reason,
                                                "usage": usage,
                                            }),
                                        ));
                                    }
                                    StreamEvent::Error { error, .. } => {
                                        events.publish(AdminEvent::new(
                                            "chat:stream-error",
                                            serde_json::json!({"conversationId": conversation_id, "message": error.message}),
                                        ));
                                    }
                                }
                            }
                        }
                    }
                }
            }

            if !content.is_empty() || !reasoning.is_empty() {
                let reasoning_content = if reasoning.is_empty() { None } else { Some(reasoning) };
                let _ = storage
                    .insert_message(Uuid::new_v4().to_string(), conversation_id.clone(), "assistant".to_string(), content, reasoning_content)
                    .await;
            }
            let _ = storage.touch_conversation(&conversation_id).await;

            if let Some(account_id) = pool_account_id {
                let _ = storage.touch_oauth_account_used(&account_id).await;
            }

            cancellations.clear(&conversation_id);
        });

        Ok(())
    }

    async fn resolve_target(&self, conversation: &ConversationModel) -> HttpResult<(String, UpstreamTarget)> {
        if let Some(provider_id) = &conversation.provider_id {
            let provider = self
                .storage
                .get_provider(provider_id)
                .await?
                .ok_or_else(|| HttpError::NotFound(provider_id.clone()))?;
            if provider.is_pool {
                let provider_type = provider
                    .oauth_provider_type
                    .clone()
                    .ok_or_else(|| HttpError::Validation("pool provider missing oauth_provider_type".to_string()))?;
                let account_id = self
                    .pool_selector
                    .select(&self.storage, &provider_type, &Default::default())
                    .await
                    .map_err(|_| HttpError::Validation(format!("no healthy {provider_type} account available")))?;
                let account = self
                    .storage
                    .get_oauth_account(&account_id)
                    .await?
                    .ok_or_else(|| HttpError::NotFound(account_id.clone()))?;
                let access_token = self.vault.decrypt(&account.access_token_encrypted)?;
                return Ok((
                    provider.adapter_type.clone(),
                    UpstreamTarget {
                        base_url: provider.base_url,
                        chat_path: provider.chat_path,
                        adapter_type: provider.adapter_type,
                        api_key: access_token,
                    },
                ));
            }
            let adapter_type = provider.adapter_type.clone();
            let target = gproxy_bridge::route::target_for_provider(&provider, &self.vault)?;
            return Ok((adapter_type, target));
        }

        let proxy_id = conversation
            .proxy_id
            .as_ref()
            .ok_or_else(|| HttpError::Validation("conversation has neither provider_id nor proxy_id".to_string()))?;
        let route = self.resolve_proxy_chain(proxy_id).await?;
        let adapter_type = route.adapter_type.clone();
        let target = gproxy_bridge::route::target_for_provider(&route, &self.vault)?;
        Ok((adapter_type, target))
    }

    /// Walks a proxy's outbound chain to its terminal provider. Duplicates the depth-bounded walk
    /// `gproxy_bridge::route::resolve_by_path` does internally (that helper is path-keyed and
    /// private past its public entry point), capped at the same depth the storage layer enforces
    /// at write time.
    async fn resolve_proxy_chain(&self, proxy_id: &str) -> HttpResult<gproxy_storage::entities::provider::Model> {
        let mut kind = "proxy".to_string();
        let mut id = proxy_id.to_string();

        for _ in 0..MAX_CHAIN_DEPTH {
            match kind.as_str() {
                "provider" => {
                    return self.storage.get_provider(&id).await?.ok_or_else(|| HttpError::NotFound(id));
                }
                "proxy" => {
                    let proxy = self.storage.get_proxy(&id).await?.ok_or_else(|| HttpError::NotFound(id.clone()))?;
                    if !proxy.enabled {
                        return Err(HttpError::NotFound(id));
                    }
                    kind = proxy.outbound_kind;
                    id = proxy.outbound_id;
                }
                other => return Err(HttpError::Validation(format!("unknown outbound kind '{other}'"))),
            }
        }
        Err(HttpError::Validation("proxy outbound chain too deep".to_string()))
    }

    async fn pool_provider_account(&self, conversation: &ConversationModel) -> Option<String> {
        let provider_id = conversation.provider_id.as_ref()?;
        let provider = self.storage.get_provider(provider_id).await.ok()??;
        if !provider.is_pool {
            return None;
        }
        provider.oauth_account_id
    }
}
