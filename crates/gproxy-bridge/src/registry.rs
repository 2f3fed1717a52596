use std::collections::HashMap;
use std::sync::Arc;

use gproxy_adapters::Adapter;
use gproxy_adapters::anthropic::AnthropicAdapter;
use gproxy_adapters::gemini::GeminiAdapter;
use gproxy_adapters::openai_chat::OpenAiChatAdapter;
use gproxy_adapters::openai_responses::OpenAiResponsesAdapter;

use crate::error::{BridgeError, BridgeResult};

/// Maps an `adapter_type`/`inbound_adapter_id` string (as stored on `providers` and
/// `bridge_proxies` rows) to its adapter implementation. Adapters are held behind `Arc` so a
/// resolved handle can be moved into the spawned streaming task without borrowing the registry.
pub struct AdapterRegistry {
    adapters: HashMap<&'static str, Arc<dyn Adapter>>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        let mut adapters: HashMap<&'static str, Arc<dyn Adapter>> = HashMap::new();
        let anthropic: Arc<dyn Adapter> = Arc::new(AnthropicAdapter::default());
        let openai_chat: Arc<dyn Adapter> = Arc::new(OpenAiChatAdapter::default());
        let openai_responses: Arc<dyn Adapter> = Arc::new(OpenAiResponsesAdapter::default());
        let gemini: Arc<dyn Adapter> = Arc::new(GeminiAdapter::default());
        adapters.insert(anthropic.name(), anthropic);
        adapters.insert(openai_chat.name(), openai_chat);
        adapters.insert(openai_responses.name(), openai_responses);
        adapters.insert(gemini.name(), gemini);
        Self { adapters }
    }
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, adapter_type: &str) -> BridgeResult<Arc<dyn Adapter>> {
        self.adapters
            .get(adapter_type)
            .cloned()
            .ok_or_else(|| BridgeError::RouteNotFound(format!("unknown adapter '{adapter_type}'")))
    }

    /// All registered adapters, for surfaces that enumerate dialect capabilities (e.g. the admin
    /// "available adapters" listing).
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn Adapter>> {
        self.adapters.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_all_four_dialects() {
        let registry = AdapterRegistry::new();
        assert!(registry.get("anthropic").is_ok());
        assert!(registry.get("openai-chat").is_ok());
        assert!(registry.get("openai-responses").is_ok());
        assert!(registry.get("gemini").is_ok());
    }

    #[test]
    fn rejects_unknown_adapter_type() {
        let registry = AdapterRegistry::new();
        assert!(registry.get("cohere").is_err());
    }
}
