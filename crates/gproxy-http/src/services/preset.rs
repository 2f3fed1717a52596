use std::sync::Arc;

use gproxy_adapters::capabilities::Capabilities;
use gproxy_bridge::registry::AdapterRegistry;
use gproxy_presets::{PresetCatalog, PresetStore, ProviderPreset};
use serde::Serialize;

use crate::error::HttpResult;

#[derive(Debug, Serialize)]
pub struct AdapterView {
    pub adapter_type: &'static str,
    pub version: &'static str,
    pub base_url: &'static str,
    pub chat_path: &'static str,
    pub models_path: &'static str,
    pub streaming: bool,
    pub tools: bool,
    pub vision: bool,
    pub reasoning: bool,
    pub json_mode: bool,
}

/// Implements `presets: get-providers | get-adapters | refresh`.
pub struct PresetService {
    presets: Arc<PresetStore>,
    adapters: Arc<AdapterRegistry>,
    client: wreq::Client,
}

impl PresetService {
    pub fn new(presets: Arc<PresetStore>, adapters: Arc<AdapterRegistry>, client: wreq::Client) -> Self {
        Self { presets, adapters, client }
    }

    pub fn get_providers(&self) -> Vec<ProviderPreset> {
        self.presets.current().providers.clone()
    }

    pub fn get_adapters(&self) -> Vec<AdapterView> {
        self.adapters
            .all()
            .map(|adapter| {
                let caps = adapter.capabilities();
                let info = adapter.info();
                AdapterView {
                    adapter_type: adapter.name(),
                    version: adapter.version(),
                    base_url: info.base_url,
                    chat_path: info.chat_path,
                    models_path: info.models_path,
                    streaming: caps.contains(Capabilities::STREAMING),
                    tools: caps.contains(Capabilities::TOOLS),
                    vision: caps.contains(Capabilities::VISION),
                    reasoning: caps.contains(Capabilities::REASONING),
                    json_mode: caps.contains(Capabilities::JSON_MODE),
                }
            })
            .collect()
    }

    pub fn catalog_updated_at(&self) -> PresetCatalog {
        (*self.presets.current()).clone()
    }

    pub async fn refresh(&self) -> HttpResult<()> {
        self.presets.refresh_now(&self.client).await;
        Ok(())
    }
}
