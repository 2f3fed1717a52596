pub mod api_key;
pub mod chat;
pub mod config;
pub mod logs;
pub mod oauth;
pub mod preset;
pub mod provider;
pub mod proxy;
pub mod proxy_service;
pub mod settings;
pub mod tunnel;

pub use api_key::ApiKeyService;
pub use chat::ChatService;
pub use config::ConfigService;
pub use logs::LogService;
pub use oauth::OAuthService;
pub use preset::PresetService;
pub use provider::ProviderService;
pub use proxy::ProxyService;
pub use settings::SettingsService;
pub use tunnel::TunnelService;
