pub mod api_key;
pub mod bridge_proxy;
pub mod code_model_mapping;
pub mod code_switch_config;
pub mod conversation;
pub mod message;
pub mod model_mapping;
pub mod oauth_account;
pub mod provider;
pub mod request_log;
pub mod schema_migration;
pub mod setting;
pub mod tunnel_access_log;
pub mod tunnel_config;
pub mod tunnel_stats;
pub mod tunnel_system_log;

pub use api_key::Entity as ApiKeys;
pub use bridge_proxy::Entity as BridgeProxies;
pub use code_model_mapping::Entity as CodeModelMappings;
pub use code_switch_config::Entity as CodeSwitchConfigs;
pub use conversation::Entity as Conversations;
pub use message::Entity as Messages;
pub use model_mapping::Entity as ModelMappings;
pub use oauth_account::Entity as OAuthAccounts;
pub use provider::Entity as Providers;
pub use request_log::Entity as RequestLogs;
pub use schema_migration::Entity as SchemaMigrations;
pub use setting::Entity as Settings;
pub use tunnel_access_log::Entity as TunnelAccessLogs;
pub use tunnel_config::Entity as TunnelConfigs;
pub use tunnel_stats::Entity as TunnelStats;
pub use tunnel_system_log::Entity as TunnelSystemLogs;
