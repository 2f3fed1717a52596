pub mod db;
pub mod entities;
pub mod error;
pub mod migrations;
pub mod repo;

pub use error::{StorageError, StorageResult};
pub use repo::Storage;

pub use repo::oauth_accounts::OAuthAccountDraft;
pub use repo::proxies::{MappingDraft, ProxyDraft};
pub use repo::providers::ProviderDraft;
pub use repo::request_logs::{RequestLogDraft, RequestLogFilter};
pub use repo::tunnel::AccessLogEntry;
