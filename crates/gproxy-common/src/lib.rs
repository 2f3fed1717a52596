pub mod config;
pub mod slug;
pub mod vault;

pub use config::{GlobalConfig, GlobalConfigError, GlobalConfigPatch};
pub use slug::{SlugError, ensure_unique_slug, validate_slug};
pub use vault::{Vault, VaultError};
