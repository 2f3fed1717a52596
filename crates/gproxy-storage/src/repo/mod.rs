pub mod api_keys;
pub mod code_switch;
pub mod conversations;
pub mod oauth_accounts;
pub mod proxies;
pub mod providers;
pub mod request_logs;
pub mod settings;
pub mod tunnel;

use sea_orm::DatabaseConnection;

/// Process-wide repository facade. Cheap to clone: it only wraps the cached connection handed
/// out by [`crate::db::connect_shared`].
#[derive(Clone)]
pub struct Storage {
    pub(crate) db: DatabaseConnection,
}

impl Storage {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}
