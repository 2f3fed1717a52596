use gproxy_storage::Storage;
use serde_json::Value;

use crate::error::HttpResult;

/// Implements the `settings: get | set | getAll | setMany` operations over the enumerated
/// setting-key catalog (§6); keys and defaults are the caller's concern, this service is a thin,
/// type-erased key/value layer over `Storage`.
pub struct SettingsService {
    storage: Storage,
}

impl SettingsService {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub async fn get(&self, key: &str) -> HttpResult<Option<Value>> {
        Ok(self.storage.get_setting_raw(key).await?)
    }

    pub async fn set(&self, key: &str, value: Value) -> HttpResult<()> {
        Ok(self.storage.set_setting(key, &value).await?)
    }

    pub async fn get_all(&self) -> HttpResult<Vec<(String, Value)>> {
        Ok(self.storage.get_all_settings().await?)
    }

    pub async fn set_many(&self, entries: Vec<(String, Value)>) -> HttpResult<()> {
        Ok(self.storage.set_many_settings(entries).await?)
    }
}
