use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use gproxy_storage::entities::api_key::Model as ApiKeyModel;
use gproxy_storage::Storage;
use rand::RngCore;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::HttpResult;

#[derive(Debug, Serialize)]
pub struct ApiKeyView {
    pub id: String,
    pub key_value: String,
    pub label: Option<String>,
    pub enabled: bool,
    pub created_at: OffsetDateTime,
    pub last_used_at: Option<OffsetDateTime>,
}

impl From<ApiKeyModel> for ApiKeyView {
    fn from(model: ApiKeyModel) -> Self {
        Self {
            id: model.id,
            key_value: model.key_value,
            label: model.label,
            enabled: model.enabled,
            created_at: model.created_at,
            last_used_at: model.last_used_at,
        }
    }
}

/// Implements the `api-keys: list | create | delete | toggle | rename` operations.
pub struct ApiKeyService {
    storage: Storage,
}

impl ApiKeyService {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub async fn list(&self) -> HttpResult<Vec<ApiKeyView>> {
        Ok(self.storage.list_api_keys().await?.into_iter().map(ApiKeyView::from).collect())
    }

    pub async fn create(&self, label: Option<String>) -> HttpResult<ApiKeyView> {
        let key_value = generate_api_key();
        let id = Uuid::new_v4().to_string();
        Ok(self.storage.create_api_key(id, key_value, label).await?.into())
    }

    pub async fn delete(&self, id: &str) -> HttpResult<()> {
        Ok(self.storage.delete_api_key(id).await?)
    }

    pub async fn toggle(&self, id: &str, enabled: bool) -> HttpResult<()> {
        Ok(self.storage.toggle_api_key(id, enabled).await?)
    }

    pub async fn rename(&self, id: &str, label: Option<String>) -> HttpResult<()> {
        Ok(self.storage.rename_api_key(id, label).await?)
    }
}

/// `sk-` followed by 32 base64url characters (24 random bytes), matching the format the
/// `api_key` entity's doc comment describes.
fn generate_api_key() -> String {
    let mut bytes = [0u8; 24];
    rand::rng().fill_bytes(&mut bytes);
    format!("sk-{}", URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_have_the_expected_shape_and_are_unique() {
        let a = generate_api_key();
        let b = generate_api_key();
        assert!(a.starts_with("sk-"));
        assert_eq!(a.len(), 3 + 32);
        assert_ne!(a, b);
    }
}
