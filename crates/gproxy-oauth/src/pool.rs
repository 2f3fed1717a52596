use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use gproxy_storage::Storage;

use crate::error::{OAuthError, OAuthResult};

/// Remembers, per provider type, the account id that most recently completed an upstream call
/// successfully. In-process only — per the pool selection contract this is never persisted
/// across restarts.
#[derive(Default)]
pub struct PoolSelector {
    last_successful: RwLock<HashMap<String, String>>,
}

impl PoolSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, provider_type: &str, account_id: &str) {
        if let Ok(mut guard) = self.last_successful.write() {
            guard.insert(provider_type.to_string(), account_id.to_string());
        }
    }

    /// Selects the eligible account for `provider_type`, preferring the remembered
    /// last-successful account, then the largest `pool_weight`, excluding anything in
    /// `excluded`.
    pub async fn select(
        &self,
        storage: &Storage,
        provider_type: &str,
        excluded: &HashSet<String>,
    ) -> OAuthResult<String> {
        let candidates = storage.list_pooled_oauth_accounts(provider_type).await?;
        let mut eligible: Vec<_> = candidates
            .into_iter()
            .filter(|account| account.health_status == "active")
            .filter(|account| !excluded.contains(&account.id))
            .collect();

        if eligible.is_empty() {
            return Err(OAuthError::PoolExhausted(provider_type.to_string()));
        }

        let last_successful = self
            .last_successful
            .read()
            .ok()
            .and_then(|guard| guard.get(provider_type).cloned());

        if let Some(preferred) = last_successful.as_ref()
            && let Some(account) = eligible.iter().find(|account| &account.id == preferred)
        {
            return Ok(account.id.clone());
        }

        eligible.sort_by(|a, b| b.pool_weight.cmp(&a.pool_weight));
        Ok(eligible[0].id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remembers_last_successful_per_provider() {
        let selector = PoolSelector::new();
        selector.record_success("codex", "acct-a");
        selector.record_success("antigravity", "acct-b");
        let guard = selector.last_successful.read().unwrap();
        assert_eq!(guard.get("codex").map(String::as_str), Some("acct-a"));
        assert_eq!(guard.get("antigravity").map(String::as_str), Some("acct-b"));
    }
}
