use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::catalog::{self, PresetCatalog};
use crate::refresh;

/// Process-wide holder for the current preset catalog. Starts from the bundled catalog and is
/// replaced wholesale by `refresh_now`, so readers never see a torn merge.
pub struct PresetStore {
    current: ArcSwap<PresetCatalog>,
    remote_url: Option<String>,
}

impl PresetStore {
    pub fn new(remote_url: Option<String>) -> Self {
        Self {
            current: ArcSwap::from_pointee(catalog::load_bundled()),
            remote_url,
        }
    }

    pub fn current(&self) -> Arc<PresetCatalog> {
        self.current.load_full()
    }

    /// Fetches the remote catalog (if a URL is configured) and merges it into the current one,
    /// keeping the newer `updatedAt` per entry. A network failure leaves the store untouched.
    pub async fn refresh_now(&self, client: &wreq::Client) {
        let Some(remote_url) = &self.remote_url else {
            return;
        };
        let base = self.current.load_full();
        let merged = refresh::refresh(client, remote_url, &base).await;
        self.current.store(Arc::new(merged));
    }

    /// Spawns a one-shot background refresh at process start, per `presets.autoUpdate`. Boot
    /// never blocks on the network: the merge lands whenever the request completes.
    pub fn spawn_auto_update(self: &Arc<Self>, client: wreq::Client) {
        let store = self.clone();
        tokio::spawn(async move {
            store.refresh_now(&client).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_from_bundled_catalog() {
        let store = PresetStore::new(None);
        assert!(!store.current().providers.is_empty());
    }
}
