use crate::catalog::{self, PresetCatalog};
use crate::error::{PresetError, PresetResult};

/// Fetches the remote catalog and merges it into `base`. On network failure or a non-2xx
/// response, leaves `base` untouched and logs a warning rather than propagating the error to the
/// caller, per the "never block the caller on network I/O" requirement.
pub async fn refresh(client: &wreq::Client, remote_url: &str, base: &PresetCatalog) -> PresetCatalog {
    match fetch_remote(client, remote_url).await {
        Ok(remote) => catalog::merge(base, &remote),
        Err(err) => {
            tracing::warn!(error = %err, remote_url, "preset catalog refresh failed, keeping bundled catalog");
            base.clone()
        }
    }
}

async fn fetch_remote(client: &wreq::Client, remote_url: &str) -> PresetResult<PresetCatalog> {
    let resp = client.get(remote_url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(PresetError::RemoteStatus(status.as_u16()));
    }
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
