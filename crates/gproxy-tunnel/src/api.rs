use serde::{Deserialize, Serialize};

use crate::error::{TunnelError, TunnelResult};

#[derive(Debug, Serialize)]
struct RegisterTunnelRequest<'a> {
    device_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TunnelRegistration {
    #[serde(rename = "tunnelId")]
    pub tunnel_id: String,
    pub subdomain: String,
    pub domain: String,
    pub credentials: serde_json::Value,
}

/// Registers a new tunnel for `device_id` against the configured tunnel API, returning the
/// assigned identity and the credentials payload the helper expects on disk.
pub async fn register_tunnel(
    client: &wreq::Client,
    base_url: &str,
    device_id: &str,
) -> TunnelResult<TunnelRegistration> {
    let url = format!("{}/tunnels", base_url.trim_end_matches('/'));
    let body = serde_json::to_vec(&RegisterTunnelRequest { device_id })
        .map_err(|err| TunnelError::Other(format!("encode register_tunnel body: {err}")))?;
    let resp = client
        .post(&url)
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await?;
    let status = resp.status();
    let bytes = resp.bytes().await?;
    if !status.is_success() {
        return Err(TunnelError::ApiStatus(
            status.as_u16(),
            String::from_utf8_lossy(&bytes).to_string(),
        ));
    }
    serde_json::from_slice(&bytes)
        .map_err(|err| TunnelError::Other(format!("decode register_tunnel response: {err}")))
}
