use std::path::{Path, PathBuf};

use crate::api::TunnelRegistration;
use crate::error::TunnelResult;

fn cloudflared_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(".cloudflared")
}

pub fn credentials_path(data_dir: &Path, tunnel_id: &str) -> PathBuf {
    cloudflared_dir(data_dir).join(format!("{tunnel_id}.json"))
}

pub fn yaml_config_path(data_dir: &Path) -> PathBuf {
    cloudflared_dir(data_dir).join("config.yml")
}

/// Writes the credentials JSON the helper expects and a YAML config pointing it at the local
/// HTTP front-end, both under `data_dir/.cloudflared`.
pub fn write_helper_config(
    data_dir: &Path,
    registration: &TunnelRegistration,
    local_host: &str,
    local_port: u16,
) -> TunnelResult<()> {
    let dir = cloudflared_dir(data_dir);
    std::fs::create_dir_all(&dir)?;

    let credentials_path = credentials_path(data_dir, &registration.tunnel_id);
    let credentials_json = serde_json::to_vec_pretty(&registration.credentials)
        .unwrap_or_else(|_| b"{}".to_vec());
    std::fs::write(&credentials_path, credentials_json)?;

    let yaml = format!(
        "tunnel: {tunnel_id}\ncredentials-file: {credentials_file}\ningress:\n  - hostname: {hostname}\n    service: http://{local_host}:{local_port}\n  - service: http_status:404\n",
        tunnel_id = registration.tunnel_id,
        credentials_file = credentials_path.display(),
        hostname = format!("{}.{}", registration.subdomain, registration.domain),
    );
    std::fs::write(yaml_config_path(data_dir), yaml)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_credentials_and_yaml_under_cloudflared_dir() {
        let dir = std::env::temp_dir().join(format!("gproxy-tunnel-config-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let registration = TunnelRegistration {
            tunnel_id: "abc-123".to_string(),
            subdomain: "my-proxy".to_string(),
            domain: "tunnels.gproxy.leenhawk.com".to_string(),
            credentials: serde_json::json!({"AccountTag": "t", "TunnelSecret": "s"}),
        };

        write_helper_config(&dir, &registration, "127.0.0.1", 8787).unwrap();

        let creds = std::fs::read_to_string(credentials_path(&dir, "abc-123")).unwrap();
        assert!(creds.contains("TunnelSecret"));

        let yaml = std::fs::read_to_string(yaml_config_path(&dir)).unwrap();
        assert!(yaml.contains("tunnel: abc-123"));
        assert!(yaml.contains("http://127.0.0.1:8787"));
        assert!(yaml.contains("my-proxy.tunnels.gproxy.leenhawk.com"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
