use clap::Parser;
use gproxy_common::GlobalConfigPatch;

#[derive(Parser)]
#[command(name = "gproxy")]
pub(crate) struct Cli {
    #[arg(long, env = "GPROXY_DSN")]
    pub(crate) dsn: Option<String>,
    #[arg(long, env = "GPROXY_DATA_DIR")]
    pub(crate) data_dir: Option<String>,
    #[arg(long, env = "GPROXY_HOST")]
    pub(crate) host: Option<String>,
    #[arg(long, env = "GPROXY_PORT")]
    pub(crate) port: Option<u16>,
    #[arg(long, env = "GPROXY_ADMIN_KEY")]
    pub(crate) admin_key: Option<String>,
    #[arg(long, env = "GPROXY_PROXY")]
    pub(crate) proxy: Option<String>,
    #[arg(long, env = "GPROXY_TUNNEL_API_BASE_URL")]
    pub(crate) tunnel_api_base_url: Option<String>,
    #[arg(long, env = "GPROXY_PRESETS_REMOTE_URL")]
    pub(crate) presets_remote_url: Option<String>,
    #[arg(long, env = "GPROXY_VAULT_PASSPHRASE")]
    pub(crate) vault_passphrase: Option<String>,
}

impl Cli {
    /// The CLI/env layer of the config merge; `admin_key`, if present, is hashed by the caller
    /// before it lands in the patch (this layer never sees the hash, only the raw key the
    /// operator typed).
    pub(crate) fn as_patch(&self, admin_key_hash: Option<String>) -> GlobalConfigPatch {
        GlobalConfigPatch {
            host: self.host.clone(),
            port: self.port,
            admin_key_hash,
            proxy: self.proxy.clone(),
            dsn: self.dsn.clone(),
            data_dir: self.data_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Cli;

    #[test]
    fn as_patch_leaves_unset_fields_as_none() {
        let cli = Cli::parse_from(["gproxy", "--port", "4000"]);
        let patch = cli.as_patch(None);
        assert_eq!(patch.port, Some(4000));
        assert_eq!(patch.host, None);
        assert_eq!(patch.admin_key_hash, None);
    }

    #[test]
    fn as_patch_carries_the_precomputed_admin_key_hash_not_the_raw_key() {
        let cli = Cli::parse_from(["gproxy", "--admin-key", "raw-secret"]);
        let patch = cli.as_patch(Some("hashed".to_string()));
        assert_eq!(patch.admin_key_hash.as_deref(), Some("hashed"));
    }
}
