use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum GlobalConfigError {
    #[error("missing required global config field: {0}")]
    MissingField(&'static str),
}

/// Final, merged process-bootstrap configuration.
///
/// Merge order: CLI > environment > persisted `global_config` row, then the merged
/// result is written back to storage so the next boot starts from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub host: String,
    pub port: u16,
    /// Stored as a hash, never plaintext.
    pub admin_key_hash: String,
    /// Optional outbound proxy used for upstream egress.
    pub proxy: Option<String>,
    /// Database DSN used for this process.
    pub dsn: String,
    pub data_dir: String,
}

/// Optional layer used while merging global config from CLI/env/DB.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalConfigPatch {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub admin_key_hash: Option<String>,
    pub proxy: Option<String>,
    pub dsn: Option<String>,
    pub data_dir: Option<String>,
}

impl GlobalConfigPatch {
    pub fn overlay(&mut self, other: GlobalConfigPatch) {
        if other.host.is_some() {
            self.host = other.host;
        }
        if other.port.is_some() {
            self.port = other.port;
        }
        if other.admin_key_hash.is_some() {
            self.admin_key_hash = other.admin_key_hash;
        }
        if other.proxy.is_some() {
            self.proxy = other.proxy;
        }
        if other.dsn.is_some() {
            self.dsn = other.dsn;
        }
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
    }

    pub fn into_config(self) -> Result<GlobalConfig, GlobalConfigError> {
        Ok(GlobalConfig {
            host: self.host.unwrap_or_else(|| "127.0.0.1".to_string()),
            port: self.port.unwrap_or(9527),
            admin_key_hash: self
                .admin_key_hash
                .ok_or(GlobalConfigError::MissingField("admin_key_hash"))?,
            proxy: self.proxy,
            dsn: self.dsn.ok_or(GlobalConfigError::MissingField("dsn"))?,
            data_dir: self.data_dir.unwrap_or_else(|| "./data".to_string()),
        })
    }
}

impl From<GlobalConfig> for GlobalConfigPatch {
    fn from(value: GlobalConfig) -> Self {
        Self {
            host: Some(value.host),
            port: Some(value.port),
            admin_key_hash: Some(value.admin_key_hash),
            proxy: value.proxy,
            dsn: Some(value.dsn),
            data_dir: Some(value.data_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_only_replaces_fields_present_in_other() {
        let mut base = GlobalConfigPatch {
            host: Some("0.0.0.0".to_string()),
            port: Some(1234),
            ..Default::default()
        };
        base.overlay(GlobalConfigPatch { port: Some(9999), dsn: Some("sqlite://x".to_string()), ..Default::default() });

        assert_eq!(base.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(base.port, Some(9999));
        assert_eq!(base.dsn.as_deref(), Some("sqlite://x"));
    }

    #[test]
    fn into_config_fills_in_defaults() {
        let patch = GlobalConfigPatch {
            admin_key_hash: Some("hash".to_string()),
            dsn: Some("sqlite://db".to_string()),
            ..Default::default()
        };
        let config = patch.into_config().unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9527);
        assert_eq!(config.data_dir, "./data");
    }

    #[test]
    fn into_config_requires_admin_key_hash_and_dsn() {
        let err = GlobalConfigPatch::default().into_config().unwrap_err();
        assert!(matches!(err, GlobalConfigError::MissingField("admin_key_hash")));

        let err = GlobalConfigPatch { admin_key_hash: Some(String::new()), ..Default::default() }.into_config().unwrap_err();
        assert!(matches!(err, GlobalConfigError::MissingField("dsn")));
    }

    #[test]
    fn round_trips_through_patch_conversion() {
        let config = GlobalConfig {
            host: "127.0.0.1".to_string(),
            port: 9527,
            admin_key_hash: "hash".to_string(),
            proxy: Some("http://proxy.local:8080".to_string()),
            dsn: "sqlite://db".to_string(),
            data_dir: "./data".to_string(),
        };
        let patch = GlobalConfigPatch::from(config.clone());
        assert_eq!(patch.into_config().unwrap(), config);
    }
}
