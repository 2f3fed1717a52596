use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

const BUNDLED_CATALOG_JSON: &str = include_str!("../presets.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderPreset {
    pub id: String,
    pub name: String,
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "chatPath")]
    pub chat_path: String,
    #[serde(rename = "modelsPath")]
    pub models_path: String,
    #[serde(rename = "adapterType")]
    pub adapter_type: String,
    #[serde(rename = "defaultModels")]
    pub default_models: Vec<String>,
    #[serde(rename = "updatedAt", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetCatalog {
    #[serde(rename = "updatedAt", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub providers: Vec<ProviderPreset>,
}

/// Parses the catalog embedded in the binary at build time. Never fails at runtime: a parse
/// failure here would be a build-time defect, not a user-facing one.
pub fn load_bundled() -> PresetCatalog {
    serde_json::from_str(BUNDLED_CATALOG_JSON).expect("bundled presets.json must parse")
}

/// Merges `remote` into `base` entry-by-entry by `id`, keeping whichever side has the newer
/// `updatedAt`. Entries present only in `remote` are added; entries present only in `base` are
/// kept as-is. The merged catalog's own `updatedAt` is the newer of the two.
pub fn merge(base: &PresetCatalog, remote: &PresetCatalog) -> PresetCatalog {
    let mut merged: Vec<ProviderPreset> = base.providers.clone();

    for remote_entry in &remote.providers {
        match merged.iter_mut().find(|entry| entry.id == remote_entry.id) {
            Some(existing) if remote_entry.updated_at > existing.updated_at => {
                *existing = remote_entry.clone();
            }
            Some(_) => {}
            None => merged.push(remote_entry.clone()),
        }
    }

    PresetCatalog {
        updated_at: base.updated_at.max(remote.updated_at),
        providers: merged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_catalog_parses_and_is_non_empty() {
        let catalog = load_bundled();
        assert!(!catalog.providers.is_empty());
        assert!(catalog.providers.iter().any(|p| p.id == "anthropic"));
    }

    fn preset(id: &str, updated_at: &str) -> ProviderPreset {
        ProviderPreset {
            id: id.to_string(),
            name: id.to_string(),
            base_url: "https://example.com".to_string(),
            chat_path: "/v1/chat".to_string(),
            models_path: "/v1/models".to_string(),
            adapter_type: "openai-chat".to_string(),
            default_models: vec![],
            updated_at: OffsetDateTime::parse(updated_at, &time::format_description::well_known::Rfc3339)
                .unwrap(),
        }
    }

    #[test]
    fn merge_prefers_newer_updated_at() {
        let base = PresetCatalog {
            updated_at: preset("x", "2026-01-01T00:00:00Z").updated_at,
            providers: vec![preset("acme", "2026-01-01T00:00:00Z")],
        };
        let remote = PresetCatalog {
            updated_at: preset("x", "2026-02-01T00:00:00Z").updated_at,
            providers: vec![{
                let mut p = preset("acme", "2026-02-01T00:00:00Z");
                p.name = "Acme Updated".to_string();
                p
            }],
        };

        let merged = merge(&base, &remote);
        assert_eq!(merged.providers.len(), 1);
        assert_eq!(merged.providers[0].name, "Acme Updated");
    }

    #[test]
    fn merge_keeps_newer_local_entry_over_stale_remote() {
        let base = PresetCatalog {
            updated_at: preset("x", "2026-03-01T00:00:00Z").updated_at,
            providers: vec![preset("acme", "2026-03-01T00:00:00Z")],
        };
        let remote = PresetCatalog {
            updated_at: preset("x", "2026-01-01T00:00:00Z").updated_at,
            providers: vec![{
                let mut p = preset("acme", "2026-01-01T00:00:00Z");
                p.name = "Stale".to_string();
                p
            }],
        };

        let merged = merge(&base, &remote);
        assert_eq!(merged.providers[0].name, "acme");
    }

    #[test]
    fn merge_adds_remote_only_entries() {
        let base = PresetCatalog {
            updated_at: preset("x", "2026-01-01T00:00:00Z").updated_at,
            providers: vec![preset("acme", "2026-01-01T00:00:00Z")],
        };
        let remote = PresetCatalog {
            updated_at: preset("x", "2026-01-01T00:00:00Z").updated_at,
            providers: vec![preset("newco", "2026-01-01T00:00:00Z")],
        };

        let merged = merge(&base, &remote);
        assert_eq!(merged.providers.len(), 2);
    }
}
