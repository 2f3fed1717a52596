use gproxy_storage::entities::model_mapping::Model as MappingModel;

/// Resolves `requested_model` against a proxy's mapping rows: an exact `source_model` match
/// wins, falling back to the row marked `is_default`, falling back to `requested_model`
/// unchanged when neither exists.
pub fn resolve_target_model(mappings: &[MappingModel], requested_model: &str) -> String {
    if let Some(exact) = mappings
        .iter()
        .find(|mapping| mapping.source_model.as_deref() == Some(requested_model))
    {
        return exact.target_model.clone();
    }
    if let Some(default) = mappings.iter().find(|mapping| mapping.is_default) {
        return default.target_model.clone();
    }
    requested_model.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(source: Option<&str>, target: &str, is_default: bool) -> MappingModel {
        MappingModel {
            id: "m".to_string(),
            proxy_id: "p".to_string(),
            source_model: source.map(str::to_string),
            target_model: target.to_string(),
            is_default,
        }
    }

    #[test]
    fn exact_match_wins_over_default() {
        let mappings = vec![
            mapping(None, "fallback-model", true),
            mapping(Some("gpt-4o"), "claude-opus-4", false),
        ];
        assert_eq!(
            resolve_target_model(&mappings, "gpt-4o"),
            "claude-opus-4"
        );
    }

    #[test]
    fn falls_back_to_default_mapping() {
        let mappings = vec![mapping(None, "fallback-model", true)];
        assert_eq!(
            resolve_target_model(&mappings, "anything"),
            "fallback-model"
        );
    }

    #[test]
    fn passes_through_unchanged_without_mappings() {
        let mappings: Vec<MappingModel> = vec![];
        assert_eq!(resolve_target_model(&mappings, "gpt-4o"), "gpt-4o");
    }
}
