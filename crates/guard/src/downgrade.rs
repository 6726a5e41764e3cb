//! Catalog of cheaper substitutes for expensive models.

use std::collections::HashMap;

use ff_domain::budget::DowngradeSuggestion;
use ff_domain::config::DowngradeConfig;

/// Target used when a downgrade is mandatory but no catalog path exists.
pub const GENERIC_DOWNGRADE_TARGET: &str = "economy";

#[derive(Debug, Clone, Default)]
pub struct DowngradeCatalog {
    default_target: Option<String>,
    models: HashMap<String, String>,
}

impl DowngradeCatalog {
    pub fn new(default_target: Option<String>, models: HashMap<String, String>) -> Self {
        Self {
            default_target,
            models,
        }
    }

    pub fn from_config(cfg: &DowngradeConfig) -> Self {
        Self::new(cfg.default_target.clone(), cfg.models.clone())
    }

    /// Cheaper configuration for `model`, if one is known.
    ///
    /// An explicit entry wins over `default_target`; a model never
    /// downgrades to itself.
    pub fn resolve(&self, model: Option<&str>) -> Option<DowngradeSuggestion> {
        let target = match model {
            Some(m) => self
                .models
                .get(m)
                .filter(|to| to.as_str() != m)
                .or(self.default_target.as_ref())
                .filter(|to| to.as_str() != m),
            None => self.default_target.as_ref(),
        }?;

        Some(DowngradeSuggestion {
            from_model: model.map(str::to_owned),
            to_model: target.clone(),
            note: format!("switch to {target} to reduce cost"),
        })
    }

    /// `resolve`, or a generic reduced-cost descriptor when nothing matches.
    pub fn resolve_or_generic(&self, model: Option<&str>) -> DowngradeSuggestion {
        self.resolve(model).unwrap_or_else(|| DowngradeSuggestion {
            from_model: model.map(str::to_owned),
            to_model: GENERIC_DOWNGRADE_TARGET.into(),
            note: "switch to a reduced-cost configuration (smaller model, fewer samples)".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(default_target: Option<&str>) -> DowngradeCatalog {
        let mut models = HashMap::new();
        models.insert("gpt-4o".to_string(), "gpt-4o-mini".to_string());
        models.insert("gpt-4o-mini".to_string(), "gpt-4o-mini".to_string());
        DowngradeCatalog::new(default_target.map(str::to_owned), models)
    }

    #[test]
    fn explicit_entry_wins() {
        let s = catalog(Some("tiny")).resolve(Some("gpt-4o")).unwrap();
        assert_eq!(s.from_model.as_deref(), Some("gpt-4o"));
        assert_eq!(s.to_model, "gpt-4o-mini");
    }

    #[test]
    fn unknown_model_uses_default_target() {
        let s = catalog(Some("tiny")).resolve(Some("claude-opus")).unwrap();
        assert_eq!(s.to_model, "tiny");
    }

    #[test]
    fn no_path_without_entry_or_default() {
        assert!(catalog(None).resolve(Some("claude-opus")).is_none());
        assert!(catalog(None).resolve(None).is_none());
    }

    #[test]
    fn self_downgrade_is_not_a_path() {
        assert!(catalog(None).resolve(Some("gpt-4o-mini")).is_none());
        assert!(catalog(Some("tiny")).resolve(Some("tiny")).is_none());
    }

    #[test]
    fn self_mapped_entry_falls_through_to_default_target() {
        let s = catalog(Some("tiny")).resolve(Some("gpt-4o-mini")).unwrap();
        assert_eq!(s.to_model, "tiny");
    }

    #[test]
    fn generic_fallback_is_always_available() {
        let s = catalog(None).resolve_or_generic(Some("claude-opus"));
        assert_eq!(s.to_model, GENERIC_DOWNGRADE_TARGET);
        assert_eq!(s.from_model.as_deref(), Some("claude-opus"));
    }
}
