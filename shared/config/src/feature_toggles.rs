use serde::Deserialize;
use std::collections::HashMap;

pub const SQL_RAG: &str = "SqlRag";
pub const VECTOR_RAG: &str = "VectorRag";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct FeatureToggles {
    #[serde(flatten)]
    pub flags: HashMap<String, bool>,
}

impl FeatureToggles {
    // Load from a provided path or env var FEATURE_TOGGLES_PATH, defaulting to ./feature-toggles.json
    pub fn from_path(path: Option<String>) -> Self {
        let default_path = std::env::var("FEATURE_TOGGLES_PATH")
            .unwrap_or_else(|_| "feature-toggles.json".to_string());
        let path = path.unwrap_or(default_path);

        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_json(&content),
            Err(_) => FeatureToggles::default(),
        }
    }

    pub fn from_env_path() -> Self {
        Self::from_path(None)
    }

    pub fn from_json(content: &str) -> Self {
        serde_json::from_str(content).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "feature toggles file is not valid JSON, using defaults");
            FeatureToggles::default()
        })
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    pub fn is_enabled_or(&self, name: &str, default: bool) -> bool {
        self.flags.get(name).copied().unwrap_or(default)
    }

    // Text-to-SQL assistant backend (V2), on unless switched off
    pub fn sql_rag_enabled(&self) -> bool {
        self.is_enabled_or(SQL_RAG, true)
    }

    // Embedding retrieval assistant backend (V1), on unless switched off
    pub fn vector_rag_enabled(&self) -> bool {
        self.is_enabled_or(VECTOR_RAG, true)
    }

    pub fn disabled_features(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .flags
            .iter()
            .filter(|(_, &enabled)| !enabled)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}
