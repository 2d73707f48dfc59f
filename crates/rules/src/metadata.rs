//! Common metadata shared across all rule kinds.

use serde::{Deserialize, Serialize};

/// Shared metadata for all rule kinds (feature config, risk config).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CommonMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl CommonMetadata {
    pub(crate) fn builtin(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: Some("Built-in default".to_string()),
            tags: None,
            enabled: true,
        }
    }
}

pub(crate) fn default_true() -> bool {
    true
}
