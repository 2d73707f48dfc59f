//! Filesystem rule loader.
//!
//! Scans a rules directory for YAML documents, dispatches them by `kind`
//! and assembles a [`RuleSet`]. Kinds that are absent from the directory
//! fall back to the built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{info, warn};

use crate::feature_config::{CompiledFeatureConfig, FeatureConfigRule};
use crate::metadata::CommonMetadata;
use crate::risk_config::{RiskConfigRule, RiskConfigSpec};

/// Errors that can occur during rule loading.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse/deserialization error.
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Rule validation error (wrong kind, out-of-range thresholds, duplicates).
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result alias for rule operations.
pub type Result<T> = std::result::Result<T, RuleError>;

/// First-pass view of a document: enough to dispatch on `kind`.
#[derive(Debug, Deserialize)]
struct RuleEnvelope {
    kind: String,
    metadata: CommonMetadata,
}

/// Compiled rule documents consumed by the analysis engine.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub features: CompiledFeatureConfig,
    pub risk: RiskConfigSpec,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleSet {
    /// Rule set made of the built-in defaults.
    pub fn builtin() -> Self {
        Self {
            features: FeatureConfigRule::builtin().compile(),
            risk: RiskConfigRule::builtin().spec,
        }
    }

    /// Load every enabled document under `dir` (recursively).
    ///
    /// Dotfiles and non-YAML files are skipped. A kind may appear at most
    /// once; missing kinds use the built-in defaults.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut files = Vec::new();
        collect_yaml_files(dir, &mut files)?;
        files.sort();

        let mut features: Option<FeatureConfigRule> = None;
        let mut risk: Option<RiskConfigRule> = None;

        for path in files {
            let contents = fs::read_to_string(&path)?;
            let envelope: RuleEnvelope = serde_yaml::from_str(&contents)?;

            if !envelope.metadata.enabled {
                info!(rule_id = %envelope.metadata.id, path = %path.display(), "skipping disabled rule");
                continue;
            }

            match envelope.kind.as_str() {
                "FeatureConfig" => {
                    let rule: FeatureConfigRule = serde_yaml::from_str(&contents)?;
                    rule.validate().map_err(RuleError::Validation)?;
                    set_once(&mut features, rule, &path)?;
                }
                "RiskConfig" => {
                    let rule: RiskConfigRule = serde_yaml::from_str(&contents)?;
                    rule.validate().map_err(RuleError::Validation)?;
                    set_once(&mut risk, rule, &path)?;
                }
                other => {
                    warn!(kind = %other, path = %path.display(), "ignoring rule of unknown kind");
                    continue;
                }
            }
            info!(rule_id = %envelope.metadata.id, kind = %envelope.kind, path = %path.display(), "loaded rule");
        }

        if features.is_none() {
            info!(dir = %dir.display(), "no FeatureConfig found, using built-in lexicon");
        }
        if risk.is_none() {
            info!(dir = %dir.display(), "no RiskConfig found, using built-in thresholds");
        }

        Ok(Self {
            features: features.unwrap_or_else(FeatureConfigRule::builtin).compile(),
            risk: risk.unwrap_or_else(RiskConfigRule::builtin).spec,
        })
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, path: &Path) -> Result<()> {
    if slot.is_some() {
        return Err(RuleError::Validation(format!(
            "duplicate rule kind in {}",
            path.display()
        )));
    }
    *slot = Some(value);
    Ok(())
}

fn collect_yaml_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();

        // Skip dotfiles/dotdirs
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'))
        {
            continue;
        }

        if path.is_dir() {
            collect_yaml_files(&path, out)?;
            continue;
        }

        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e == "yml" || e == "yaml")
            .unwrap_or(false);
        if is_yaml {
            out.push(path);
        }
    }
    Ok(())
}

fn load_document<T: DeserializeOwned>(path: &Path, expected_kind: &str) -> Result<T> {
    let contents = fs::read_to_string(path)?;
    let envelope: RuleEnvelope = serde_yaml::from_str(&contents)?;
    if envelope.kind != expected_kind {
        return Err(RuleError::Validation(format!(
            "{} has kind '{}', expected '{}'",
            path.display(),
            envelope.kind,
            expected_kind
        )));
    }
    Ok(serde_yaml::from_str(&contents)?)
}

/// Load and validate a single FeatureConfig document.
pub fn load_feature_config(path: &Path) -> Result<FeatureConfigRule> {
    let rule: FeatureConfigRule = load_document(path, "FeatureConfig")?;
    rule.validate().map_err(RuleError::Validation)?;
    Ok(rule)
}

/// Load and validate a single RiskConfig document.
pub fn load_risk_config(path: &Path) -> Result<RiskConfigRule> {
    let rule: RiskConfigRule = load_document(path, "RiskConfig")?;
    rule.validate().map_err(RuleError::Validation)?;
    Ok(rule)
}
