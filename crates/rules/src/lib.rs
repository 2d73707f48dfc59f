//! YAML rule documents driving the health analysis engine.
//!
//! This crate provides:
//! - `FeatureConfig` documents: symptom weights, body-system categories and
//!   diet keywords used by feature engineering
//! - `RiskConfig` documents: thresholds and confidence adjustments for the
//!   ordered risk rules
//! - A directory loader that dispatches documents by `kind` and falls back to
//!   built-in defaults

pub mod feature_config;
pub mod loader;
pub mod metadata;
pub mod risk_config;

pub use feature_config::{CompiledFeatureConfig, FeatureConfigRule, FeatureConfigSpec};
pub use loader::{load_feature_config, load_risk_config, RuleError, RuleSet};
pub use metadata::CommonMetadata;
pub use risk_config::{RiskConfigRule, RiskConfigSpec};
