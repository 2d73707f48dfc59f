use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub analysis: AnalysisConfig,
    pub rules: RulesConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `VITALS_PROFILE`. When set (e.g. `CLINIC`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("VITALS_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            analysis: AnalysisConfig::from_env_profiled(p),
            rules: RulesConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        let a = &self.analysis;
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  analysis:    max_k={}, min_observations={}, anomaly_threshold={}",
            a.max_k,
            a.min_observations,
            a.anomaly_threshold
        );
        tracing::info!(
            "  kmeans:      max_iterations={}, sweep_iterations={}, tolerance={:e}",
            a.max_iterations,
            a.sweep_iterations,
            a.tolerance
        );
        tracing::info!(
            "  seed:        {}",
            a.seed.map(|s| s.to_string()).unwrap_or_else(|| "(entropy)".into())
        );
        tracing::info!(
            "  rules:       dir={}",
            self.rules
                .rules_dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| "(built-in)".into())
        );
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: String::new(),
            analysis: AnalysisConfig::default(),
            rules: RulesConfig::default(),
        }
    }
}

// ── Analysis ──────────────────────────────────────────────────

/// Tunables for the clustering and anomaly pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Upper bound of the optimal-K sweep.
    pub max_k: usize,
    /// Absolute z-score above which a feature value is anomalous.
    pub anomaly_threshold: f64,
    /// Lloyd iterations for the final clustering run.
    pub max_iterations: usize,
    /// Lloyd iterations per candidate K during the sweep.
    pub sweep_iterations: usize,
    /// Convergence tolerance on the inertia change.
    pub tolerance: f64,
    /// Batches smaller than this get the insufficient-data result.
    pub min_observations: usize,
    /// Fixed RNG seed; `None` seeds every call from entropy.
    pub seed: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_k: 10,
            anomaly_threshold: 2.5,
            max_iterations: 300,
            sweep_iterations: 100,
            tolerance: 1e-4,
            min_observations: 3,
            seed: None,
        }
    }
}

impl AnalysisConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            max_k: profiled_env_parse(p, "VITALS_MAX_K", d.max_k),
            anomaly_threshold: profiled_env_parse(p, "VITALS_ANOMALY_THRESHOLD", d.anomaly_threshold),
            max_iterations: profiled_env_parse(p, "VITALS_MAX_ITERATIONS", d.max_iterations),
            sweep_iterations: profiled_env_parse(p, "VITALS_SWEEP_ITERATIONS", d.sweep_iterations),
            tolerance: profiled_env_parse(p, "VITALS_TOLERANCE", d.tolerance),
            min_observations: profiled_env_parse(p, "VITALS_MIN_OBSERVATIONS", d.min_observations),
            seed: profiled_env_opt(p, "VITALS_SEED").and_then(|v| v.parse().ok()),
        }
    }
}

// ── Rules ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Directory holding `features/` and `risk/` rule documents.
    /// `None` uses the built-in defaults.
    pub rules_dir: Option<PathBuf>,
}

impl RulesConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            rules_dir: profiled_env_opt(p, "VITALS_RULES_DIR").map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let a = AnalysisConfig::default();
        assert_eq!(a.max_k, 10);
        assert_eq!(a.anomaly_threshold, 2.5);
        assert_eq!(a.max_iterations, 300);
        assert_eq!(a.sweep_iterations, 100);
        assert_eq!(a.tolerance, 1e-4);
        assert_eq!(a.min_observations, 3);
        assert!(a.seed.is_none());
    }

    #[test]
    fn profiled_keys_take_precedence() {
        env::set_var("CFGTEST_VITALS_MAX_K", "4");
        env::set_var("CFGTEST_VITALS_SEED", "42");
        env::set_var("CFGTEST_VITALS_ANOMALY_THRESHOLD", "not-a-number");

        let cfg = Config::for_profile("cfgtest");
        assert_eq!(cfg.profile, "CFGTEST");
        assert_eq!(cfg.analysis.max_k, 4);
        assert_eq!(cfg.analysis.seed, Some(42));
        // Unparseable values fall back to the default.
        assert_eq!(cfg.analysis.anomaly_threshold, 2.5);
    }

    #[test]
    fn default_profile_label() {
        assert_eq!(Config::default().profile_label(), "default");
    }
}
