//! RiskConfig rule kind: thresholds and confidence adjustments for the
//! ordered risk-assessment rules.

use serde::{Deserialize, Serialize};

use crate::metadata::CommonMetadata;

/// Top-level RiskConfig rule document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RiskConfigRule {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    pub spec: RiskConfigSpec,
}

/// Specification section of a RiskConfig rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RiskConfigSpec {
    /// Confidence the rule fold starts from.
    pub base_confidence: f64,
    pub severity: SeverityThresholds,
    pub sleep: SleepThresholds,
    pub stress: StressThresholds,
    pub exercise: ExerciseThresholds,
    pub anomalies: AnomalyAdjustment,
    pub diversity: DiversityAdjustment,
    pub importance: ImportanceSettings,
    pub data_volume: DataVolumeAdjustment,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SeverityThresholds {
    /// Mean severity strictly above this is high risk.
    pub high_threshold: f64,
    /// Mean severity strictly above this (and not high) is moderate.
    pub moderate_threshold: f64,
    pub high_confidence_boost: f64,
    pub confidence_cap: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SleepThresholds {
    /// Mean sleep strictly below this is deprivation.
    pub min_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StressThresholds {
    pub high_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExerciseThresholds {
    pub min_minutes: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AnomalyAdjustment {
    /// Anomaly count above this fraction of the batch triggers the rule.
    pub max_ratio: f64,
    pub confidence_penalty: f64,
    pub confidence_floor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DiversityAdjustment {
    /// Largest cluster share below this means no dominant trend.
    pub dominant_cluster_share: f64,
    pub confidence_penalty: f64,
    pub confidence_floor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ImportanceSettings {
    /// How many top features to name in the importance pattern.
    pub top_features: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DataVolumeAdjustment {
    /// Batches smaller than this are flagged as limited.
    pub min_observations: usize,
    pub confidence_penalty: f64,
    pub confidence_floor: f64,
}

impl Default for RiskConfigSpec {
    fn default() -> Self {
        Self {
            base_confidence: 0.7,
            severity: SeverityThresholds {
                high_threshold: 7.0,
                moderate_threshold: 4.0,
                high_confidence_boost: 0.2,
                confidence_cap: 0.95,
            },
            sleep: SleepThresholds { min_hours: 6.0 },
            stress: StressThresholds { high_threshold: 7.0 },
            exercise: ExerciseThresholds { min_minutes: 30.0 },
            anomalies: AnomalyAdjustment {
                max_ratio: 0.1,
                confidence_penalty: 0.1,
                confidence_floor: 0.5,
            },
            diversity: DiversityAdjustment {
                dominant_cluster_share: 0.5,
                confidence_penalty: 0.1,
                confidence_floor: 0.5,
            },
            importance: ImportanceSettings { top_features: 3 },
            data_volume: DataVolumeAdjustment {
                min_observations: 10,
                confidence_penalty: 0.2,
                confidence_floor: 0.3,
            },
        }
    }
}

impl RiskConfigRule {
    /// Built-in risk thresholds.
    pub fn builtin() -> Self {
        Self {
            api_version: "v1".to_string(),
            kind: "RiskConfig".to_string(),
            metadata: CommonMetadata::builtin("risk-config-default", "Default risk thresholds"),
            spec: RiskConfigSpec::default(),
        }
    }

    /// Check threshold ordering and that confidence values are probabilities.
    pub fn validate(&self) -> Result<(), String> {
        let s = &self.spec;
        if s.severity.moderate_threshold >= s.severity.high_threshold {
            return Err(format!(
                "severity.moderate_threshold ({}) must be below severity.high_threshold ({})",
                s.severity.moderate_threshold, s.severity.high_threshold
            ));
        }

        let unit_values = [
            ("base_confidence", s.base_confidence),
            ("severity.high_confidence_boost", s.severity.high_confidence_boost),
            ("severity.confidence_cap", s.severity.confidence_cap),
            ("anomalies.max_ratio", s.anomalies.max_ratio),
            ("anomalies.confidence_penalty", s.anomalies.confidence_penalty),
            ("anomalies.confidence_floor", s.anomalies.confidence_floor),
            ("diversity.dominant_cluster_share", s.diversity.dominant_cluster_share),
            ("diversity.confidence_penalty", s.diversity.confidence_penalty),
            ("diversity.confidence_floor", s.diversity.confidence_floor),
            ("data_volume.confidence_penalty", s.data_volume.confidence_penalty),
            ("data_volume.confidence_floor", s.data_volume.confidence_floor),
        ];
        for (name, v) in unit_values {
            if !(0.0..=1.0).contains(&v) {
                return Err(format!("{name} must be within [0, 1], got {v}"));
            }
        }

        if s.importance.top_features == 0 {
            return Err("importance.top_features must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_risk_config_yaml() {
        let yaml = include_str!("../../../data/rules/risk/risk-config.yml");
        let rule: RiskConfigRule = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rule.kind, "RiskConfig");
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn shipped_yaml_matches_builtin() {
        let yaml = include_str!("../../../data/rules/risk/risk-config.yml");
        let rule: RiskConfigRule = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rule.spec, RiskConfigSpec::default());
    }

    #[test]
    fn validate_rejects_inverted_severity_thresholds() {
        let mut rule = RiskConfigRule::builtin();
        rule.spec.severity.moderate_threshold = 8.0;
        assert!(rule.validate().unwrap_err().contains("moderate_threshold"));
    }

    #[test]
    fn validate_rejects_out_of_range_confidence() {
        let mut rule = RiskConfigRule::builtin();
        rule.spec.base_confidence = 1.5;
        assert!(rule.validate().unwrap_err().contains("base_confidence"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let yaml = r#"
apiVersion: v1
kind: RiskConfig
metadata:
  id: risk-custom
  name: Custom
spec:
  base_confidence: 0.7
  surprise: true
"#;
        assert!(serde_yaml::from_str::<RiskConfigRule>(yaml).is_err());
    }
}
