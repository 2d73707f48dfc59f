use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of engineered features per observation.
pub const FEATURE_COUNT: usize = 14;

/// Feature names, in vector order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "severity",
    "sleep",
    "stress",
    "exercise",
    "symptom_count",
    "symptom_severity_score",
    "symptom_diversity",
    "time_of_day_score",
    "day_of_week_score",
    "sleep_stress_ratio",
    "exercise_severity_ratio",
    "lifestyle_score",
    "diet_quality_score",
    "notes_complexity_score",
];

/// Identifier of a cluster within one analysis run (0-based).
pub type ClusterId = usize;

/// Numeric encoding of one observation.
///
/// Created per analysis call and discarded afterwards. `observation_index`
/// points back into the caller's input slice and is only used to report the
/// raw values behind a vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub id: Uuid,
    pub subject_id: String,
    pub timestamp: DateTime<Utc>,
    pub values: [f64; FEATURE_COUNT],
    pub observation_index: usize,
}

impl FeatureVector {
    /// Feature names parallel to `values`.
    pub fn names(&self) -> &'static [&'static str; FEATURE_COUNT] {
        &FEATURE_NAMES
    }

    /// Look up a feature value by name.
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.values[i])
    }
}

/// One cluster of a K-means partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterResult {
    pub id: ClusterId,
    /// Centroid in normalized feature space.
    pub centroid: Vec<f64>,
    pub members: Vec<FeatureVector>,
    /// Sum of squared member distances to the centroid.
    pub inertia: f64,
    /// Batch-level silhouette score, identical for every cluster of a run.
    pub silhouette: f64,
}

/// Headline risk classification. Ordered: `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// The engine's sole output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub clusters: Vec<ClusterResult>,
    pub optimal_k: usize,
    pub risk_level: RiskLevel,
    pub patterns: Vec<String>,
    pub recommendations: Vec<String>,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Feature name → normalized weight in [0, 1], in feature order.
    pub feature_importance: IndexMap<String, f64>,
    pub anomalies: Vec<FeatureVector>,
}

impl AnalysisResult {
    /// Result returned when a batch is too small to cluster.
    pub fn insufficient_data() -> Self {
        Self::degraded(
            0.1,
            "Insufficient data for meaningful analysis",
            "Continue logging your health data daily to enable pattern analysis",
        )
    }

    /// Result returned when the pipeline hit a hard failure.
    pub fn analysis_error() -> Self {
        Self::degraded(
            0.0,
            "Analysis error occurred",
            "Please try again later or contact support if the problem persists",
        )
    }

    fn degraded(confidence: f64, pattern: &str, recommendation: &str) -> Self {
        Self {
            clusters: Vec::new(),
            optimal_k: 1,
            risk_level: RiskLevel::Low,
            patterns: vec![pattern.to_string()],
            recommendations: vec![recommendation.to_string()],
            confidence,
            feature_importance: IndexMap::new(),
            anomalies: Vec::new(),
        }
    }

    /// Total number of clustered feature vectors.
    pub fn member_count(&self) -> usize {
        self.clusters.iter().map(|c| c.members.len()).sum()
    }
}

/// Response of a deployed risk model for a single observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub overall_risk: RiskLevel,
    pub confidence: f64,
    pub risk_score: f64,
    pub severity_risk: f64,
    pub lifestyle_risk: f64,
    pub symptom_risk: f64,
    pub primary_cluster: ClusterId,
    #[serde(default)]
    pub immediate_actions: Vec<String>,
    #[serde(default)]
    pub preventative_actions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_levels_are_ordered() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert_eq!(RiskLevel::Low.max(RiskLevel::High), RiskLevel::High);
    }

    #[test]
    fn risk_level_serializes_lowercase() {
        let json = serde_json::to_string(&RiskLevel::Medium).unwrap();
        assert_eq!(json, "\"medium\"");
        assert_eq!(RiskLevel::High.to_string(), "high");
    }

    #[test]
    fn insufficient_data_shape() {
        let r = AnalysisResult::insufficient_data();
        assert_eq!(r.risk_level, RiskLevel::Low);
        assert_eq!(r.confidence, 0.1);
        assert_eq!(r.optimal_k, 1);
        assert!(r.clusters.is_empty());
        assert!(r.anomalies.is_empty());
        assert!(r.feature_importance.is_empty());
        assert_eq!(r.patterns.len(), 1);
        assert_eq!(r.recommendations.len(), 1);
    }

    #[test]
    fn analysis_error_has_zero_confidence() {
        let r = AnalysisResult::analysis_error();
        assert_eq!(r.confidence, 0.0);
        assert_eq!(r.patterns, vec!["Analysis error occurred".to_string()]);
    }

    #[test]
    fn feature_lookup_by_name() {
        let mut values = [0.0; FEATURE_COUNT];
        values[2] = 7.0;
        let fv = FeatureVector {
            id: Uuid::new_v4(),
            subject_id: "s1".into(),
            timestamp: Utc::now(),
            values,
            observation_index: 0,
        };
        assert_eq!(fv.get("stress"), Some(7.0));
        assert_eq!(fv.get("nope"), None);
        assert_eq!(fv.names()[13], "notes_complexity_score");
    }
}
