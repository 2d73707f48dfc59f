//! Heuristic risk assessment.
//!
//! Risk is computed by folding an accumulator through an ordered list of
//! immutable rules. Each rule receives the accumulator by value and returns
//! the next one. The order matters: confidence caps and floors are applied
//! to whatever value earlier rules left behind.

use indexmap::IndexMap;
use tracing::debug;

use vitals_core::{HealthObservation, RiskLevel};
use vitals_rules::risk_config::{
    AnomalyAdjustment, DataVolumeAdjustment, DiversityAdjustment, ExerciseThresholds,
    SeverityThresholds, SleepThresholds, StressThresholds,
};
use vitals_rules::RiskConfigSpec;

use super::importance::top_features;

/// Running state threaded through the rule fold.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAccumulator {
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub patterns: Vec<String>,
    pub recommendations: Vec<String>,
}

impl RiskAccumulator {
    pub fn new(confidence: f64) -> Self {
        Self {
            risk_level: RiskLevel::Low,
            confidence,
            patterns: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    /// Raise the level to at least `level`. Never lowers it.
    pub fn escalate(mut self, level: RiskLevel) -> Self {
        self.risk_level = self.risk_level.max(level);
        self
    }

    pub fn pattern(mut self, text: impl Into<String>) -> Self {
        self.patterns.push(text.into());
        self
    }

    pub fn recommend(mut self, text: impl Into<String>) -> Self {
        self.recommendations.push(text.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }
}

/// Batch statistics the rules read.
///
/// Means come from the raw observations, not the normalized vectors.
#[derive(Debug, Clone)]
pub struct RiskContext<'a> {
    pub batch_size: usize,
    pub mean_severity: f64,
    pub mean_sleep: f64,
    pub mean_stress: f64,
    pub mean_exercise: f64,
    pub anomaly_count: usize,
    pub cluster_sizes: Vec<usize>,
    pub importance: &'a IndexMap<String, f64>,
}

impl<'a> RiskContext<'a> {
    pub fn new(
        observations: &[HealthObservation],
        cluster_sizes: Vec<usize>,
        anomaly_count: usize,
        importance: &'a IndexMap<String, f64>,
    ) -> Self {
        let mean = |f: fn(&HealthObservation) -> f64| {
            if observations.is_empty() {
                0.0
            } else {
                observations.iter().map(f).sum::<f64>() / observations.len() as f64
            }
        };

        Self {
            batch_size: observations.len(),
            mean_severity: mean(|o| f64::from(o.severity)),
            mean_sleep: mean(|o| o.sleep_hours),
            mean_stress: mean(|o| f64::from(o.stress)),
            mean_exercise: mean(|o| o.exercise_minutes),
            anomaly_count,
            cluster_sizes,
            importance,
        }
    }

    /// Size of the largest cluster, 0 without a partition.
    pub fn largest_cluster(&self) -> usize {
        self.cluster_sizes.iter().copied().max().unwrap_or(0)
    }
}

/// One step of the risk fold.
pub trait RiskRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, acc: RiskAccumulator, ctx: &RiskContext<'_>) -> RiskAccumulator;
}

// ── Rules ───────────────────────────────────────────────────────────

pub struct HighSeverityRule(pub SeverityThresholds);

impl RiskRule for HighSeverityRule {
    fn name(&self) -> &'static str {
        "high-severity"
    }

    fn apply(&self, acc: RiskAccumulator, ctx: &RiskContext<'_>) -> RiskAccumulator {
        if ctx.mean_severity <= self.0.high_threshold {
            return acc;
        }
        let confidence = (acc.confidence + self.0.high_confidence_boost).min(self.0.confidence_cap);
        acc.escalate(RiskLevel::High)
            .pattern(format!(
                "Consistently high symptom severity (average {:.1}/10)",
                ctx.mean_severity
            ))
            .recommend("Consider consulting a healthcare provider about your persistent high-severity symptoms")
            .with_confidence(confidence)
    }
}

/// Fires only when the high-severity rule did not.
pub struct ModerateSeverityRule(pub SeverityThresholds);

impl RiskRule for ModerateSeverityRule {
    fn name(&self) -> &'static str {
        "moderate-severity"
    }

    fn apply(&self, acc: RiskAccumulator, ctx: &RiskContext<'_>) -> RiskAccumulator {
        let m = ctx.mean_severity;
        if m <= self.0.moderate_threshold || m > self.0.high_threshold {
            return acc;
        }
        acc.escalate(RiskLevel::Medium)
            .pattern(format!("Moderate symptom severity (average {m:.1}/10)"))
            .recommend("Monitor your symptoms and note any changes in severity or frequency")
    }
}

pub struct SleepDeprivationRule(pub SleepThresholds);

impl RiskRule for SleepDeprivationRule {
    fn name(&self) -> &'static str {
        "sleep-deprivation"
    }

    fn apply(&self, acc: RiskAccumulator, ctx: &RiskContext<'_>) -> RiskAccumulator {
        if ctx.mean_sleep >= self.0.min_hours {
            return acc;
        }
        acc.escalate(RiskLevel::Medium)
            .pattern(format!(
                "Chronic sleep deprivation (average {:.1} hours per night)",
                ctx.mean_sleep
            ))
            .recommend("Aim for 7-9 hours of sleep per night and keep a consistent sleep schedule")
    }
}

pub struct ElevatedStressRule(pub StressThresholds);

impl RiskRule for ElevatedStressRule {
    fn name(&self) -> &'static str {
        "elevated-stress"
    }

    fn apply(&self, acc: RiskAccumulator, ctx: &RiskContext<'_>) -> RiskAccumulator {
        if ctx.mean_stress <= self.0.high_threshold {
            return acc;
        }
        acc.escalate(RiskLevel::Medium)
            .pattern(format!("Elevated stress levels (average {:.1}/10)", ctx.mean_stress))
            .recommend("Practice stress-management techniques such as meditation, breathing exercises or regular breaks")
    }
}

/// Advisory only: never changes the risk level.
pub struct LowActivityRule(pub ExerciseThresholds);

impl RiskRule for LowActivityRule {
    fn name(&self) -> &'static str {
        "low-activity"
    }

    fn apply(&self, acc: RiskAccumulator, ctx: &RiskContext<'_>) -> RiskAccumulator {
        if ctx.mean_exercise >= self.0.min_minutes {
            return acc;
        }
        acc.pattern(format!(
            "Low physical activity (average {:.0} minutes per day)",
            ctx.mean_exercise
        ))
        .recommend("Aim for at least 30 minutes of moderate physical activity most days")
    }
}

pub struct IrregularPatternsRule(pub AnomalyAdjustment);

impl RiskRule for IrregularPatternsRule {
    fn name(&self) -> &'static str {
        "irregular-patterns"
    }

    fn apply(&self, acc: RiskAccumulator, ctx: &RiskContext<'_>) -> RiskAccumulator {
        if ctx.anomaly_count as f64 <= self.0.max_ratio * ctx.batch_size as f64 {
            return acc;
        }
        let confidence = (acc.confidence - self.0.confidence_penalty).max(self.0.confidence_floor);
        acc.pattern(format!(
            "Irregular patterns detected ({} unusual entries)",
            ctx.anomaly_count
        ))
        .recommend("Review the unusual entries and discuss them with a healthcare provider if they recur")
        .with_confidence(confidence)
    }
}

pub struct NoDominantTrendRule(pub DiversityAdjustment);

impl RiskRule for NoDominantTrendRule {
    fn name(&self) -> &'static str {
        "no-dominant-trend"
    }

    fn apply(&self, acc: RiskAccumulator, ctx: &RiskContext<'_>) -> RiskAccumulator {
        let total: usize = ctx.cluster_sizes.iter().sum();
        if total == 0 || ctx.largest_cluster() as f64 >= self.0.dominant_cluster_share * total as f64 {
            return acc;
        }
        let confidence = (acc.confidence - self.0.confidence_penalty).max(self.0.confidence_floor);
        acc.pattern("Diverse patterns with no dominant trend")
            .with_confidence(confidence)
    }
}

/// Names the highest-weighted features whenever importance is non-empty.
///
/// All-zero weights still fire; ties keep feature order, so a constant batch
/// reports the first features.
pub struct KeyFactorsRule {
    pub top_features: usize,
}

impl RiskRule for KeyFactorsRule {
    fn name(&self) -> &'static str {
        "key-factors"
    }

    fn apply(&self, acc: RiskAccumulator, ctx: &RiskContext<'_>) -> RiskAccumulator {
        if ctx.importance.is_empty() {
            return acc;
        }
        let top = top_features(ctx.importance, self.top_features);
        acc.pattern(format!("Key contributing factors: {}", top.join(", ")))
    }
}

pub struct LimitedDataRule(pub DataVolumeAdjustment);

impl RiskRule for LimitedDataRule {
    fn name(&self) -> &'static str {
        "limited-data"
    }

    fn apply(&self, acc: RiskAccumulator, ctx: &RiskContext<'_>) -> RiskAccumulator {
        if ctx.batch_size >= self.0.min_observations {
            return acc;
        }
        let confidence = (acc.confidence - self.0.confidence_penalty).max(self.0.confidence_floor);
        acc.pattern(format!("Limited data ({} observations)", ctx.batch_size))
            .recommend("Continue logging your health data daily to improve analysis accuracy")
            .with_confidence(confidence)
    }
}

// ── Engine ──────────────────────────────────────────────────────────

/// Ordered, immutable rule list.
pub struct RiskEngine {
    base_confidence: f64,
    rules: Vec<Box<dyn RiskRule>>,
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::from_config(&RiskConfigSpec::default())
    }
}

impl RiskEngine {
    /// The standard nine rules, parameterized by `config`.
    pub fn from_config(config: &RiskConfigSpec) -> Self {
        let rules: Vec<Box<dyn RiskRule>> = vec![
            Box::new(HighSeverityRule(config.severity.clone())),
            Box::new(ModerateSeverityRule(config.severity.clone())),
            Box::new(SleepDeprivationRule(config.sleep.clone())),
            Box::new(ElevatedStressRule(config.stress.clone())),
            Box::new(LowActivityRule(config.exercise.clone())),
            Box::new(IrregularPatternsRule(config.anomalies.clone())),
            Box::new(NoDominantTrendRule(config.diversity.clone())),
            Box::new(KeyFactorsRule {
                top_features: config.importance.top_features,
            }),
            Box::new(LimitedDataRule(config.data_volume.clone())),
        ];
        Self::with_rules(config.base_confidence, rules)
    }

    pub fn with_rules(base_confidence: f64, rules: Vec<Box<dyn RiskRule>>) -> Self {
        Self {
            base_confidence,
            rules,
        }
    }

    pub fn rules(&self) -> &[Box<dyn RiskRule>] {
        &self.rules
    }

    pub fn base_confidence(&self) -> f64 {
        self.base_confidence
    }

    /// Fold every rule in order over a fresh accumulator.
    ///
    /// The final confidence is rounded to three decimals and kept in [0, 1].
    pub fn evaluate(&self, ctx: &RiskContext<'_>) -> RiskAccumulator {
        let mut acc = self.rules.iter().fold(RiskAccumulator::new(self.base_confidence), |acc, rule| {
            let next = rule.apply(acc, ctx);
            debug!(rule = rule.name(), risk = %next.risk_level, confidence = next.confidence, "risk rule applied");
            next
        });
        acc.confidence = ((acc.confidence * 1000.0).round() / 1000.0).clamp(0.0, 1.0);
        acc
    }
}
