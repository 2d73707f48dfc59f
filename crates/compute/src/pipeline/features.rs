//! Feature engineering: raw observations → 14-dimensional feature vectors,
//! plus batch z-score normalization.

use chrono::{Datelike, Timelike, Weekday};
use uuid::Uuid;

use vitals_core::{FeatureVector, HealthObservation, FEATURE_COUNT};
use vitals_rules::CompiledFeatureConfig;

use super::population::column_stats;

/// Build one feature vector per observation, in input order.
pub fn extract_features(
    subject_id: &str,
    observations: &[HealthObservation],
    lexicon: &CompiledFeatureConfig,
) -> Vec<FeatureVector> {
    observations
        .iter()
        .enumerate()
        .map(|(i, obs)| FeatureVector {
            id: Uuid::new_v4(),
            subject_id: subject_id.to_string(),
            timestamp: obs.timestamp,
            values: feature_values(obs, lexicon),
            observation_index: i,
        })
        .collect()
}

/// The 14 engineered features of one observation, in `FEATURE_NAMES` order.
pub fn feature_values(obs: &HealthObservation, lexicon: &CompiledFeatureConfig) -> [f64; FEATURE_COUNT] {
    let severity = f64::from(obs.severity);
    let sleep = obs.sleep_hours;
    let stress = f64::from(obs.stress);
    let exercise = obs.exercise_minutes;

    let sleep_stress_ratio = if stress == 0.0 { sleep } else { sleep / stress };
    let exercise_severity_ratio = if severity == 0.0 { exercise } else { exercise / severity };

    [
        severity,
        sleep,
        stress,
        exercise,
        obs.symptoms.len() as f64,
        symptom_severity_score(&obs.symptoms, lexicon),
        symptom_diversity(&obs.symptoms, lexicon),
        time_of_day_score(obs.timestamp.hour()),
        day_of_week_score(obs.timestamp.weekday()),
        sleep_stress_ratio,
        exercise_severity_ratio,
        lifestyle_score(sleep, stress, exercise),
        diet_quality_score(&obs.diet, lexicon),
        notes_complexity_score(&obs.notes),
    ]
}

/// Mean lookup weight over the reported symptoms; 0 when none.
pub fn symptom_severity_score(symptoms: &[String], lexicon: &CompiledFeatureConfig) -> f64 {
    if symptoms.is_empty() {
        return 0.0;
    }
    let total: f64 = symptoms.iter().map(|s| lexicon.symptom_weight(s)).sum();
    total / symptoms.len() as f64
}

/// Number of body-system categories touched by the symptom set.
pub fn symptom_diversity(symptoms: &[String], lexicon: &CompiledFeatureConfig) -> f64 {
    let lowered: Vec<String> = symptoms.iter().map(|s| s.to_lowercase()).collect();
    lexicon
        .symptom_categories
        .iter()
        .filter(|(_, keywords)| {
            lowered
                .iter()
                .any(|s| keywords.iter().any(|kw| s.contains(kw.as_str())))
        })
        .count() as f64
}

/// Morning = 1 (06–11), afternoon = 2 (12–16), evening = 3 (17–20), night = 4.
pub fn time_of_day_score(hour: u32) -> f64 {
    match hour {
        6..=11 => 1.0,
        12..=16 => 2.0,
        17..=20 => 3.0,
        _ => 4.0,
    }
}

/// 1 on weekends, 0 otherwise.
pub fn day_of_week_score(day: Weekday) -> f64 {
    match day {
        Weekday::Sat | Weekday::Sun => 1.0,
        _ => 0.0,
    }
}

/// Weighted blend of sleep adequacy, low stress and activity, in [0, 1] for
/// in-range inputs.
pub fn lifestyle_score(sleep: f64, stress: f64, exercise: f64) -> f64 {
    0.4 * (sleep / 8.0).min(1.0) + 0.3 * (10.0 - stress) / 10.0 + 0.3 * (exercise / 60.0).min(1.0)
}

/// Starts at 5; +1 per healthy keyword, -1 per unhealthy keyword; clamped to [0, 10].
pub fn diet_quality_score(diet: &str, lexicon: &CompiledFeatureConfig) -> f64 {
    let diet = diet.to_lowercase();
    let count = |keywords: &[String]| keywords.iter().filter(|kw| diet.contains(kw.as_str())).count() as f64;
    let healthy = count(lexicon.healthy_diet_keywords.as_slice());
    let unhealthy = count(lexicon.unhealthy_diet_keywords.as_slice());
    (5.0 + healthy - unhealthy).clamp(0.0, 10.0)
}

/// min(10, words * 0.1 + avg_words_per_sentence * 0.2); 0 for blank notes.
pub fn notes_complexity_score(notes: &str) -> f64 {
    if notes.trim().is_empty() {
        return 0.0;
    }
    let words = notes.split_whitespace().count() as f64;
    let sentences = notes
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count()
        .max(1) as f64;
    (words * 0.1 + (words / sentences) * 0.2).min(10.0)
}

/// Batch mean and standard deviation per feature dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationStats {
    pub means: [f64; FEATURE_COUNT],
    pub stds: [f64; FEATURE_COUNT],
}

impl NormalizationStats {
    /// Compute the statistics of a batch.
    pub fn fit(vectors: &[FeatureVector]) -> Self {
        let (means, stds) = column_stats(vectors);
        Self { means, stds }
    }

    /// Standardize one vector; zero-deviation dimensions map to 0.
    pub fn apply(&self, fv: &FeatureVector) -> FeatureVector {
        let mut values = [0.0; FEATURE_COUNT];
        for (i, v) in values.iter_mut().enumerate() {
            if self.stds[i] > 0.0 {
                *v = (fv.values[i] - self.means[i]) / self.stds[i];
            }
        }
        FeatureVector { values, ..fv.clone() }
    }
}

/// Z-score standardize a batch with statistics computed once over the batch.
///
/// Vector identity and back-references are preserved.
pub fn normalize_features(vectors: &[FeatureVector]) -> Vec<FeatureVector> {
    let stats = NormalizationStats::fit(vectors);
    vectors.iter().map(|fv| stats.apply(fv)).collect()
}
