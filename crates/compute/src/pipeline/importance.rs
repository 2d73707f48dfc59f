//! Variance-based feature importance.
//!
//! A dimension's raw score is its population variance inside each cluster,
//! averaged over all K clusters (clusters with at most one member count as
//! zero). Scores are then scaled by the maximum so the top feature is 1.

use indexmap::IndexMap;

use vitals_core::{ClusterId, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};

use super::population::variance;

/// Feature name → normalized importance in [0, 1], in feature order.
///
/// `assignments` is parallel to `vectors`. When every raw score is zero the
/// map still lists every feature, all at zero.
pub fn feature_importance(
    vectors: &[FeatureVector],
    assignments: &[ClusterId],
    k: usize,
) -> IndexMap<String, f64> {
    let mut raw = [0.0; FEATURE_COUNT];

    if k > 0 {
        for cluster in 0..k {
            let members: Vec<&FeatureVector> = vectors
                .iter()
                .zip(assignments)
                .filter(|(_, c)| **c == cluster)
                .map(|(fv, _)| fv)
                .collect();

            for (dim, score) in raw.iter_mut().enumerate() {
                let column: Vec<f64> = members.iter().map(|fv| fv.values[dim]).collect();
                *score += variance(&column);
            }
        }
        for score in &mut raw {
            *score /= k as f64;
        }
    }

    let max = raw.iter().cloned().fold(0.0_f64, f64::max);

    FEATURE_NAMES
        .iter()
        .zip(raw)
        .map(|(name, score)| {
            let weight = if max > 0.0 { score / max } else { 0.0 };
            (name.to_string(), weight)
        })
        .collect()
}

/// The `n` highest-weighted feature names; ties keep feature order.
pub fn top_features(importance: &IndexMap<String, f64>, n: usize) -> Vec<&str> {
    let mut ranked: Vec<(&String, &f64)> = importance.iter().collect();
    // Stable sort keeps the insertion (feature) order among equal weights.
    ranked.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.into_iter().take(n).map(|(name, _)| name.as_str()).collect()
}
