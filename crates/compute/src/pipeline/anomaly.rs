//! Per-dimension z-score outlier detection.
//!
//! Each feature dimension is tested independently against the batch mean
//! and standard deviation. There is no correction for testing fourteen
//! dimensions at once.

use std::collections::HashSet;

use uuid::Uuid;

use vitals_core::{FeatureVector, FEATURE_COUNT};

use super::population::column_stats;

/// Default |z| above which a feature value is anomalous.
pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 2.5;

/// Batches smaller than this are never scored.
const MIN_BATCH: usize = 3;

/// Return the vectors with at least one feature whose |z| exceeds `threshold`.
///
/// Dimensions with zero deviation are skipped. A vector flagged on several
/// dimensions is reported once; output keeps input order.
pub fn detect_anomalies(vectors: &[FeatureVector], threshold: f64) -> Vec<FeatureVector> {
    if vectors.len() < MIN_BATCH {
        return Vec::new();
    }

    let (means, stds) = column_stats(vectors);
    let mut flagged: HashSet<Uuid> = HashSet::new();

    for dim in 0..FEATURE_COUNT {
        if stds[dim] == 0.0 {
            continue;
        }
        for fv in vectors {
            let z = (fv.values[dim] - means[dim]) / stds[dim];
            if z.abs() > threshold {
                flagged.insert(fv.id);
            }
        }
    }

    vectors
        .iter()
        .filter(|fv| flagged.contains(&fv.id))
        .cloned()
        .collect()
}
