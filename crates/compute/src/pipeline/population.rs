//! Population-level statistics over feature vectors.
//!
//! Provides per-dimension mean/variance/stddev, shared by batch
//! normalization, anomaly detection and feature importance.

use vitals_core::{FeatureVector, FEATURE_COUNT};

/// Per-dimension mean and population standard deviation.
///
/// Unlike scoring helpers that floor the deviation, zero is kept as-is so
/// callers can detect constant dimensions.
pub fn column_stats(vectors: &[FeatureVector]) -> ([f64; FEATURE_COUNT], [f64; FEATURE_COUNT]) {
    let mut means = [0.0; FEATURE_COUNT];
    let mut stds = [0.0; FEATURE_COUNT];
    if vectors.is_empty() {
        return (means, stds);
    }

    let n = vectors.len() as f64;
    for fv in vectors {
        for (m, v) in means.iter_mut().zip(fv.values.iter()) {
            *m += v;
        }
    }
    for m in &mut means {
        *m /= n;
    }

    for fv in vectors {
        for i in 0..FEATURE_COUNT {
            let diff = fv.values[i] - means[i];
            stds[i] += diff * diff;
        }
    }
    for s in &mut stds {
        *s = (*s / n).sqrt();
    }

    // Summation error can leave a tiny non-zero deviation on a constant column.
    let first = &vectors[0].values;
    for i in 0..FEATURE_COUNT {
        if vectors.iter().all(|fv| fv.values[i] == first[i]) {
            means[i] = first[i];
            stds[i] = 0.0;
        }
    }

    (means, stds)
}

/// Population variance of a slice; 0 for fewer than two values.
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
}
