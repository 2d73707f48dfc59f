//! Descriptive profile of an observation batch.
//!
//! Summarizes a batch before it is clustered: per-column statistics, symptom
//! frequencies, strong correlations, when entries are logged, and a few
//! clustering hints (K range, columns needing scaling, IQR outliers,
//! variability ranking). Nothing here feeds back into the analysis result.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use indexmap::IndexMap;
use serde::Serialize;

use vitals_core::HealthObservation;

/// Correlations at or below this magnitude are not reported.
const CORRELATION_CUTOFF: f64 = 0.3;

/// Columns whose range exceeds this are flagged for scaling.
const SCALING_RANGE: f64 = 10.0;

const TOP_SYMPTOMS: usize = 10;

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub mean: f64,
    /// Sample standard deviation (n - 1); 0 for fewer than two values.
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymptomSummary {
    pub mean_count: f64,
    pub max_count: usize,
    pub records_without_symptoms: usize,
    /// Most frequent symptoms, most common first; ties keep first-seen order.
    pub most_common: Vec<(String, usize)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correlation {
    pub left: String,
    pub right: String,
    pub r: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourCount {
    pub hour: u32,
    pub period: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourSeverity {
    pub hour: u32,
    pub mean_severity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemporalProfile {
    /// Hours with at least one entry, ascending.
    pub hours: Vec<HourCount>,
    /// Weekdays with at least one entry, Monday first.
    pub weekdays: Vec<(String, usize)>,
    pub peak_severity_hour: Option<HourSeverity>,
    pub lowest_severity_hour: Option<HourSeverity>,
}

/// Spread of one clustering-frame column, derived ratios included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSummary {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Sample standard deviation (n - 1).
    pub std: f64,
    /// Sample variance (n - 1).
    pub variance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusteringHints {
    pub k_min: usize,
    pub k_max: usize,
    /// One entry per clustering-frame column, in frame order.
    pub features: Vec<FeatureSummary>,
    pub needs_scaling: Vec<String>,
    /// Columns with at least one Tukey outlier.
    pub outliers: Vec<(String, usize)>,
    /// Coefficient of variation per column, highest first.
    pub variability: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetProfile {
    pub record_count: usize,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub columns: Vec<ColumnSummary>,
    pub symptoms: SymptomSummary,
    pub correlations: Vec<Correlation>,
    pub temporal: TemporalProfile,
    pub clustering: ClusteringHints,
}

impl DatasetProfile {
    pub fn from_observations(observations: &[HealthObservation]) -> Self {
        let columns = base_columns(observations);

        Self {
            record_count: observations.len(),
            first_timestamp: observations.iter().map(|o| o.timestamp).min(),
            last_timestamp: observations.iter().map(|o| o.timestamp).max(),
            columns: columns
                .iter()
                .map(|(name, values)| summarize(name, values))
                .collect(),
            symptoms: symptom_summary(observations),
            correlations: strong_correlations(&columns),
            temporal: temporal_profile(observations),
            clustering: clustering_hints(observations),
        }
    }
}

fn base_columns(observations: &[HealthObservation]) -> IndexMap<&'static str, Vec<f64>> {
    let mut cols = IndexMap::new();
    cols.insert("severity", observations.iter().map(|o| f64::from(o.severity)).collect());
    cols.insert("sleep", observations.iter().map(|o| o.sleep_hours).collect());
    cols.insert("stress", observations.iter().map(|o| f64::from(o.stress)).collect());
    cols.insert("exercise", observations.iter().map(|o| o.exercise_minutes).collect());
    cols.insert(
        "symptom_count",
        observations.iter().map(|o| o.symptoms.len() as f64).collect(),
    );
    cols
}

/// Base columns plus the smoothed ratio features used for clustering hints.
fn clustering_frame(observations: &[HealthObservation]) -> IndexMap<&'static str, Vec<f64>> {
    let mut cols = base_columns(observations);
    let derived = |f: fn(f64, f64, f64, f64) -> f64| -> Vec<f64> {
        observations
            .iter()
            .map(|o| f(f64::from(o.severity), o.sleep_hours, f64::from(o.stress), o.exercise_minutes))
            .collect()
    };
    cols.insert("sleep_stress_ratio", derived(|_, sleep, stress, _| sleep / (stress + 0.1)));
    cols.insert(
        "exercise_severity_ratio",
        derived(|severity, _, _, exercise| exercise / (severity + 0.1)),
    );
    cols.insert(
        "lifestyle_score",
        derived(|_, sleep, stress, exercise| (sleep + exercise / 10.0 - stress) / 3.0),
    );
    cols
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    ss / (values.len() - 1) as f64
}

fn sample_std(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

fn min_max(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

fn summarize(name: &str, values: &[f64]) -> ColumnSummary {
    let (min, max) = min_max(values);
    ColumnSummary {
        name: name.to_string(),
        mean: mean(values),
        std: sample_std(values),
        min,
        max,
    }
}

fn symptom_summary(observations: &[HealthObservation]) -> SymptomSummary {
    let counts: Vec<usize> = observations.iter().map(|o| o.symptoms.len()).collect();

    let mut freq: IndexMap<&str, usize> = IndexMap::new();
    for symptom in observations.iter().flat_map(|o| o.symptoms.iter()) {
        *freq.entry(symptom.as_str()).or_insert(0) += 1;
    }
    let mut most_common: Vec<(String, usize)> =
        freq.into_iter().map(|(s, c)| (s.to_string(), c)).collect();
    most_common.sort_by(|a, b| b.1.cmp(&a.1));
    most_common.truncate(TOP_SYMPTOMS);

    SymptomSummary {
        mean_count: mean(&counts.iter().map(|&c| c as f64).collect::<Vec<_>>()),
        max_count: counts.iter().copied().max().unwrap_or(0),
        records_without_symptoms: counts.iter().filter(|&&c| c == 0).count(),
        most_common,
    }
}

/// Pearson correlation; `None` when either column is constant.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let (mx, my) = (mean(x), mean(y));
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (a, b) in x.iter().zip(y) {
        cov += (a - mx) * (b - my);
        vx += (a - mx) * (a - mx);
        vy += (b - my) * (b - my);
    }
    if vx == 0.0 || vy == 0.0 {
        return None;
    }
    Some(cov / (vx.sqrt() * vy.sqrt()))
}

fn strong_correlations(columns: &IndexMap<&'static str, Vec<f64>>) -> Vec<Correlation> {
    let entries: Vec<(&&str, &Vec<f64>)> = columns.iter().collect();
    let mut out = Vec::new();
    for i in 0..entries.len() {
        for j in (i + 1)..entries.len() {
            if let Some(r) = pearson(entries[i].1, entries[j].1) {
                if r.abs() > CORRELATION_CUTOFF {
                    out.push(Correlation {
                        left: entries[i].0.to_string(),
                        right: entries[j].0.to_string(),
                        r,
                    });
                }
            }
        }
    }
    out
}

/// Label for an hour of day.
pub fn time_period(hour: u32) -> &'static str {
    match hour {
        5..=7 => "early morning",
        8..=11 => "morning",
        12..=13 => "noon",
        14..=16 => "afternoon",
        17..=19 => "evening",
        _ => "night",
    }
}

fn temporal_profile(observations: &[HealthObservation]) -> TemporalProfile {
    let mut per_hour = [0usize; 24];
    let mut severity_sum = [0.0f64; 24];
    let mut per_day = [0usize; 7];

    for o in observations {
        let hour = o.timestamp.hour() as usize;
        per_hour[hour] += 1;
        severity_sum[hour] += f64::from(o.severity);
        per_day[o.timestamp.weekday().num_days_from_monday() as usize] += 1;
    }

    let hours: Vec<HourCount> = (0..24u32)
        .filter(|&h| per_hour[h as usize] > 0)
        .map(|h| HourCount {
            hour: h,
            period: time_period(h),
            count: per_hour[h as usize],
        })
        .collect();

    let hourly_severity: Vec<HourSeverity> = hours
        .iter()
        .map(|h| HourSeverity {
            hour: h.hour,
            mean_severity: severity_sum[h.hour as usize] / h.count as f64,
        })
        .collect();

    // First hour wins on ties in both directions.
    let mut peak: Option<&HourSeverity> = None;
    let mut lowest: Option<&HourSeverity> = None;
    for hs in &hourly_severity {
        if peak.map_or(true, |p| hs.mean_severity > p.mean_severity) {
            peak = Some(hs);
        }
        if lowest.map_or(true, |l| hs.mean_severity < l.mean_severity) {
            lowest = Some(hs);
        }
    }

    TemporalProfile {
        weekdays: WEEKDAYS
            .iter()
            .zip(per_day)
            .filter(|(_, c)| *c > 0)
            .map(|(d, c)| (weekday_name(*d).to_string(), c))
            .collect(),
        peak_severity_hour: peak.cloned(),
        lowest_severity_hour: lowest.cloned(),
        hours,
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Quantile with linear interpolation between closest ranks.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Values outside the 1.5 * IQR fences.
pub fn tukey_outliers(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let (low, high) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
    values.iter().filter(|&&v| v < low || v > high).count()
}

fn clustering_hints(observations: &[HealthObservation]) -> ClusteringHints {
    let n = observations.len() as f64;
    let frame = clustering_frame(observations);

    let features = frame
        .iter()
        .map(|(name, values)| {
            let (min, max) = min_max(values);
            let variance = sample_variance(values);
            FeatureSummary {
                name: name.to_string(),
                min,
                max,
                mean: mean(values),
                std: variance.sqrt(),
                variance,
            }
        })
        .collect();

    let needs_scaling = frame
        .iter()
        .filter(|(_, values)| {
            let (min, max) = min_max(values);
            max - min > SCALING_RANGE
        })
        .map(|(name, _)| name.to_string())
        .collect();

    let outliers = frame
        .iter()
        .map(|(name, values)| (name.to_string(), tukey_outliers(values)))
        .filter(|(_, count)| *count > 0)
        .collect();

    let mut variability: Vec<(String, f64)> = frame
        .iter()
        .map(|(name, values)| (name.to_string(), sample_std(values) / (mean(values) + 0.001)))
        .collect();
    variability.sort_by(|a, b| b.1.total_cmp(&a.1));

    ClusteringHints {
        k_min: ((n / 2.0).sqrt() as usize).max(2),
        k_max: (n.sqrt() as usize).min(10),
        features,
        needs_scaling,
        outliers,
        variability,
    }
}
