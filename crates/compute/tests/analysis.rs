//! End-to-end tests for `HealthAnalyzer`: degraded results, risk scenarios,
//! cluster-count selection and the deployed-model fast path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

use vitals_compute::pipeline::{extract_features, normalize_features};
use vitals_compute::{find_optimal_k, DeployedModel, HealthAnalyzer, ModelError};
use vitals_core::config::AnalysisConfig;
use vitals_core::{HealthObservation, RiskAssessment, RiskLevel, FEATURE_COUNT};
use vitals_rules::{CompiledFeatureConfig, RuleSet};

fn analyzer() -> HealthAnalyzer {
    HealthAnalyzer::new(
        AnalysisConfig {
            seed: Some(42),
            ..AnalysisConfig::default()
        },
        RuleSet::builtin(),
    )
}

fn at_hour(hour: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 2, hour, 30, 0).unwrap()
}

/// Four groups of five identical observations with distinct vitals.
fn four_groups() -> Vec<HealthObservation> {
    let groups = [
        (2, 8.5, 2, 60.0, "fruit salad"),
        (4, 7.0, 5, 30.0, "pasta"),
        (7, 5.0, 7, 10.0, "fast food"),
        (9, 3.0, 9, 0.0, "soda and chips"),
    ];
    groups
        .iter()
        .flat_map(|&(severity, sleep, stress, exercise, diet)| {
            (0..5).map(move |_| {
                HealthObservation::new(severity, sleep, stress, exercise)
                    .with_diet(diet)
                    .at(at_hour(10))
            })
        })
        .collect()
}

// ── Degraded results ────────────────────────────────────────

#[test]
fn two_observations_give_insufficient_data() {
    let obs = vec![
        HealthObservation::new(5, 7.0, 5, 20.0),
        HealthObservation::new(6, 6.0, 6, 10.0),
    ];
    let result = analyzer().analyze("subject-a", &obs);

    assert_eq!(result.risk_level, RiskLevel::Low);
    assert_eq!(result.confidence, 0.1);
    assert_eq!(result.optimal_k, 1);
    assert!(result.clusters.is_empty());
    assert!(result.anomalies.is_empty());
    assert!(result.feature_importance.is_empty());
    assert_eq!(
        result.patterns,
        vec!["Insufficient data for meaningful analysis".to_string()]
    );
    assert_eq!(result.recommendations.len(), 1);
}

#[test]
fn clustering_failure_gives_error_result() {
    let permissive = HealthAnalyzer::new(
        AnalysisConfig {
            min_observations: 0,
            seed: Some(1),
            ..AnalysisConfig::default()
        },
        RuleSet::builtin(),
    );
    let result = permissive.analyze("subject-empty", &[]);

    assert_eq!(result.risk_level, RiskLevel::Low);
    assert_eq!(result.confidence, 0.0);
    assert_eq!(result.patterns, vec!["Analysis error occurred".to_string()]);
    assert!(result.clusters.is_empty());
}

// ── Risk scenarios ──────────────────────────────────────────

#[test]
fn uniformly_severe_batch_is_high_risk() {
    let obs: Vec<HealthObservation> = (0..10)
        .map(|_| HealthObservation::new(9, 3.0, 9, 0.0).at(at_hour(21)))
        .collect();
    let result = analyzer().analyze("subject-b", &obs);

    assert_eq!(result.risk_level, RiskLevel::High);
    assert!(result.confidence >= 0.9);
    assert!(result.confidence <= 0.95);
    assert!(result
        .patterns
        .iter()
        .any(|p| p.contains("high symptom severity")));
    assert!(result.patterns.iter().any(|p| p.contains("sleep deprivation")));
    assert!(result.patterns.iter().any(|p| p.contains("stress")));
    assert_eq!(result.member_count(), 10);
    assert!(result.anomalies.is_empty());

    // Every candidate K ties at silhouette 0, so the lowest one is kept and
    // all identical points share one cluster.
    assert_eq!(result.optimal_k, 2);
    let mut sizes: Vec<usize> = result.clusters.iter().map(|c| c.members.len()).collect();
    sizes.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(sizes, vec![10, 0]);
}

#[test]
fn healthy_batch_is_low_risk() {
    let obs: Vec<HealthObservation> = (0..12)
        .map(|i| {
            HealthObservation::new(if i % 2 == 0 { 1 } else { 2 }, 8.0, 2, 45.0)
                .with_diet("vegetables and fish")
                .at(at_hour(8 + (i % 3) as u32))
        })
        .collect();
    let result = analyzer().analyze("subject-healthy", &obs);

    assert_eq!(result.risk_level, RiskLevel::Low);
    assert!(result
        .patterns
        .iter()
        .all(|p| !p.contains("severity") || p.starts_with("Key contributing factors")));
    assert!((0.0..=1.0).contains(&result.confidence));
}

#[test]
fn result_invariants_hold() {
    let obs = four_groups();
    let result = analyzer().analyze("subject-c", &obs);

    assert!(result.optimal_k <= obs.len());
    assert_eq!(result.clusters.len(), result.optimal_k);
    assert_eq!(result.member_count(), obs.len());
    assert!((0.0..=1.0).contains(&result.confidence));

    let keys: Vec<&str> = result.feature_importance.keys().map(|k| k.as_str()).collect();
    assert_eq!(keys.len(), FEATURE_COUNT);
    assert_eq!(keys[0], "severity");
    assert!(result
        .feature_importance
        .values()
        .all(|w| (0.0..=1.0).contains(w)));

    // Back-references point into the input batch.
    for cluster in &result.clusters {
        for member in &cluster.members {
            assert!(member.observation_index < obs.len());
            assert_eq!(member.subject_id, "subject-c");
        }
    }
}

// ── Optimal K ───────────────────────────────────────────────

#[test]
fn four_separated_groups_select_four_clusters() {
    let obs = four_groups();
    let features = normalize_features(&extract_features(
        "subject-c",
        &obs,
        &CompiledFeatureConfig::default(),
    ));
    let points: Vec<[f64; FEATURE_COUNT]> = features.iter().map(|fv| fv.values).collect();

    let mut rng = StdRng::seed_from_u64(9);
    assert_eq!(find_optimal_k(&points, 10, &mut rng).unwrap(), 4);

    let result = analyzer().analyze("subject-c", &obs);
    assert_eq!(result.optimal_k, 4);
    let mut sizes: Vec<usize> = result.clusters.iter().map(|c| c.members.len()).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![5, 5, 5, 5]);
    assert!(result.clusters.iter().all(|c| c.inertia.abs() < 1e-12));
    assert!((result.clusters[0].silhouette - 1.0).abs() < 1e-12);
}

// ── Deployed model fast path ────────────────────────────────

struct StubModel {
    ready: bool,
    fail: bool,
    calls: AtomicUsize,
}

impl StubModel {
    fn new(ready: bool, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            ready,
            fail,
            calls: AtomicUsize::new(0),
        })
    }
}

impl DeployedModel for StubModel {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn assess_health_risk(&self, _observation: &HealthObservation) -> Result<RiskAssessment, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ModelError::Inference("timeout".into()));
        }
        Ok(RiskAssessment {
            overall_risk: RiskLevel::Medium,
            confidence: 0.82,
            risk_score: 0.57,
            severity_risk: 0.6,
            lifestyle_risk: 0.4,
            symptom_risk: 0.3,
            primary_cluster: 2,
            immediate_actions: vec!["Rest today".into()],
            preventative_actions: vec!["Keep a regular sleep schedule".into(), "Stay hydrated".into()],
        })
    }
}

#[test]
fn ready_model_answers_single_observation() {
    let model = StubModel::new(true, false);
    let analyzer = analyzer().with_model(model.clone());
    let result = analyzer.analyze("subject-m", &[HealthObservation::new(6, 6.0, 6, 15.0)]);

    assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.risk_level, RiskLevel::Medium);
    assert_eq!(result.confidence, 0.82);
    assert_eq!(result.optimal_k, 1);
    assert!(result.clusters.is_empty());
    assert_eq!(
        result.recommendations,
        vec![
            "Rest today".to_string(),
            "Keep a regular sleep schedule".to_string(),
            "Stay hydrated".to_string()
        ]
    );
    assert!(result.patterns[0].contains("cluster 2"));
    let keys: Vec<&str> = result.feature_importance.keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["severity_risk", "lifestyle_risk", "symptom_risk"]);
}

#[test]
fn unready_model_falls_back_to_pipeline() {
    let model = StubModel::new(false, false);
    let analyzer = analyzer().with_model(model.clone());
    let result = analyzer.analyze("subject-m", &[HealthObservation::new(6, 6.0, 6, 15.0)]);

    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    assert_eq!(result.confidence, 0.1);
    assert_eq!(result.patterns[0], "Insufficient data for meaningful analysis");
}

#[test]
fn failing_model_falls_back_to_pipeline() {
    let model = StubModel::new(true, true);
    let analyzer = analyzer().with_model(model.clone());
    let result = analyzer.analyze("subject-m", &[HealthObservation::new(6, 6.0, 6, 15.0)]);

    assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.risk_level, RiskLevel::Low);
    assert_eq!(result.confidence, 0.1);
}

#[test]
fn model_is_not_consulted_for_batches() {
    let model = StubModel::new(true, false);
    let analyzer = analyzer().with_model(model.clone());
    let obs: Vec<HealthObservation> = (0..4).map(|_| HealthObservation::new(3, 7.0, 3, 30.0)).collect();
    let result = analyzer.analyze("subject-m", &obs);

    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    assert_eq!(result.member_count(), 4);
}

#[test]
fn analyzer_is_shareable_across_threads() {
    let analyzer = Arc::new(analyzer());
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let analyzer = Arc::clone(&analyzer);
            std::thread::spawn(move || {
                let obs: Vec<HealthObservation> = (0..6)
                    .map(|i| HealthObservation::new(((i + t) % 10 + 1) as u8, 7.0, 4, 20.0))
                    .collect();
                analyzer.analyze(&format!("subject-{t}"), &obs).member_count()
            })
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), 6);
    }
}
