use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use vitals_core::config::AnalysisConfig;
use vitals_core::{AnalysisResult, ClusterResult, Config, FeatureVector, HealthObservation, FEATURE_COUNT};
use vitals_rules::{RuleError, RuleSet};

use crate::algorithms::distance::squared_euclidean;
use crate::algorithms::kmeans::{find_optimal_k_with, ClusterError, InitStrategy, KMeans, KMeansResult};
use crate::model::DeployedModel;
use crate::pipeline::{anomaly, features, importance, risk};

/// Batch analyzer: feature engineering, clustering, anomaly detection,
/// importance ranking and rule-based risk assessment.
///
/// Holds only immutable configuration. Every call builds its own working
/// state and RNG, so one instance can be shared across threads.
pub struct HealthAnalyzer {
    config: AnalysisConfig,
    rules: RuleSet,
    risk_engine: risk::RiskEngine,
    model: Option<Arc<dyn DeployedModel>>,
}

impl Default for HealthAnalyzer {
    fn default() -> Self {
        Self::new(AnalysisConfig::default(), RuleSet::builtin())
    }
}

impl HealthAnalyzer {
    pub fn new(config: AnalysisConfig, rules: RuleSet) -> Self {
        let risk_engine = risk::RiskEngine::from_config(&rules.risk);
        Self {
            config,
            rules,
            risk_engine,
            model: None,
        }
    }

    /// Build from the environment config, loading rule documents from
    /// `rules.rules_dir` when one is set.
    pub fn from_config(config: &Config) -> Result<Self, RuleError> {
        let rules = match &config.rules.rules_dir {
            Some(dir) => RuleSet::load_dir(dir)?,
            None => RuleSet::builtin(),
        };
        Ok(Self::new(config.analysis.clone(), rules))
    }

    /// Attach a deployed model for the single-observation fast path.
    pub fn with_model(mut self, model: Arc<dyn DeployedModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Analyze one subject's batch. Never fails: hard clustering errors
    /// become the degraded error result.
    pub fn analyze(&self, subject_id: &str, observations: &[HealthObservation]) -> AnalysisResult {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.analyze_with_rng(subject_id, observations, &mut rng)
    }

    /// [`analyze`](Self::analyze) drawing all randomness from `rng`.
    pub fn analyze_with_rng<R: Rng + ?Sized>(
        &self,
        subject_id: &str,
        observations: &[HealthObservation],
        rng: &mut R,
    ) -> AnalysisResult {
        let start = Instant::now();
        info!(subject = subject_id, n = observations.len(), "analysis started");

        if let [single] = observations {
            if let Some(result) = self.assess_with_model(single) {
                info!(subject = subject_id, risk = %result.risk_level, "analysis answered by deployed model");
                return result;
            }
        }

        if observations.len() < self.config.min_observations {
            info!(
                subject = subject_id,
                n = observations.len(),
                min = self.config.min_observations,
                "insufficient data for analysis"
            );
            return AnalysisResult::insufficient_data();
        }

        match self.run_pipeline(subject_id, observations, rng) {
            Ok(result) => {
                info!(
                    subject = subject_id,
                    n = observations.len(),
                    k = result.optimal_k,
                    risk = %result.risk_level,
                    confidence = result.confidence,
                    anomalies = result.anomalies.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "analysis complete"
                );
                result
            }
            Err(e) => {
                warn!(subject = subject_id, error = %e, "analysis failed, returning degraded result");
                AnalysisResult::analysis_error()
            }
        }
    }

    fn run_pipeline<R: Rng + ?Sized>(
        &self,
        subject_id: &str,
        observations: &[HealthObservation],
        rng: &mut R,
    ) -> Result<AnalysisResult, ClusterError> {
        let raw = features::extract_features(subject_id, observations, &self.rules.features);
        let normalized = features::normalize_features(&raw);
        let points: Vec<[f64; FEATURE_COUNT]> = normalized.iter().map(|fv| fv.values).collect();

        let k = find_optimal_k_with(
            &points,
            self.config.max_k,
            self.config.sweep_iterations,
            self.config.tolerance,
            rng,
        )?;
        debug!(subject = subject_id, k, "optimal k selected");

        let partition = KMeans::new(k)
            .with_max_iterations(self.config.max_iterations)
            .with_tolerance(self.config.tolerance)
            .with_init(InitStrategy::KMeansPlusPlus)
            .cluster(&points, rng)?;
        debug!(
            subject = subject_id,
            iterations = partition.iterations,
            inertia = partition.inertia,
            silhouette = partition.silhouette_score,
            "final clustering done"
        );

        let clusters = build_clusters(&normalized, &partition);
        let anomalies = anomaly::detect_anomalies(&normalized, self.config.anomaly_threshold);
        let importance = importance::feature_importance(&normalized, &partition.assignments, k);

        let ctx = risk::RiskContext::new(observations, partition.cluster_sizes(), anomalies.len(), &importance);
        let assessment = self.risk_engine.evaluate(&ctx);

        Ok(AnalysisResult {
            clusters,
            optimal_k: k,
            risk_level: assessment.risk_level,
            patterns: assessment.patterns,
            recommendations: assessment.recommendations,
            confidence: assessment.confidence,
            feature_importance: importance,
            anomalies,
        })
    }

    /// Fast path through the deployed model. `None` means fall back to the
    /// regular pipeline.
    fn assess_with_model(&self, observation: &HealthObservation) -> Option<AnalysisResult> {
        let model = self.model.as_ref()?;
        if !model.is_ready() {
            warn!("deployed model not ready, falling back to pipeline");
            return None;
        }

        let assessment = match model.assess_health_risk(observation) {
            Ok(a) => a,
            Err(e) => {
                warn!(error = %e, "deployed model failed, falling back to pipeline");
                return None;
            }
        };

        let mut importance = IndexMap::new();
        importance.insert("severity_risk".to_string(), assessment.severity_risk);
        importance.insert("lifestyle_risk".to_string(), assessment.lifestyle_risk);
        importance.insert("symptom_risk".to_string(), assessment.symptom_risk);

        let recommendations = assessment
            .immediate_actions
            .into_iter()
            .chain(assessment.preventative_actions)
            .collect();

        Some(AnalysisResult {
            clusters: Vec::new(),
            optimal_k: 1,
            risk_level: assessment.overall_risk,
            patterns: vec![
                format!("Primary health pattern: cluster {}", assessment.primary_cluster),
                format!("Model risk score: {:.2}", assessment.risk_score),
            ],
            recommendations,
            confidence: assessment.confidence.clamp(0.0, 1.0),
            feature_importance: importance,
            anomalies: Vec::new(),
        })
    }
}

/// One `ClusterResult` per cluster id, including empty clusters.
fn build_clusters(vectors: &[FeatureVector], partition: &KMeansResult) -> Vec<ClusterResult> {
    (0..partition.k)
        .map(|c| {
            let centroid = &partition.centroids[c];
            let members: Vec<FeatureVector> = partition
                .members(c)
                .into_iter()
                .map(|i| vectors[i].clone())
                .collect();
            let inertia = members
                .iter()
                .map(|fv| squared_euclidean(&fv.values, centroid))
                .sum();
            ClusterResult {
                id: c,
                centroid: centroid.clone(),
                members,
                inertia,
                silhouette: partition.silhouette_score,
            }
        })
        .collect()
}
