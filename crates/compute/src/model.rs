//! Deployed risk-model collaborator.
//!
//! The analyzer can hand single observations to an externally trained model
//! instead of running the clustering pipeline. The model is injected by the
//! caller; the analyzer never constructs or caches one.

use thiserror::Error;

use vitals_core::{HealthObservation, RiskAssessment};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("model unavailable: {0}")]
    Unavailable(String),
    #[error("model inference failed: {0}")]
    Inference(String),
}

/// A trained model able to score one observation.
pub trait DeployedModel: Send + Sync {
    /// Whether the model is loaded and able to answer.
    fn is_ready(&self) -> bool;

    fn assess_health_risk(&self, observation: &HealthObservation) -> Result<RiskAssessment, ModelError>;
}
