//! Health-pattern analysis engine.
//!
//! Turns a batch of self-reported observations into clusters, anomalies,
//! feature importances and a rule-based risk assessment.

pub mod algorithms;
pub mod engine;
pub mod model;
pub mod pipeline;

pub use algorithms::kmeans::{find_optimal_k, ClusterError, InitStrategy, KMeans, KMeansResult};
pub use engine::HealthAnalyzer;
pub use model::{DeployedModel, ModelError};
pub use pipeline::DatasetProfile;
