//! Analysis pipeline stages.
//!
//! - `features`: observation → feature vector, batch normalization
//! - `anomaly`: z-score outlier flagging on normalized vectors
//! - `importance`: within-cluster variance ranking
//! - `risk`: ordered rule fold producing the headline assessment
//! - `profile`: descriptive batch report, independent of clustering
//!
//! `HealthAnalyzer` in `crate::engine` sequences the first four.

pub mod anomaly;
pub mod features;
pub mod importance;
pub mod population;
pub mod profile;
pub mod risk;

pub use anomaly::{detect_anomalies, DEFAULT_ANOMALY_THRESHOLD};
pub use features::{extract_features, normalize_features, NormalizationStats};
pub use importance::{feature_importance, top_features};
pub use profile::DatasetProfile;
pub use risk::{RiskAccumulator, RiskContext, RiskEngine, RiskRule};
