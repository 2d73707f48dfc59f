//! Numeric algorithms: distance metrics and K-means clustering.

pub mod distance;
pub mod kmeans;
