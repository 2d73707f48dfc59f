use rand::seq::index;
use rand::Rng;
use thiserror::Error;
use tracing::debug;

use vitals_core::ClusterId;

use super::distance::{euclidean, squared_euclidean};

/// Default upper bound on Lloyd's iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 300;

/// Default convergence tolerance on the change in inertia.
pub const DEFAULT_TOLERANCE: f64 = 1e-4;

/// Lloyd's iterations used per candidate K while searching for the optimal K.
pub const SWEEP_ITERATIONS: usize = 100;

/// Default upper bound of the optimal-K sweep.
pub const DEFAULT_MAX_K: usize = 10;

/// Hard failures raised when clustering preconditions are violated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    #[error("cannot cluster an empty dataset")]
    EmptyDataset,
    #[error("invalid k={k} for {n} points")]
    InvalidK { k: usize, n: usize },
    #[error("point {index} has {found} dimensions, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
}

/// Centroid seeding strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InitStrategy {
    /// K distinct points chosen uniformly at random.
    Random,
    /// D²-weighted sampling.
    #[default]
    KMeansPlusPlus,
}

/// Result of a full batch K-means run.
#[derive(Debug, Clone)]
pub struct KMeansResult {
    /// Cluster of each point, parallel to the input.
    pub assignments: Vec<ClusterId>,
    /// Final centroid vectors, indexed by cluster id.
    pub centroids: Vec<Vec<f64>>,
    /// Number of clusters.
    pub k: usize,
    /// Sum of squared distances from each point to its assigned centroid.
    pub inertia: f64,
    /// Mean silhouette over all points, in [-1, 1].
    pub silhouette_score: f64,
    /// Number of Lloyd's iterations performed.
    pub iterations: usize,
    /// Inertia after each iteration.
    pub inertia_history: Vec<f64>,
}

impl KMeansResult {
    /// Number of points assigned to each cluster.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.k];
        for &c in &self.assignments {
            sizes[c] += 1;
        }
        sizes
    }

    /// Indices of the points assigned to `cluster`.
    pub fn members(&self, cluster: ClusterId) -> Vec<usize> {
        self.assignments
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == cluster)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Lloyd's K-means with configurable seeding.
#[derive(Debug, Clone)]
pub struct KMeans {
    pub k: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub init: InitStrategy,
}

impl KMeans {
    /// K-means with default iterations, tolerance and k-means++ seeding.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            init: InitStrategy::default(),
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_init(mut self, init: InitStrategy) -> Self {
        self.init = init;
        self
    }

    /// Partition `data` into `k` clusters.
    ///
    /// Iterates until the absolute change in inertia drops below the
    /// tolerance or `max_iterations` is reached. All randomness comes from
    /// `rng`, so a seeded generator gives reproducible assignments.
    pub fn cluster<V, R>(&self, data: &[V], rng: &mut R) -> Result<KMeansResult, ClusterError>
    where
        V: AsRef<[f64]>,
        R: Rng + ?Sized,
    {
        let n = data.len();
        if n == 0 {
            return Err(ClusterError::EmptyDataset);
        }
        if self.k == 0 || self.k > n {
            return Err(ClusterError::InvalidK { k: self.k, n });
        }
        let dim = data[0].as_ref().len();
        if let Some((index, p)) = data.iter().enumerate().find(|(_, p)| p.as_ref().len() != dim) {
            return Err(ClusterError::DimensionMismatch {
                index,
                expected: dim,
                found: p.as_ref().len(),
            });
        }

        let k = self.k;
        let mut centroids = match self.init {
            InitStrategy::KMeansPlusPlus => kmeanspp_init(data, k, rng),
            InitStrategy::Random => random_init(data, k, rng),
        };

        let mut assignments = vec![0usize; n];
        let mut inertia_history = Vec::new();
        let mut previous_inertia = f64::INFINITY;
        let mut inertia = 0.0;
        let mut iterations = 0;

        for _ in 0..self.max_iterations.max(1) {
            iterations += 1;

            // Assignment step: assign each point to nearest centroid.
            for (i, p) in data.iter().enumerate() {
                assignments[i] = nearest_centroid(p.as_ref(), &centroids);
            }

            // Update step: recompute centroids as mean of assigned points.
            let mut sums = vec![vec![0.0; dim]; k];
            let mut counts = vec![0usize; k];
            for (i, p) in data.iter().enumerate() {
                let c = assignments[i];
                counts[c] += 1;
                for (j, &val) in p.as_ref().iter().enumerate() {
                    sums[c][j] += val;
                }
            }

            for (c, sum) in sums.into_iter().enumerate() {
                if counts[c] > 0 {
                    let count = counts[c] as f64;
                    centroids[c] = sum.into_iter().map(|v| v / count).collect();
                } else {
                    // Empty cluster: reseed from a random point.
                    centroids[c] = data[rng.gen_range(0..n)].as_ref().to_vec();
                }
            }

            inertia = compute_inertia(data, &assignments, &centroids);
            inertia_history.push(inertia);

            if (previous_inertia - inertia).abs() < self.tolerance {
                break;
            }
            previous_inertia = inertia;
        }

        debug!(k, iterations, inertia, "k-means finished");

        let silhouette = silhouette_score(data, &assignments, k);

        Ok(KMeansResult {
            assignments,
            centroids,
            k,
            inertia,
            silhouette_score: silhouette,
            iterations,
            inertia_history,
        })
    }
}

/// Pick the K with the best silhouette score.
///
/// Returns 1 for fewer than two points. Otherwise sweeps K from 2 to
/// `min(max_k, n / 2)` with k-means++ seeding; a later K replaces the current
/// best only when its score is strictly greater, so ties keep the lower K.
/// When the sweep range is empty, K = 2 is returned.
pub fn find_optimal_k<V, R>(data: &[V], max_k: usize, rng: &mut R) -> Result<usize, ClusterError>
where
    V: AsRef<[f64]>,
    R: Rng + ?Sized,
{
    find_optimal_k_with(data, max_k, SWEEP_ITERATIONS, DEFAULT_TOLERANCE, rng)
}

/// [`find_optimal_k`] with explicit per-candidate iteration and tolerance settings.
pub fn find_optimal_k_with<V, R>(
    data: &[V],
    max_k: usize,
    max_iterations: usize,
    tolerance: f64,
    rng: &mut R,
) -> Result<usize, ClusterError>
where
    V: AsRef<[f64]>,
    R: Rng + ?Sized,
{
    let n = data.len();
    if n < 2 {
        return Ok(1);
    }

    let upper = max_k.min(n / 2);
    let mut best_k = 2;
    let mut best_score = -1.0;

    for k in 2..=upper {
        let result = KMeans::new(k)
            .with_max_iterations(max_iterations)
            .with_tolerance(tolerance)
            .with_init(InitStrategy::KMeansPlusPlus)
            .cluster(data, rng)?;

        debug!(k, silhouette = result.silhouette_score, "optimal-k candidate");

        if result.silhouette_score > best_score {
            best_score = result.silhouette_score;
            best_k = k;
        }
    }

    Ok(best_k)
}

/// Compute the mean silhouette score for a partition.
///
/// For each point i:
///   a(i) = average distance to other points in the same cluster
///   b(i) = minimum average distance to points in any other non-empty cluster
///   s(i) = (b(i) - a(i)) / max(a(i), b(i))
///
/// s(i) is 0 when b(i) is undefined. Returns the mean s(i) across all
/// points, or 0 when `k <= 1`. Range: [-1, 1].
///
/// `assignments` must hold one cluster id below `k` per point of `data`.
pub fn silhouette_score<V: AsRef<[f64]>>(data: &[V], assignments: &[ClusterId], k: usize) -> f64 {
    debug_assert_eq!(data.len(), assignments.len());
    debug_assert!(assignments.iter().all(|&c| c < k));

    let n = data.len();
    if n <= 1 || k <= 1 {
        return 0.0;
    }

    // Build cluster -> point indices map.
    let mut cluster_members: Vec<Vec<usize>> = vec![Vec::new(); k];
    for (i, &c) in assignments.iter().enumerate() {
        cluster_members[c].push(i);
    }

    let mut total = 0.0;

    for (i, p) in data.iter().enumerate() {
        let p = p.as_ref();
        let own = assignments[i];
        let own_members = &cluster_members[own];

        // a(i): average distance to same-cluster points.
        let a = if own_members.len() <= 1 {
            0.0
        } else {
            let sum: f64 = own_members
                .iter()
                .filter(|&&j| j != i)
                .map(|&j| euclidean(p, data[j].as_ref()))
                .sum();
            sum / (own_members.len() - 1) as f64
        };

        // b(i): minimum average distance to any other cluster.
        let b = cluster_members
            .iter()
            .enumerate()
            .filter(|(c, members)| *c != own && !members.is_empty())
            .map(|(_, members)| {
                members
                    .iter()
                    .map(|&j| euclidean(p, data[j].as_ref()))
                    .sum::<f64>()
                    / members.len() as f64
            })
            .fold(None, |best: Option<f64>, avg| {
                Some(best.map_or(avg, |b| b.min(avg)))
            });

        let s = match b {
            Some(b) => {
                let max_ab = a.max(b);
                if max_ab > 0.0 { (b - a) / max_ab } else { 0.0 }
            }
            None => 0.0,
        };
        total += s;
    }

    total / n as f64
}

// ── Internal helpers ─────────────────────────────────────────

/// K-means++ initialization: pick k centroids with D²-weighted sampling.
fn kmeanspp_init<V, R>(data: &[V], k: usize, rng: &mut R) -> Vec<Vec<f64>>
where
    V: AsRef<[f64]>,
    R: Rng + ?Sized,
{
    let n = data.len();
    let mut centroids = Vec::with_capacity(k);

    let first = rng.gen_range(0..n);
    centroids.push(data[first].as_ref().to_vec());

    // Squared distance of every point to its nearest chosen centroid.
    let mut weights: Vec<f64> = data
        .iter()
        .map(|p| squared_euclidean(p.as_ref(), &centroids[0]))
        .collect();

    for _ in 1..k {
        let total: f64 = weights.iter().sum();
        let next = if total > 0.0 {
            roulette(&weights, rng.gen::<f64>() * total)
        } else {
            // Every point coincides with a centroid.
            rng.gen_range(0..n)
        };

        let chosen = data[next].as_ref().to_vec();
        for (w, p) in weights.iter_mut().zip(data.iter()) {
            let d = squared_euclidean(p.as_ref(), &chosen);
            if d < *w {
                *w = d;
            }
        }
        centroids.push(chosen);
    }

    centroids
}

/// Roulette-wheel selection over cumulative weights. Zero-weight entries
/// are never selected.
fn roulette(weights: &[f64], target: f64) -> usize {
    let mut cumulative = 0.0;
    let mut last_positive = 0;
    for (i, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        cumulative += w;
        last_positive = i;
        if cumulative >= target {
            return i;
        }
    }
    last_positive
}

fn random_init<V, R>(data: &[V], k: usize, rng: &mut R) -> Vec<Vec<f64>>
where
    V: AsRef<[f64]>,
    R: Rng + ?Sized,
{
    index::sample(rng, data.len(), k)
        .into_iter()
        .map(|i| data[i].as_ref().to_vec())
        .collect()
}

/// Find the index of the nearest centroid (first minimum wins).
fn nearest_centroid(point: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best_idx = 0;
    let mut best_dist = f64::MAX;
    for (i, centroid) in centroids.iter().enumerate() {
        let dist = squared_euclidean(point, centroid);
        if dist < best_dist {
            best_dist = dist;
            best_idx = i;
        }
    }
    best_idx
}

fn compute_inertia<V: AsRef<[f64]>>(data: &[V], assignments: &[usize], centroids: &[Vec<f64>]) -> f64 {
    data.iter()
        .zip(assignments.iter())
        .map(|(p, &c)| squared_euclidean(p.as_ref(), &centroids[c]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    /// `per` points around each 2-d center with a small deterministic spread.
    fn make_clusters(centers: &[(f64, f64)], per: usize) -> Vec<Vec<f64>> {
        let mut points = Vec::new();
        for &(cx, cy) in centers {
            for i in 0..per {
                let offset = (i as f64) * 0.1;
                points.push(vec![cx + offset, cy - offset]);
            }
        }
        points
    }

    #[test]
    fn kmeans_two_clusters() {
        let points = make_clusters(&[(0.0, 0.0), (100.0, 100.0)], 10);
        let result = KMeans::new(2).cluster(&points, &mut rng()).unwrap();

        assert_eq!(result.k, 2);
        assert_eq!(result.assignments.len(), 20);

        let c0 = result.assignments[0];
        let c1 = result.assignments[10];
        assert_ne!(c0, c1);
        assert!(result.assignments[..10].iter().all(|&c| c == c0));
        assert!(result.assignments[10..].iter().all(|&c| c == c1));
    }

    #[test]
    fn kmeans_single_cluster() {
        let points = make_clusters(&[(5.0, 5.0)], 20);
        let result = KMeans::new(1).cluster(&points, &mut rng()).unwrap();

        assert_eq!(result.centroids.len(), 1);
        assert!(result.assignments.iter().all(|&c| c == 0));
        assert_eq!(result.silhouette_score, 0.0);
    }

    #[test]
    fn kmeans_three_clusters() {
        let points = make_clusters(&[(0.0, 0.0), (50.0, 50.0), (100.0, 100.0)], 15);
        let result = KMeans::new(3).cluster(&points, &mut rng()).unwrap();

        let c0 = result.assignments[0];
        let c1 = result.assignments[15];
        let c2 = result.assignments[30];
        assert!(result.assignments[..15].iter().all(|&c| c == c0));
        assert!(result.assignments[15..30].iter().all(|&c| c == c1));
        assert!(result.assignments[30..].iter().all(|&c| c == c2));
        assert_ne!(c0, c1);
        assert_ne!(c1, c2);
        assert_ne!(c0, c2);
        assert_eq!(result.cluster_sizes(), vec![15, 15, 15]);
    }

    #[test]
    fn kmeans_converges_quickly_on_separable_data() {
        let points = make_clusters(&[(0.0, 0.0), (1000.0, 1000.0)], 5);
        let result = KMeans::new(2).cluster(&points, &mut rng()).unwrap();

        // Well-separated data should converge in very few iterations.
        assert!(result.iterations <= 5, "iterations: {}", result.iterations);
        assert_eq!(result.inertia_history.len(), result.iterations);
    }

    #[test]
    fn random_init_also_separates_clusters() {
        let points = make_clusters(&[(0.0, 0.0), (100.0, 100.0)], 10);
        let result = KMeans::new(2)
            .with_init(InitStrategy::Random)
            .cluster(&points, &mut StdRng::seed_from_u64(3))
            .unwrap();
        assert_eq!(result.assignments.len(), 20);
        assert!(result.inertia >= 0.0);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let points = make_clusters(&[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)], 6);
        let a = KMeans::new(3).cluster(&points, &mut StdRng::seed_from_u64(99)).unwrap();
        let b = KMeans::new(3).cluster(&points, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a.assignments, b.assignments);
        assert_eq!(a.centroids, b.centroids);
    }

    #[test]
    fn max_iterations_bounds_the_loop() {
        let points = make_clusters(&[(0.0, 0.0), (3.0, 3.0), (6.0, 0.0)], 8);
        let result = KMeans::new(3)
            .with_max_iterations(1)
            .cluster(&points, &mut rng())
            .unwrap();
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn duplicate_points_leave_extra_clusters_empty() {
        let points = vec![vec![1.0, 1.0]; 6];
        let result = KMeans::new(3).cluster(&points, &mut rng()).unwrap();
        assert_eq!(result.inertia, 0.0);
        assert_eq!(result.cluster_sizes().iter().sum::<usize>(), 6);
        assert_eq!(result.silhouette_score, 0.0);
    }

    #[test]
    fn silhouette_well_separated() {
        let points = make_clusters(&[(0.0, 0.0), (100.0, 100.0)], 10);
        let result = KMeans::new(2).cluster(&points, &mut rng()).unwrap();

        // Well-separated clusters should have high silhouette score.
        assert!(result.silhouette_score > 0.8, "silhouette = {}", result.silhouette_score);
    }

    #[test]
    fn silhouette_hand_computed() {
        // Clusters {0, 1} and {10}; point 2 is a singleton.
        let points = vec![vec![0.0], vec![1.0], vec![10.0]];
        let score = silhouette_score(&points, &[0, 0, 1], 2);
        // s0: a=1, b=10 -> 0.9 ; s1: a=1, b=9 -> 8/9 ; s2: a=0, b=9.5 -> 1
        let expected = (0.9 + 8.0 / 9.0 + 1.0) / 3.0;
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn optimal_k_finds_three() {
        let points = make_clusters(&[(0.0, 0.0), (100.0, 100.0), (200.0, 0.0)], 20);
        let k = find_optimal_k(&points, 10, &mut rng()).unwrap();
        assert_eq!(k, 3, "expected optimal k=3, got k={}", k);
    }

    #[test]
    fn optimal_k_small_inputs() {
        let one = vec![vec![1.0]];
        assert_eq!(find_optimal_k(&one, 10, &mut rng()).unwrap(), 1);

        let empty: Vec<Vec<f64>> = Vec::new();
        assert_eq!(find_optimal_k(&empty, 10, &mut rng()).unwrap(), 1);

        // n / 2 = 1 leaves no candidates; falls back to 2.
        let three = vec![vec![0.0], vec![1.0], vec![5.0]];
        assert_eq!(find_optimal_k(&three, 10, &mut rng()).unwrap(), 2);
    }

    #[test]
    fn optimal_k_ties_keep_lowest_k() {
        // Every candidate scores 0 on identical points.
        let points = vec![vec![1.0, 1.0]; 10];
        for seed in 0..10 {
            let k = find_optimal_k(&points, 10, &mut StdRng::seed_from_u64(seed)).unwrap();
            assert_eq!(k, 2, "seed {seed}");
        }
    }

    #[test]
    #[should_panic]
    #[cfg(debug_assertions)]
    fn silhouette_rejects_short_assignments() {
        let points = vec![vec![0.0], vec![1.0], vec![10.0]];
        silhouette_score(&points, &[0, 1], 2);
    }

    #[test]
    fn optimal_k_respects_max_k() {
        let points = make_clusters(&[(0.0, 0.0), (100.0, 100.0), (200.0, 0.0), (300.0, 300.0)], 5);
        let k = find_optimal_k(&points, 3, &mut rng()).unwrap();
        assert!((2..=3).contains(&k));
    }

    #[test]
    fn kmeanspp_init_picks_spread_centroids() {
        let points = make_clusters(&[(0.0, 0.0), (100.0, 100.0)], 5);
        let centroids = kmeanspp_init(&points, 2, &mut rng());

        assert_eq!(centroids.len(), 2);
        let dist = squared_euclidean(&centroids[0], &centroids[1]);
        assert!(dist > 1000.0, "centroids too close: dist²={}", dist);
    }

    #[test]
    fn roulette_skips_zero_weights() {
        assert_eq!(roulette(&[0.0, 2.0, 0.0, 3.0], 0.0), 1);
        assert_eq!(roulette(&[0.0, 2.0, 0.0, 3.0], 2.5), 3);
        assert_eq!(roulette(&[1.0, 1.0], 5.0), 1);
    }

    #[test]
    fn kmeans_higher_dimensions() {
        let mut points = Vec::new();
        for i in 0..20 {
            points.push(vec![0.0, 0.0, 0.0, (i as f64) * 0.01]);
        }
        for i in 0..20 {
            points.push(vec![100.0, 100.0, 100.0, 100.0 + (i as f64) * 0.01]);
        }

        let result = KMeans::new(2).cluster(&points, &mut rng()).unwrap();
        assert_ne!(result.assignments[0], result.assignments[20]);
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let points: Vec<Vec<f64>> = Vec::new();
        let err = KMeans::new(1).cluster(&points, &mut rng()).unwrap_err();
        assert_eq!(err, ClusterError::EmptyDataset);
    }

    #[test]
    fn zero_k_is_rejected() {
        let points = vec![vec![1.0]];
        let err = KMeans::new(0).cluster(&points, &mut rng()).unwrap_err();
        assert_eq!(err, ClusterError::InvalidK { k: 0, n: 1 });
    }

    #[test]
    fn k_greater_than_n_is_rejected() {
        let points = vec![vec![1.0], vec![2.0]];
        let err = KMeans::new(3).cluster(&points, &mut rng()).unwrap_err();
        assert_eq!(err, ClusterError::InvalidK { k: 3, n: 2 });
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let points = vec![vec![1.0, 2.0], vec![3.0]];
        let err = KMeans::new(1).cluster(&points, &mut rng()).unwrap_err();
        assert!(matches!(err, ClusterError::DimensionMismatch { index: 1, .. }));
    }
}
