//! Seeded k-means over sparse TF-IDF vectors.
//!
//! k-means++ seeding, Lloyd iterations, best-of-`n_init` restarts by inertia.
//! After fitting, clusters are renumbered by the index of their earliest
//! member so that label 0 always holds the oldest point of the corpus. This
//! keeps label numbering stable across refits of a growing corpus.

use super::tfidf::SparseVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct KMeansConfig {
    pub n_clusters: usize,
    pub n_init: usize,
    pub max_iter: usize,
    /// Stop once the summed squared centroid shift falls below this.
    pub tolerance: f64,
    pub seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            n_clusters: 3,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KMeansError {
    #[error("cluster count must be at least 1")]
    ZeroClusters,

    #[error("need at least {clusters} points to fit, got {points}")]
    NotEnoughPoints { points: usize, clusters: usize },
}

/// Fitted centroids.
#[derive(Debug, Clone)]
pub struct KMeans {
    centroids: Vec<Vec<f64>>,
    centroid_norms: Vec<f64>,
    inertia: f64,
}

/// Result of a fit: the model and the label of every training point.
#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub model: KMeans,
    pub labels: Vec<usize>,
}

struct Run {
    centroids: Vec<Vec<f64>>,
    labels: Vec<usize>,
    inertia: f64,
}

impl KMeans {
    pub fn fit(
        points: &[SparseVector],
        dimension: usize,
        config: &KMeansConfig,
    ) -> Result<KMeansFit, KMeansError> {
        if config.n_clusters == 0 {
            return Err(KMeansError::ZeroClusters);
        }
        if points.len() < config.n_clusters {
            return Err(KMeansError::NotEnoughPoints {
                points: points.len(),
                clusters: config.n_clusters,
            });
        }

        let mut best = run_once(points, dimension, config, config.seed);
        for restart in 1..config.n_init {
            let candidate = run_once(
                points,
                dimension,
                config,
                config.seed.wrapping_add(restart as u64),
            );
            if candidate.inertia < best.inertia {
                best = candidate;
            }
        }

        let (centroids, labels) = canonical_order(best.centroids, best.labels);
        let centroid_norms = centroids.iter().map(|c| norm_squared(c)).collect();

        Ok(KMeansFit {
            model: KMeans {
                centroids,
                centroid_norms,
                inertia: best.inertia,
            },
            labels,
        })
    }

    /// Label of the nearest centroid; ties go to the lower label.
    pub fn predict(&self, point: &SparseVector) -> usize {
        nearest(point, &self.centroids, &self.centroid_norms).0
    }

    pub fn n_clusters(&self) -> usize {
        self.centroids.len()
    }

    /// Sum of squared distances from training points to their centroids.
    pub fn inertia(&self) -> f64 {
        self.inertia
    }
}

fn run_once(points: &[SparseVector], dimension: usize, config: &KMeansConfig, seed: u64) -> Run {
    let mut rng = StdRng::seed_from_u64(seed);
    let k = config.n_clusters;
    let mut centroids = init_plus_plus(points, dimension, k, &mut rng);
    let mut labels = vec![0usize; points.len()];

    for _ in 0..config.max_iter {
        let norms: Vec<f64> = centroids.iter().map(|c| norm_squared(c)).collect();
        for (label, point) in labels.iter_mut().zip(points) {
            *label = nearest(point, &centroids, &norms).0;
        }

        let mut sums = vec![vec![0.0; dimension]; k];
        let mut counts = vec![0usize; k];
        for (point, &label) in points.iter().zip(&labels) {
            counts[label] += 1;
            for (idx, value) in point.entries() {
                sums[label][*idx] += value;
            }
        }

        // Empty clusters take over the points worst served by their centroid.
        let mut taken: Vec<usize> = Vec::new();
        for cluster in 0..k {
            if counts[cluster] == 0 {
                if let Some(far) = farthest_point(points, &labels, &centroids, &norms, &taken) {
                    sums[cluster] = densify(&points[far], dimension);
                    counts[cluster] = 1;
                    taken.push(far);
                }
            }
        }

        let updated: Vec<Vec<f64>> = sums
            .into_iter()
            .zip(&counts)
            .zip(&centroids)
            .map(|((sum, &count), previous)| {
                if count == 0 {
                    previous.clone()
                } else {
                    sum.into_iter().map(|v| v / count as f64).collect()
                }
            })
            .collect();

        let shift: f64 = centroids
            .iter()
            .zip(&updated)
            .map(|(a, b)| dense_distance_squared(a, b))
            .sum();
        centroids = updated;

        if shift <= config.tolerance {
            break;
        }
    }

    let norms: Vec<f64> = centroids.iter().map(|c| norm_squared(c)).collect();
    let mut inertia = 0.0;
    for (label, point) in labels.iter_mut().zip(points) {
        let (nearest_label, distance) = nearest(point, &centroids, &norms);
        *label = nearest_label;
        inertia += distance;
    }

    Run {
        centroids,
        labels,
        inertia,
    }
}

fn init_plus_plus(
    points: &[SparseVector],
    dimension: usize,
    k: usize,
    rng: &mut StdRng,
) -> Vec<Vec<f64>> {
    let mut centroids = Vec::with_capacity(k);
    let first = densify(&points[rng.gen_range(0..points.len())], dimension);
    let first_norm = norm_squared(&first);
    let mut closest: Vec<f64> = points
        .iter()
        .map(|p| p.distance_squared(&first, first_norm))
        .collect();
    centroids.push(first);

    while centroids.len() < k {
        let total: f64 = closest.iter().sum();
        let chosen = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = points.len() - 1;
            for (idx, distance) in closest.iter().enumerate() {
                if target < *distance {
                    chosen = idx;
                    break;
                }
                target -= distance;
            }
            chosen
        } else {
            rng.gen_range(0..points.len())
        };

        let centroid = densify(&points[chosen], dimension);
        let centroid_norm = norm_squared(&centroid);
        for (best, point) in closest.iter_mut().zip(points) {
            *best = best.min(point.distance_squared(&centroid, centroid_norm));
        }
        centroids.push(centroid);
    }

    centroids
}

fn nearest(point: &SparseVector, centroids: &[Vec<f64>], norms: &[f64]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (label, (centroid, norm)) in centroids.iter().zip(norms).enumerate() {
        let distance = point.distance_squared(centroid, *norm);
        if distance < best.1 {
            best = (label, distance);
        }
    }
    best
}

fn farthest_point(
    points: &[SparseVector],
    labels: &[usize],
    centroids: &[Vec<f64>],
    norms: &[f64],
    exclude: &[usize],
) -> Option<usize> {
    points
        .iter()
        .zip(labels)
        .enumerate()
        .filter(|(idx, _)| !exclude.contains(idx))
        .map(|(idx, (point, &label))| {
            (idx, point.distance_squared(&centroids[label], norms[label]))
        })
        .fold(None, |best: Option<(usize, f64)>, (idx, distance)| match best {
            Some((_, d)) if d >= distance => best,
            _ => Some((idx, distance)),
        })
        .map(|(idx, _)| idx)
}

/// Renumber clusters by the index of their first member; empty clusters last.
fn canonical_order(centroids: Vec<Vec<f64>>, labels: Vec<usize>) -> (Vec<Vec<f64>>, Vec<usize>) {
    let k = centroids.len();
    let mut first_member = vec![usize::MAX; k];
    for (idx, &label) in labels.iter().enumerate() {
        if first_member[label] == usize::MAX {
            first_member[label] = idx;
        }
    }

    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by_key(|&cluster| (first_member[cluster], cluster));

    let mut remap = vec![0usize; k];
    for (new_label, &old_label) in order.iter().enumerate() {
        remap[old_label] = new_label;
    }

    let mut slots: Vec<Option<Vec<f64>>> = centroids.into_iter().map(Some).collect();
    let centroids = order
        .iter()
        .map(|&old| slots[old].take().unwrap_or_default())
        .collect();
    let labels = labels.into_iter().map(|l| remap[l]).collect();

    (centroids, labels)
}

fn densify(point: &SparseVector, dimension: usize) -> Vec<f64> {
    let mut dense = vec![0.0; dimension];
    for (idx, value) in point.entries() {
        if let Some(slot) = dense.get_mut(*idx) {
            *slot = *value;
        }
    }
    dense
}

fn norm_squared(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum()
}

fn dense_distance_squared(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f64, y: f64) -> SparseVector {
        SparseVector::new(vec![(0, x), (1, y)])
    }

    fn three_groups() -> Vec<SparseVector> {
        vec![
            point(10.0, 0.0),
            point(10.2, 0.1),
            point(0.0, 10.0),
            point(0.1, 10.3),
            point(0.0, 0.0),
            point(0.2, 0.1),
        ]
    }

    #[test]
    fn fit_separates_obvious_groups() {
        let fit = KMeans::fit(&three_groups(), 2, &KMeansConfig::default()).unwrap();
        assert_eq!(fit.labels, vec![0, 0, 1, 1, 2, 2]);
        assert_eq!(fit.model.n_clusters(), 3);
        assert!(fit.model.inertia() < 1.0);
    }

    #[test]
    fn labels_follow_first_member_order() {
        let mut points = three_groups();
        points.rotate_left(2);
        let fit = KMeans::fit(&points, 2, &KMeansConfig::default()).unwrap();
        assert_eq!(fit.labels, vec![0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn fit_is_deterministic_for_a_seed() {
        let config = KMeansConfig::default();
        let a = KMeans::fit(&three_groups(), 2, &config).unwrap();
        let b = KMeans::fit(&three_groups(), 2, &config).unwrap();
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.model.inertia(), b.model.inertia());
    }

    #[test]
    fn predict_assigns_nearest_centroid() {
        let fit = KMeans::fit(&three_groups(), 2, &KMeansConfig::default()).unwrap();
        assert_eq!(fit.model.predict(&point(9.0, 1.0)), 0);
        assert_eq!(fit.model.predict(&point(1.0, 9.0)), 1);
        assert_eq!(fit.model.predict(&point(0.5, 0.5)), 2);
    }

    #[test]
    fn fit_requires_at_least_k_points() {
        let err = KMeans::fit(&three_groups()[..2], 2, &KMeansConfig::default()).unwrap_err();
        assert_eq!(
            err,
            KMeansError::NotEnoughPoints {
                points: 2,
                clusters: 3
            }
        );
    }

    #[test]
    fn zero_clusters_is_rejected() {
        let config = KMeansConfig {
            n_clusters: 0,
            ..Default::default()
        };
        assert_eq!(
            KMeans::fit(&three_groups(), 2, &config).unwrap_err(),
            KMeansError::ZeroClusters
        );
    }

    #[test]
    fn identical_points_do_not_panic() {
        let points = vec![point(1.0, 1.0), point(1.0, 1.0), point(1.0, 1.0)];
        let fit = KMeans::fit(&points, 2, &KMeansConfig::default()).unwrap();
        assert_eq!(fit.labels.len(), 3);
        assert!(fit.labels.iter().all(|&l| l < 3));
    }
}
