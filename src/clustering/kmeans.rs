use anyhow::{anyhow, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::debug;

use crate::TARGET_CLUSTER;

/// Seed for k-means++ initialization, fixed so a given input always partitions the same way
pub const KMEANS_SEED: u64 = 0x5eed_b1a5;

/// Iteration cap for Lloyd refinement
pub const KMEANS_MAX_ITERATIONS: usize = 100;

/// Result of partitioning a set of vectors
#[derive(Debug, Clone)]
pub struct KMeans {
    /// Cluster index per input vector
    pub assignments: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    pub iterations: usize,
}

impl KMeans {
    /// Partitions `data` into `k` groups by Euclidean distance.
    ///
    /// Centroids are seeded with k-means++ using a seeded RNG, then refined
    /// until assignments stop changing or `max_iterations` is reached.
    ///
    /// # Errors
    /// Empty input, `k == 0`, `k` larger than the number of vectors, vectors
    /// of differing or zero dimension, and non-finite components.
    pub fn fit(data: &[Vec<f32>], k: usize, max_iterations: usize, seed: u64) -> Result<Self> {
        let points = validate(data, k)?;
        let mut rng = StdRng::seed_from_u64(seed);

        let mut centroids = init_plus_plus(&points, k, &mut rng);
        let mut assignments = vec![usize::MAX; points.len()];
        let mut iterations = 0;

        while iterations < max_iterations {
            iterations += 1;

            let mut changed = false;
            for (i, point) in points.iter().enumerate() {
                let nearest = nearest_centroid(point, &centroids);
                if assignments[i] != nearest {
                    assignments[i] = nearest;
                    changed = true;
                }
            }

            if !changed {
                break;
            }

            centroids = recompute_centroids(&points, &assignments, &centroids);
        }

        debug!(
            target: TARGET_CLUSTER,
            "k-means finished: {} points, k={}, {} iterations", points.len(), k, iterations
        );

        Ok(Self {
            assignments,
            centroids,
            iterations,
        })
    }

    /// Indices of the input vectors assigned to each cluster
    pub fn groups(&self) -> Vec<Vec<usize>> {
        let mut groups = vec![Vec::new(); self.centroids.len()];
        for (i, &cluster) in self.assignments.iter().enumerate() {
            groups[cluster].push(i);
        }
        groups
    }
}

fn validate(data: &[Vec<f32>], k: usize) -> Result<Vec<Vec<f64>>> {
    if data.is_empty() {
        return Err(anyhow!("Cannot partition an empty set of vectors"));
    }
    if k == 0 {
        return Err(anyhow!("Number of clusters must be at least 1"));
    }
    if k > data.len() {
        return Err(anyhow!(
            "Number of clusters ({}) exceeds number of vectors ({})",
            k,
            data.len()
        ));
    }

    let dim = data[0].len();
    if dim == 0 {
        return Err(anyhow!("Vectors must have at least one dimension"));
    }

    data.iter()
        .enumerate()
        .map(|(i, v)| {
            if v.len() != dim {
                return Err(anyhow!(
                    "Vector dimensions don't match: {} vs {} at index {}",
                    dim,
                    v.len(),
                    i
                ));
            }
            if v.iter().any(|x| !x.is_finite()) {
                return Err(anyhow!("Non-finite component in vector {}", i));
            }
            Ok(v.iter().map(|&x| x as f64).collect())
        })
        .collect()
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Lowest-index centroid at minimum distance
fn nearest_centroid(point: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let dist = squared_distance(point, centroid);
        if dist < best_dist {
            best = i;
            best_dist = dist;
        }
    }
    best
}

fn init_plus_plus(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut chosen = vec![rng.random_range(0..points.len())];

    while chosen.len() < k {
        let distances: Vec<f64> = points
            .iter()
            .map(|p| {
                chosen
                    .iter()
                    .map(|&c| squared_distance(p, &points[c]))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = distances.iter().sum();

        let next = if total > 0.0 {
            // Sample proportional to squared distance from the nearest chosen centroid
            let mut target = rng.random::<f64>() * total;
            let mut pick = None;
            for (i, &d) in distances.iter().enumerate() {
                if d <= 0.0 {
                    continue;
                }
                if target < d {
                    pick = Some(i);
                    break;
                }
                target -= d;
            }
            // Rounding can run past the end; fall back to the farthest point
            pick.unwrap_or_else(|| farthest(&distances))
        } else {
            // Every point coincides with a chosen centroid
            (0..points.len())
                .find(|i| !chosen.contains(i))
                .unwrap_or(0)
        };

        chosen.push(next);
    }

    chosen.into_iter().map(|i| points[i].clone()).collect()
}

fn farthest(distances: &[f64]) -> usize {
    let mut best = 0;
    for (i, &d) in distances.iter().enumerate() {
        if d > distances[best] {
            best = i;
        }
    }
    best
}

/// Mean of each cluster's points; a cluster left empty keeps its previous centroid
fn recompute_centroids(
    points: &[Vec<f64>],
    assignments: &[usize],
    previous: &[Vec<f64>],
) -> Vec<Vec<f64>> {
    let dim = points[0].len();
    let mut sums = vec![vec![0.0; dim]; previous.len()];
    let mut counts = vec![0usize; previous.len()];

    for (point, &cluster) in points.iter().zip(assignments) {
        counts[cluster] += 1;
        for (s, x) in sums[cluster].iter_mut().zip(point) {
            *s += x;
        }
    }

    sums.into_iter()
        .zip(counts)
        .zip(previous)
        .map(|((sum, count), prev)| {
            if count == 0 {
                prev.clone()
            } else {
                sum.into_iter().map(|s| s / count as f64).collect()
            }
        })
        .collect()
}
