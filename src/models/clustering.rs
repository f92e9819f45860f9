//! Agglomerative hierarchical clustering with average linkage.
//!
//! Used as the confirmation stage behind the isolation forest: it groups
//! the forest's candidate anomalies into a handful of clusters, and a new
//! point is flagged when its closest cluster is small or the point lies
//! far from it relative to that cluster's separation from its siblings.

use super::check_rows;
use crate::config::ClusteringConfig;
use crate::error::{EngineError, Result};

/// Clusters with fewer members than this are treated as rare patterns.
pub const SMALL_CLUSTER_SIZE: usize = 3;

/// A group of training points.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    points: Vec<Vec<f64>>,
    centroid: Vec<f64>,
    distance_to_nearest: f64,
}

impl Cluster {
    fn singleton(point: &[f64]) -> Self {
        Self {
            points: vec![point.to_vec()],
            centroid: point.to_vec(),
            distance_to_nearest: f64::INFINITY,
        }
    }

    fn merge(first: Cluster, second: Cluster) -> Self {
        let mut points = first.points;
        points.extend(second.points);

        let mut centroid = vec![0.0; first.centroid.len()];
        for point in &points {
            for (c, v) in centroid.iter_mut().zip(point) {
                *c += v;
            }
        }
        let n = points.len() as f64;
        for c in &mut centroid {
            *c /= n;
        }

        Self {
            points,
            centroid,
            distance_to_nearest: f64::INFINITY,
        }
    }

    pub fn size(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[Vec<f64>] {
        &self.points
    }

    /// Arithmetic mean of the member points
    pub fn centroid(&self) -> &[f64] {
        &self.centroid
    }

    /// Average-linkage distance to the closest surviving sibling cluster
    /// (infinite when this is the only cluster).
    pub fn distance_to_nearest(&self) -> f64 {
        self.distance_to_nearest
    }

    /// Mean Euclidean distance from `point` to every member.
    pub fn mean_distance_to(&self, point: &[f64]) -> f64 {
        let mut total = 0.0;
        for member in &self.points {
            total += euclidean_distance(point, member);
        }
        total / self.points.len() as f64
    }
}

/// One step of the merge history (the implicit dendrogram).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeStep {
    /// Index of the first merged cluster before the merge
    pub left: usize,
    /// Index of the second merged cluster before the merge
    pub right: usize,
    /// Linkage distance at which the pair merged
    pub distance: f64,
    /// Members in the merged cluster
    pub merged_size: usize,
    /// Clusters remaining after this step
    pub remaining: usize,
}

/// Agglomerative clustering model used for anomaly confirmation.
#[derive(Debug, Clone)]
pub struct HierarchicalModel {
    config: ClusteringConfig,
    clusters: Vec<Cluster>,
    merges: Vec<MergeStep>,
    n_features: usize,
}

impl Default for HierarchicalModel {
    fn default() -> Self {
        Self::new(ClusteringConfig::default())
    }
}

impl HierarchicalModel {
    pub fn new(config: ClusteringConfig) -> Self {
        Self {
            config,
            clusters: Vec::new(),
            merges: Vec::new(),
            n_features: 0,
        }
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        !self.clusters.is_empty()
    }

    /// Surviving clusters after the last fit
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Merge history of the last fit, in merge order
    pub fn merges(&self) -> &[MergeStep] {
        &self.merges
    }

    /// Cluster `data` bottom-up until `n_clusters` clusters remain.
    ///
    /// The full distance matrix is rebuilt after every merge; this stage
    /// only ever sees the small candidate-anomaly subset.
    pub fn fit<S: AsRef<[f64]>>(&mut self, data: &[S]) -> Result<()> {
        let rows = check_rows(data)?;
        let n_features = rows[0].len();

        let mut clusters: Vec<Cluster> = rows.iter().map(|row| Cluster::singleton(row)).collect();
        let mut matrix = distance_matrix(&clusters);
        let mut merges = Vec::with_capacity(clusters.len().saturating_sub(self.config.n_clusters));

        while clusters.len() > self.config.n_clusters {
            let Some((i, j, distance)) = closest_pair(&matrix) else {
                // Only reachable with NaN distances.
                break;
            };

            // j > i, so removing j first keeps i valid.
            let second = clusters.remove(j);
            let first = clusters.remove(i);
            let merged = Cluster::merge(first, second);
            let merged_size = merged.size();
            clusters.push(merged);

            merges.push(MergeStep {
                left: i,
                right: j,
                distance,
                merged_size,
                remaining: clusters.len(),
            });

            matrix = distance_matrix(&clusters);
        }

        for (i, cluster) in clusters.iter_mut().enumerate() {
            cluster.distance_to_nearest = matrix[i]
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, &d)| d)
                .fold(f64::INFINITY, |min, d| if d < min { d } else { min });
        }

        self.clusters = clusters;
        self.merges = merges;
        self.n_features = n_features;
        Ok(())
    }

    /// Whether `sample` is anomalous relative to the fitted clusters.
    ///
    /// Without clusters every sample is treated as anomalous.
    pub fn predict(&self, sample: &[f64]) -> Result<bool> {
        let Some((cluster, distance)) = self.closest_cluster(sample)? else {
            return Ok(true);
        };

        let is_small = cluster.size() < SMALL_CLUSTER_SIZE;
        let is_distant = distance > cluster.distance_to_nearest * self.config.anomaly_threshold;
        Ok(is_small || is_distant)
    }

    /// Verdicts for a batch of samples
    pub fn predict_batch<S: AsRef<[f64]>>(&self, data: &[S]) -> Result<Vec<bool>> {
        data.iter().map(|s| self.predict(s.as_ref())).collect()
    }

    /// Cluster with the smallest mean member distance to `sample`, and that distance.
    pub fn closest_cluster(&self, sample: &[f64]) -> Result<Option<(&Cluster, f64)>> {
        if !self.is_fitted() {
            return Ok(None);
        }
        if sample.len() != self.n_features {
            return Err(EngineError::DimensionMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }

        let mut best: Option<(&Cluster, f64)> = None;
        for cluster in &self.clusters {
            let distance = cluster.mean_distance_to(sample);
            if best.map_or(true, |(_, min)| distance < min) {
                best = Some((cluster, distance));
            }
        }
        Ok(best)
    }
}

fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    let mut sum = 0.0;
    for (x, y) in a.iter().zip(b) {
        sum += (x - y).powi(2);
    }
    sum.sqrt()
}

/// Mean Euclidean distance over all cross pairs of members.
pub(crate) fn average_linkage(a: &Cluster, b: &Cluster) -> f64 {
    let mut total = 0.0;
    for p in &a.points {
        for q in &b.points {
            total += euclidean_distance(p, q);
        }
    }
    total / (a.points.len() * b.points.len()) as f64
}

fn distance_matrix(clusters: &[Cluster]) -> Vec<Vec<f64>> {
    let n = clusters.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = average_linkage(&clusters[i], &clusters[j]);
            matrix[i][j] = d;
            matrix[j][i] = d;
        }
    }
    matrix
}

/// Closest pair in row-major upper-triangle order; ties keep the first found.
fn closest_pair(matrix: &[Vec<f64>]) -> Option<(usize, usize, f64)> {
    let mut best: Option<(usize, usize, f64)> = None;
    let mut min = f64::INFINITY;
    for (i, row) in matrix.iter().enumerate() {
        for (j, &d) in row.iter().enumerate().skip(i + 1) {
            if d < min {
                min = d;
                best = Some((i, j, d));
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(n_clusters: usize) -> HierarchicalModel {
        HierarchicalModel::new(ClusteringConfig {
            n_clusters,
            ..ClusteringConfig::default()
        })
    }

    fn blob(cx: f64, cy: f64, n: usize) -> Vec<Vec<f64>> {
        (0..n)
            .map(|i| {
                let offset = i as f64 * 0.1;
                vec![cx + offset, cy - offset]
            })
            .collect()
    }

    #[test]
    fn test_fit_empty_is_invalid_input() {
        let mut ahc = HierarchicalModel::default();
        let empty: Vec<Vec<f64>> = Vec::new();
        assert!(matches!(ahc.fit(&empty), Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn test_predict_without_clusters_is_anomalous() {
        let ahc = HierarchicalModel::default();
        assert_eq!(ahc.predict(&[1.0, 2.0]), Ok(true));
    }

    #[test]
    fn test_cluster_count_and_merge_history() {
        let mut data = blob(0.0, 0.0, 7);
        data.extend(blob(30.0, 30.0, 6));
        data.extend(blob(-40.0, 25.0, 4));

        let mut ahc = model(5);
        ahc.fit(&data).unwrap();

        assert_eq!(ahc.clusters().len(), 5);
        assert_eq!(ahc.merges().len(), data.len() - 5);
        let mut expected_remaining = data.len();
        for step in ahc.merges() {
            expected_remaining -= 1;
            assert_eq!(step.remaining, expected_remaining);
            assert!(step.left < step.right);
        }
        let members: usize = ahc.clusters().iter().map(Cluster::size).sum();
        assert_eq!(members, data.len());
    }

    #[test]
    fn test_fewer_points_than_clusters() {
        let data = vec![vec![1.0, 1.0], vec![5.0, 5.0], vec![9.0, 1.0]];
        let mut ahc = model(5);
        ahc.fit(&data).unwrap();

        assert_eq!(ahc.clusters().len(), 3);
        assert!(ahc.merges().is_empty());
        // Singletons are always "small".
        assert_eq!(ahc.predict(&[1.0, 1.0]), Ok(true));
    }

    #[test]
    fn test_average_linkage_differs_from_centroid_distance() {
        let a = Cluster::merge(Cluster::singleton(&[0.0]), Cluster::singleton(&[10.0]));
        let b = Cluster::singleton(&[4.0]);

        assert_eq!(a.centroid(), &[5.0]);
        assert_eq!(average_linkage(&a, &b), 5.0);
        assert_eq!(a.mean_distance_to(&[4.0]), 5.0);
    }

    #[test]
    fn test_ties_merge_lowest_indices_first() {
        let data = vec![vec![0.0], vec![1.0], vec![2.0]];
        let mut ahc = model(2);
        ahc.fit(&data).unwrap();

        let step = ahc.merges()[0];
        assert_eq!((step.left, step.right), (0, 1));
        assert_eq!(step.distance, 1.0);
        // Merged cluster is appended after the survivors.
        assert_eq!(ahc.clusters()[0].points(), &[vec![2.0]]);
        assert_eq!(ahc.clusters()[1].size(), 2);
        assert_eq!(ahc.clusters()[1].centroid(), &[0.5]);
    }

    #[test]
    fn test_distance_to_nearest() {
        let data = vec![vec![0.0], vec![1.0], vec![2.0]];
        let mut ahc = model(2);
        ahc.fit(&data).unwrap();

        // {2} vs {0, 1}: (2 + 1) / 2
        for cluster in ahc.clusters() {
            assert_eq!(cluster.distance_to_nearest(), 1.5);
        }

        let mut single = model(1);
        single.fit(&data).unwrap();
        assert_eq!(single.clusters().len(), 1);
        assert!(single.clusters()[0].distance_to_nearest().is_infinite());
    }

    #[test]
    fn test_predict_near_large_cluster_is_normal() {
        let mut data = blob(0.0, 0.0, 10);
        data.extend(blob(100.0, 100.0, 10));
        let mut ahc = model(2);
        ahc.fit(&data).unwrap();

        assert_eq!(ahc.clusters().len(), 2);
        assert!(ahc.clusters().iter().all(|c| c.size() == 10));
        assert_eq!(ahc.predict(&[0.5, -0.5]), Ok(false));
        assert_eq!(ahc.predict(&[100.2, 99.8]), Ok(false));
    }

    #[test]
    fn test_predict_distant_point_is_anomalous() {
        let mut data = blob(0.0, 0.0, 10);
        data.extend(blob(100.0, 100.0, 10));
        let mut ahc = model(2);
        ahc.fit(&data).unwrap();

        assert_eq!(ahc.predict(&[1000.0, 1000.0]), Ok(true));
    }

    #[test]
    fn test_predict_small_cluster_is_anomalous() {
        let mut data = blob(0.0, 0.0, 8);
        data.extend(blob(50.0, 50.0, 8));
        data.push(vec![500.0, 500.0]);
        let mut ahc = model(3);
        ahc.fit(&data).unwrap();

        let sizes: Vec<usize> = ahc.clusters().iter().map(Cluster::size).collect();
        assert!(sizes.contains(&1));
        assert_eq!(ahc.predict(&[501.0, 499.0]), Ok(true));
        assert_eq!(
            ahc.predict_batch(&[vec![0.2, -0.2], vec![500.0, 500.0]]).unwrap(),
            vec![false, true]
        );
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut ahc = model(2);
        ahc.fit(&blob(0.0, 0.0, 4)).unwrap();
        assert_eq!(
            ahc.predict(&[1.0]),
            Err(EngineError::DimensionMismatch { expected: 2, got: 1 })
        );
    }
}
