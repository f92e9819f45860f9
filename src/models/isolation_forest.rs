//! Isolation Forest implementation
//!
//! Anomaly detection using isolation trees. Each tree recursively splits a
//! random sample of the data on a random feature at a random threshold;
//! anomalies are isolated after fewer splits and so have shorter average
//! path lengths across the forest.

use super::check_rows;
use crate::config::ForestConfig;
use crate::error::{EngineError, Result};
use rand::Rng;

/// Euler-Mascheroni constant used by the path length correction.
pub const EULER_GAMMA: f64 = 0.5772156649;

/// Expected additional path length to isolate a point among `n` samples
/// (the `c(n)` correction applied at leaves and used to normalise scores).
pub fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n = n as f64;
    2.0 * (n.ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
}

/// Score and forest-level verdict for one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredSample {
    pub score: f64,
    pub is_anomaly: bool,
}

/// Isolation Forest model for anomaly detection
#[derive(Debug, Clone)]
pub struct IsolationForest {
    config: ForestConfig,
    trees: Vec<IsolationTree>,
    /// Score at the contamination quantile of the training data
    threshold: f64,
    /// Dimension fixed by the last fit
    n_features: usize,
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new(ForestConfig::default())
    }
}

impl IsolationForest {
    /// Create an unfitted forest
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            threshold: 0.0,
            n_features: 0,
        }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Whether `fit` has completed at least once
    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Contamination-calibrated cut point used by [`predict`](Self::predict)
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn trees(&self) -> &[IsolationTree] {
        &self.trees
    }

    /// Fit the forest, replacing any previous trees and threshold.
    ///
    /// Every tree draws `max_samples` indices with replacement, even when
    /// the input is smaller than that.
    pub fn fit<S, R>(&mut self, data: &[S], rng: &mut R) -> Result<()>
    where
        S: AsRef<[f64]>,
        R: Rng + ?Sized,
    {
        let rows = check_rows(data)?;
        let n_features = rows[0].len();

        let trees: Vec<IsolationTree> = (0..self.config.n_trees)
            .map(|_| {
                let sample: Vec<&[f64]> = (0..self.config.max_samples)
                    .map(|_| rows[rng.gen_range(0..rows.len())])
                    .collect();
                IsolationTree::build(sample, n_features, self.config.max_depth, rng)
            })
            .collect();

        let normaliser = average_path_length(self.config.max_samples);
        let mut scores: Vec<f64> = rows
            .iter()
            .map(|row| anomaly_score(&trees, normaliser, row))
            .collect();
        scores.sort_by(|a, b| a.total_cmp(b));

        let idx = ((1.0 - self.config.contamination) * scores.len() as f64).floor() as usize;
        let threshold = scores[idx.min(scores.len() - 1)];

        self.trees = trees;
        self.threshold = threshold;
        self.n_features = n_features;
        Ok(())
    }

    /// Anomaly score in (0, 1]; larger means easier to isolate.
    pub fn decision_score(&self, sample: &[f64]) -> Result<f64> {
        self.check_sample(sample)?;
        Ok(anomaly_score(
            &self.trees,
            average_path_length(self.config.max_samples),
            sample,
        ))
    }

    /// Scores for a batch of samples
    pub fn decision_scores<S: AsRef<[f64]>>(&self, data: &[S]) -> Result<Vec<f64>> {
        data.iter().map(|s| self.decision_score(s.as_ref())).collect()
    }

    /// Forest-level verdicts: score above the fitted threshold
    pub fn predict<S: AsRef<[f64]>>(&self, data: &[S]) -> Result<Vec<bool>> {
        Ok(self
            .predict_with_scores(data)?
            .into_iter()
            .map(|s| s.is_anomaly)
            .collect())
    }

    /// Scores together with forest-level verdicts
    pub fn predict_with_scores<S: AsRef<[f64]>>(&self, data: &[S]) -> Result<Vec<ScoredSample>> {
        Ok(self
            .decision_scores(data)?
            .into_iter()
            .map(|score| ScoredSample {
                score,
                is_anomaly: score > self.threshold,
            })
            .collect())
    }

    fn check_sample(&self, sample: &[f64]) -> Result<()> {
        if !self.is_fitted() {
            return Err(EngineError::NotTrained);
        }
        if sample.len() != self.n_features {
            return Err(EngineError::DimensionMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        Ok(())
    }
}

fn anomaly_score(trees: &[IsolationTree], normaliser: f64, sample: &[f64]) -> f64 {
    let mut total_path_length = 0.0;
    for tree in trees {
        total_path_length += tree.path_length(sample);
    }
    let avg_path_length = total_path_length / trees.len() as f64;

    // 2^(-E[h(x)] / c(max_samples))
    2.0_f64.powf(-avg_path_length / normaliser)
}

/// A single isolation tree
#[derive(Debug, Clone)]
pub struct IsolationTree {
    root: IsolationNode,
}

#[derive(Debug, Clone)]
enum IsolationNode {
    Internal {
        feature: usize,
        threshold: f64,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
    Leaf {
        size: usize,
    },
}

impl IsolationTree {
    fn build<R: Rng + ?Sized>(
        samples: Vec<&[f64]>,
        n_features: usize,
        max_depth: usize,
        rng: &mut R,
    ) -> Self {
        Self {
            root: Self::build_node(samples, n_features, 0, max_depth, rng),
        }
    }

    fn build_node<R: Rng + ?Sized>(
        samples: Vec<&[f64]>,
        n_features: usize,
        depth: usize,
        max_depth: usize,
        rng: &mut R,
    ) -> IsolationNode {
        if depth >= max_depth || samples.len() <= 1 {
            return IsolationNode::Leaf {
                size: samples.len(),
            };
        }

        let feature = rng.gen_range(0..n_features);

        let (min_val, max_val) = samples
            .iter()
            .skip(1)
            .fold((samples[0][feature], samples[0][feature]), |(lo, hi), s| {
                (lo.min(s[feature]), hi.max(s[feature]))
            });

        if min_val == max_val {
            return IsolationNode::Leaf {
                size: samples.len(),
            };
        }

        let threshold = min_val + rng.gen::<f64>() * (max_val - min_val);

        let (left, right): (Vec<&[f64]>, Vec<&[f64]>) =
            samples.into_iter().partition(|s| s[feature] < threshold);

        IsolationNode::Internal {
            feature,
            threshold,
            left: Box::new(Self::build_node(left, n_features, depth + 1, max_depth, rng)),
            right: Box::new(Self::build_node(right, n_features, depth + 1, max_depth, rng)),
        }
    }

    /// Edges from the root to the sample's leaf plus the leaf-size correction
    pub fn path_length(&self, sample: &[f64]) -> f64 {
        let mut node = &self.root;
        let mut edges = 0usize;
        loop {
            match node {
                IsolationNode::Leaf { size } => {
                    return edges as f64 + average_path_length(*size);
                }
                IsolationNode::Internal {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample[*feature] < *threshold { left } else { right };
                    edges += 1;
                }
            }
        }
    }

    /// Length of the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        fn walk(node: &IsolationNode) -> usize {
            match node {
                IsolationNode::Leaf { .. } => 0,
                IsolationNode::Internal { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        walk(&self.root)
    }

    /// Total number of samples held by the leaves
    pub fn leaf_samples(&self) -> usize {
        fn walk(node: &IsolationNode) -> usize {
            match node {
                IsolationNode::Leaf { size } => *size,
                IsolationNode::Internal { left, right, .. } => walk(left) + walk(right),
            }
        }
        walk(&self.root)
    }
}
