//! Sequential isolation-forest → clustering pipeline.
//!
//! Training fits the forest on the whole accumulated history, then fits the
//! clustering stage on the vectors the forest finds suspicious. Scoring asks
//! the forest first and consults the clustering stage only for suspicious
//! vectors, then fuses both signals.

use crate::config::{AppConfig, ClusteringConfig, ForestConfig};
use crate::error::{EngineError, Result};
use crate::feature_extractor::{FeatureVector, FEATURE_COUNT};
use crate::models::aggregator::ScoreAggregator;
use crate::models::clustering::HierarchicalModel;
use crate::models::isolation_forest::IsolationForest;
use crate::models::risk_factors;
use crate::types::alert::{AnomalyResult, MODEL_VERSION};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Candidate anomalies needed before the clustering stage is fitted on them
/// rather than on the whole history.
pub const MIN_CANDIDATE_ANOMALIES: usize = 5;

/// Relative feature importance reported alongside the models.
pub const FEATURE_IMPORTANCE: [(&str, f64); 9] = [
    ("amount", 0.25),
    ("timeOfDay", 0.10),
    ("dayOfWeek", 0.05),
    ("userTransactionCount", 0.15),
    ("userAverageAmount", 0.15),
    ("transactionVelocity", 0.10),
    ("isNewPaymentMethod", 0.10),
    ("isInternational", 0.05),
    ("isHighRiskCountry", 0.05),
];

/// Summary of a completed training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    /// Vectors in the accumulated history
    pub history_len: usize,
    /// History vectors scoring above the isolation threshold
    pub candidate_anomalies: usize,
    /// Clustering was fitted on the whole history for lack of candidates
    pub degraded: bool,
    /// Contamination-calibrated threshold of the new forest
    pub forest_threshold: f64,
}

/// Result of a `train` call
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingOutcome {
    /// Models were rebuilt and published
    Trained(TrainingReport),
    /// History is still below the configured minimum; nothing was refitted
    Deferred { history_len: usize },
}

/// Fitted models of one training run. Immutable once built.
#[derive(Debug, Clone)]
pub struct FusionSnapshot {
    forest: IsolationForest,
    clustering: HierarchicalModel,
    aggregator: ScoreAggregator,
}

impl FusionSnapshot {
    pub fn forest(&self) -> &IsolationForest {
        &self.forest
    }

    pub fn clustering(&self) -> &HierarchicalModel {
        &self.clustering
    }

    pub fn aggregator(&self) -> &ScoreAggregator {
        &self.aggregator
    }

    /// Score one vector
    pub fn predict(&self, features: &FeatureVector) -> Result<AnomalyResult> {
        let sample = features.to_array();

        let if_score = self.forest.decision_score(&sample)?;
        let ahc_flag = if self.aggregator.should_confirm(if_score) {
            self.clustering.predict(&sample)?
        } else {
            false
        };

        let final_score = self.aggregator.fuse(if_score, ahc_flag);
        let is_anomaly = self.aggregator.is_anomaly(final_score);
        let confidence = self.aggregator.confidence(final_score);
        let risk_factors = risk_factors::evaluate(features, if_score, ahc_flag);

        debug!(
            if_score = if_score,
            ahc_flag = ahc_flag,
            final_score = final_score,
            is_anomaly = is_anomaly,
            "Vector scored"
        );

        Ok(AnomalyResult {
            final_score,
            if_score,
            ahc_flag,
            is_anomaly,
            confidence,
            risk_factors,
            threshold: self.aggregator.final_threshold(),
            model_version: MODEL_VERSION.to_string(),
        })
    }
}

/// Two-stage fraud model with an append-only training history.
#[derive(Debug)]
pub struct FusionModel {
    forest_config: ForestConfig,
    clustering_config: ClusteringConfig,
    aggregator: ScoreAggregator,
    min_history: usize,
    history: Vec<FeatureVector>,
    rng: ChaCha8Rng,
    snapshot: Option<Arc<FusionSnapshot>>,
}

impl FusionModel {
    /// Create an untrained model. Tree construction is seeded from
    /// `training.seed`, or from entropy when no seed is configured.
    pub fn new(config: &AppConfig) -> Self {
        let rng = match config.training.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }

    /// Create an untrained model with an explicit random source
    pub fn with_rng(config: &AppConfig, rng: ChaCha8Rng) -> Self {
        Self {
            forest_config: config.forest.clone(),
            clustering_config: config.clustering.clone(),
            aggregator: ScoreAggregator::new(&config.fusion),
            min_history: config.training.min_history,
            history: Vec::new(),
            rng,
            snapshot: None,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Accumulated training vectors, oldest first
    pub fn history(&self) -> &[FeatureVector] {
        &self.history
    }

    /// Models of the last successful training run
    pub fn snapshot(&self) -> Option<Arc<FusionSnapshot>> {
        self.snapshot.clone()
    }

    /// Static feature importance table
    pub fn feature_importance() -> &'static [(&'static str, f64)] {
        &FEATURE_IMPORTANCE
    }

    /// Append `vectors` to the history and rebuild both models from scratch.
    ///
    /// The previous snapshot stays in place until the new forest and
    /// clusters are completely built.
    pub fn train(&mut self, vectors: &[FeatureVector]) -> Result<TrainingOutcome> {
        if vectors.is_empty() {
            return Err(EngineError::invalid("no training vectors supplied"));
        }
        self.history.extend_from_slice(vectors);

        let history_len = self.history.len();
        if history_len < self.min_history {
            warn!(
                history_len = history_len,
                min_history = self.min_history,
                "Not enough data to train the model, deferring"
            );
            return Ok(TrainingOutcome::Deferred { history_len });
        }

        let rows: Vec<[f64; FEATURE_COUNT]> = self.history.iter().map(FeatureVector::to_array).collect();

        let mut forest = IsolationForest::new(self.forest_config.clone());
        forest.fit(&rows, &mut self.rng)?;

        let scores = forest.decision_scores(&rows)?;
        let candidates: Vec<[f64; FEATURE_COUNT]> = rows
            .iter()
            .zip(&scores)
            .filter(|&(_, &score)| self.aggregator.should_confirm(score))
            .map(|(row, _)| *row)
            .collect();

        let mut clustering = HierarchicalModel::new(self.clustering_config.clone());
        let degraded = candidates.len() < MIN_CANDIDATE_ANOMALIES;
        if degraded {
            warn!(
                candidate_anomalies = candidates.len(),
                history_len = history_len,
                "Not enough potential anomalies found, clustering on all data"
            );
            clustering.fit(&rows)?;
        } else {
            clustering.fit(&candidates)?;
        }

        let report = TrainingReport {
            history_len,
            candidate_anomalies: candidates.len(),
            degraded,
            forest_threshold: forest.threshold(),
        };

        self.snapshot = Some(Arc::new(FusionSnapshot {
            forest,
            clustering,
            aggregator: self.aggregator.clone(),
        }));

        info!(
            history_len = report.history_len,
            candidate_anomalies = report.candidate_anomalies,
            degraded = report.degraded,
            forest_threshold = report.forest_threshold,
            "Model trained"
        );

        Ok(TrainingOutcome::Trained(report))
    }

    /// Score one vector with the last trained models
    pub fn predict(&self, features: &FeatureVector) -> Result<AnomalyResult> {
        self.snapshot
            .as_ref()
            .ok_or(EngineError::NotTrained)?
            .predict(features)
    }
}
