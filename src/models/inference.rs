//! Shared scoring engine for the service
//!
//! Wraps a [`FusionModel`] so many tasks can score concurrently while a
//! background task retrains. Scoring never waits for training: it clones the
//! published snapshot and works on that.

use crate::config::AppConfig;
use crate::error::{EngineError, Result};
use crate::feature_extractor::{FeatureExtractor, FeatureVector};
use crate::models::fusion::{FusionModel, FusionSnapshot, TrainingOutcome};
use crate::models::synthetic;
use crate::types::alert::AnomalyResult;
use crate::types::transaction::TransactionFeatures;
use parking_lot::{Mutex, RwLock};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Seed of the synthetic warm-start dataset
const WARM_START_SEED: u64 = 0x5eed;

/// Fraud scoring engine
pub struct InferenceEngine {
    extractor: FeatureExtractor,
    /// Serializes training runs
    model: Mutex<FusionModel>,
    /// Models readers score against
    published: RwLock<Option<Arc<FusionSnapshot>>>,
}

impl InferenceEngine {
    /// Create an engine from configuration, warm-starting it on synthetic
    /// data when `training.warm_start` is set.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let engine = Self::untrained(config)?;

        if config.training.warm_start {
            let mut rng = ChaCha8Rng::seed_from_u64(WARM_START_SEED);
            let data = synthetic::warm_start_dataset(
                &mut rng,
                config.training.warm_start_normal,
                config.training.warm_start_outliers,
            );
            if !data.is_empty() {
                engine.train(&data)?;
            }
        }

        info!(
            trained = engine.is_trained(),
            history_len = engine.history_len(),
            n_trees = config.forest.n_trees,
            n_clusters = config.clustering.n_clusters,
            "Inference engine initialized"
        );

        Ok(engine)
    }

    /// Create an engine with no trained models
    pub fn untrained(config: &AppConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            extractor: FeatureExtractor::from_config(&config.risk),
            model: Mutex::new(FusionModel::new(config)),
            published: RwLock::new(None),
        })
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Currently published models
    pub fn snapshot(&self) -> Option<Arc<FusionSnapshot>> {
        self.published.read().clone()
    }

    pub fn is_trained(&self) -> bool {
        self.published.read().is_some()
    }

    /// Vectors accumulated for training so far
    pub fn history_len(&self) -> usize {
        self.model.lock().history().len()
    }

    /// Score one feature vector
    pub fn predict(&self, features: &FeatureVector) -> Result<AnomalyResult> {
        self.snapshot()
            .ok_or(EngineError::NotTrained)?
            .predict(features)
    }

    /// Adapt and score one transaction record
    pub fn score(&self, transaction: &TransactionFeatures) -> Result<AnomalyResult> {
        self.predict(&self.extractor.extract(transaction))
    }

    /// Score a batch against one snapshot
    pub fn predict_batch(&self, batch: &[FeatureVector]) -> Result<Vec<AnomalyResult>> {
        let snapshot = self.snapshot().ok_or(EngineError::NotTrained)?;
        batch.iter().map(|v| snapshot.predict(v)).collect()
    }

    /// Append vectors to the history and retrain. Blocks for the duration of
    /// the fit; readers keep using the previous snapshot until it completes.
    pub fn train(&self, vectors: &[FeatureVector]) -> Result<TrainingOutcome> {
        let mut model = self.model.lock();
        let outcome = model.train(vectors)?;

        if matches!(outcome, TrainingOutcome::Trained(_)) {
            *self.published.write() = model.snapshot();
        }

        Ok(outcome)
    }

    /// Adapt transaction records and retrain on them
    pub fn train_transactions(&self, transactions: &[TransactionFeatures]) -> Result<TrainingOutcome> {
        let vectors: Vec<FeatureVector> = transactions
            .iter()
            .map(|tx| self.extractor.extract(tx))
            .collect();
        self.train(&vectors)
    }

    /// Retrain on a blocking worker thread
    pub fn spawn_retrain(self: &Arc<Self>, vectors: Vec<FeatureVector>) -> JoinHandle<Result<TrainingOutcome>> {
        let engine = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            let outcome = engine.train(&vectors);
            if let Err(e) = &outcome {
                error!(error = %e, batch = vectors.len(), "Background retrain failed");
            }
            outcome
        })
    }
}
