//! Fraud Anomaly Engine Library
//!
//! Unsupervised transaction scoring: an isolation forest ranks how easy a
//! transaction is to isolate, and an agglomerative clustering stage confirms
//! or dampens the suspicious ones. Results carry a fused score, a verdict, a
//! confidence and human-readable risk factors.

pub mod config;
pub mod consumer;
pub mod error;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod retrain;
pub mod types;

pub use config::AppConfig;
pub use consumer::TransactionConsumer;
pub use error::{EngineError, Result};
pub use feature_extractor::{FeatureExtractor, FeatureVector};
pub use models::fusion::{FusionModel, TrainingOutcome, TrainingReport};
pub use models::inference::InferenceEngine;
pub use producer::ResultProducer;
pub use retrain::RetrainScheduler;
pub use types::{alert::AnomalyResult, alert::ScoredTransaction, transaction::TransactionFeatures};
