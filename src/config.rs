//! Configuration management for the fraud anomaly engine

use crate::error::{EngineError, Result as EngineResult};
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub nats: NatsConfig,
    #[serde(default)]
    pub forest: ForestConfig,
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming transaction feature records
    pub transaction_subject: String,
    /// Subject for outgoing scoring results
    pub result_subject: String,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            transaction_subject: "transactions.features".to_string(),
            result_subject: "fraud.scores".to_string(),
        }
    }
}

/// Isolation forest parameters
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of isolation trees
    pub n_trees: usize,
    /// Indices drawn (with replacement) per tree
    pub max_samples: usize,
    /// Depth limit for tree construction
    pub max_depth: usize,
    /// Assumed anomalous fraction, calibrates the forest's own threshold
    pub contamination: f64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_samples: 256,
            max_depth: 8,
            contamination: 0.1,
        }
    }
}

/// Agglomerative clustering parameters
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Number of clusters left after merging
    pub n_clusters: usize,
    /// Multiple of a cluster's nearest-sibling distance beyond which a point is distant
    pub anomaly_threshold: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            n_clusters: 5,
            anomaly_threshold: 2.0,
        }
    }
}

/// Score fusion thresholds
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FusionConfig {
    /// Final score above which a transaction is anomalous
    pub final_threshold: f64,
    /// Isolation score above which the clustering stage is consulted
    pub if_threshold: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            final_threshold: 0.65,
            if_threshold: 0.5,
        }
    }
}

/// Static risk lookup tables used by the feature adapter
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskConfig {
    pub high_risk_countries: Vec<String>,
    pub high_risk_merchant_categories: Vec<String>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            high_risk_countries: ["XX", "YY", "ZZ"].iter().map(|s| s.to_string()).collect(),
            high_risk_merchant_categories: ["gambling", "cryptocurrency", "adult", "money_transfer"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Training and retraining policy
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainingConfig {
    /// Seed for tree construction; entropy-seeded when absent
    pub seed: Option<u64>,
    /// Accumulated history needed before the models are refitted
    pub min_history: usize,
    /// Train on a synthetic dataset when the engine is created
    pub warm_start: bool,
    /// Normal vectors in the warm-start dataset
    pub warm_start_normal: usize,
    /// Anomalous vectors in the warm-start dataset
    pub warm_start_outliers: usize,
    /// Scored records the service must hold before it schedules a retrain
    pub retrain_floor: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: None,
            min_history: 10,
            warm_start: true,
            warm_start_normal: 100,
            warm_start_outliers: 10,
            retrain_floor: 10,
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of concurrent scoring tasks
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        let app: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app.validate().context("Invalid configuration")?;
        Ok(app)
    }

    /// Reject parameter values the models cannot work with
    pub fn validate(&self) -> EngineResult<()> {
        let f = &self.forest;
        if f.n_trees == 0 || f.max_depth == 0 {
            return Err(EngineError::invalid("forest n_trees and max_depth must be positive"));
        }
        if f.max_samples < 2 {
            return Err(EngineError::invalid(format!(
                "forest max_samples must be at least 2, got {}",
                f.max_samples
            )));
        }
        if !(0.0..1.0).contains(&f.contamination) {
            return Err(EngineError::invalid(format!(
                "contamination must be in [0, 1), got {}",
                f.contamination
            )));
        }
        if self.clustering.n_clusters == 0 {
            return Err(EngineError::invalid("n_clusters must be positive"));
        }
        if self.clustering.anomaly_threshold <= 0.0 {
            return Err(EngineError::invalid("clustering anomaly_threshold must be positive"));
        }
        if self.pipeline.workers == 0 {
            return Err(EngineError::invalid("pipeline workers must be positive"));
        }
        Ok(())
    }
}
