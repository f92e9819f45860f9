//! Error types for the anomaly scoring engine.

use thiserror::Error;

/// Result type alias using `EngineError`.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors returned by the scoring engine.
///
/// Degraded training (too few candidate anomalies for the clustering
/// stage) is not represented here: it is logged and reported through
/// [`TrainingReport`](crate::models::fusion::TrainingReport).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// Training data or configuration is unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A vector does not have the dimension the model was fitted with.
    #[error("invalid vector dimension: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A scoring call arrived before the model was fitted.
    #[error("model has not been trained yet")]
    NotTrained,
}

impl EngineError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        EngineError::InvalidInput(msg.into())
    }
}
