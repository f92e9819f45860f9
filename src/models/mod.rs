//! Anomaly models and the scoring pipeline built from them

pub mod aggregator;
pub mod clustering;
pub mod fusion;
pub mod inference;
pub mod isolation_forest;
pub mod risk_factors;
pub mod synthetic;

pub use aggregator::ScoreAggregator;
pub use clustering::{Cluster, HierarchicalModel, MergeStep};
pub use fusion::{FusionModel, FusionSnapshot, TrainingOutcome, TrainingReport};
pub use inference::InferenceEngine;
pub use isolation_forest::{IsolationForest, IsolationTree, ScoredSample};

use crate::error::{EngineError, Result};

/// Borrow rows as slices after checking they are non-empty and share a dimension.
pub(crate) fn check_rows<S: AsRef<[f64]>>(data: &[S]) -> Result<Vec<&[f64]>> {
    let first = data
        .first()
        .ok_or_else(|| EngineError::invalid("cannot fit on an empty dataset"))?;
    let n_features = first.as_ref().len();
    if n_features == 0 {
        return Err(EngineError::invalid("vectors must have at least one feature"));
    }

    data.iter()
        .map(|row| {
            let row = row.as_ref();
            if row.len() != n_features {
                return Err(EngineError::DimensionMismatch {
                    expected: n_features,
                    got: row.len(),
                });
            }
            Ok(row)
        })
        .collect()
}
