//! Type definitions for the fraud anomaly engine

pub mod alert;
pub mod transaction;

pub use alert::{AnomalyResult, ScoredTransaction, MODEL_VERSION};
pub use transaction::TransactionFeatures;
