//! Scoring result data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version of the fusion algorithm, recorded with every result for audit
pub const MODEL_VERSION: &str = "2.0.0";

/// Outcome of scoring one feature vector.
///
/// A snapshot copy: holds no reference to the model that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    /// Fused anomaly score (0.0 - 1.0)
    pub final_score: f64,

    /// Isolation forest score (0.0 - 1.0)
    pub if_score: f64,

    /// Whether the clustering stage flagged the vector
    pub ahc_flag: bool,

    /// `final_score > threshold`
    pub is_anomaly: bool,

    /// Distance from the decision boundary, clipped to [0, 1]
    pub confidence: f64,

    /// Human-readable reasons, in rule evaluation order
    pub risk_factors: Vec<String>,

    /// Final threshold in effect when the vector was scored
    pub threshold: f64,

    /// Fusion algorithm version
    pub model_version: String,
}

/// Result envelope published for each scored transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredTransaction {
    /// Unique result identifier
    pub result_id: String,

    /// Associated transaction ID
    pub transaction_id: String,

    /// User the transaction belongs to
    pub user_id: String,

    /// Engine output
    pub result: AnomalyResult,

    /// Scoring timestamp
    pub timestamp: DateTime<Utc>,
}

impl ScoredTransaction {
    /// Wrap a result for publication
    pub fn new(transaction_id: String, user_id: String, result: AnomalyResult) -> Self {
        Self {
            result_id: uuid::Uuid::new_v4().to_string(),
            transaction_id,
            user_id,
            result,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> AnomalyResult {
        AnomalyResult {
            final_score: 0.78,
            if_score: 0.65,
            ahc_flag: true,
            is_anomaly: true,
            confidence: 0.26,
            risk_factors: vec!["unusually high amount".to_string()],
            threshold: 0.65,
            model_version: MODEL_VERSION.to_string(),
        }
    }

    #[test]
    fn test_scored_transaction_serialization() {
        let scored = ScoredTransaction::new("tx_123".to_string(), "u_1".to_string(), sample_result());

        let json = serde_json::to_string(&scored).unwrap();
        let deserialized: ScoredTransaction = serde_json::from_str(&json).unwrap();

        assert_eq!(scored.transaction_id, deserialized.transaction_id);
        assert_eq!(scored.result, deserialized.result);
        assert_eq!(deserialized.result.model_version, "2.0.0");
    }

    #[test]
    fn test_result_ids_are_unique() {
        let a = ScoredTransaction::new("tx".to_string(), "u".to_string(), sample_result());
        let b = ScoredTransaction::new("tx".to_string(), "u".to_string(), sample_result());
        assert_ne!(a.result_id, b.result_id);
    }
}
