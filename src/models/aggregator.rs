//! Score fusion for the two-stage pipeline

use crate::config::FusionConfig;

/// Multiplier applied when the clustering stage confirms the forest.
pub const AGREEMENT_BOOST: f64 = 1.2;

/// Multiplier applied when the clustering stage disagrees with the forest.
pub const DISAGREEMENT_DAMPING: f64 = 0.8;

/// Combines the isolation score and the clustering verdict into one
/// final score, verdict and confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreAggregator {
    /// Isolation score above which the clustering stage is consulted
    if_threshold: f64,
    /// Final score above which a transaction is anomalous
    final_threshold: f64,
}

impl ScoreAggregator {
    pub fn new(config: &FusionConfig) -> Self {
        Self {
            if_threshold: config.if_threshold,
            final_threshold: config.final_threshold,
        }
    }

    pub fn if_threshold(&self) -> f64 {
        self.if_threshold
    }

    pub fn final_threshold(&self) -> f64 {
        self.final_threshold
    }

    /// Whether the clustering stage should be asked about this score.
    pub fn should_confirm(&self, if_score: f64) -> bool {
        if_score > self.if_threshold
    }

    /// Fuse the two signals.
    ///
    /// Scores at or below the isolation threshold pass through untouched.
    /// Above it, agreement amplifies (capped at 1) and disagreement dampens.
    pub fn fuse(&self, if_score: f64, ahc_flag: bool) -> f64 {
        if !self.should_confirm(if_score) {
            if_score
        } else if ahc_flag {
            (if_score * AGREEMENT_BOOST).min(1.0)
        } else {
            if_score * DISAGREEMENT_DAMPING
        }
    }

    pub fn is_anomaly(&self, final_score: f64) -> bool {
        final_score > self.final_threshold
    }

    /// Distance from the decision boundary, scaled and clipped to [0, 1].
    pub fn confidence(&self, final_score: f64) -> f64 {
        ((final_score - self.final_threshold).abs() * 2.0).min(1.0)
    }
}

impl Default for ScoreAggregator {
    fn default() -> Self {
        Self::new(&FusionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_scores_pass_through() {
        let aggregator = ScoreAggregator::default();
        for score in [0.0, 0.12, 0.3, 0.5] {
            assert_eq!(aggregator.fuse(score, false), score);
            assert_eq!(aggregator.fuse(score, true), score);
            assert!(!aggregator.should_confirm(score));
        }
    }

    #[test]
    fn test_agreement_amplifies() {
        let aggregator = ScoreAggregator::default();
        assert!((aggregator.fuse(0.6, true) - 0.72).abs() < 1e-12);
        assert_eq!(aggregator.fuse(0.9, true), 1.0);
    }

    #[test]
    fn test_disagreement_dampens() {
        let aggregator = ScoreAggregator::default();
        assert!((aggregator.fuse(0.7, false) - 0.56).abs() < 1e-12);
        assert!(!aggregator.is_anomaly(aggregator.fuse(0.7, false)));
        assert!(aggregator.is_anomaly(aggregator.fuse(0.7, true)));
    }

    #[test]
    fn test_confidence_bounds() {
        let aggregator = ScoreAggregator::default();
        assert_eq!(aggregator.confidence(0.65), 0.0);
        assert!((aggregator.confidence(0.75) - 0.2).abs() < 1e-12);
        assert!((aggregator.confidence(0.55) - 0.2).abs() < 1e-12);
        assert_eq!(aggregator.confidence(0.0), 1.0);
        assert!((aggregator.confidence(1.0) - 0.7).abs() < 1e-12);

        for i in 0..=100 {
            let c = aggregator.confidence(i as f64 / 100.0);
            assert!((0.0..=1.0).contains(&c));
        }
    }

    #[test]
    fn test_custom_thresholds() {
        let aggregator = ScoreAggregator::new(&FusionConfig {
            final_threshold: 0.4,
            if_threshold: 0.3,
        });
        assert!(aggregator.should_confirm(0.35));
        assert!(aggregator.is_anomaly(aggregator.fuse(0.35, true)));
        assert!(!aggregator.is_anomaly(aggregator.fuse(0.35, false)));
    }
}
