//! Human-readable explanations attached to each scoring result.

use crate::feature_extractor::FeatureVector;

/// Inputs the rules are evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct RiskContext<'a> {
    pub features: &'a FeatureVector,
    pub if_score: f64,
    pub ahc_flag: bool,
}

/// A named, independent check.
pub struct RiskRule {
    pub label: &'static str,
    pub applies: fn(&RiskContext<'_>) -> bool,
}

/// Rules in evaluation order; the output keeps this order.
pub const RISK_RULES: &[RiskRule] = &[
    RiskRule {
        label: "high isolation score",
        applies: |ctx| ctx.if_score > 0.8,
    },
    RiskRule {
        label: "small/distant cluster membership",
        applies: |ctx| ctx.ahc_flag,
    },
    RiskRule {
        label: "unusually high amount",
        applies: |ctx| ctx.features.amount > 1000.0,
    },
    RiskRule {
        label: "unusual hours",
        applies: |ctx| ctx.features.time_of_day < 6.0 || ctx.features.time_of_day > 22.0,
    },
    RiskRule {
        label: "new account",
        applies: |ctx| ctx.features.user_transaction_count < 5.0,
    },
    RiskRule {
        label: "high velocity",
        applies: |ctx| ctx.features.transaction_velocity > 3.0,
    },
    RiskRule {
        label: "new payment method",
        applies: |ctx| ctx.features.is_new_payment_method != 0.0,
    },
    RiskRule {
        label: "international",
        applies: |ctx| ctx.features.is_international != 0.0,
    },
    RiskRule {
        label: "high-risk country",
        applies: |ctx| ctx.features.is_high_risk_country != 0.0,
    },
];

/// Labels of every rule that fires, in rule order.
pub fn evaluate(features: &FeatureVector, if_score: f64, ahc_flag: bool) -> Vec<String> {
    let ctx = RiskContext {
        features,
        if_score,
        ahc_flag,
    };
    RISK_RULES
        .iter()
        .filter(|rule| (rule.applies)(&ctx))
        .map(|rule| rule.label.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_vector() -> FeatureVector {
        FeatureVector {
            amount: 120.0,
            time_of_day: 14.0,
            day_of_week: 2.0,
            user_transaction_count: 40.0,
            user_average_amount: 100.0,
            transaction_velocity: 1.0,
            ..FeatureVector::default()
        }
    }

    #[test]
    fn test_no_rules_fire_for_ordinary_transaction() {
        assert!(evaluate(&quiet_vector(), 0.4, false).is_empty());
    }

    #[test]
    fn test_all_rules_fire_in_order() {
        let v = FeatureVector {
            amount: 5000.0,
            time_of_day: 3.0,
            user_transaction_count: 1.0,
            transaction_velocity: 7.0,
            is_new_payment_method: 1.0,
            is_international: 1.0,
            is_high_risk_country: 1.0,
            ..quiet_vector()
        };

        let labels = evaluate(&v, 0.85, true);
        let expected: Vec<&str> = RISK_RULES.iter().map(|r| r.label).collect();
        assert_eq!(labels, expected);
    }

    #[test]
    fn test_boundaries_are_strict() {
        let v = FeatureVector {
            amount: 1000.0,
            time_of_day: 22.0,
            user_transaction_count: 5.0,
            transaction_velocity: 3.0,
            ..quiet_vector()
        };
        assert!(evaluate(&v, 0.8, false).is_empty());

        let late = FeatureVector {
            time_of_day: 23.0,
            ..quiet_vector()
        };
        assert_eq!(evaluate(&late, 0.1, false), vec!["unusual hours"]);

        let early = FeatureVector {
            time_of_day: 5.0,
            ..quiet_vector()
        };
        assert_eq!(evaluate(&early, 0.1, false), vec!["unusual hours"]);
    }

    #[test]
    fn test_signal_rules() {
        assert_eq!(evaluate(&quiet_vector(), 0.81, false), vec!["high isolation score"]);
        assert_eq!(
            evaluate(&quiet_vector(), 0.6, true),
            vec!["small/distant cluster membership"]
        );
    }
}
