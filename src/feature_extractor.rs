//! Feature adapter: turns transaction feature records into model input.
//!
//! The numeric layout is fixed by [`FEATURE_NAMES`]; index `i` of every
//! vector handed to the forest or the clustering stage is always the
//! field named `FEATURE_NAMES[i]`.

use crate::config::RiskConfig;
use crate::types::transaction::TransactionFeatures;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Number of model input features.
pub const FEATURE_COUNT: usize = 10;

/// Canonical field order of the model input.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "amount",
    "timeOfDay",
    "dayOfWeek",
    "userTransactionCount",
    "userAverageAmount",
    "transactionVelocity",
    "isNewPaymentMethod",
    "isInternational",
    "isHighRiskCountry",
    "merchantCategoryRisk",
];

/// Fixed-order numeric feature vector.
///
/// Missing fields deserialize as 0.0. Boolean features are 0.0 or 1.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeatureVector {
    pub amount: f64,
    pub time_of_day: f64,
    pub day_of_week: f64,
    pub user_transaction_count: f64,
    pub user_average_amount: f64,
    pub transaction_velocity: f64,
    pub is_new_payment_method: f64,
    pub is_international: f64,
    pub is_high_risk_country: f64,
    pub merchant_category_risk: f64,
}

impl FeatureVector {
    /// Values in [`FEATURE_NAMES`] order.
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.amount,
            self.time_of_day,
            self.day_of_week,
            self.user_transaction_count,
            self.user_average_amount,
            self.transaction_velocity,
            self.is_new_payment_method,
            self.is_international,
            self.is_high_risk_country,
            self.merchant_category_risk,
        ]
    }

    /// Build from values in [`FEATURE_NAMES`] order.
    pub fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        let [amount, time_of_day, day_of_week, user_transaction_count, user_average_amount, transaction_velocity, is_new_payment_method, is_international, is_high_risk_country, merchant_category_risk] =
            values;
        Self {
            amount,
            time_of_day,
            day_of_week,
            user_transaction_count,
            user_average_amount,
            transaction_velocity,
            is_new_payment_method,
            is_international,
            is_high_risk_country,
            merchant_category_risk,
        }
    }

    /// Build from name/value pairs. Unknown names are ignored and
    /// absent features stay at 0.0.
    pub fn from_named<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut values = [0.0; FEATURE_COUNT];
        for (name, value) in pairs {
            if let Some(idx) = feature_index(name) {
                values[idx] = value;
            }
        }
        Self::from_array(values)
    }

    /// Look up a feature by its canonical name.
    pub fn get(&self, name: &str) -> Option<f64> {
        feature_index(name).map(|idx| self.to_array()[idx])
    }
}

/// Position of a feature in the canonical order.
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_NAMES.iter().position(|&n| n == name)
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Feature extractor that maps transaction records to [`FeatureVector`]s
/// and derives the merchant and country risk flags.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    high_risk_countries: HashSet<String>,
    high_risk_merchants: HashSet<String>,
}

impl FeatureExtractor {
    /// Create a feature extractor with the default risk tables.
    pub fn new() -> Self {
        Self::from_config(&RiskConfig::default())
    }

    /// Create a feature extractor from configured risk tables.
    pub fn from_config(risk: &RiskConfig) -> Self {
        Self {
            high_risk_countries: risk
                .high_risk_countries
                .iter()
                .map(|c| c.trim().to_ascii_uppercase())
                .collect(),
            high_risk_merchants: risk
                .high_risk_merchant_categories
                .iter()
                .map(|m| m.trim().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Extract the model input for a transaction.
    pub fn extract(&self, tx: &TransactionFeatures) -> FeatureVector {
        let high_risk_country = tx.is_high_risk_country
            || tx
                .country
                .as_deref()
                .is_some_and(|c| self.is_high_risk_country(c));

        let merchant_risk = tx
            .merchant_category
            .as_deref()
            .is_some_and(|m| self.is_high_risk_merchant(m));

        FeatureVector {
            amount: tx.amount,
            time_of_day: tx.time_of_day,
            day_of_week: tx.day_of_week,
            user_transaction_count: tx.user_transaction_count,
            user_average_amount: tx.user_average_amount,
            transaction_velocity: tx.transaction_velocity,
            is_new_payment_method: flag(tx.is_new_payment_method),
            is_international: flag(tx.is_international),
            is_high_risk_country: flag(high_risk_country),
            merchant_category_risk: flag(merchant_risk),
        }
    }

    /// Whether a merchant category is in the high-risk set (case-insensitive).
    pub fn is_high_risk_merchant(&self, category: &str) -> bool {
        self.high_risk_merchants
            .contains(&category.trim().to_ascii_lowercase())
    }

    /// Whether a country code is in the high-risk set (case-insensitive).
    pub fn is_high_risk_country(&self, country: &str) -> bool {
        self.high_risk_countries
            .contains(&country.trim().to_ascii_uppercase())
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Get feature names in model order.
    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}
