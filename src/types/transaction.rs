//! Transaction feature record received from the payment pipeline

use serde::{Deserialize, Serialize};

/// Per-transaction features computed upstream from the user's history.
///
/// Field names accept both snake_case and the camelCase used by the
/// payment front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionFeatures {
    /// Transaction identifier assigned by the caller
    #[serde(default, alias = "transactionId")]
    pub transaction_id: String,

    /// Opaque user identifier, only used for upstream aggregation
    #[serde(default, alias = "userId")]
    pub user_id: String,

    /// Transaction amount
    #[serde(default)]
    pub amount: f64,

    /// Hour of day (0-23)
    #[serde(default, alias = "timeOfDay")]
    pub time_of_day: f64,

    /// Day of week (0 = Sunday .. 6 = Saturday)
    #[serde(default, alias = "dayOfWeek")]
    pub day_of_week: f64,

    /// Number of prior transactions by this user
    #[serde(default, alias = "userTransactionCount")]
    pub user_transaction_count: f64,

    /// Mean amount of the user's prior transactions
    #[serde(default, alias = "userAverageAmount")]
    pub user_average_amount: f64,

    /// Transactions by this user in the last hour
    #[serde(default, alias = "transactionVelocity")]
    pub transaction_velocity: f64,

    #[serde(default, alias = "isNewPaymentMethod")]
    pub is_new_payment_method: bool,

    #[serde(default, alias = "isInternational")]
    pub is_international: bool,

    #[serde(default, alias = "isHighRiskCountry")]
    pub is_high_risk_country: bool,

    /// ISO country code of the transaction origin, if known
    #[serde(default)]
    pub country: Option<String>,

    /// Merchant category label, e.g. "groceries" or "gambling"
    #[serde(default, alias = "merchantCategory")]
    pub merchant_category: Option<String>,
}

impl TransactionFeatures {
    /// Create a record with the given amount and neutral defaults elsewhere
    pub fn new(transaction_id: impl Into<String>, user_id: impl Into<String>, amount: f64) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            user_id: user_id.into(),
            amount,
            time_of_day: 12.0,
            day_of_week: 3.0,
            user_transaction_count: 0.0,
            user_average_amount: 0.0,
            transaction_velocity: 0.0,
            is_new_payment_method: false,
            is_international: false,
            is_high_risk_country: false,
            country: None,
            merchant_category: None,
        }
    }
}
