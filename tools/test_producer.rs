//! Test Transaction Producer
//!
//! Generates and publishes transaction feature records to NATS for exercising
//! the scoring service.

use chrono::{Datelike, Timelike, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Record shape the scoring service consumes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionFeatures {
    transaction_id: String,
    user_id: String,
    amount: f64,
    time_of_day: u8,
    day_of_week: u8,
    user_transaction_count: u32,
    user_average_amount: f64,
    transaction_velocity: f64,
    is_new_payment_method: bool,
    is_international: bool,
    is_high_risk_country: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    merchant_category: Option<String>,
}

/// Transaction generator for testing
struct TransactionGenerator {
    rng: rand::rngs::ThreadRng,
    transaction_counter: u64,
}

impl TransactionGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            transaction_counter: 0,
        }
    }

    fn next_id(&mut self) -> String {
        self.transaction_counter += 1;
        format!("tx_{:012}", self.transaction_counter)
    }

    /// Everyday purchase by an established user
    fn generate_legitimate(&mut self) -> TransactionFeatures {
        let now = Utc::now();
        let average = self.rng.gen_range(50.0..300.0);

        TransactionFeatures {
            transaction_id: self.next_id(),
            user_id: format!("user_{}", self.rng.gen_range(1..500)),
            amount: self.rng.gen_range(5.0..500.0),
            time_of_day: now.hour() as u8,
            day_of_week: now.weekday().num_days_from_sunday() as u8,
            user_transaction_count: self.rng.gen_range(5..200),
            user_average_amount: average,
            transaction_velocity: self.rng.gen_range(0..3) as f64,
            is_new_payment_method: self.rng.gen_bool(0.1),
            is_international: self.rng.gen_bool(0.05),
            is_high_risk_country: false,
            country: Some(self.random_choice(&["US", "GB", "CA", "DE", "FR"]).to_string()),
            merchant_category: Some(
                self.random_choice(&["groceries", "restaurants", "fuel", "pharmacy", "retail"])
                    .to_string(),
            ),
        }
    }

    /// Fraud-shaped purchase: large, late, fresh card, risky merchant
    fn generate_suspicious(&mut self) -> TransactionFeatures {
        TransactionFeatures {
            transaction_id: self.next_id(),
            user_id: format!("user_{}", self.rng.gen_range(500..600)),
            amount: self.rng.gen_range(2000.0..15000.0),
            time_of_day: self.rng.gen_range(0..6),
            day_of_week: self.rng.gen_range(0..7),
            user_transaction_count: self.rng.gen_range(0..3),
            user_average_amount: self.rng.gen_range(0.0..100.0),
            transaction_velocity: self.rng.gen_range(4..12) as f64,
            is_new_payment_method: true,
            is_international: true,
            is_high_risk_country: false,
            // High-risk codes are derived by the engine from the country
            country: Some(self.random_choice(&["XX", "YY", "ZZ", "US"]).to_string()),
            merchant_category: Some(
                self.random_choice(&["gambling", "cryptocurrency", "money_transfer"])
                    .to_string(),
            ),
        }
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Transaction Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("transactions.features");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let fraud_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.1);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        fraud_rate = fraud_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, fraud_rate, delay_ms).await;
        }
    };

    let mut generator = TransactionGenerator::new();
    let mut rng = rand::thread_rng();

    info!("Starting to publish {} transactions...", count);

    let mut legitimate_count = 0;
    let mut suspicious_count = 0;

    for i in 0..count {
        let transaction = if rng.gen_bool(fraud_rate) {
            suspicious_count += 1;
            generator.generate_suspicious()
        } else {
            legitimate_count += 1;
            generator.generate_legitimate()
        };

        let payload = serde_json::to_vec(&transaction)?;
        client.publish(subject.to_string(), payload.into()).await?;

        if (i + 1) % 10 == 0 {
            info!(
                "Published {}/{} transactions ({} legitimate, {} suspicious)",
                i + 1,
                count,
                legitimate_count,
                suspicious_count
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    // Flush buffered publishes before exiting
    client.flush().await?;

    info!(
        "Completed! Published {} transactions ({} legitimate, {} suspicious)",
        count, legitimate_count, suspicious_count
    );

    Ok(())
}

async fn run_dry_mode(count: u64, fraud_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = TransactionGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let transaction = if rng.gen_bool(fraud_rate) {
            generator.generate_suspicious()
        } else {
            generator.generate_legitimate()
        };

        let json = serde_json::to_string_pretty(&transaction)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample transaction {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
