//! NATS producer for scoring results

use crate::types::alert::ScoredTransaction;
use anyhow::Result;
use async_nats::Client;
use tracing::debug;

/// Publishes scored transactions to NATS
#[derive(Clone)]
pub struct ResultProducer {
    client: Client,
    subject: String,
}

impl ResultProducer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish one scoring result
    pub async fn publish(&self, scored: &ScoredTransaction) -> Result<()> {
        let payload = serde_json::to_vec(scored)?;

        self.client
            .publish(self.subject.clone(), payload.into())
            .await?;

        debug!(
            result_id = %scored.result_id,
            transaction_id = %scored.transaction_id,
            final_score = scored.result.final_score,
            is_anomaly = scored.result.is_anomaly,
            "Published scoring result"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // Integration tests would require a running NATS server
}
