//! NATS consumer for incoming transaction feature records

use crate::types::transaction::TransactionFeatures;
use anyhow::{Context, Result};
use async_nats::{Client, Subscriber};
use tracing::info;

/// Consumer for receiving transaction feature records from NATS
pub struct TransactionConsumer {
    client: Client,
    subject: String,
}

impl TransactionConsumer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the transaction subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to transaction subject");
        Ok(subscriber)
    }

    /// Decode one message payload
    pub fn decode(payload: &[u8]) -> Result<TransactionFeatures> {
        serde_json::from_slice(payload).context("Failed to deserialize transaction features")
    }
}
