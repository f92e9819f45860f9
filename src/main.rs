//! Fraud Anomaly Engine - Main Entry Point
//!
//! Consumes transaction feature records from NATS, scores them, publishes the
//! results and periodically retrains on what it has scored.

use anyhow::{Context, Result};
use fraud_anomaly_engine::{
    config::{AppConfig, LoggingConfig},
    consumer::TransactionConsumer,
    metrics::{MetricsReporter, PipelineMetrics},
    models::inference::InferenceEngine,
    producer::ResultProducer,
    retrain::{self, RetrainHandle, RetrainScheduler},
    EngineError, ScoredTransaction, TrainingOutcome,
};
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!("fraud_anomaly_engine={}", logging.level))
    })?;

    if logging.format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

/// Wait for a scheduled retrain and record how it went
async fn report_retrain(handle: RetrainHandle, metrics: &PipelineMetrics, batch_len: usize) {
    match handle.await {
        Ok(Ok(Ok(TrainingOutcome::Trained(report)))) => {
            metrics.record_retrain(true);
            info!(
                batch = batch_len,
                history_len = report.history_len,
                candidate_anomalies = report.candidate_anomalies,
                degraded = report.degraded,
                "Background retrain completed"
            );
        }
        Ok(Ok(Ok(TrainingOutcome::Deferred { history_len }))) => {
            debug!(batch = batch_len, history_len = history_len, "Retrain deferred");
        }
        // Already logged by the retrain task
        Ok(Ok(Err(_))) => metrics.record_retrain(false),
        Ok(Err(e)) | Err(e) => {
            metrics.record_retrain(false);
            error!(error = %e, "Retrain task panicked");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (optional path as the first argument)
    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };

    init_logging(&config.logging)?;
    info!("Starting Fraud Anomaly Engine");
    info!(
        n_trees = config.forest.n_trees,
        max_samples = config.forest.max_samples,
        n_clusters = config.clustering.n_clusters,
        if_threshold = config.fusion.if_threshold,
        final_threshold = config.fusion.final_threshold,
        "Configuration loaded"
    );

    let metrics = Arc::new(PipelineMetrics::new());

    let engine = Arc::new(InferenceEngine::new(&config).context("Failed to create inference engine")?);
    let scheduler = Arc::new(Mutex::new(RetrainScheduler::new(config.training.retrain_floor)));

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = TransactionConsumer::new(client.clone(), &config.nats.transaction_subject);
    let producer = Arc::new(ResultProducer::new(client.clone(), &config.nats.result_subject));

    let if_threshold = config.fusion.if_threshold;
    let num_workers = config.pipeline.workers;
    info!(
        workers = num_workers,
        subject = %config.nats.transaction_subject,
        results = %config.nats.result_subject,
        "Starting scoring loop"
    );

    // Semaphore to limit concurrent processing
    let semaphore = Arc::new(Semaphore::new(num_workers));
    let processed_count = Arc::new(AtomicU64::new(0));

    let metrics_clone = metrics.clone();
    tokio::spawn(async move {
        let reporter = MetricsReporter::new(metrics_clone, 30);
        reporter.start().await;
    });

    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        let permit = semaphore.clone().acquire_owned().await?;

        let engine = engine.clone();
        let scheduler = scheduler.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();
        let processed_count = processed_count.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();

            let transaction = match TransactionConsumer::decode(&message.payload) {
                Ok(tx) => tx,
                Err(e) => {
                    warn!(error = %e, "Dropping malformed message");
                    return;
                }
            };
            let tx_id = transaction.transaction_id.clone();
            let features = engine.extractor().extract(&transaction);

            let result = match engine.predict(&features) {
                Ok(result) => Some(result),
                Err(EngineError::NotTrained) => {
                    // Default-allow: the transaction goes through unscored.
                    metrics.record_not_trained();
                    warn!(transaction_id = %tx_id, "Model not trained, allowing transaction");
                    None
                }
                Err(e) => {
                    error!(transaction_id = %tx_id, error = %e, "Scoring failed");
                    return;
                }
            };

            if let Some(result) = result {
                let latency = start_time.elapsed();
                let consulted = result.if_score > if_threshold;
                metrics.record_score(latency, result.final_score, consulted, result.is_anomaly);

                if result.is_anomaly {
                    info!(
                        transaction_id = %tx_id,
                        final_score = result.final_score,
                        confidence = result.confidence,
                        risk_factors = ?result.risk_factors,
                        "Anomalous transaction"
                    );
                } else {
                    debug!(
                        transaction_id = %tx_id,
                        final_score = result.final_score,
                        latency_us = latency.as_micros(),
                        "Transaction scored"
                    );
                }

                let scored = ScoredTransaction::new(tx_id.clone(), transaction.user_id.clone(), result);
                if let Err(e) = producer.publish(&scored).await {
                    error!(transaction_id = %tx_id, error = %e, "Failed to publish scoring result");
                }
            }

            let due = scheduler.lock().record(features);

            let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
            if count % 100 == 0 {
                let latency_stats = metrics.get_latency_stats();
                info!(
                    processed = count,
                    throughput = format!("{:.1} tx/s", metrics.get_throughput()),
                    avg_latency_us = latency_stats.mean_us,
                    "Processing milestone"
                );
            }

            // Retraining runs outside the worker limit
            drop(permit);

            if let Some(batch) = due {
                let batch_len = batch.len();
                let handle = retrain::spawn_scheduled(&engine, &scheduler, batch);
                report_retrain(handle, &metrics, batch_len).await;
            }
        });
    }

    info!("Engine shutting down...");
    metrics.print_summary();

    Ok(())
}
