//! Throughput, latency and score statistics for the scoring service.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Latency samples kept for percentile estimates
const LATENCY_WINDOW: usize = 10_000;

/// Metrics collector for the scoring service
pub struct PipelineMetrics {
    /// Transactions scored
    pub transactions_scored: AtomicU64,
    /// Transactions whose final score crossed the threshold
    pub anomalies_flagged: AtomicU64,
    /// Scores for which the clustering stage was consulted
    pub clustering_consultations: AtomicU64,
    /// Scoring attempts rejected because no model was trained yet
    pub not_trained: AtomicU64,
    pub retrains_completed: AtomicU64,
    pub retrains_failed: AtomicU64,
    /// Scoring latency (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Final score distribution buckets
    score_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            transactions_scored: AtomicU64::new(0),
            anomalies_flagged: AtomicU64::new(0),
            clustering_consultations: AtomicU64::new(0),
            not_trained: AtomicU64::new(0),
            retrains_completed: AtomicU64::new(0),
            retrains_failed: AtomicU64::new(0),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a scored transaction
    pub fn record_score(&self, latency: Duration, final_score: f64, consulted_clustering: bool, is_anomaly: bool) {
        self.transactions_scored.fetch_add(1, Ordering::Relaxed);
        if consulted_clustering {
            self.clustering_consultations.fetch_add(1, Ordering::Relaxed);
        }
        if is_anomaly {
            self.anomalies_flagged.fetch_add(1, Ordering::Relaxed);
        }

        {
            let mut latencies = self.latencies.write();
            latencies.push(latency.as_micros() as u64);
            if latencies.len() > LATENCY_WINDOW {
                latencies.drain(0..LATENCY_WINDOW / 2);
            }
        }

        let bucket = (final_score.clamp(0.0, 1.0) * 10.0).min(9.0) as usize;
        self.score_buckets.write()[bucket] += 1;
    }

    pub fn record_not_trained(&self) {
        self.not_trained.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retrain(&self, succeeded: bool) {
        let counter = if succeeded {
            &self.retrains_completed
        } else {
            &self.retrains_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Latency percentiles over the recent window
    pub fn get_latency_stats(&self) -> LatencyStats {
        let mut sorted = self.latencies.read().clone();
        if sorted.is_empty() {
            return LatencyStats::default();
        }
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let at = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: at(0.5),
            p95_us: at(0.95),
            p99_us: at(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Transactions scored per second since startup
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.transactions_scored.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_score_distribution(&self) -> [u64; 10] {
        *self.score_buckets.read()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let scored = self.transactions_scored.load(Ordering::Relaxed);
        let anomalies = self.anomalies_flagged.load(Ordering::Relaxed);
        let consulted = self.clustering_consultations.load(Ordering::Relaxed);
        let pct = |n: u64| if scored > 0 { n as f64 / scored as f64 * 100.0 } else { 0.0 };

        let latency = self.get_latency_stats();
        let score_dist = self.get_score_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║            FRAUD ANOMALY ENGINE - METRICS SUMMARY            ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Transactions Scored:    {:>8}  │  Throughput: {:>6.1} tx/s ║",
            scored,
            self.get_throughput()
        );
        info!(
            "║ Anomalies Flagged:      {:>8}  │  Anomaly Rate: {:>5.1}%   ║",
            anomalies,
            pct(anomalies)
        );
        info!(
            "║ Clustering Consulted:   {:>8}  │  Consult Rate: {:>5.1}%   ║",
            consulted,
            pct(consulted)
        );
        info!(
            "║ Retrains: {:>5} ok {:>5} failed  │  Not trained: {:>8}   ║",
            self.retrains_completed.load(Ordering::Relaxed),
            self.retrains_failed.load(Ordering::Relaxed),
            self.not_trained.load(Ordering::Relaxed)
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Scoring Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            latency.mean_us, latency.p50_us, latency.p95_us, latency.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Final Score Distribution:                                    ║");
        let total: u64 = score_dist.iter().sum();
        for (i, &count) in score_dist.iter().enumerate() {
            let share = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar: String = "█".repeat(((share / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                share,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoring latency statistics
#[derive(Debug, Default, PartialEq)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Prints a metrics summary on a fixed interval
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = PipelineMetrics::new();

        metrics.record_score(Duration::from_micros(100), 0.3, false, false);
        metrics.record_score(Duration::from_micros(200), 0.9, true, true);
        metrics.record_score(Duration::from_micros(300), 0.56, true, false);
        metrics.record_not_trained();
        metrics.record_retrain(true);
        metrics.record_retrain(false);

        assert_eq!(metrics.transactions_scored.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.anomalies_flagged.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.clustering_consultations.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.not_trained.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.retrains_completed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.retrains_failed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_score_buckets() {
        let metrics = PipelineMetrics::new();
        for score in [0.0, 0.05, 0.55, 1.0] {
            metrics.record_score(Duration::from_micros(10), score, false, false);
        }
        let dist = metrics.get_score_distribution();
        assert_eq!(dist[0], 2);
        assert_eq!(dist[5], 1);
        assert_eq!(dist[9], 1);
    }

    #[test]
    fn test_latency_stats() {
        let metrics = PipelineMetrics::new();
        assert_eq!(metrics.get_latency_stats(), LatencyStats::default());

        for us in 1..=100 {
            metrics.record_score(Duration::from_micros(us), 0.1, false, false);
        }
        let stats = metrics.get_latency_stats();
        assert_eq!(stats.count, 100);
        assert_eq!(stats.max_us, 100);
        assert_eq!(stats.p50_us, 51);
        assert_eq!(stats.p99_us, 100);
    }
}
