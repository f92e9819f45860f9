//! Retraining cadence for the streaming service

use crate::error::Result;
use crate::feature_extractor::FeatureVector;
use crate::models::fusion::TrainingOutcome;
use crate::models::inference::InferenceEngine;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};

/// Buffers scored vectors and hands them out for retraining once the service
/// has seen more than `floor` records in total.
///
/// At most one batch is out at a time. Vectors recorded while a retrain is
/// running are held for the next one.
#[derive(Debug)]
pub struct RetrainScheduler {
    floor: usize,
    recorded: usize,
    pending: Vec<FeatureVector>,
    in_flight: bool,
}

impl RetrainScheduler {
    pub fn new(floor: usize) -> Self {
        Self {
            floor,
            recorded: 0,
            pending: Vec::new(),
            in_flight: false,
        }
    }

    /// Total records seen since startup
    pub fn recorded(&self) -> usize {
        self.recorded
    }

    /// Records waiting for the next retrain
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Record a scored vector. Returns the accumulated batch when a retrain
    /// is due; the caller must call [`complete`](Self::complete) once it has
    /// finished.
    pub fn record(&mut self, features: FeatureVector) -> Option<Vec<FeatureVector>> {
        self.recorded += 1;
        self.pending.push(features);

        if self.recorded > self.floor && !self.in_flight {
            self.in_flight = true;
            Some(std::mem::take(&mut self.pending))
        } else {
            None
        }
    }

    /// Mark the outstanding retrain as finished
    pub fn complete(&mut self) {
        self.in_flight = false;
    }
}

/// Handle to a scheduled retrain, resolving to the blocking task's outcome
pub type RetrainHandle = JoinHandle<std::result::Result<Result<TrainingOutcome>, JoinError>>;

/// Start a due batch on the blocking pool and release `scheduler` when it
/// finishes. The release does not depend on anyone awaiting the handle.
pub fn spawn_scheduled(
    engine: &Arc<InferenceEngine>,
    scheduler: &Arc<Mutex<RetrainScheduler>>,
    batch: Vec<FeatureVector>,
) -> RetrainHandle {
    let retrain = engine.spawn_retrain(batch);
    let scheduler = Arc::clone(scheduler);
    tokio::spawn(async move {
        let outcome = retrain.await;
        scheduler.lock().complete();
        outcome
    })
}
