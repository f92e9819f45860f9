//! End-to-end scoring tests over the public API

use fraud_anomaly_engine::{
    AppConfig, EngineError, FeatureVector, FusionModel, InferenceEngine, TrainingOutcome,
    TransactionFeatures,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn normal<R: Rng>(rng: &mut R) -> FeatureVector {
    FeatureVector {
        amount: rng.gen_range(0.0..500.0),
        time_of_day: rng.gen_range(8..=20) as f64,
        day_of_week: rng.gen_range(0..7) as f64,
        user_transaction_count: rng.gen_range(5..25) as f64,
        user_average_amount: rng.gen_range(50.0..300.0),
        transaction_velocity: rng.gen_range(0.0..2.0),
        ..FeatureVector::default()
    }
}

fn outlier<R: Rng>(rng: &mut R) -> FeatureVector {
    FeatureVector {
        amount: rng.gen_range(2000.0..6000.0),
        time_of_day: rng.gen_range(0..6) as f64,
        day_of_week: rng.gen_range(0..7) as f64,
        user_transaction_count: rng.gen_range(0..3) as f64,
        user_average_amount: rng.gen_range(0.0..100.0),
        transaction_velocity: rng.gen_range(4.0..10.0),
        is_new_payment_method: 1.0,
        is_international: 1.0,
        is_high_risk_country: 0.0,
        merchant_category_risk: 1.0,
    }
}

fn training_set<R: Rng>(rng: &mut R) -> Vec<FeatureVector> {
    let mut data: Vec<FeatureVector> = (0..90).map(|_| normal(&mut *rng)).collect();
    data.extend((0..10).map(|_| outlier(&mut *rng)));
    data
}

fn seeded_training_set(seed: u64) -> Vec<FeatureVector> {
    training_set(&mut ChaCha8Rng::seed_from_u64(seed))
}

fn config(seed: u64) -> AppConfig {
    let mut config = AppConfig::default();
    config.training.seed = Some(seed);
    config.training.warm_start = false;
    config
}

/// Outlier-shaped but far beyond the training outliers' amount range
fn far_outlier() -> FeatureVector {
    FeatureVector::from_array([15000.0, 3.0, 6.0, 1.0, 40.0, 6.0, 1.0, 1.0, 0.0, 1.0])
}

#[test]
fn test_predict_before_train() {
    let model = FusionModel::new(&config(1));
    assert_eq!(model.predict(&normal(&mut ChaCha8Rng::seed_from_u64(1))), Err(EngineError::NotTrained));
}

// Fresh vectors drawn from the same bands as the training data. The forest
// always ranks an in-band outlier as suspicious, but the clustering stage
// often places it inside the cluster of training outliers, and then the
// disagreement damping keeps it below the final threshold. Only outliers the
// clustering stage also flags end up anomalous.
#[test]
fn test_in_band_vectors_over_seed_sweep() {
    let mut confirmed = 0;
    let mut damped = 0;

    for seed in 0..30u64 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let data = training_set(&mut rng);
        let mut model = FusionModel::new(&config(seed));
        let TrainingOutcome::Trained(report) = model.train(&data).unwrap() else {
            panic!("seed {}: training deferred", seed);
        };
        assert!(!report.degraded, "seed {}: {:?}", seed, report);

        let fresh_outlier = outlier(&mut rng);
        let fresh_normal = normal(&mut rng);
        let suspicious = model.predict(&fresh_outlier).unwrap();
        let ordinary = model.predict(&fresh_normal).unwrap();

        assert!(suspicious.if_score > 0.5, "seed {}: {:?}", seed, suspicious);
        assert!(suspicious.if_score > ordinary.if_score, "seed {}", seed);
        assert!(suspicious.risk_factors.iter().any(|f| f == "unusually high amount"));

        if suspicious.ahc_flag {
            assert!((suspicious.final_score - (suspicious.if_score * 1.2).min(1.0)).abs() < 1e-12);
            assert!(suspicious.is_anomaly, "seed {}: {:?}", seed, suspicious);
            confirmed += 1;
        } else {
            assert!((suspicious.final_score - suspicious.if_score * 0.8).abs() < 1e-12);
            damped += 1;
        }

        assert!(!ordinary.is_anomaly, "seed {}: {:?}", seed, ordinary);
        assert!(ordinary.risk_factors.iter().all(|f| f != "unusually high amount"));
    }

    assert!(confirmed > 0);
    assert!(damped > 0);
}

#[test]
fn test_far_outlier_is_flagged() {
    for seed in 0..10u64 {
        let mut model = FusionModel::new(&config(seed));
        model.train(&seeded_training_set(seed)).unwrap();

        let result = model.predict(&far_outlier()).unwrap();
        assert!(result.is_anomaly, "seed {}: {:?}", seed, result);
        assert!(result.ahc_flag);
        assert!(result.risk_factors.iter().any(|f| f == "unusually high amount"));
    }
}

#[test]
fn test_engine_scores_raw_transactions() {
    let engine = InferenceEngine::untrained(&config(99)).unwrap();
    engine.train(&seeded_training_set(99)).unwrap();

    let mut tx = TransactionFeatures::new("tx-e2e-1", "user-77", 15000.0);
    tx.time_of_day = 3.0;
    tx.day_of_week = 6.0;
    tx.user_transaction_count = 1.0;
    tx.user_average_amount = 40.0;
    tx.transaction_velocity = 6.0;
    tx.is_new_payment_method = true;
    tx.is_international = true;
    tx.merchant_category = Some("Gambling".to_string());

    let result = engine.score(&tx).unwrap();
    assert!(result.is_anomaly);
    assert_eq!(result.model_version, "2.0.0");

    let mut tx = TransactionFeatures::new("tx-e2e-2", "user-78", 220.0);
    tx.time_of_day = 14.0;
    tx.day_of_week = 2.0;
    tx.user_transaction_count = 12.0;
    tx.user_average_amount = 180.0;
    tx.transaction_velocity = 1.0;
    assert!(!engine.score(&tx).unwrap().is_anomaly);
}

#[test]
fn test_wrong_dimension_rejected_by_stages() {
    let mut model = FusionModel::new(&config(3));
    model.train(&seeded_training_set(3)).unwrap();
    let snapshot = model.snapshot().unwrap();

    assert_eq!(
        snapshot.forest().decision_score(&[1.0, 2.0]),
        Err(EngineError::DimensionMismatch { expected: 10, got: 2 })
    );
}
