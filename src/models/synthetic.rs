//! Synthetic transaction vectors for warm-starting an empty engine.

use crate::feature_extractor::FeatureVector;
use rand::Rng;

fn flag<R: Rng + ?Sized>(rng: &mut R, p: f64) -> f64 {
    if rng.gen_bool(p) {
        1.0
    } else {
        0.0
    }
}

/// Everyday spending: small amounts, established users, rare risk flags.
pub fn normal_vector<R: Rng + ?Sized>(rng: &mut R) -> FeatureVector {
    FeatureVector {
        amount: rng.gen_range(0.0..500.0),
        time_of_day: f64::from(rng.gen_range(0u8..24)),
        day_of_week: f64::from(rng.gen_range(0u8..7)),
        user_transaction_count: f64::from(rng.gen_range(0u32..20)),
        user_average_amount: rng.gen_range(0.0..300.0),
        transaction_velocity: rng.gen_range(0.0..3.0),
        is_new_payment_method: flag(rng, 0.2),
        is_international: flag(rng, 0.1),
        is_high_risk_country: flag(rng, 0.05),
        merchant_category_risk: flag(rng, 0.1),
    }
}

/// Fraud-shaped activity: large night-time purchases on a fresh card.
pub fn anomalous_vector<R: Rng + ?Sized>(rng: &mut R) -> FeatureVector {
    FeatureVector {
        amount: rng.gen_range(1000.0..6000.0),
        time_of_day: f64::from(rng.gen_range(0u8..6)),
        day_of_week: 6.0,
        user_transaction_count: f64::from(rng.gen_range(0u32..3)),
        user_average_amount: rng.gen_range(0.0..100.0),
        transaction_velocity: rng.gen_range(0.0..10.0),
        is_new_payment_method: 1.0,
        is_international: 1.0,
        is_high_risk_country: flag(rng, 0.5),
        merchant_category_risk: 1.0,
    }
}

/// `normal` ordinary vectors followed by `anomalous` fraud-shaped ones.
pub fn warm_start_dataset<R: Rng + ?Sized>(
    rng: &mut R,
    normal: usize,
    anomalous: usize,
) -> Vec<FeatureVector> {
    let mut data = Vec::with_capacity(normal + anomalous);
    data.extend((0..normal).map(|_| normal_vector(rng)));
    data.extend((0..anomalous).map(|_| anomalous_vector(rng)));
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_dataset_shape() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let data = warm_start_dataset(&mut rng, 100, 10);
        assert_eq!(data.len(), 110);

        for v in &data[..100] {
            assert!(v.amount < 500.0);
            assert!(v.transaction_velocity < 3.0);
        }
        for v in &data[100..] {
            assert!(v.amount >= 1000.0);
            assert!(v.time_of_day < 6.0);
            assert_eq!(v.is_new_payment_method, 1.0);
            assert_eq!(v.merchant_category_risk, 1.0);
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = warm_start_dataset(&mut ChaCha8Rng::seed_from_u64(9), 5, 2);
        let b = warm_start_dataset(&mut ChaCha8Rng::seed_from_u64(9), 5, 2);
        assert_eq!(a, b);
    }
}
