//! Randomised sweeps over the pricing math.
//!
//! Seeded so a failure reproduces exactly.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use propedge_backend::{
    calibration::{CalibrationParams, CalibrationStore},
    config::ValuationConfig,
    valuation::{
        kelly::{expected_value, kelly_fraction},
        odds::{american_to_decimal, decimal_to_american, implied_probability},
        parlay::{correlated_joint, independent_joint, CorrelationMatrix},
        LegInput, Market,
    },
    ValuationEngine,
};

const SEED: u64 = 0x5eed_0dd5;
const ROUNDS: usize = 2_000;

fn rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(SEED)
}

fn random_american(rng: &mut ChaCha8Rng) -> i32 {
    let magnitude = rng.gen_range(100..=5_000);
    if rng.gen_bool(0.5) {
        magnitude
    } else {
        -magnitude
    }
}

fn engine() -> ValuationEngine {
    ValuationEngine::new(
        CalibrationStore::new(10),
        &ValuationConfig::default(),
        CalibrationParams::default(),
    )
}

fn leg(p: f64, odds: i32) -> LegInput {
    LegInput {
        player: String::new(),
        market: Market::ReceivingYards,
        sportsbook: None,
        projection: None,
        actual_or_estimate: None,
        odds: f64::from(odds),
        p_hit: Some(p),
    }
}

#[test]
fn test_odds_round_trip_implied_times_decimal_is_one() {
    let mut rng = rng();
    for _ in 0..ROUNDS {
        let odds = random_american(&mut rng);
        let d = american_to_decimal(odds).unwrap();
        let p = implied_probability(d).unwrap();
        assert!(d >= 1.0, "decimal {d} for {odds}");
        assert!((p * d - 1.0).abs() < 1e-12, "odds {odds}");

        let back = decimal_to_american(d).unwrap();
        assert!((back - f64::from(odds)).abs() < 1e-6, "odds {odds} -> {back}");
    }
}

#[test]
fn test_kelly_bounded_and_positive_iff_edge() {
    let mut rng = rng();
    for _ in 0..ROUNDS {
        let p: f64 = rng.gen_range(0.001..0.999);
        let d: f64 = rng.gen_range(1.0..15.0);
        let cap: f64 = rng.gen_range(0.01..=1.0);

        let ev = expected_value(p, d);
        let k = kelly_fraction(p, d, cap);
        assert!(k >= 0.0 && k <= cap, "p={p} d={d} cap={cap} k={k}");
        assert_eq!(k > 0.0, ev > 0.0, "p={p} d={d} ev={ev} k={k}");
    }
}

#[test]
fn test_even_money_never_bets() {
    for p in [0.01, 0.5, 0.99] {
        assert_eq!(kelly_fraction(p, 1.0, 1.0), 0.0);
    }
}

#[test]
fn test_ev_and_kelly_monotone_in_probability() {
    let mut rng = rng();
    for _ in 0..ROUNDS {
        let d: f64 = rng.gen_range(1.05..10.0);
        let lo: f64 = rng.gen_range(0.01..0.98);
        let hi: f64 = rng.gen_range((lo + 1e-6)..0.99);

        assert!(expected_value(hi, d) > expected_value(lo, d));

        let (k_lo, k_hi) = (kelly_fraction(lo, d, 1.0), kelly_fraction(hi, d, 1.0));
        assert!(k_hi >= k_lo);
        if expected_value(lo, d) > 0.0 {
            assert!(k_hi > k_lo, "d={d} lo={lo} hi={hi}");
        }
    }
}

#[test]
fn test_zero_matrix_gives_strict_product() {
    let engine = engine();
    let mut rng = rng();
    for legs in 2..=8 {
        let probs: Vec<f64> = (0..legs).map(|_| rng.gen_range(0.05..0.95)).collect();
        let inputs: Vec<LegInput> = probs
            .iter()
            .map(|&p| leg(p, random_american(&mut rng)))
            .collect();

        let zeros = vec![vec![0.0; legs]; legs];
        let out = engine.value_multi_leg(&inputs, Some(zeros.into())).unwrap();
        let product: f64 = probs.iter().product();

        assert!((out.parlay.joint_probability - product).abs() < 1e-12);
        assert!((out.parlay.joint_probability_independent - product).abs() < 1e-12);
    }
}

#[test]
fn test_identity_matrix_applies_and_matches_product() {
    let mut rng = rng();
    for legs in 2..=6 {
        let probs: Vec<f64> = (0..legs).map(|_| rng.gen_range(0.05..0.95)).collect();
        let identity: Vec<Vec<f64>> = (0..legs)
            .map(|i| (0..legs).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
            .collect();
        let matrix = CorrelationMatrix::new(identity, legs).unwrap();
        assert!((correlated_joint(&probs, &matrix) - independent_joint(&probs)).abs() < 1e-15);
    }
}

#[test]
fn test_joint_probability_always_clamped() {
    let mut rng = rng();
    for _ in 0..ROUNDS {
        let legs = rng.gen_range(2..=6);
        let probs: Vec<f64> = (0..legs).map(|_| rng.gen_range(0.0001..0.9999)).collect();

        let mut rows = vec![vec![1.0; legs]; legs];
        for i in 0..legs {
            for j in (i + 1)..legs {
                let rho = if rng.gen_bool(0.3) {
                    if rng.gen_bool(0.5) { 1.0 } else { -1.0 }
                } else {
                    rng.gen_range(-1.0..=1.0)
                };
                rows[i][j] = rho;
                rows[j][i] = rho;
            }
        }

        let matrix = CorrelationMatrix::new(rows, legs).unwrap();
        let joint = correlated_joint(&probs, &matrix);
        assert!((0.0..=1.0).contains(&joint), "joint {joint} for {probs:?}");
    }
}

#[test]
fn test_adversarial_full_correlation_through_engine() {
    let engine = engine();
    let inputs: Vec<LegInput> = (0..6).map(|_| leg(0.95, -1000)).collect();
    let ones = vec![vec![1.0; 6]; 6];

    let out = engine.value_multi_leg(&inputs, Some(ones.into())).unwrap();
    assert!(out.parlay.correlation_applied);
    assert!(out.parlay.joint_probability <= 1.0);
    assert!(out.parlay.joint_probability >= out.parlay.joint_probability_independent);
    assert!(out.parlay.combined_kelly_fraction <= engine.kelly_cap());
}
