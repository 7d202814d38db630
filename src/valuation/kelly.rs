//! Single-Leg Valuation: Expected Value and Kelly Sizing
//!
//! The Kelly Criterion determines the optimal fraction of bankroll to bet.
//! Formula: f* = (bp - q) / b
//! Where:
//!   f* = fraction of bankroll to bet
//!   b = net odds received on the bet (decimal odds - 1)
//!   p = probability of winning
//!   q = probability of losing (1 - p)
//!
//! Expanding the numerator gives `bp - q = p*d - 1`, which is exactly the
//! expected profit per unit stake, so `f* = ev / b`. Computing it that way
//! keeps `kelly > 0` and `ev > 0` in lockstep under floating point.
//!
//! Negative Kelly means "no edge": it is floored at 0, never a negative stake.
//! The result is capped at `kelly_cap` (100% of bankroll unless configured lower).

use serde::{Deserialize, Serialize};

use super::error::{ValuationError, ValuationResult};
use super::model::{CalibratedLeg, ValuedLeg};
use super::odds;

/// Kelly calculation parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KellyParams {
    /// Maximum bankroll fraction ever recommended, in (0, 1]
    pub kelly_cap: f64,
}

impl Default for KellyParams {
    fn default() -> Self {
        Self { kelly_cap: 1.0 }
    }
}

impl KellyParams {
    pub fn with_cap(kelly_cap: f64) -> Self {
        Self {
            kelly_cap: sanitize_cap(kelly_cap),
        }
    }
}

fn sanitize_cap(cap: f64) -> f64 {
    if cap.is_finite() && cap > 0.0 {
        cap.min(1.0)
    } else {
        1.0
    }
}

/// Expected profit per unit stake: a hit returns `d`, a miss returns 0.
#[inline]
pub fn expected_value(p: f64, decimal_odds: f64) -> f64 {
    p * decimal_odds - 1.0
}

/// Kelly fraction from an already computed EV, clamped to `[0, cap]`.
#[inline]
pub fn kelly_from_ev(ev: f64, decimal_odds: f64, cap: f64) -> f64 {
    let b = decimal_odds - 1.0;
    if b <= 0.0 {
        // Even a hit returns only the stake
        return 0.0;
    }
    (ev / b).max(0.0).min(cap)
}

/// Kelly fraction for probability `p` at decimal odds `d`.
#[inline]
pub fn kelly_fraction(p: f64, decimal_odds: f64, cap: f64) -> f64 {
    kelly_from_ev(expected_value(p, decimal_odds), decimal_odds, cap)
}

/// Values one calibrated leg against its quoted odds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleLegValuator {
    params: KellyParams,
}

impl SingleLegValuator {
    pub fn new(params: KellyParams) -> Self {
        Self {
            params: KellyParams::with_cap(params.kelly_cap),
        }
    }

    pub fn kelly_cap(&self) -> f64 {
        self.params.kelly_cap
    }

    /// `(ev, kelly_fraction)` for a probability and decimal odds.
    ///
    /// # Errors
    /// * `InvalidProbability` if `p` is not strictly inside (0, 1)
    /// * `InvalidOdds` if `decimal_odds < 1`
    pub fn evaluate(&self, p: f64, decimal_odds: f64) -> ValuationResult<(f64, f64)> {
        if !(p > 0.0 && p < 1.0) {
            return Err(ValuationError::invalid_probability(
                "p_hit",
                p,
                "calibrated probability must be strictly inside (0, 1)",
            ));
        }
        if !decimal_odds.is_finite() || decimal_odds < 1.0 {
            return Err(ValuationError::invalid_odds(
                "decimal_odds",
                decimal_odds,
                "decimal odds must be >= 1",
            ));
        }

        let ev = expected_value(p, decimal_odds);
        let kelly = kelly_from_ev(ev, decimal_odds, self.params.kelly_cap);
        Ok((ev, kelly))
    }

    pub fn value(&self, calibrated: CalibratedLeg) -> ValuationResult<ValuedLeg> {
        let (decimal_odds, implied_prob) = odds::normalize_american(calibrated.leg.odds)?;
        let (ev, kelly_fraction) = self.evaluate(calibrated.calibrated_p_hit, decimal_odds)?;

        Ok(ValuedLeg {
            calibrated,
            implied_prob,
            decimal_odds,
            ev,
            kelly_fraction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minus_110() -> f64 {
        odds::american_to_decimal(-110).unwrap()
    }

    #[test]
    fn test_kelly_with_edge() {
        let valuator = SingleLegValuator::default();

        // 55% on a -110 line
        let (ev, kelly) = valuator.evaluate(0.55, minus_110()).unwrap();

        assert!((ev - 0.05).abs() < 1e-9);
        assert!((kelly - 0.055).abs() < 1e-9);
    }

    #[test]
    fn test_kelly_no_edge() {
        let valuator = SingleLegValuator::default();

        // 45% on a -110 line => negative EV, no bet
        let (ev, kelly) = valuator.evaluate(0.45, minus_110()).unwrap();

        assert!(ev < 0.0);
        assert_eq!(kelly, 0.0);
    }

    #[test]
    fn test_kelly_respects_cap() {
        let valuator = SingleLegValuator::new(KellyParams::with_cap(0.10));

        // 90% at even money => full Kelly 0.8
        let (_, kelly) = valuator.evaluate(0.90, 2.0).unwrap();
        assert!((kelly - 0.10).abs() < 1e-12);
        assert!((kelly_fraction(0.90, 2.0, 1.0) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_cap_falls_back_to_full_bankroll() {
        assert_eq!(KellyParams::with_cap(0.0).kelly_cap, 1.0);
        assert_eq!(KellyParams::with_cap(f64::NAN).kelly_cap, 1.0);
        assert_eq!(KellyParams::with_cap(3.0).kelly_cap, 1.0);
    }

    #[test]
    fn test_even_payout_never_bets() {
        assert_eq!(kelly_fraction(0.99, 1.0, 1.0), 0.0);
    }

    #[test]
    fn test_rejects_boundary_probabilities() {
        let valuator = SingleLegValuator::default();
        assert!(valuator.evaluate(0.0, 2.0).is_err());
        assert!(valuator.evaluate(1.0, 2.0).is_err());
        assert!(valuator.evaluate(f64::NAN, 2.0).is_err());
    }

    #[test]
    fn test_rejects_decimal_below_one() {
        let err = SingleLegValuator::default().evaluate(0.5, 0.8).unwrap_err();
        assert_eq!(err.code(), "invalid_odds");
    }

    #[test]
    fn test_monotone_in_probability() {
        let valuator = SingleLegValuator::default();
        let d = minus_110();
        let mut last = valuator.evaluate(0.53, d).unwrap();
        for step in 1..40 {
            let p = 0.53 + step as f64 * 0.01;
            let next = valuator.evaluate(p, d).unwrap();
            assert!(next.0 > last.0);
            assert!(next.1 > last.1);
            last = next;
        }
    }
}
