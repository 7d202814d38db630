//! Raw hit-probability sources.
//!
//! The statistical model that turns a projection into a probability lives
//! upstream; the engine only needs `ProbabilitySource`. A `p_hit` supplied on
//! the request always takes precedence over any source.

use statrs::distribution::{ContinuousCDF, Normal};

use crate::valuation::engine::LegInput;

pub trait ProbabilitySource: Send + Sync {
    /// Raw probability that the leg hits, in [0, 1].
    fn raw_probability(&self, leg: &LegInput) -> f64;
}

/// Normal error model around the projection.
///
/// With `diff = actual_or_estimate - projection` and `sd = sd_ratio * projection`,
/// the hit probability is `P(X > 0)` for `X ~ Normal(diff, sd)`, clipped to
/// `[floor, 1 - floor]`. Without a positive projection and a finite estimate
/// it returns the baseline.
#[derive(Debug, Clone, Copy)]
pub struct NormalProjectionModel {
    pub sd_ratio: f64,
    pub floor: f64,
    pub baseline: f64,
}

impl Default for NormalProjectionModel {
    fn default() -> Self {
        Self {
            sd_ratio: 0.15,
            floor: 0.05,
            baseline: 0.5,
        }
    }
}

impl NormalProjectionModel {
    pub fn probability(&self, projection: Option<f64>, actual_or_estimate: Option<f64>) -> f64 {
        let Some(projection) = projection.filter(|p| p.is_finite() && *p > 0.0) else {
            return self.baseline;
        };
        let Some(actual) = actual_or_estimate.filter(|a| a.is_finite()) else {
            return self.baseline;
        };

        let diff = actual - projection;
        let sd = projection * self.sd_ratio;
        let Ok(dist) = Normal::new(diff, sd) else {
            return self.baseline;
        };

        let p = 1.0 - dist.cdf(0.0);
        if p.is_finite() {
            p.clamp(self.floor, 1.0 - self.floor)
        } else {
            self.baseline
        }
    }
}

impl ProbabilitySource for NormalProjectionModel {
    fn raw_probability(&self, leg: &LegInput) -> f64 {
        self.probability(leg.projection, leg.actual_or_estimate)
    }
}
