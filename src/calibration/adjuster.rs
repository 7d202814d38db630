//! Calibration Adjuster
//!
//! Blends a raw model probability toward the historical hit rate of the
//! matching (provider, market, bucket):
//!
//! ```text
//! calibrated = p + shrink(n) * (hit_rate - p),   shrink(n) = n / (n + k)
//! confidence = shrink(n) * (1 - brier)
//! ```
//!
//! Sparse or missing buckets leave `p` untouched with a fixed low confidence.

use serde::{Deserialize, Serialize};

use super::table::CalibrationTable;
use crate::valuation::model::{provider_key, CalibratedLeg, CalibrationRef, Leg};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibrationParams {
    /// Buckets with fewer graded outcomes are ignored.
    #[serde(default = "default_min_sample_size")]
    pub min_sample_size: u64,
    /// Pseudo-count `k`: a bucket with `k` outcomes gets half weight.
    #[serde(default = "default_prior_strength")]
    pub prior_strength: f64,
    /// Confidence reported when no usable bucket exists.
    #[serde(default = "default_confidence")]
    pub default_confidence: f64,
    /// Output probabilities are clamped to [epsilon, 1 - epsilon].
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
}

fn default_min_sample_size() -> u64 {
    30
}
fn default_prior_strength() -> f64 {
    50.0
}
fn default_confidence() -> f64 {
    0.2
}
fn default_epsilon() -> f64 {
    1e-4
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            min_sample_size: default_min_sample_size(),
            prior_strength: default_prior_strength(),
            default_confidence: default_confidence(),
            epsilon: default_epsilon(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CalibrationAdjuster {
    params: CalibrationParams,
}

impl CalibrationAdjuster {
    pub fn new(params: CalibrationParams) -> Self {
        let epsilon = if params.epsilon.is_finite() && params.epsilon > 0.0 && params.epsilon < 0.5 {
            params.epsilon
        } else {
            default_epsilon()
        };
        Self {
            params: CalibrationParams {
                epsilon,
                prior_strength: params.prior_strength.max(0.0),
                default_confidence: params.default_confidence.clamp(0.0, 1.0),
                ..params
            },
        }
    }

    pub fn params(&self) -> &CalibrationParams {
        &self.params
    }

    /// Weight on the empirical rate, rising from 0 toward 1 with sample size.
    pub fn shrink(&self, sample_size: u64) -> f64 {
        let n = sample_size as f64;
        let denom = n + self.params.prior_strength;
        if denom <= 0.0 {
            return 0.0;
        }
        n / denom
    }

    /// Confidence in [0, 1]: more samples and a lower Brier score score higher.
    pub fn confidence(&self, sample_size: u64, brier_score: f64) -> f64 {
        let skill = (1.0 - brier_score).clamp(0.0, 1.0);
        (self.shrink(sample_size) * skill).clamp(0.0, 1.0)
    }

    /// Clamp strictly inside (0, 1).
    pub fn clamp_probability(&self, p: f64) -> f64 {
        let eps = self.params.epsilon;
        p.clamp(eps, 1.0 - eps)
    }

    pub fn calibrate(&self, table: &CalibrationTable, leg: Leg) -> CalibratedLeg {
        let raw = self.clamp_probability(leg.raw_p_hit);
        let provider = provider_key(&leg.sportsbook);

        let usable = table
            .lookup(&provider, leg.market, raw)
            .filter(|(_, stats)| stats.sample_size >= self.params.min_sample_size.max(1));

        let (calibrated_p_hit, confidence, calibration) = match usable {
            Some((bucket, stats)) => {
                let weight = self.shrink(stats.sample_size);
                let blended = raw + weight * (stats.historical_hit_rate - raw);
                (
                    self.clamp_probability(blended),
                    self.confidence(stats.sample_size, stats.brier_score),
                    CalibrationRef {
                        applied: true,
                        table_version: table.version(),
                        bucket: Some(bucket),
                        sample_size: stats.sample_size,
                    },
                )
            }
            None => (
                raw,
                self.params.default_confidence,
                CalibrationRef {
                    applied: false,
                    table_version: table.version(),
                    bucket: None,
                    sample_size: table
                        .lookup(&provider, leg.market, raw)
                        .map_or(0, |(_, s)| s.sample_size),
                },
            ),
        };

        CalibratedLeg {
            leg,
            calibrated_p_hit,
            confidence,
            calibration,
        }
    }
}
