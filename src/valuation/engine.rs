//! Valuation Engine
//!
//! Per-request pipeline:
//! 1. validate each leg's odds and probability input
//! 2. calibrate against one calibration snapshot for the whole request
//! 3. value each leg (EV, Kelly)
//! 4. for multi-leg entries, combine into a parlay valuation
//! 5. classify the final EV
//!
//! Pure and synchronous: no I/O, no locks, nothing awaited.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::error::{ValuationError, ValuationResult};
use super::kelly::{KellyParams, SingleLegValuator};
use super::model::{provider_key, Leg, Market, ParlayValuation, ValuedLeg};
use super::parlay::{CorrelationInput, ParlayCombiner, MIN_PARLAY_LEGS};
use super::recommendation::Recommendation;
use crate::calibration::{CalibrationAdjuster, CalibrationParams, CalibrationStore, CalibrationTable};
use crate::config::ValuationConfig;
use crate::projection::{NormalProjectionModel, ProbabilitySource};

/// One leg as supplied by a client, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegInput {
    #[serde(default)]
    pub player: String,
    #[serde(default)]
    pub market: Market,
    #[serde(default)]
    pub sportsbook: Option<String>,
    #[serde(default)]
    pub projection: Option<f64>,
    #[serde(default)]
    pub actual_or_estimate: Option<f64>,
    /// American odds; must be a non-zero whole number.
    pub odds: f64,
    /// Raw hit probability. When absent the probability source derives it.
    #[serde(default)]
    pub p_hit: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct SingleValuation {
    pub leg: ValuedLeg,
    pub recommendation: Recommendation,
}

#[derive(Debug, Clone)]
pub struct MultiLegValuation {
    pub legs: Vec<ValuedLeg>,
    pub parlay: ParlayValuation,
    pub recommendation: Recommendation,
    pub table_version: u64,
}

pub struct ValuationEngine {
    store: Arc<CalibrationStore>,
    adjuster: CalibrationAdjuster,
    valuator: SingleLegValuator,
    combiner: ParlayCombiner,
    source: Arc<dyn ProbabilitySource>,
}

impl ValuationEngine {
    pub fn new(
        store: Arc<CalibrationStore>,
        valuation: &ValuationConfig,
        calibration: CalibrationParams,
    ) -> Self {
        let kelly = KellyParams::with_cap(valuation.kelly_cap);
        Self {
            store,
            adjuster: CalibrationAdjuster::new(calibration),
            valuator: SingleLegValuator::new(kelly),
            combiner: ParlayCombiner::new(kelly, valuation.strict_correlation),
            source: Arc::new(NormalProjectionModel::default()),
        }
    }

    pub fn with_probability_source(mut self, source: Arc<dyn ProbabilitySource>) -> Self {
        self.source = source;
        self
    }

    pub fn store(&self) -> &Arc<CalibrationStore> {
        &self.store
    }

    pub fn kelly_cap(&self) -> f64 {
        self.valuator.kelly_cap()
    }

    /// Validate odds and resolve the raw probability. Odds are checked first,
    /// so a zero line never reaches the probability or EV steps.
    pub fn validate_leg(&self, input: &LegInput) -> ValuationResult<Leg> {
        let odds = parse_american(input.odds)?;

        let raw_p_hit = match input.p_hit {
            Some(p) => p,
            None => self.source.raw_probability(input),
        };
        if !raw_p_hit.is_finite() || !(0.0..=1.0).contains(&raw_p_hit) {
            return Err(ValuationError::invalid_probability(
                "p_hit",
                raw_p_hit,
                "must be within [0, 1]",
            ));
        }

        Ok(Leg {
            player: input.player.trim().to_string(),
            market: input.market,
            sportsbook: input
                .sportsbook
                .as_deref()
                .map(provider_key)
                .unwrap_or_else(|| provider_key("")),
            projection: input.projection,
            actual_or_estimate: input.actual_or_estimate,
            odds,
            raw_p_hit,
        })
    }

    fn value_with(&self, table: &CalibrationTable, input: &LegInput) -> ValuationResult<ValuedLeg> {
        let leg = self.validate_leg(input)?;
        let calibrated = self.adjuster.calibrate(table, leg);
        self.valuator.value(calibrated)
    }

    /// Value a single wager.
    pub fn value_single(&self, input: &LegInput) -> ValuationResult<SingleValuation> {
        let table = self.store.snapshot();
        let leg = self.value_with(&table, input)?;
        let recommendation = Recommendation::classify(leg.ev);

        debug!(
            player = %leg.calibrated.leg.player,
            market = %leg.calibrated.leg.market,
            provider = %leg.calibrated.leg.sportsbook,
            p_hit = leg.p_hit(),
            ev = leg.ev,
            kelly = leg.kelly_fraction,
            table_version = table.version(),
            "Valued single leg"
        );

        Ok(SingleValuation {
            leg,
            recommendation,
        })
    }

    /// Value a multi-leg entry. Fewer than two legs is an error, never a
    /// degenerate single-leg valuation.
    pub fn value_multi_leg(
        &self,
        inputs: &[LegInput],
        correlation: Option<CorrelationInput>,
    ) -> ValuationResult<MultiLegValuation> {
        if inputs.len() < MIN_PARLAY_LEGS {
            return Err(ValuationError::InsufficientLegs {
                required: MIN_PARLAY_LEGS,
                got: inputs.len(),
            });
        }

        let table = self.store.snapshot();
        let legs = inputs
            .iter()
            .enumerate()
            .map(|(i, input)| {
                self.value_with(&table, input)
                    .map_err(|e| e.at(&format!("legs[{i}]")))
            })
            .collect::<ValuationResult<Vec<_>>>()?;

        let parlay = self.combiner.combine(&legs, correlation)?;
        let recommendation = Recommendation::classify(parlay.combined_ev);

        debug!(
            legs = legs.len(),
            joint = parlay.joint_probability,
            correlation_applied = parlay.correlation_applied,
            combined_ev = parlay.combined_ev,
            positive = recommendation.is_positive(),
            table_version = table.version(),
            "Valued multi-leg entry"
        );

        Ok(MultiLegValuation {
            legs,
            parlay,
            recommendation,
            table_version: table.version(),
        })
    }
}

/// American odds must be a finite, non-zero whole number in i32 range.
fn parse_american(raw: f64) -> ValuationResult<i32> {
    if !raw.is_finite() || raw.fract() != 0.0 {
        return Err(ValuationError::invalid_odds(
            "odds",
            raw,
            "american odds must be a whole number",
        ));
    }
    if raw == 0.0 {
        return Err(ValuationError::invalid_odds(
            "odds",
            raw,
            "american odds cannot be zero",
        ));
    }
    if raw.abs() > i32::MAX as f64 {
        return Err(ValuationError::invalid_odds("odds", raw, "out of range"));
    }
    Ok(raw as i32)
}
