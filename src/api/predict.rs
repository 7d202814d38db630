//! `/api/predict` and `/api/multi-leg`.
//!
//! Handlers only translate between the wire schema and the engine; every
//! number is computed by `ValuationEngine` against one calibration snapshot.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ApiResult;
use super::AppState;
use crate::valuation::{
    CalibrationRef, CorrelationInput, LegInput, Market, MultiLegValuation, Recommendation,
    SingleValuation, ValuedLeg,
};

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(flatten)]
    pub leg: LegInput,
    /// Echoed back untouched; single-leg valuation has nothing to correlate.
    #[serde(default)]
    pub correlations: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct MultiLegRequest {
    #[serde(default)]
    pub legs: Vec<LegInput>,
    /// Kept as raw JSON so an unreadable matrix degrades to independence
    /// instead of rejecting the whole request.
    #[serde(default)]
    pub correlation_matrix: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct PredictionView {
    pub player: String,
    pub market: Market,
    pub sportsbook: String,
    pub p_hit: f64,
    pub p_hit_pct: f64,
    pub raw_p_hit: f64,
}

#[derive(Debug, Serialize)]
pub struct ValuationView {
    pub odds: i32,
    pub decimal_odds: f64,
    pub implied_prob: f64,
    pub implied_prob_pct: f64,
    pub ev: f64,
    pub ev_pct: f64,
    pub kelly_fraction: f64,
    pub kelly_pct: f64,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub success: bool,
    pub prediction: PredictionView,
    pub valuation: ValuationView,
    pub confidence: f64,
    pub calibration: CalibrationRef,
    pub recommendation: Recommendation,
    pub correlations: Vec<Value>,
}

/// Per-leg entry of a multi-leg response.
#[derive(Debug, Serialize)]
pub struct LegView {
    #[serde(flatten)]
    pub prediction: PredictionView,
    #[serde(flatten)]
    pub valuation: ValuationView,
    pub confidence: f64,
    pub calibration: CalibrationRef,
}

#[derive(Debug, Serialize)]
pub struct MultiLegView {
    pub num_legs: usize,
    pub joint_probability_independent: f64,
    pub joint_probability: f64,
    pub joint_probability_pct: f64,
    pub correlation_applied: bool,
    pub combined_decimal_odds: f64,
    pub combined_ev: f64,
    pub combined_ev_pct: f64,
    pub combined_kelly_fraction: f64,
    pub combined_kelly_pct: f64,
}

#[derive(Debug, Serialize)]
pub struct MultiLegResponse {
    pub success: bool,
    pub multi_leg: MultiLegView,
    pub legs: Vec<LegView>,
    pub recommendation: Recommendation,
    pub warnings: Vec<String>,
}

#[inline]
fn round_to(x: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (x * scale).round() / scale
}

/// Probabilities, EV, Kelly and decimal odds go out at 4 dp.
#[inline]
fn r4(x: f64) -> f64 {
    round_to(x, 4)
}

/// Percent view of a fraction, 2 dp.
#[inline]
fn pct(x: f64) -> f64 {
    round_to(x * 100.0, 2)
}

fn prediction_view(leg: &ValuedLeg) -> PredictionView {
    let inner = &leg.calibrated.leg;
    PredictionView {
        player: inner.player.clone(),
        market: inner.market,
        sportsbook: inner.sportsbook.clone(),
        p_hit: r4(leg.p_hit()),
        p_hit_pct: pct(leg.p_hit()),
        raw_p_hit: r4(inner.raw_p_hit),
    }
}

fn valuation_view(leg: &ValuedLeg) -> ValuationView {
    ValuationView {
        odds: leg.calibrated.leg.odds,
        decimal_odds: r4(leg.decimal_odds),
        implied_prob: r4(leg.implied_prob),
        implied_prob_pct: pct(leg.implied_prob),
        ev: r4(leg.ev),
        ev_pct: pct(leg.ev),
        kelly_fraction: r4(leg.kelly_fraction),
        kelly_pct: pct(leg.kelly_fraction),
    }
}

impl PredictResponse {
    pub fn new(valuation: SingleValuation, correlations: Vec<Value>) -> Self {
        let leg = &valuation.leg;
        Self {
            success: true,
            prediction: prediction_view(leg),
            valuation: valuation_view(leg),
            confidence: r4(leg.calibrated.confidence),
            calibration: leg.calibrated.calibration,
            recommendation: valuation.recommendation,
            correlations,
        }
    }
}

impl From<&ValuedLeg> for LegView {
    fn from(leg: &ValuedLeg) -> Self {
        Self {
            prediction: prediction_view(leg),
            valuation: valuation_view(leg),
            confidence: r4(leg.calibrated.confidence),
            calibration: leg.calibrated.calibration,
        }
    }
}

impl From<MultiLegValuation> for MultiLegResponse {
    fn from(valuation: MultiLegValuation) -> Self {
        let parlay = &valuation.parlay;
        Self {
            success: true,
            multi_leg: MultiLegView {
                num_legs: valuation.legs.len(),
                joint_probability_independent: r4(parlay.joint_probability_independent),
                joint_probability: r4(parlay.joint_probability),
                joint_probability_pct: pct(parlay.joint_probability),
                correlation_applied: parlay.correlation_applied,
                combined_decimal_odds: r4(parlay.combined_decimal_odds),
                combined_ev: r4(parlay.combined_ev),
                combined_ev_pct: pct(parlay.combined_ev),
                combined_kelly_fraction: r4(parlay.combined_kelly_fraction),
                combined_kelly_pct: pct(parlay.combined_kelly_fraction),
            },
            legs: valuation.legs.iter().map(LegView::from).collect(),
            recommendation: valuation.recommendation,
            warnings: valuation.parlay.warnings,
        }
    }
}

/// POST /api/predict
pub async fn post_predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> ApiResult<PredictResponse> {
    let Json(req) = payload?;
    let valuation = state.engine.value_single(&req.leg)?;
    Ok(Json(PredictResponse::new(valuation, req.correlations)))
}

/// POST /api/multi-leg
pub async fn post_multi_leg(
    State(state): State<AppState>,
    payload: Result<Json<MultiLegRequest>, JsonRejection>,
) -> ApiResult<MultiLegResponse> {
    let Json(req) = payload?;
    let correlation = req.correlation_matrix.and_then(CorrelationInput::from_json);
    let valuation = state.engine.value_multi_leg(&req.legs, correlation)?;
    Ok(Json(MultiLegResponse::from(valuation)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounding() {
        assert_eq!(r4(1.909_090_909), 1.9091);
        assert_eq!(r4(0.523_809_52), 0.5238);
        assert_eq!(pct(0.055), 5.5);
        assert_eq!(pct(0.421_405), 42.14);
        assert_eq!(pct(-0.047_6), -4.76);
    }

    #[test]
    fn test_predict_request_flattens_leg() {
        let req: PredictRequest = serde_json::from_str(
            r#"{"sportsbook":"FanDuel","market":"rushing_yards","player":"Derrick Henry",
                "projection":95.5,"actual_or_estimate":104.0,"odds":-115,"correlations":[]}"#,
        )
        .unwrap();
        assert_eq!(req.leg.market, Market::RushingYards);
        assert_eq!(req.leg.odds, -115.0);
        assert_eq!(req.leg.p_hit, None);
        assert!(req.correlations.is_empty());
    }

    #[test]
    fn test_multi_leg_request_null_matrix() {
        let req: MultiLegRequest = serde_json::from_str(
            r#"{"legs":[{"market":"passing_yards","p_hit":0.6,"odds":-110}],"correlation_matrix":null}"#,
        )
        .unwrap();
        assert_eq!(req.legs.len(), 1);
        assert!(req.correlation_matrix.is_none());
    }

    #[test]
    fn test_multi_leg_request_from_browser_form() {
        let req: MultiLegRequest = serde_json::from_str(
            r#"{"legs":[{"player":"A","p_hit":0.6,"odds":-110},{"player":"B","p_hit":0.65,"odds":-110}],
                "correlation_matrix":[[1.0,null],[null,1.0]]}"#,
        )
        .unwrap();
        assert!(req.legs.iter().all(|l| l.market == Market::PassingYards));
        assert!(matches!(
            req.correlation_matrix.and_then(CorrelationInput::from_json),
            Some(CorrelationInput::Unreadable(_))
        ));
    }
}
