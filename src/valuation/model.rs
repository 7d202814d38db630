//! Leg and valuation data model.
//!
//! Each stage wraps the previous one: `Leg` -> `CalibratedLeg` -> `ValuedLeg`.
//! Nothing is mutated after construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Player prop market. Legs that omit it are passing-yards props.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    #[default]
    PassingYards,
    ReceivingYards,
    RushingYards,
    PassingTouchdowns,
    ReceivingTouchdowns,
    RushingTouchdowns,
}

impl Market {
    pub const ALL: [Market; 6] = [
        Market::PassingYards,
        Market::ReceivingYards,
        Market::RushingYards,
        Market::PassingTouchdowns,
        Market::ReceivingTouchdowns,
        Market::RushingTouchdowns,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Market::PassingYards => "passing_yards",
            Market::ReceivingYards => "receiving_yards",
            Market::RushingYards => "rushing_yards",
            Market::PassingTouchdowns => "passing_touchdowns",
            Market::ReceivingTouchdowns => "receiving_touchdowns",
            Market::RushingTouchdowns => "rushing_touchdowns",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Market::PassingYards => "Passing Yards",
            Market::ReceivingYards => "Receiving Yards",
            Market::RushingYards => "Rushing Yards",
            Market::PassingTouchdowns => "Passing Touchdowns",
            Market::ReceivingTouchdowns => "Receiving Touchdowns",
            Market::RushingTouchdowns => "Rushing Touchdowns",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Market {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Market::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == needle)
            .ok_or_else(|| format!("unknown market '{s}'"))
    }
}

/// Provider id used when a request does not name its sportsbook.
pub const UNKNOWN_PROVIDER: &str = "unknown";

/// Normalised provider key (calibration rows are stored lowercase).
pub fn provider_key(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        UNKNOWN_PROVIDER.to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

/// A validated wager leg as received.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leg {
    pub player: String,
    pub market: Market,
    pub sportsbook: String,
    pub projection: Option<f64>,
    pub actual_or_estimate: Option<f64>,
    /// American odds, never zero.
    pub odds: i32,
    /// Raw model probability in [0, 1]; calibration clamps it strictly inside.
    pub raw_p_hit: f64,
}

/// Where a calibrated probability came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationRef {
    /// True when a historical bucket actually moved the probability.
    pub applied: bool,
    pub table_version: u64,
    pub bucket: Option<usize>,
    pub sample_size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibratedLeg {
    pub leg: Leg,
    pub calibrated_p_hit: f64,
    /// In [0, 1].
    pub confidence: f64,
    pub calibration: CalibrationRef,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuedLeg {
    pub calibrated: CalibratedLeg,
    pub implied_prob: f64,
    /// Never below `odds::MIN_DECIMAL_ODDS`.
    pub decimal_odds: f64,
    pub ev: f64,
    pub kelly_fraction: f64,
}

impl ValuedLeg {
    pub fn p_hit(&self) -> f64 {
        self.calibrated.calibrated_p_hit
    }
}

/// Combined valuation of a multi-leg entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParlayValuation {
    /// Strict product of leg probabilities.
    pub joint_probability_independent: f64,
    /// Probability used for EV and Kelly (correlation-adjusted when applied).
    pub joint_probability: f64,
    pub correlation_applied: bool,
    pub combined_decimal_odds: f64,
    pub combined_ev: f64,
    pub combined_kelly_fraction: f64,
    /// Non-fatal notes, e.g. a malformed correlation matrix that was ignored.
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_round_trips_through_str() {
        for m in Market::ALL {
            assert_eq!(m.as_str().parse::<Market>().unwrap(), m);
        }
        assert_eq!(" Rushing_Yards ".parse::<Market>().unwrap(), Market::RushingYards);
        assert!("longest_reception".parse::<Market>().is_err());
    }

    #[test]
    fn test_market_serde_is_snake_case() {
        let json = serde_json::to_string(&Market::ReceivingTouchdowns).unwrap();
        assert_eq!(json, "\"receiving_touchdowns\"");
    }

    #[test]
    fn test_provider_key() {
        assert_eq!(provider_key(" DraftKings "), "draftkings");
        assert_eq!(provider_key(""), UNKNOWN_PROVIDER);
    }
}
