//! Odds Conversion
//!
//! American odds quote the profit on a 100 stake (`+150`) or the stake needed
//! to profit 100 (`-110`). Decimal odds are the full payout multiple per unit
//! staked, stake included. Implied probability is `1 / decimal`.
//!
//! Only a single side of the market is quoted, so no vig is backed out: the
//! implied probability here carries the book's margin.

use super::error::{ValuationError, ValuationResult};

/// Shortest quotable price; every decimal odds value is at least this.
pub const MIN_DECIMAL_ODDS: f64 = 1.01;

/// Longest favourite line, `1 + 100 / 10000 = 1.01`.
pub const MIN_AMERICAN_ODDS: i32 = -10_000;

/// American odds -> decimal odds.
pub fn american_to_decimal(american: i32) -> ValuationResult<f64> {
    if american == 0 {
        return Err(ValuationError::invalid_odds(
            "odds",
            0.0,
            "american odds cannot be zero",
        ));
    }
    if american < MIN_AMERICAN_ODDS {
        return Err(ValuationError::invalid_odds(
            "odds",
            american as f64,
            "decimal odds would fall below 1.01",
        ));
    }

    let o = american as f64;
    let decimal = if american > 0 {
        1.0 + o / 100.0
    } else {
        1.0 + 100.0 / o.abs()
    };
    Ok(decimal)
}

/// Implied probability of a decimal quote (no margin removal).
pub fn implied_probability(decimal: f64) -> ValuationResult<f64> {
    if !decimal.is_finite() || decimal < 1.0 {
        return Err(ValuationError::invalid_odds(
            "decimal_odds",
            decimal,
            "decimal odds must be >= 1",
        ));
    }
    Ok(1.0 / decimal)
}

/// American odds -> (decimal odds, implied probability).
pub fn normalize_american(american: i32) -> ValuationResult<(f64, f64)> {
    let decimal = american_to_decimal(american)?;
    let implied = implied_probability(decimal)?;
    Ok((decimal, implied))
}

/// Decimal odds -> American odds. Even money (2.0) maps to +100.
pub fn decimal_to_american(decimal: f64) -> ValuationResult<f64> {
    if !decimal.is_finite() || decimal <= 1.0 {
        return Err(ValuationError::invalid_odds(
            "decimal_odds",
            decimal,
            "decimal odds must be > 1 to express as american",
        ));
    }
    if decimal >= 2.0 {
        Ok((decimal - 1.0) * 100.0)
    } else {
        Ok(-100.0 / (decimal - 1.0))
    }
}

/// Fair American odds for a probability (favourites negative).
pub fn implied_probability_to_american(prob: f64) -> ValuationResult<f64> {
    if !(prob > 0.0 && prob < 1.0) {
        return Err(ValuationError::invalid_probability(
            "probability",
            prob,
            "must be strictly inside (0, 1)",
        ));
    }
    if prob >= 0.5 {
        Ok(-(prob * 100.0) / (1.0 - prob))
    } else {
        Ok(((1.0 - prob) * 100.0) / prob)
    }
}
