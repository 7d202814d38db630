//! EV guidance bands. Clients map the band to display text; the thresholds
//! live only here.

use serde::{Deserialize, Serialize};

/// EV above this is strong value; its negation is the floor of a close call.
pub const STRONG_VALUE_EV: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// ev > 0.05
    StrongValue,
    /// 0 < ev <= 0.05
    SlightValue,
    /// -0.05 <= ev <= 0
    CloseCall,
    /// ev < -0.05
    Avoid,
}

impl Recommendation {
    pub fn classify(ev: f64) -> Self {
        if ev > STRONG_VALUE_EV {
            Recommendation::StrongValue
        } else if ev > 0.0 {
            Recommendation::SlightValue
        } else if ev >= -STRONG_VALUE_EV {
            Recommendation::CloseCall
        } else {
            // NaN also lands here
            Recommendation::Avoid
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Recommendation::StrongValue | Recommendation::SlightValue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_edges() {
        assert_eq!(Recommendation::classify(0.0501), Recommendation::StrongValue);
        assert_eq!(Recommendation::classify(0.05), Recommendation::SlightValue);
        assert_eq!(Recommendation::classify(1e-9), Recommendation::SlightValue);
        assert_eq!(Recommendation::classify(0.0), Recommendation::CloseCall);
        assert_eq!(Recommendation::classify(-0.05), Recommendation::CloseCall);
        assert_eq!(Recommendation::classify(-0.0501), Recommendation::Avoid);
        assert_eq!(Recommendation::classify(f64::NAN), Recommendation::Avoid);
    }

    #[test]
    fn test_serializes_as_snake_case() {
        let json = serde_json::to_string(&Recommendation::StrongValue).unwrap();
        assert_eq!(json, "\"strong_value\"");
        assert!(Recommendation::SlightValue.is_positive());
        assert!(!Recommendation::CloseCall.is_positive());
    }
}
