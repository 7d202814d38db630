use thiserror::Error;

/// Failures scoped to a single valuation request.
///
/// Every variant names the request field it came from (`odds`,
/// `legs[2].p_hit`, `correlation_matrix`) so the HTTP envelope can echo a
/// field-identified message back to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValuationError {
    #[error("{field}: invalid odds {value} ({reason})")]
    InvalidOdds {
        field: String,
        value: f64,
        reason: &'static str,
    },

    #[error("{field}: invalid probability {value} ({reason})")]
    InvalidProbability {
        field: String,
        value: f64,
        reason: &'static str,
    },

    #[error("legs: at least {required} legs required for a multi-leg entry, got {got}")]
    InsufficientLegs { required: usize, got: usize },

    #[error("correlation_matrix: {0}")]
    MalformedCorrelationMatrix(String),

    /// Soft condition: the calibration table could not be rebuilt. Never
    /// aborts a valuation, only surfaces in logs and the reload endpoint.
    #[error("calibration unavailable: {0}")]
    CalibrationUnavailable(String),
}

impl ValuationError {
    pub fn invalid_odds(field: impl Into<String>, value: f64, reason: &'static str) -> Self {
        Self::InvalidOdds {
            field: field.into(),
            value,
            reason,
        }
    }

    pub fn invalid_probability(field: impl Into<String>, value: f64, reason: &'static str) -> Self {
        Self::InvalidProbability {
            field: field.into(),
            value,
            reason,
        }
    }

    /// Re-target the error at a nested request field, e.g. `odds` -> `legs[1].odds`.
    pub fn at(self, prefix: &str) -> Self {
        match self {
            Self::InvalidOdds {
                field,
                value,
                reason,
            } => Self::InvalidOdds {
                field: format!("{prefix}.{field}"),
                value,
                reason,
            },
            Self::InvalidProbability {
                field,
                value,
                reason,
            } => Self::InvalidProbability {
                field: format!("{prefix}.{field}"),
                value,
                reason,
            },
            other => other,
        }
    }

    /// Stable machine-readable code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidOdds { .. } => "invalid_odds",
            Self::InvalidProbability { .. } => "invalid_probability",
            Self::InsufficientLegs { .. } => "insufficient_legs",
            Self::MalformedCorrelationMatrix(_) => "malformed_correlation_matrix",
            Self::CalibrationUnavailable(_) => "calibration_unavailable",
        }
    }
}

pub type ValuationResult<T> = Result<T, ValuationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_names_field() {
        let err = ValuationError::invalid_odds("odds", 0.0, "american odds cannot be zero");
        assert_eq!(
            err.to_string(),
            "odds: invalid odds 0 (american odds cannot be zero)"
        );
    }

    #[test]
    fn test_at_prefixes_nested_field() {
        let err = ValuationError::invalid_probability("p_hit", 1.5, "outside [0, 1]").at("legs[1]");
        assert!(err.to_string().starts_with("legs[1].p_hit:"));
        assert_eq!(err.code(), "invalid_probability");
    }

    #[test]
    fn test_at_leaves_leg_count_errors_alone() {
        let err = ValuationError::InsufficientLegs {
            required: 2,
            got: 1,
        }
        .at("legs[0]");
        assert_eq!(
            err,
            ValuationError::InsufficientLegs {
                required: 2,
                got: 1
            }
        );
    }
}
