//! Multi-Leg (Parlay) Combination
//!
//! A parlay pays the product of its legs' decimal odds and only when every
//! leg hits. Under independence the joint hit probability is `∏ p_i`.
//!
//! With a correlation matrix we apply a first-order covariance correction
//! over leg pairs. For Bernoulli outcomes with correlation `ρ_ij`:
//!
//! ```text
//! cov_ij = ρ_ij * sqrt(p_i(1-p_i) * p_j(1-p_j))
//! joint  = ∏ p_k + Σ_{i<j} cov_ij * ∏_{k≠i,j} p_k
//! ```
//!
//! clamped to `[0, 1]`. Exact when all correlations are zero, good for small
//! pairwise correlations, NOT exact for three-or-more-way dependence. A full
//! multivariate model (copula) would be needed for that.

use serde_json::Value;
use tracing::warn;

use super::error::{ValuationError, ValuationResult};
use super::kelly::{expected_value, kelly_from_ev, KellyParams};
use super::model::{ParlayValuation, ValuedLeg};

pub const MIN_PARLAY_LEGS: usize = 2;

/// Symmetry / unit-diagonal tolerance for client-supplied matrices.
const MATRIX_TOLERANCE: f64 = 1e-6;

/// Correlation data as a client sent it. Anything that is not an array of
/// numeric rows is kept as `Unreadable` so the combiner applies the same
/// fallback / strict policy as for a mis-shaped matrix.
#[derive(Debug, Clone, PartialEq)]
pub enum CorrelationInput {
    Rows(Vec<Vec<f64>>),
    Unreadable(String),
}

impl From<Vec<Vec<f64>>> for CorrelationInput {
    fn from(rows: Vec<Vec<f64>>) -> Self {
        CorrelationInput::Rows(rows)
    }
}

impl CorrelationInput {
    /// Read a JSON matrix. `null` means no correlation data at all.
    pub fn from_json(value: Value) -> Option<Self> {
        let rows = match value {
            Value::Null => return None,
            Value::Array(rows) => rows,
            other => {
                return Some(CorrelationInput::Unreadable(format!(
                    "expected an array of rows, got {}",
                    json_kind(&other)
                )))
            }
        };

        let mut parsed = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let Value::Array(entries) = row else {
                return Some(CorrelationInput::Unreadable(format!(
                    "row {i} is {}, expected an array",
                    json_kind(row)
                )));
            };
            let mut out = Vec::with_capacity(entries.len());
            for (j, entry) in entries.iter().enumerate() {
                match entry.as_f64() {
                    Some(x) => out.push(x),
                    None => {
                        return Some(CorrelationInput::Unreadable(format!(
                            "entry [{i}][{j}] is {}, expected a number",
                            json_kind(entry)
                        )))
                    }
                }
            }
            parsed.push(out);
        }
        Some(CorrelationInput::Rows(parsed))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Validated square correlation matrix (symmetric, unit diagonal, entries in [-1, 1]).
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    rows: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Validate `rows` as a correlation matrix over `legs` legs. An all-zero
    /// square matrix is read as explicit independence (the identity).
    pub fn new(mut rows: Vec<Vec<f64>>, legs: usize) -> ValuationResult<Self> {
        let malformed = |msg: String| Err(ValuationError::MalformedCorrelationMatrix(msg));

        if rows.len() != legs {
            return malformed(format!(
                "expected {legs}x{legs} matrix for {legs} legs, got {} rows",
                rows.len()
            ));
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != legs {
                return malformed(format!(
                    "row {i} has {} entries, expected {legs} (matrix must be square)",
                    row.len()
                ));
            }
        }

        if rows.iter().flatten().all(|&x| x == 0.0) {
            for (i, row) in rows.iter_mut().enumerate() {
                row[i] = 1.0;
            }
        }

        for i in 0..legs {
            let diag = rows[i][i];
            if !diag.is_finite() || (diag - 1.0).abs() > MATRIX_TOLERANCE {
                return malformed(format!("diagonal entry [{i}][{i}] is {diag}, expected 1"));
            }
            for j in (i + 1)..legs {
                let (a, b) = (rows[i][j], rows[j][i]);
                if !a.is_finite() || !b.is_finite() || a.abs() > 1.0 || b.abs() > 1.0 {
                    return malformed(format!(
                        "entries [{i}][{j}]={a} and [{j}][{i}]={b} must lie in [-1, 1]"
                    ));
                }
                if (a - b).abs() > MATRIX_TOLERANCE {
                    return malformed(format!(
                        "not symmetric: [{i}][{j}]={a} but [{j}][{i}]={b}"
                    ));
                }
            }
        }

        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.rows[i][j]
    }
}

/// Joint probability under independence.
pub fn independent_joint(probs: &[f64]) -> f64 {
    probs.iter().product()
}

/// First-order covariance-corrected joint probability, clamped to [0, 1].
///
/// `probs` must be strictly inside (0, 1); the "all other legs" product is
/// taken as `∏ p / (p_i p_j)`.
pub fn correlated_joint(probs: &[f64], matrix: &CorrelationMatrix) -> f64 {
    debug_assert_eq!(probs.len(), matrix.len());

    let product = independent_joint(probs);
    let mut correction = 0.0;

    for i in 0..probs.len() {
        let var_i = probs[i] * (1.0 - probs[i]);
        for j in (i + 1)..probs.len() {
            let rho = matrix.get(i, j);
            if rho == 0.0 {
                continue;
            }
            let var_j = probs[j] * (1.0 - probs[j]);
            let cov = rho * (var_i * var_j).sqrt();
            let others = product / (probs[i] * probs[j]);
            correction += cov * others;
        }
    }

    (product + correction).clamp(0.0, 1.0)
}

/// Combines valued legs into one parlay valuation.
#[derive(Debug, Clone, Copy)]
pub struct ParlayCombiner {
    params: KellyParams,
    /// Reject malformed matrices instead of falling back to independence.
    strict_correlation: bool,
}

impl ParlayCombiner {
    pub fn new(params: KellyParams, strict_correlation: bool) -> Self {
        Self {
            params: KellyParams::with_cap(params.kelly_cap),
            strict_correlation,
        }
    }

    pub fn combine(
        &self,
        legs: &[ValuedLeg],
        correlation: Option<CorrelationInput>,
    ) -> ValuationResult<ParlayValuation> {
        if legs.len() < MIN_PARLAY_LEGS {
            return Err(ValuationError::InsufficientLegs {
                required: MIN_PARLAY_LEGS,
                got: legs.len(),
            });
        }

        let probs: Vec<f64> = legs.iter().map(ValuedLeg::p_hit).collect();
        let combined_decimal_odds: f64 = legs.iter().map(|l| l.decimal_odds).product();
        let joint_probability_independent = independent_joint(&probs);

        let mut warnings = Vec::new();
        let mut joint_probability = joint_probability_independent;
        let mut correlation_applied = false;

        if let Some(input) = correlation {
            let matrix = match input {
                CorrelationInput::Rows(rows) => CorrelationMatrix::new(rows, legs.len()),
                CorrelationInput::Unreadable(msg) => {
                    Err(ValuationError::MalformedCorrelationMatrix(msg))
                }
            };
            match matrix {
                Ok(matrix) => {
                    joint_probability = correlated_joint(&probs, &matrix);
                    correlation_applied = true;
                }
                Err(e) if self.strict_correlation => return Err(e),
                Err(e) => {
                    warn!(error = %e, legs = legs.len(), "Ignoring malformed correlation matrix, assuming independence");
                    warnings.push(format!("{e}; joint probability assumes independence"));
                }
            }
        }

        let combined_ev = expected_value(joint_probability, combined_decimal_odds);
        let combined_kelly_fraction =
            kelly_from_ev(combined_ev, combined_decimal_odds, self.params.kelly_cap);

        Ok(ParlayValuation {
            joint_probability_independent,
            joint_probability,
            correlation_applied,
            combined_decimal_odds,
            combined_ev,
            combined_kelly_fraction,
            warnings,
        })
    }
}

impl Default for ParlayCombiner {
    fn default() -> Self {
        Self::new(KellyParams::default(), false)
    }
}
