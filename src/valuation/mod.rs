//! Wagering valuation core: odds conversion, single-leg EV and Kelly sizing,
//! parlay combination and EV guidance bands.

pub mod engine;
pub mod error;
pub mod kelly;
pub mod model;
pub mod odds;
pub mod parlay;
pub mod recommendation;

pub use engine::{LegInput, MultiLegValuation, SingleValuation, ValuationEngine};
pub use error::{ValuationError, ValuationResult};
pub use kelly::{KellyParams, SingleLegValuator};
pub use model::{CalibratedLeg, CalibrationRef, Leg, Market, ParlayValuation, ValuedLeg};
pub use parlay::{CorrelationInput, CorrelationMatrix, ParlayCombiner};
pub use recommendation::Recommendation;
