//! PropEdge Backend Library
//!
//! Wagering valuation engine for player-prop bets: odds conversion,
//! provider calibration, single-leg EV/Kelly, correlated parlays and the
//! HTTP surface that serves them. Shared by the server, the maintenance CLI
//! and the integration tests.

pub mod api;
pub mod calibration;
pub mod config;
pub mod middleware;
pub mod projection;
pub mod valuation;

pub use config::EngineConfig;
pub use valuation::{ValuationEngine, ValuationError};
