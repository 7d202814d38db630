//! Historical calibration of raw model probabilities.
//!
//! - `table`: immutable (provider, market, bucket) aggregates
//! - `adjuster`: shrinkage blend toward the historical hit rate
//! - `store`: lock-free snapshot with atomic reload
//! - `outcomes_db`: SQLite store of graded predictions feeding the rebuild
//! - `metrics`: Brier score, ECE and reliability bins

pub mod adjuster;
pub mod metrics;
pub mod outcomes_db;
pub mod store;
pub mod table;

pub use adjuster::{CalibrationAdjuster, CalibrationParams};
pub use outcomes_db::{InMemoryOutcomes, OutcomesDb, OutcomesSource};
pub use store::CalibrationStore;
pub use table::{BucketRow, BucketStats, CalibrationTable, GradedOutcome, ProviderSummary};
