//! Process-wide calibration snapshot.
//!
//! Readers call `snapshot()` (one atomic load, never blocks). A refresh
//! builds a complete new table off to the side and `install`s it with a
//! single pointer swap, so an in-flight request sees exactly one version.
//! Refreshes run one at a time and the live version never moves backwards.

use arc_swap::ArcSwap;
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{sync::Mutex, task::JoinHandle, time::interval};
use tracing::{info, warn};

use super::outcomes_db::OutcomesSource;
use super::table::CalibrationTable;
use crate::valuation::error::{ValuationError, ValuationResult};

pub struct CalibrationStore {
    current: ArcSwap<CalibrationTable>,
    last_version: AtomicU64,
    bucket_count: usize,
    refresh_lock: Mutex<()>,
}

impl CalibrationStore {
    pub fn new(bucket_count: usize) -> Arc<Self> {
        Arc::new(Self {
            current: ArcSwap::from_pointee(CalibrationTable::empty(bucket_count)),
            last_version: AtomicU64::new(0),
            bucket_count: bucket_count.max(1),
            refresh_lock: Mutex::new(()),
        })
    }

    #[inline]
    pub fn snapshot(&self) -> Arc<CalibrationTable> {
        self.current.load_full()
    }

    pub fn version(&self) -> u64 {
        self.current.load().version()
    }

    /// Atomically replace the table; returns the version it was stamped with.
    /// A table stamped older than the live one is never swapped in.
    pub fn install(&self, table: CalibrationTable) -> u64 {
        let version = self.last_version.fetch_add(1, Ordering::AcqRel) + 1;
        let table = Arc::new(table.stamped(version));
        self.current.rcu(|live| {
            if live.version() > version {
                Arc::clone(live)
            } else {
                Arc::clone(&table)
            }
        });
        version
    }

    /// Rebuild from `source` and install. On failure the previous snapshot
    /// stays live and `CalibrationUnavailable` is returned.
    pub async fn refresh_from(&self, source: &dyn OutcomesSource) -> ValuationResult<u64> {
        let _guard = self.refresh_lock.lock().await;
        let outcomes = source
            .load_outcomes()
            .await
            .map_err(|e| ValuationError::CalibrationUnavailable(format!("{e:#}")))?;

        let table = CalibrationTable::build(&outcomes, self.bucket_count);
        let outcome_count = table.outcome_count();
        let version = self.install(table);

        info!(
            version,
            buckets = self.bucket_count,
            outcomes = outcome_count,
            "📐 Calibration table installed"
        );
        Ok(version)
    }

    /// Periodic refresh loop; the first tick fires immediately.
    pub fn spawn_refresh(
        self: Arc<Self>,
        source: Arc<dyn OutcomesSource>,
        every: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(every);
            loop {
                ticker.tick().await;
                if let Err(e) = self.refresh_from(source.as_ref()).await {
                    warn!(
                        error = %e,
                        version = self.version(),
                        "Calibration refresh failed, keeping previous snapshot"
                    );
                }
            }
        })
    }
}
