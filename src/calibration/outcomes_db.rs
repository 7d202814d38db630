use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

use super::table::GradedOutcome;
use crate::valuation::model::{provider_key, Market};

/// Anything that can hand the refresher the full graded history.
#[async_trait]
pub trait OutcomesSource: Send + Sync {
    async fn load_outcomes(&self) -> Result<Vec<GradedOutcome>>;
}

/// Fixed in-memory history (tests, offline tooling).
#[derive(Debug, Clone, Default)]
pub struct InMemoryOutcomes(pub Vec<GradedOutcome>);

#[async_trait]
impl OutcomesSource for InMemoryOutcomes {
    async fn load_outcomes(&self) -> Result<Vec<GradedOutcome>> {
        Ok(self.0.clone())
    }
}

/// SQLite-backed store of graded predictions.
#[derive(Clone)]
pub struct OutcomesDb {
    conn: Arc<Mutex<Connection>>,
}

impl OutcomesDb {
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).context("open outcomes db")?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS graded_predictions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                provider TEXT NOT NULL,
                market TEXT NOT NULL,
                p_hit REAL NOT NULL,
                outcome INTEGER NOT NULL CHECK (outcome IN (0, 1)),
                graded_at INTEGER NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_graded_predictions_provider_market
                ON graded_predictions(provider, market)",
            [],
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub async fn record(&self, outcome: &GradedOutcome) -> Result<()> {
        if !outcome.p_hit.is_finite() || !(0.0..=1.0).contains(&outcome.p_hit) {
            anyhow::bail!("p_hit {} outside [0, 1]", outcome.p_hit);
        }
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO graded_predictions (provider, market, p_hit, outcome, graded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                provider_key(&outcome.provider),
                outcome.market.as_str(),
                outcome.p_hit,
                outcome.hit as i64,
                Utc::now().timestamp(),
            ],
        )
        .context("insert graded prediction")?;
        Ok(())
    }

    pub async fn count(&self) -> Result<u64> {
        let conn = self.conn.lock().await;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM graded_predictions", [], |row| {
            row.get(0)
        })?;
        Ok(n.max(0) as u64)
    }

    /// Every graded prediction. Rows with an unknown market are skipped.
    pub async fn load_all(&self) -> Result<Vec<GradedOutcome>> {
        let conn = self.conn.lock().await;
        let mut stmt =
            conn.prepare("SELECT provider, market, p_hit, outcome FROM graded_predictions")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut out = Vec::new();
        let mut skipped = 0usize;
        for row in rows {
            let (provider, market, p_hit, outcome) = row?;
            match market.parse::<Market>() {
                Ok(market) => out.push(GradedOutcome::new(&provider, market, p_hit, outcome != 0)),
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(skipped, "Skipped graded predictions with unknown market");
        }
        Ok(out)
    }
}

#[async_trait]
impl OutcomesSource for OutcomesDb {
    async fn load_outcomes(&self) -> Result<Vec<GradedOutcome>> {
        self.load_all().await
    }
}
