//! Calibration Maintenance Tool
//!
//! Records graded predictions into the outcomes store, inspects how well each
//! provider is calibrated, and values a single leg without running the server.
//!
//! Usage:
//!   propedge-calibrate --db-path ./outcomes.db record --provider fanduel --market passing_yards --p-hit 0.62 --outcome 1
//!   propedge-calibrate --db-path ./outcomes.db summary --market passing_yards
//!   propedge-calibrate value --odds -110 --p-hit 0.55
//!
//! Environment Variables:
//!   OUTCOMES_DB_PATH - SQLite file of graded predictions

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use propedge_backend::{
    api::predict::PredictResponse,
    calibration::{CalibrationStore, CalibrationTable, GradedOutcome, OutcomesDb},
    valuation::{LegInput, Market},
    EngineConfig, ValuationEngine,
};

#[derive(Parser, Debug)]
#[command(name = "propedge-calibrate")]
#[command(about = "Maintain and inspect provider calibration history")]
struct Cli {
    /// Path to the outcomes SQLite database
    #[arg(short, long, env = "OUTCOMES_DB_PATH", default_value = "propedge_outcomes.db")]
    db_path: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append one graded prediction
    Record {
        #[arg(long)]
        provider: String,

        #[arg(long)]
        market: Market,

        /// Probability the model assigned before the game
        #[arg(long)]
        p_hit: f64,

        /// 1 if the leg hit, 0 if it missed
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1))]
        outcome: u8,
    },

    /// Per-bucket hit rates and per-provider Brier / ECE
    Summary {
        /// Restrict to one market (otherwise all markets)
        #[arg(long)]
        market: Option<Market>,
    },

    /// Value one leg against an empty calibration table
    Value {
        /// American odds, e.g. -110 or 150
        #[arg(long, allow_negative_numbers = true)]
        odds: i32,

        #[arg(long)]
        p_hit: f64,

        #[arg(long, default_value = "passing_yards")]
        market: Market,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "propedge_backend=warn".into()),
        )
        .init();

    match cli.command {
        Commands::Record {
            provider,
            market,
            p_hit,
            outcome,
        } => record(&cli.db_path, &provider, market, p_hit, outcome == 1).await?,
        Commands::Summary { market } => summary(&cli.db_path, market).await?,
        Commands::Value {
            odds,
            p_hit,
            market,
        } => value(odds, p_hit, market)?,
    }

    Ok(())
}

fn open_db(path: &str) -> Result<OutcomesDb> {
    OutcomesDb::new(path).with_context(|| format!("Failed to open outcomes db: {path}"))
}

async fn record(path: &str, provider: &str, market: Market, p_hit: f64, hit: bool) -> Result<()> {
    let db = open_db(path)?;
    let outcome = GradedOutcome::new(provider, market, p_hit, hit);
    db.record(&outcome).await?;

    println!(
        "Recorded {} {} p_hit={:.4} outcome={} ({} graded total)",
        outcome.provider,
        market,
        p_hit,
        if hit { "hit" } else { "miss" },
        db.count().await?
    );
    Ok(())
}

async fn summary(path: &str, market: Option<Market>) -> Result<()> {
    let db = open_db(path)?;
    let outcomes = db.load_all().await?;
    let config = EngineConfig::from_env().calibration;
    let table = CalibrationTable::build(&outcomes, config.bucket_count);

    println!("=== Calibration Summary ===");
    println!("Database: {path}");
    println!("Graded predictions: {}", table.outcome_count());
    println!();

    let markets: Vec<Market> = match market {
        Some(m) => vec![m],
        None => Market::ALL.to_vec(),
    };

    let min_n = config.params.min_sample_size;
    for market in markets {
        let rows = table.rows(market, None);
        if rows.is_empty() {
            continue;
        }

        println!("--- {} ---", market.display_name());
        println!(
            "{:<14} {:>11} {:>6} {:>9} {:>9} {:>8}",
            "provider", "bucket", "n", "mean_p", "hit_rate", "brier"
        );
        for row in &rows {
            let marker = if row.stats.sample_size < min_n { " *" } else { "" };
            println!(
                "{:<14} {:>4.2}-{:<4.2}  {:>6} {:>9.4} {:>9.4} {:>8.4}{}",
                row.provider,
                row.lower,
                row.upper,
                row.stats.sample_size,
                row.stats.mean_predicted,
                row.stats.historical_hit_rate,
                row.stats.brier_score,
                marker
            );
        }
        for s in table.summaries(market, None) {
            println!(
                "  {:<12} n={:<6} brier={:.4} ece={:.4}",
                s.provider, s.n_predictions, s.brier_score, s.ece
            );
        }
        println!();
    }
    println!("* below min_sample_size ({min_n}); raw probability is used");

    Ok(())
}

fn value(odds: i32, p_hit: f64, market: Market) -> Result<()> {
    let config = EngineConfig::from_env();
    let engine = ValuationEngine::new(
        CalibrationStore::new(config.calibration.bucket_count),
        &config.valuation,
        config.calibration.params,
    );

    let input = LegInput {
        player: String::new(),
        market,
        sportsbook: None,
        projection: None,
        actual_or_estimate: None,
        odds: f64::from(odds),
        p_hit: Some(p_hit),
    };
    let valuation = engine.value_single(&input)?;
    let response = PredictResponse::new(valuation, Vec::new());

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
