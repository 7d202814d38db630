//! PropEdge - player-prop valuation service
//! Serves /api/predict and /api/multi-leg from a lock-free calibration snapshot

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::{path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use propedge_backend::{
    api::{self, AppState},
    calibration::{CalibrationStore, OutcomesDb, OutcomesSource},
    EngineConfig, ValuationEngine,
};

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    let config = EngineConfig::from_env();
    info!(
        bind_addr = %config.bind_addr,
        kelly_cap = config.valuation.kelly_cap,
        strict_correlation = config.valuation.strict_correlation,
        buckets = config.calibration.bucket_count,
        "🚀 Starting PropEdge valuation service"
    );

    let store = CalibrationStore::new(config.calibration.bucket_count);
    let engine = Arc::new(ValuationEngine::new(
        store.clone(),
        &config.valuation,
        config.calibration.params,
    ));
    let mut state = AppState::new(engine);

    match config.calibration.outcomes_db_path.as_deref() {
        Some(path) => {
            let db = OutcomesDb::new(path)
                .with_context(|| format!("Failed to open outcomes db at {path}"))?;
            let graded = db.count().await.unwrap_or(0);
            info!(
                path,
                graded,
                refresh_secs = config.calibration.refresh_secs,
                "📚 Outcomes store ready"
            );
            let source: Arc<dyn OutcomesSource> = Arc::new(db);
            store
                .clone()
                .spawn_refresh(source.clone(), config.calibration.refresh_interval());
            state = state.with_outcomes(source);
        }
        None => {
            warn!("OUTCOMES_DB_PATH not set; serving raw probabilities without calibration");
        }
    }

    let app = api::router(state, config.request_timeout());

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("🎯 API server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "propedge_backend=debug,propedge=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // 1) Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // 2) Also try the crate root when launched from elsewhere
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let candidates = [manifest_dir.join(".env"), manifest_dir.join("../.env")];

    for p in candidates {
        if p.exists() {
            let _ = dotenv::from_path(&p);
        }
    }
}
