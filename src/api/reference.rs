//! Health, reference lists and calibration inspection / reload.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::calibration::{BucketRow, ProviderSummary};
use crate::valuation::{Market, ValuationError};

pub const SERVICE_NAME: &str = "propedge-backend";

/// Sportsbooks clients offer by default. Any other provider id is still
/// accepted on requests and calibrated if history exists for it.
pub const SPORTSBOOKS: &[(&str, &str)] = &[
    ("draftkings", "DraftKings"),
    ("fanduel", "FanDuel"),
    ("betmgm", "BetMGM"),
    ("pointsbet", "PointsBet"),
];

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub calibration_version: u64,
}

#[derive(Debug, Serialize)]
pub struct ReferenceItem {
    pub id: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ReferenceList {
    pub success: bool,
    pub items: Vec<ReferenceItem>,
}

#[derive(Debug, Deserialize)]
pub struct CalibrationQuery {
    pub market: String,
    pub provider: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CalibrationResponse {
    pub success: bool,
    pub market: Market,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub table_version: u64,
    pub built_at: DateTime<Utc>,
    pub bucket_count: usize,
    pub buckets: Vec<BucketRow>,
    pub summaries: Vec<ProviderSummary>,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub success: bool,
    pub version: u64,
    pub outcome_count: usize,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: SERVICE_NAME,
        calibration_version: state.engine.store().version(),
    })
}

pub async fn get_markets() -> Json<ReferenceList> {
    Json(ReferenceList {
        success: true,
        items: Market::ALL
            .iter()
            .map(|m| ReferenceItem {
                id: m.as_str(),
                name: m.display_name(),
            })
            .collect(),
    })
}

pub async fn get_sportsbooks() -> Json<ReferenceList> {
    Json(ReferenceList {
        success: true,
        items: SPORTSBOOKS
            .iter()
            .map(|&(id, name)| ReferenceItem { id, name })
            .collect(),
    })
}

/// GET /api/calibration?market=&provider=
pub async fn get_calibration(
    State(state): State<AppState>,
    query: Result<Query<CalibrationQuery>, QueryRejection>,
) -> ApiResult<CalibrationResponse> {
    let Query(q) = query?;
    let market: Market = q.market.parse().map_err(ApiError::BadRequest)?;
    let provider = q
        .provider
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());

    let table = state.engine.store().snapshot();
    let buckets = table.rows(market, provider);
    if buckets.is_empty() {
        return Err(ApiError::NotFound(match provider {
            Some(p) => format!("no calibration data for {market} at {p}"),
            None => format!("no calibration data for {market}"),
        }));
    }

    Ok(Json(CalibrationResponse {
        success: true,
        market,
        provider: provider.map(str::to_ascii_lowercase),
        table_version: table.version(),
        built_at: table.built_at(),
        bucket_count: table.bucket_count(),
        buckets,
        summaries: table.summaries(market, provider),
    }))
}

/// POST /api/calibration/reload
pub async fn post_calibration_reload(State(state): State<AppState>) -> ApiResult<ReloadResponse> {
    let source = state.outcomes.as_ref().ok_or_else(|| {
        ValuationError::CalibrationUnavailable("no outcomes store configured".to_string())
    })?;

    let store = state.engine.store();
    let version = store.refresh_from(source.as_ref()).await?;
    let outcome_count = store.snapshot().outcome_count();
    info!(version, outcome_count, "🔄 Calibration reloaded on request");

    Ok(Json(ReloadResponse {
        success: true,
        version,
        outcome_count,
    }))
}
