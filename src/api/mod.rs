//! HTTP surface.

pub mod error;
pub mod predict;
pub mod reference;

use axum::{
    error_handling::HandleErrorLayer,
    middleware,
    routing::{get, post},
    BoxError, Router,
};
use std::{sync::Arc, time::Duration};
use tower::{timeout::error::Elapsed, ServiceBuilder};
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::calibration::OutcomesSource;
use crate::middleware::request_logging;
use crate::valuation::ValuationEngine;

pub use error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ValuationEngine>,
    /// Backing store for `/api/calibration/reload`; `None` disables reloads.
    pub outcomes: Option<Arc<dyn OutcomesSource>>,
}

impl AppState {
    pub fn new(engine: Arc<ValuationEngine>) -> Self {
        Self {
            engine,
            outcomes: None,
        }
    }

    pub fn with_outcomes(mut self, outcomes: Arc<dyn OutcomesSource>) -> Self {
        self.outcomes = Some(outcomes);
        self
    }
}

/// Full application router with CORS, request deadline and request logging.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let routes = Router::new()
        .route("/health", get(reference::health_check))
        .route("/api/predict", post(predict::post_predict))
        .route("/api/multi-leg", post(predict::post_multi_leg))
        .route("/api/markets", get(reference::get_markets))
        .route("/api/sportsbooks", get(reference::get_sportsbooks))
        .route("/api/calibration", get(reference::get_calibration))
        .route(
            "/api/calibration/reload",
            post(reference::post_calibration_reload),
        )
        .with_state(state);
    layered(routes, request_timeout)
}

/// Wrap `routes` in the shared middleware stack. A request that outlives
/// `request_timeout` is answered with the usual error envelope.
pub fn layered(routes: Router, request_timeout: Duration) -> Router {
    routes
        .layer(middleware::from_fn(request_logging))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout))
                .timeout(request_timeout),
        )
        .layer(CorsLayer::permissive())
}

async fn handle_timeout(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        warn!("Request exceeded deadline");
        ApiError::Timeout
    } else {
        ApiError::Internal(format!("unhandled middleware error: {err}"))
    }
}
