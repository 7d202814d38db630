//! `{success: false, error}` envelope for every failed request.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::debug;

use crate::valuation::ValuationError;

#[derive(Debug)]
pub enum ApiError {
    Valuation(ValuationError),
    BadRequest(String),
    NotFound(String),
    /// Request exceeded the configured deadline.
    Timeout,
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Valuation(ValuationError::CalibrationUnavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Valuation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::Valuation(e) => Some(e.code()),
            ApiError::BadRequest(_) => Some("bad_request"),
            ApiError::NotFound(_) => None,
            ApiError::Timeout => Some("timeout"),
            ApiError::Internal(_) => Some("internal"),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Valuation(e) => write!(f, "{e}"),
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) | ApiError::Internal(msg) => {
                f.write_str(msg)
            }
            ApiError::Timeout => f.write_str("request timed out"),
        }
    }
}

impl From<ValuationError> for ApiError {
    fn from(e: ValuationError) -> Self {
        ApiError::Valuation(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        debug!(status = status.as_u16(), error = %self, "Request rejected");
        let body = ErrorBody {
            success: false,
            error: self.to_string(),
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;
