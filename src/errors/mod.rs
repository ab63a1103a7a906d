/// Unified error handling module
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Unified error response format
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("External API error: {0}")]
    ExternalApi(#[from] reqwest::Error),
    #[error("{provider} responded with status {status}")]
    UpstreamStatus {
        provider: &'static str,
        status: reqwest::StatusCode,
    },
    #[error("{provider} returned an unexpected payload: {message}")]
    MalformedResponse {
        provider: &'static str,
        message: String,
    },
    #[error("No API key configured for {0}")]
    MissingApiKey(&'static str),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn malformed(provider: &'static str, err: impl std::fmt::Display) -> Self {
        ApiError::MalformedResponse {
            provider,
            message: err.to_string(),
        }
    }

    fn code(&self) -> &'static str {
        let status = match self {
            ApiError::ExternalApi(e) => e.status(),
            ApiError::UpstreamStatus { status, .. } => Some(*status),
            ApiError::MalformedResponse { .. } => return "UPSTREAM_MALFORMED",
            ApiError::MissingApiKey(_) => return "MISSING_API_KEY",
            ApiError::NotFound(_) => return "NOT_FOUND",
            ApiError::InvalidInput(_) => return "INVALID_INPUT",
            ApiError::Internal(_) => return "INTERNAL_ERROR",
        };
        match status.map(|s| s.as_u16()) {
            Some(403) => "UPSTREAM_403",
            Some(404) => "UPSTREAM_404",
            Some(429) => "UPSTREAM_429",
            Some(500..=599) => "UPSTREAM_5XX",
            _ => "UPSTREAM_ERROR",
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_response = ErrorResponse {
            ok: false,
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };

        // Errors travel in the envelope; the transport status stays 200
        (StatusCode::OK, Json(error_response)).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
