//! HTTP-facing error type for the webhook listener.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use reviewbot_provider::ProviderError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("malformed request: {0}")]
    BadRequest(String),

    #[error("invalid webhook signature")]
    Unauthorized,

    #[error("unknown provider path segment '{0}'")]
    UnknownProvider(String),

    #[error("admission queue saturated")]
    Saturated,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::UnknownProvider(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Saturated => StatusCode::TOO_MANY_REQUESTS,
            AppError::Provider(ProviderError::InvalidSignature) => StatusCode::UNAUTHORIZED,
            AppError::Provider(ProviderError::RateLimited { .. }) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Provider(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::UnknownProvider(_) => "UNKNOWN_PROVIDER",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Saturated => "SATURATED",
            AppError::Provider(ProviderError::InvalidSignature) => "UNAUTHORIZED",
            AppError::Provider(_) => "PROVIDER_ERROR",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.error_code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
