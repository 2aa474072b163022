//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`; every error renders as an
//! `ErrorResponse` with status, code and log level taken from `ErrorMetadata`.

use attache_core::{ErrorMetadata, LambdaError, LogLevel};
use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Lambda(#[from] LambdaError),
    #[error("Dispatch queue is full, please try again later")]
    QueueFull,
    #[error("Dispatch queue is closed")]
    QueueClosed,
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

impl ErrorMetadata for ApiError {
    fn http_status_code(&self) -> u16 {
        match self {
            ApiError::Lambda(e) => e.http_status_code(),
            ApiError::QueueFull | ApiError::QueueClosed => 503,
            ApiError::InvalidBody(_) => 400,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ApiError::Lambda(e) => e.error_code(),
            ApiError::QueueFull => "QUEUE_FULL",
            ApiError::QueueClosed => "QUEUE_CLOSED",
            ApiError::InvalidBody(_) => "INVALID_BODY",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            ApiError::Lambda(e) => e.is_recoverable(),
            ApiError::QueueFull => true,
            ApiError::QueueClosed | ApiError::InvalidBody(_) => false,
        }
    }

    fn client_message(&self) -> String {
        match self {
            ApiError::Lambda(e) => e.client_message(),
            other => other.to_string(),
        }
    }

    fn is_sensitive(&self) -> bool {
        match self {
            ApiError::Lambda(e) => e.is_sensitive(),
            _ => false,
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            ApiError::Lambda(e) => e.log_level(),
            ApiError::QueueFull => LogLevel::Warn,
            ApiError::QueueClosed => LogLevel::Error,
            ApiError::InvalidBody(_) => LogLevel::Debug,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
}

/// Wrapper so `IntoResponse` can be implemented for domain errors
#[derive(Debug)]
pub struct HttpAppError(pub ApiError);

impl From<ApiError> for HttpAppError {
    fn from(err: ApiError) -> Self {
        HttpAppError(err)
    }
}

impl From<LambdaError> for HttpAppError {
    fn from(err: LambdaError) -> Self {
        HttpAppError(ApiError::Lambda(err))
    }
}

impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(ApiError::InvalidBody(rejection.body_text()))
    }
}

/// JSON body extractor rendering deserialization failures as `ErrorResponse`.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &ApiError) {
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, code = code, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, code = code, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, code = code, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let error = &self.0;
        let status = StatusCode::from_u16(error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(error);

        // Details only leave the process for non-sensitive errors outside production
        let details = if is_production_env() || error.is_sensitive() {
            None
        } else {
            Some(error.to_string())
        };

        let body = Json(ErrorResponse {
            error: error.client_message(),
            details,
            code: error.error_code().to_string(),
            recoverable: error.is_recoverable(),
        });

        (status, body).into_response()
    }
}
