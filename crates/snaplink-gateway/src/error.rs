use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use snaplink_core::{AnalyticsError, RedirectError, ShortenerError, StorageError};
use tracing::error;

use crate::model::ErrorResponse;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    /// No usable `X-Owner-Id` on a route that needs one.
    MissingIdentity,
    BadRequest(String),
    Shortener(ShortenerError),
    Redirect(RedirectError),
    Analytics(AnalyticsError),
}

impl From<ShortenerError> for AppError {
    fn from(value: ShortenerError) -> Self {
        Self::Shortener(value)
    }
}

impl From<RedirectError> for AppError {
    fn from(value: RedirectError) -> Self {
        Self::Redirect(value)
    }
}

impl From<AnalyticsError> for AppError {
    fn from(value: AnalyticsError) -> Self {
        Self::Analytics(value)
    }
}

fn storage_status(err: &StorageError) -> StatusCode {
    match err {
        StorageError::Unavailable(_) | StorageError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingIdentity => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Shortener(err) => match err {
                ShortenerError::InvalidUrl(_)
                | ShortenerError::InvalidAlias(_)
                | ShortenerError::InvalidExpiration
                | ShortenerError::InvalidCodeLength { .. } => StatusCode::BAD_REQUEST,
                ShortenerError::AliasAlreadyExists(_) | ShortenerError::AllocationExhausted { .. } => {
                    StatusCode::CONFLICT
                }
                ShortenerError::LinkNotFound => StatusCode::NOT_FOUND,
                ShortenerError::Unauthorized => StatusCode::FORBIDDEN,
                ShortenerError::Storage(err) => storage_status(err),
            },
            AppError::Redirect(err) => match err {
                RedirectError::LinkNotFound => StatusCode::NOT_FOUND,
                RedirectError::LinkExpired => StatusCode::GONE,
                RedirectError::Storage(err) => storage_status(err),
            },
            AppError::Analytics(err) => match err {
                AnalyticsError::LinkNotFound => StatusCode::NOT_FOUND,
                AnalyticsError::Unauthorized => StatusCode::FORBIDDEN,
                AnalyticsError::Storage(err) => storage_status(err),
            },
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::MissingIdentity => "missing or invalid X-Owner-Id header".to_string(),
            AppError::BadRequest(message) => message.clone(),
            AppError::Shortener(err) => err.to_string(),
            AppError::Redirect(err) => err.to_string(),
            AppError::Analytics(err) => err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            // Backend details stay in the logs.
            error!(error = %self.message(), status = status.as_u16(), "request failed");
            "internal error".to_string()
        } else {
            self.message()
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
