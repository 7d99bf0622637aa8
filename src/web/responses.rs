//! HTTP mapping of attempt outcomes and errors.

use crate::models::{AttemptOutcome, BackgroundAsset, Diagnostic, ErrorKind, ThemeConfig};
use crate::Error;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use tracing::{error, info};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeBody {
    pub theme_data: ThemeConfig,
    pub background_image: Option<BackgroundAsset>,
    pub image_unavailable: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RetryBody {
    retry: bool,
    next_attempt: u32,
    message: String,
    partial_theme: Option<ThemeConfig>,
}

#[derive(Debug, Serialize)]
struct FailureBody {
    error: &'static str,
    kind: ErrorKind,
    diagnostic: Diagnostic,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    kind: ErrorKind,
    details: String,
    diagnostic: Diagnostic,
}

impl IntoResponse for AttemptOutcome {
    fn into_response(self) -> Response {
        match self {
            AttemptOutcome::Final {
                theme,
                asset,
                image_unavailable,
            } => (
                StatusCode::OK,
                Json(ThemeBody {
                    theme_data: theme,
                    background_image: asset,
                    image_unavailable,
                }),
            )
                .into_response(),
            AttemptOutcome::Retry {
                next_attempt,
                partial_theme,
                reason,
            } => {
                info!("Asking caller to retry as attempt {}: {}", next_attempt, reason);
                (
                    StatusCode::ACCEPTED,
                    Json(RetryBody {
                        retry: true,
                        next_attempt,
                        message: reason,
                        partial_theme,
                    }),
                )
                    .into_response()
            }
            AttemptOutcome::Failure { kind, diagnostic } => {
                info!("Theme generation failed: {:?}", kind);
                (
                    StatusCode::BAD_REQUEST,
                    Json(FailureBody {
                        error: kind.message(),
                        kind,
                        diagnostic,
                    }),
                )
                    .into_response()
            }
        }
    }
}

/// Errors that never became an outcome: the body could not be read, the
/// gateway is missing, or talking to it failed.
#[derive(Debug)]
pub enum ApiError {
    InvalidRequest(String),
    NotReady { attempt: u32, reason: String },
    Upstream { attempt: u32, error: Error },
}

impl ApiError {
    pub fn from_error(attempt: u32, error: Error) -> Self {
        match error {
            Error::ServiceNotReady(reason) => ApiError::NotReady { attempt, reason },
            error => ApiError::Upstream { attempt, error },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, attempt, details) = match self {
            ApiError::InvalidRequest(details) => {
                info!("Rejecting malformed request: {}", details);
                (StatusCode::BAD_REQUEST, ErrorKind::InvalidRequest, 0, details)
            }
            ApiError::NotReady { attempt, reason } => {
                error!("Theme generation requested while not ready: {}", reason);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorKind::ServiceNotReady,
                    attempt,
                    reason,
                )
            }
            ApiError::Upstream { attempt, error } => {
                error!("Error calling upstream on attempt {}: {}", attempt, error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorKind::UpstreamTransportError,
                    attempt,
                    error.to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: kind.message(),
            kind,
            diagnostic: Diagnostic::for_attempt(attempt).with_details(details.clone()),
            details,
        };
        (status, Json(body)).into_response()
    }
}
