//! Mapping of service errors onto HTTP responses.

use api_shared::AuthError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bucketview_core::ExplorerError;

/// Error returned by handlers.
///
/// Client errors carry their message; server errors are logged in full and
/// answered with a generic text.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Explorer(#[from] ExplorerError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Explorer(e) => match e {
                ExplorerError::PathOutsideMount(_) | ExplorerError::NotFound { .. } => {
                    StatusCode::NOT_FOUND
                }
                ExplorerError::InvalidInput(_)
                | ExplorerError::InvalidName { .. }
                | ExplorerError::AlreadyExists { .. }
                | ExplorerError::UnsupportedViewType(_)
                | ExplorerError::UploadBody(_) => StatusCode::BAD_REQUEST,
                ExplorerError::MountFailed { .. } | ExplorerError::StaleMount { .. } => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                ExplorerError::RemoteWriteFailure { .. }
                | ExplorerError::Http(_)
                | ExplorerError::IssueTracker(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Auth(AuthError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            ApiError::Auth(_) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match status {
            StatusCode::NOT_FOUND => (status, "Not found").into_response(),
            StatusCode::SERVICE_UNAVAILABLE => {
                tracing::error!("Mount error: {:?}", self);
                (status, "Bucket unavailable, please retry").into_response()
            }
            s if s.is_client_error() => (status, self.to_string()).into_response(),
            _ => {
                tracing::error!("Request error: {:?}", self);
                (status, "Internal error").into_response()
            }
        }
    }
}
