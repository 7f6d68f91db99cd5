//! Route handlers.

pub mod auth;
pub mod download;
pub mod explorer;
pub mod issues;
pub mod jobs;
pub mod view;

use crate::AppState;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

/// Serves `favicon.ico` from the static directory.
pub async fn favicon(State(state): State<AppState>) -> Response {
    let path = state.web.static_dir().join("favicon.ico");
    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [(header::CONTENT_TYPE, "image/vnd.microsoft.icon")],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::debug!("favicon not served from {}: {}", path.display(), e);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}
