use crate::middleware::CurrentUser;
use crate::{views, AppState};
use axum::extract::{Path as AxumPath, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::Extension;
use bucketview_core::viewer::{load_view, ViewKind};
use bucketview_core::ExplorerError;

#[utoipa::path(
    get,
    path = "/view/{filepath}",
    params(
        ("filepath" = String, Path, description = "Absolute path of the file without the leading /")
    ),
    responses(
        (status = 200, description = "File contents (json, html, csv, log or png)"),
        (status = 400, description = "Unsupported file type", body = String),
        (status = 404, description = "File not found"),
        (status = 500, description = "File could not be read")
    )
)]
/// View a file inline
///
/// The type is decided from the extension before anything is read, so an
/// unsupported file is never opened.
///
/// # Returns
/// * `200` with the file in its native content type
/// * `400` with a JSON string naming the unsupported extension
pub async fn view_file(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    AxumPath(filepath): AxumPath<String>,
) -> Response {
    let path = match state.paths.resolve(&filepath) {
        Ok(path) => path,
        Err(_) => return (StatusCode::NOT_FOUND, "Not found").into_response(),
    };

    if let Err(e) = ViewKind::from_path(&path) {
        return (StatusCode::BAD_REQUEST, Json(e.to_string())).into_response();
    }

    match load_view(&path).await {
        Ok(view) => {
            tracing::info!(actor = %user.email, path = %path.display(), "viewed file");
            ([(header::CONTENT_TYPE, view.kind.content_type())], view.body).into_response()
        }
        Err(ExplorerError::NotFound { .. }) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        Err(e) => {
            tracing::error!(actor = %user.email, path = %path.display(), "error viewing file: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(views::view_error(&e.to_string())),
            )
                .into_response()
        }
    }
}
