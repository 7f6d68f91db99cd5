//! Fire-and-forget job dispatch.

use crate::middleware::CurrentUser;
use crate::AppState;
use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use bucketview_core::jobs::JobKind;

/// Posts the file to the job service and relays the outcome.
///
/// - remote success: `200` with an empty body, the remote reply is logged
/// - remote failure: the remote status and body, verbatim
/// - service unreachable: `502` with the transport error
async fn dispatch(state: AppState, user: CurrentUser, kind: JobKind, filepath: String) -> Response {
    let path = match state.paths.resolve(&filepath) {
        Ok(path) => path,
        Err(_) => return (StatusCode::NOT_FOUND, "Not found").into_response(),
    };
    let path = path.to_string_lossy();

    tracing::info!(actor = %user.email, path = %path, "starting {} job", kind);
    match state.jobs.dispatch(kind, &path).await {
        Ok(response) if response.is_success() => {
            tracing::info!("{} job accepted for {}: {}", kind, path, response.body);
            StatusCode::OK.into_response()
        }
        Ok(response) => {
            tracing::error!(
                "{} job request for {} failed with {}: {}",
                kind,
                path,
                response.status,
                response.body
            );
            let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
            (status, response.body).into_response()
        }
        Err(e) => {
            tracing::error!("{} job request for {} failed: {}", kind, path, e);
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/background_reprocess/{filepath}",
    params(("filepath" = String, Path, description = "Geopackage path without the leading /")),
    responses(
        (status = 200, description = "Job accepted"),
        (status = 502, description = "Job service unreachable")
    )
)]
/// Reprocess a geopackage.
pub async fn reprocess(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    AxumPath(filepath): AxumPath<String>,
) -> Response {
    dispatch(state, user, JobKind::Reprocess, filepath).await
}

#[utoipa::path(
    get,
    path = "/background_compute_leveed_area/{filepath}",
    params(("filepath" = String, Path, description = "Geopackage path without the leading /")),
    responses(
        (status = 200, description = "Job accepted"),
        (status = 502, description = "Job service unreachable")
    )
)]
/// Compute leveed areas of a geopackage.
pub async fn compute_leveed_area(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    AxumPath(filepath): AxumPath<String>,
) -> Response {
    dispatch(state, user, JobKind::ComputeLeveedArea, filepath).await
}

#[utoipa::path(
    get,
    path = "/background_create_report/{filepath}",
    params(("filepath" = String, Path, description = "Geopackage path without the leading /")),
    responses(
        (status = 200, description = "Job accepted"),
        (status = 502, description = "Job service unreachable")
    )
)]
/// Create a report for a geopackage.
pub async fn create_report(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    AxumPath(filepath): AxumPath<String>,
) -> Response {
    dispatch(state, user, JobKind::CreateReport, filepath).await
}
