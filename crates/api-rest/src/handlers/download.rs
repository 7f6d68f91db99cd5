//! Single-file and zipped-directory downloads.

use crate::middleware::CurrentUser;
use crate::{ApiError, AppState};
use axum::body::Body;
use axum::extract::{Path as AxumPath, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use bucketview_core::ExplorerError;
use bucketview_files::build_archive;
use futures_util::StreamExt;
use std::path::Path;
use tokio_util::io::ReaderStream;

/// Prefix selecting a zipped directory download: `/download/dir/<dir_path>`.
const DIR_PREFIX: &str = "dir/";

/// `GET /download/<filepath>` and `GET /download/dir/<dir_path>`.
///
/// Both forms share one route because the archive form is a prefix of the
/// single-file form.
///
/// # Errors
///
/// Returns `404 Not Found` if the path is outside the bucket, missing, or of
/// the wrong kind (a directory for a file download or vice versa).
pub async fn download(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    AxumPath(filepath): AxumPath<String>,
) -> Result<Response, ApiError> {
    match filepath.strip_prefix(DIR_PREFIX) {
        Some(dir_path) => download_dir(&state, &user, dir_path).await,
        None => download_file(&state, &user, &filepath).await,
    }
}

async fn download_file(state: &AppState, user: &CurrentUser, filepath: &str) -> Result<Response, ApiError> {
    let path = state.paths.resolve(filepath)?;
    let not_found = || ExplorerError::NotFound { path: path.clone() };

    let meta = tokio::fs::metadata(&path).await.map_err(|_| not_found())?;
    if !meta.is_file() {
        return Err(not_found().into());
    }
    let file = tokio::fs::File::open(&path).await.map_err(ExplorerError::Io)?;

    tracing::warn!(actor = %user.email, path = %path.display(), "downloaded file");

    // No Content-Length: a file on the FUSE mount may change size while it is
    // streamed, so the body is sent chunked.
    let body = Body::from_stream(ReaderStream::new(file));
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
            (header::CONTENT_DISPOSITION, attachment(&path)),
        ],
        body,
    )
        .into_response())
}

async fn download_dir(state: &AppState, user: &CurrentUser, dir_path: &str) -> Result<Response, ApiError> {
    let dir = state.paths.resolve(dir_path)?;
    let temp_dir = state.cfg.temp_dir().to_path_buf();

    let source = dir.clone();
    let archive = tokio::task::spawn_blocking(move || {
        if !source.is_dir() {
            return Err(ExplorerError::NotFound { path: source });
        }
        build_archive(&temp_dir, &source).map_err(ExplorerError::from)
    })
    .await??;

    let file = tokio::fs::File::open(archive.path())
        .await
        .map_err(ExplorerError::Io)?;
    let size = file.metadata().await.map_err(ExplorerError::Io)?.len();
    let disposition = attachment(Path::new(archive.file_name()));

    tracing::warn!(actor = %user.email, path = %dir.display(), "downloaded directory as {}", archive.file_name());

    // The archive guard lives inside the stream and is dropped with the body,
    // whether it was fully sent or the client went away.
    let stream = ReaderStream::new(file).map(move |chunk| {
        let _ = &archive;
        chunk
    });

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/zip")),
            (header::CONTENT_LENGTH, HeaderValue::from(size)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

/// `Content-Disposition: attachment` with the leaf name of `path`.
fn attachment(path: &Path) -> HeaderValue {
    let name: String = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
        .chars()
        .map(|c| if c == '"' || c == '\\' || !c.is_ascii() || c.is_ascii_control() { '_' } else { c })
        .collect();

    HeaderValue::from_str(&format!("attachment; filename=\"{name}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
