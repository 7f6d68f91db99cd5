//! Directory browsing, directory creation and uploads.

use crate::middleware::CurrentUser;
use crate::views::{self, ExplorerPage};
use crate::{ApiError, AppState};
use api_shared::Flash;
use axum::extract::{Multipart, Path as AxumPath, State};
use axum::response::{Html, Redirect};
use axum::Extension;
use bucketview_core::constants::ILLEGAL_DIR_NAME_CHARS;
use bucketview_core::directories::create_directory;
use bucketview_core::listing::list;
use bucketview_core::paths::url_path;
use bucketview_core::ExplorerError;
use std::path::{Path, PathBuf};

/// `GET /`: redirect to the root of the bucket.
pub async fn index(State(state): State<AppState>) -> Redirect {
    Redirect::to(&format!("/explorer/{}", url_path(state.paths.mount_point())))
}

/// `GET /explorer/<dir_path>`: list a directory.
///
/// # Errors
///
/// - `404 Not Found` if the path is outside the bucket or does not exist.
/// - `503 Service Unavailable` if the mount stays stale after a remount.
pub async fn browse(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    AxumPath(dir_path): AxumPath<String>,
) -> Result<Html<String>, ApiError> {
    let dir = state.paths.resolve(&dir_path)?;

    let mount = state.mount.clone();
    let listed = dir.clone();
    let entries = tokio::task::spawn_blocking(move || list(&mount, &listed)).await??;

    let flashes = state.sessions.take_flashes(&user.session_id).await;
    let breadcrumbs = state.paths.breadcrumbs(&dir);
    let dir_url = url_path(&dir);

    Ok(Html(views::explorer_page(&ExplorerPage {
        bucket: state.cfg.bucket(),
        user: &user.email,
        dir_url: &dir_url,
        breadcrumbs: &breadcrumbs,
        entries: &entries,
        flashes: &flashes,
    })))
}

/// `POST /explorer/<dir_path>`: create a directory or upload a file.
///
/// A non-empty `create_dir` field takes precedence and ends the request;
/// otherwise `input_file` is uploaded. The outcome is reported as a flash
/// notice on the redirected page.
///
/// # Errors
///
/// Returns `404 Not Found` if the path is outside the bucket and
/// `400 Bad Request` if the multipart body is malformed.
pub async fn submit(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    AxumPath(dir_path): AxumPath<String>,
    mut multipart: Multipart,
) -> Result<Redirect, ApiError> {
    let dir = state.paths.resolve(&dir_path)?;
    let back = Redirect::to(&format!("/explorer/{}", url_path(&dir)));

    while let Some(field) = multipart.next_field().await.map_err(bad_body)? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("create_dir") => {
                let name = field.text().await.map_err(bad_body)?;
                if name.trim().is_empty() {
                    continue;
                }
                let flash = make_directory(&user, &dir, &name).await?;
                state
                    .sessions
                    .push_flash(&user.session_id, flash)
                    .await;
                return Ok(back);
            }
            Some("input_file") => {
                let client_filename = field.file_name().unwrap_or_default().to_string();
                let flash = match state.uploader.upload(field, &client_filename, &dir).await {
                    Ok(Some(outcome)) => {
                        tracing::warn!(
                            actor = %user.email,
                            path = %dir.join(&outcome.filename).display(),
                            "successfully uploaded a {} file",
                            bucketview_core::listing::pretty_size(outcome.size)
                        );
                        Flash::success(format!("Successfully uploaded {}", outcome.filename))
                    }
                    Ok(None) => continue,
                    Err(ExplorerError::RemoteWriteFailure { key, size, source }) => {
                        tracing::error!(
                            actor = %user.email,
                            path = %dir.display(),
                            "error uploading a {} file to {}: {}",
                            bucketview_core::listing::pretty_size(size),
                            key,
                            source
                        );
                        Flash::error(format!("Error uploading {}", file_leaf(&key)))
                    }
                    Err(e) => {
                        tracing::error!(actor = %user.email, path = %dir.display(), "upload error: {:?}", e);
                        Flash::error(format!("Error uploading {client_filename}"))
                    }
                };
                state
                    .sessions
                    .push_flash(&user.session_id, flash)
                    .await;
                return Ok(back);
            }
            _ => {}
        }
    }

    Ok(back)
}

async fn make_directory(user: &CurrentUser, dir: &Path, name: &str) -> Result<Flash, ApiError> {
    let parent: PathBuf = dir.to_path_buf();
    let requested = name.to_string();
    let result = tokio::task::spawn_blocking(move || create_directory(&parent, &requested)).await?;

    let flash = match result {
        Ok(created) => {
            tracing::warn!(actor = %user.email, path = %created.display(), "successfully created a directory");
            Flash::success(format!("Successfully created {name}!"))
        }
        Err(ExplorerError::AlreadyExists { path }) => {
            tracing::warn!(actor = %user.email, path = %path.display(), "failed to create directory: it already exists");
            Flash::error(format!("{name} already exists!"))
        }
        Err(ExplorerError::InvalidName { .. }) => {
            tracing::warn!(actor = %user.email, path = %dir.display(), "failed to create directory {:?}: it contains a special character", name);
            Flash::error(format!(
                "Error creating {name}, cannot contain a space or the following characters: {ILLEGAL_DIR_NAME_CHARS}"
            ))
        }
        Err(e) => {
            tracing::error!(actor = %user.email, path = %dir.display(), "create directory error: {:?}", e);
            Flash::error(format!("Error creating {name}"))
        }
    };
    Ok(flash)
}

fn file_leaf(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

fn bad_body(e: axum::extract::multipart::MultipartError) -> ApiError {
    ExplorerError::UploadBody(e.to_string()).into()
}
