//! Dispatch of long-running processing jobs to the job service.
//!
//! Only the POST round trip is awaited; the job itself runs on the remote side
//! and its completion is never tracked here.

use crate::ExplorerResult;
use serde::Serialize;
use std::fmt;

/// Processing jobs that can be started from the explorer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobKind {
    Reprocess,
    ComputeLeveedArea,
    CreateReport,
}

impl JobKind {
    pub const ALL: [JobKind; 3] = [
        JobKind::Reprocess,
        JobKind::ComputeLeveedArea,
        JobKind::CreateReport,
    ];

    /// Name used in the `/background_<name>/` route.
    pub fn route_name(self) -> &'static str {
        match self {
            JobKind::Reprocess => "reprocess",
            JobKind::ComputeLeveedArea => "compute_leveed_area",
            JobKind::CreateReport => "create_report",
        }
    }

    /// Path of the job service endpoint.
    pub fn endpoint(self) -> &'static str {
        match self {
            JobKind::Reprocess => "/reprocess_geopackage",
            JobKind::ComputeLeveedArea => "/compute_leveed_areas",
            JobKind::CreateReport => "/create_report",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.route_name())
    }
}

#[derive(Serialize)]
struct JobRequest<'a> {
    gpkg_path: &'a str,
}

/// Status and body returned by the job service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobResponse {
    pub status: u16,
    pub body: String,
}

impl JobResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client for the job service.
#[derive(Clone, Debug)]
pub struct JobDispatcher {
    client: reqwest::Client,
    base_url: String,
}

impl JobDispatcher {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Prefixes `/` when the path is relative.
    pub fn normalize_path(path: &str) -> String {
        if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        }
    }

    /// Posts `{"gpkg_path": <path>}` to the job's endpoint.
    ///
    /// Any HTTP status from the service is returned as a [`JobResponse`];
    /// only transport failures are errors.
    ///
    /// # Errors
    ///
    /// Returns `ExplorerError::Http` if the service cannot be reached or the
    /// response body cannot be read.
    pub async fn dispatch(&self, kind: JobKind, path: &str) -> ExplorerResult<JobResponse> {
        let gpkg_path = Self::normalize_path(path);
        let url = format!("{}{}", self.base_url, kind.endpoint());

        tracing::debug!("dispatching {} for {} to {}", kind, gpkg_path, url);
        let response = self
            .client
            .post(&url)
            .json(&JobRequest {
                gpkg_path: &gpkg_path,
            })
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(JobResponse { status, body })
    }
}
