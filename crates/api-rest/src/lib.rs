//! # API REST
//!
//! The BucketView web interface.
//!
//! Handles:
//! - HTML pages for browsing, uploading and downloading with axum
//! - Session cookies and the login gate
//! - Job dispatch, inline views and bug reports
//! - OpenAPI/Swagger documentation of the JSON routes
//!
//! Uses `api-shared` for sessions and credential checks, and `bucketview-core`
//! for everything that touches the bucket.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod views;

use api_shared::{HealthRes, SessionStore};
use axum::extract::{DefaultBodyLimit, FromRef};
use axum::routing::get;
use axum::Router;
use axum_extra::extract::cookie::Key;
use bucketview_core::issues::IssueTracker;
use bucketview_core::jobs::{JobDispatcher, JobKind};
use bucketview_core::{
    CoreConfig, ExplorerError, ExplorerResult, MountCommand, MountManager, MountPaths,
    ObjectStore, Uploader, UserStore,
};
use bucketview_files::StagingArea;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use error::ApiError;
pub use middleware::CurrentUser;

/// Minimum length of `SECRET_KEY` in bytes.
pub const MIN_SECRET_KEY_LEN: usize = 32;

/// Web-layer settings resolved at startup.
#[derive(Clone)]
pub struct WebConfig {
    secret_key: Key,
    static_dir: PathBuf,
    session_ttl: Duration,
    remember_ttl: Duration,
}

impl WebConfig {
    /// Create a new `WebConfig`.
    ///
    /// # Errors
    ///
    /// Returns `ExplorerError::InvalidConfig` if the secret is shorter than
    /// [`MIN_SECRET_KEY_LEN`] bytes or a session lifetime is zero.
    pub fn new(
        secret: &str,
        static_dir: PathBuf,
        session_ttl: Duration,
        remember_ttl: Duration,
    ) -> ExplorerResult<Self> {
        if secret.len() < MIN_SECRET_KEY_LEN {
            return Err(ExplorerError::InvalidConfig(format!(
                "SECRET_KEY must be at least {MIN_SECRET_KEY_LEN} bytes"
            )));
        }
        if session_ttl.is_zero() || remember_ttl.is_zero() {
            return Err(ExplorerError::InvalidConfig(
                "session lifetimes must be positive".into(),
            ));
        }

        Ok(Self {
            secret_key: Key::derive_from(secret.as_bytes()),
            static_dir,
            session_ttl,
            remember_ttl,
        })
    }

    pub fn static_dir(&self) -> &std::path::Path {
        &self.static_dir
    }
}

/// Application state shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<CoreConfig>,
    pub web: Arc<WebConfig>,
    pub mount: MountManager,
    pub paths: MountPaths,
    pub users: Arc<dyn UserStore>,
    pub uploader: Uploader,
    pub sessions: SessionStore,
    pub jobs: JobDispatcher,
    pub issues: Option<IssueTracker>,
}

impl AppState {
    /// Wires the services together.
    ///
    /// # Errors
    ///
    /// Returns an error if the staging directory cannot be created.
    pub fn new(
        cfg: CoreConfig,
        web: WebConfig,
        mount_command: Arc<dyn MountCommand>,
        users: Arc<dyn UserStore>,
        store: Arc<dyn ObjectStore>,
        http: reqwest::Client,
    ) -> ExplorerResult<Self> {
        let mount_point = cfg.mount_point();
        let mount = MountManager::new(cfg.bucket().to_string(), mount_point.clone(), mount_command);
        let paths = MountPaths::new(mount_point);
        let staging = StagingArea::new(cfg.temp_dir())?;
        let uploader = Uploader::new(store, staging, cfg.bucket().to_string(), paths.clone());
        let sessions = SessionStore::new(web.session_ttl, web.remember_ttl);
        let jobs = JobDispatcher::new(http.clone(), cfg.job_api_url());
        let issues = cfg
            .issue_tracker()
            .cloned()
            .map(|tracker| IssueTracker::new(http, tracker));

        Ok(Self {
            cfg: Arc::new(cfg),
            web: Arc::new(web),
            mount,
            paths,
            users,
            uploader,
            sessions,
            jobs,
            issues,
        })
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.web.secret_key.clone()
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        handlers::view::view_file,
        handlers::jobs::reprocess,
        handlers::jobs::compute_leveed_area,
        handlers::jobs::create_report,
    ),
    components(schemas(HealthRes))
)]
pub struct ApiDoc;

/// Builds the application router.
///
/// Every route except `/health`, `/favicon.ico`, `/login` and the API docs
/// sits behind the login gate and carries no-cache headers.
pub fn router(state: AppState) -> Router {
    let job_route = |kind: JobKind| format!("/background_{}/*filepath", kind.route_name());

    let protected = Router::new()
        .route("/", get(handlers::explorer::index))
        .route("/logout", get(handlers::auth::logout))
        .route(
            "/explorer/*dir_path",
            get(handlers::explorer::browse)
                .post(handlers::explorer::submit)
                .layer(DefaultBodyLimit::disable()),
        )
        .route("/download/*filepath", get(handlers::download::download))
        .route("/view/*filepath", get(handlers::view::view_file))
        .route(&job_route(JobKind::Reprocess), get(handlers::jobs::reprocess))
        .route(
            &job_route(JobKind::ComputeLeveedArea),
            get(handlers::jobs::compute_leveed_area),
        )
        .route(&job_route(JobKind::CreateReport), get(handlers::jobs::create_report))
        .route(
            "/report_bug",
            get(handlers::issues::report_form).post(handlers::issues::report_bug),
        )
        .layer(axum::middleware::from_fn(middleware::no_cache))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_login,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/favicon.ico", get(handlers::favicon))
        .route(
            "/login",
            get(handlers::auth::login_form).post(handlers::auth::login),
        )
        .merge(protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint
///
/// Used by container orchestration and load balancers; requires no session.
#[axum::debug_handler]
async fn health() -> axum::Json<HealthRes> {
    axum::Json(api_shared::HealthService::check_health())
}
