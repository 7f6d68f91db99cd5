use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use api_rest::{AppState, WebConfig};
use bucketview_core::config::{command_from_env_value, seconds_from_env_value};
use bucketview_core::constants::{
    DEFAULT_JOB_API_URL, DEFAULT_MOUNT_COMMAND, DEFAULT_MOUNT_ROOT, DEFAULT_TEMP_DIR,
    DEFAULT_UNMOUNT_COMMAND,
};
use bucketview_core::{CoreConfig, ExternalMountCommand, IssueTrackerConfig, S3ObjectStore, SqliteUserStore};

const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_REMEMBER_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Targets logged at info and above. Audit entries come from `api_rest` and
/// `api_shared`; request spans from `tower_http`.
const LOG_DIRECTIVES: [&str; 6] = [
    "bucketview_run=info",
    "bucketview_core=info",
    "bucketview_files=info",
    "api_rest=info",
    "api_shared=info",
    "tower_http=info",
];

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn required(name: &str) -> anyhow::Result<String> {
    env(name)
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("{name} must be set"))
}

/// Adds the workspace targets to `filter`.
fn log_filter(mut filter: EnvFilter) -> anyhow::Result<EnvFilter> {
    for directive in LOG_DIRECTIVES {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

/// Installs the global subscriber.
///
/// Logs go to stdout, or to the file named by `BUCKETVIEW_LOG` through a
/// non-blocking writer whose guard must outlive the server.
fn init_tracing() -> anyhow::Result<Option<WorkerGuard>> {
    let filter = log_filter(EnvFilter::from_default_env())?;

    let (file_layer, guard) = match env("BUCKETVIEW_LOG") {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("cannot open log file {path}"))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    let stdout_layer = file_layer.is_none().then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(guard)
}

/// Main entry point for BucketView
///
/// Resolves configuration from the environment, mounts the bucket and serves
/// the web interface until SIGINT or SIGTERM.
///
/// # Environment Variables
/// - `BUCKETVIEW_ADDR`: listen address (default: "0.0.0.0:5000")
/// - `AWS_S3_BUCKET`: bucket to expose (required)
/// - `SQLITE_DB`: credential database (required)
/// - `SECRET_KEY`: cookie signing key, at least 32 bytes (required)
/// - `MOUNT_ROOT`, `MOUNT_COMMAND`, `UNMOUNT_COMMAND`: FUSE mount settings
/// - `TEMP_DIR`, `STATIC_DIR`, `JOB_API_URL`
/// - `SESSION_TTL_SECS`, `REMEMBER_TTL_SECS`
/// - `GIT_TOKEN`, `GIT_ORG`, `GIT_REPO`: optional bug report target
/// - `BUCKETVIEW_LOG`: log file (default: stdout)
///
/// # Returns
/// * `Err(anyhow::Error)` - If configuration is invalid, the bucket cannot be
///   mounted or the listener fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing()?;

    let addr = env("BUCKETVIEW_ADDR").unwrap_or_else(|| "0.0.0.0:5000".into());

    let mount_command = command_from_env_value(env("MOUNT_COMMAND"), DEFAULT_MOUNT_COMMAND)?;
    let unmount_command = command_from_env_value(env("UNMOUNT_COMMAND"), DEFAULT_UNMOUNT_COMMAND)?;
    let cfg = CoreConfig::new(
        required("AWS_S3_BUCKET")?,
        PathBuf::from(env("MOUNT_ROOT").unwrap_or_else(|| DEFAULT_MOUNT_ROOT.into())),
        PathBuf::from(env("TEMP_DIR").unwrap_or_else(|| DEFAULT_TEMP_DIR.into())),
        env("JOB_API_URL").unwrap_or_else(|| DEFAULT_JOB_API_URL.into()),
        mount_command.clone(),
        unmount_command.clone(),
    )?
    .with_issue_tracker(IssueTrackerConfig::from_env_values(
        env("GIT_TOKEN"),
        env("GIT_ORG"),
        env("GIT_REPO"),
    ));
    if cfg.issue_tracker().is_none() {
        tracing::warn!("GIT_TOKEN, GIT_ORG or GIT_REPO not set; bug reporting is disabled");
    }

    let web = WebConfig::new(
        &required("SECRET_KEY")?,
        PathBuf::from(env("STATIC_DIR").unwrap_or_else(|| "static".into())),
        Duration::from_secs(seconds_from_env_value(
            env("SESSION_TTL_SECS"),
            DEFAULT_SESSION_TTL_SECS,
        )?),
        Duration::from_secs(seconds_from_env_value(
            env("REMEMBER_TTL_SECS"),
            DEFAULT_REMEMBER_TTL_SECS,
        )?),
    )?;

    let database = PathBuf::from(required("SQLITE_DB")?);
    let users = SqliteUserStore::connect(&database)
        .await
        .with_context(|| format!("cannot open user database {}", database.display()))?;
    let store = S3ObjectStore::from_env().await;
    let http = reqwest::Client::builder()
        .user_agent("bucketview")
        .build()?;

    let state = AppState::new(
        cfg,
        web,
        Arc::new(ExternalMountCommand::new(mount_command, unmount_command)),
        Arc::new(users),
        Arc::new(store),
        http,
    )?;

    let mount = state.mount.clone();
    let mount_point = tokio::task::spawn_blocking(move || mount.ensure_mounted())
        .await?
        .context("cannot mount the bucket")?;
    tracing::info!("++ Bucket {} mounted at {}", state.cfg.bucket(), mount_point.display());

    let app = api_rest::router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("++ Starting BucketView on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutting down...");
}
