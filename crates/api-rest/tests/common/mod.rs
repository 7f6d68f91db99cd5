#![allow(dead_code)]

use api_rest::{router, AppState, WebConfig};
use api_shared::SessionStore;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use bucketview_core::config::CommandLine;
use bucketview_core::{
    CoreConfig, MountCommand, ObjectStore, ObjectStoreError, SqliteUserStore, User, UserStore,
};
use bucketview_types::EmailAddress;
use http_body_util::BodyExt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

pub const BUCKET: &str = "flood-data";
pub const EMAIL: &str = "ops@example.com";
pub const PASSWORD: &str = "correct horse";
pub const SECRET: &str = "an-integration-test-secret-of-sufficient-length";
pub const BOUNDARY: &str = "bucketview-test-boundary";

/// Mount command that never touches the system.
#[derive(Default)]
pub struct FakeMount {
    pub mounts: AtomicUsize,
}

impl MountCommand for FakeMount {
    fn mount(&self, _bucket: &str, _mount_point: &Path) -> io::Result<()> {
        self.mounts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn unmount(&self, _mount_point: &Path) -> io::Result<()> {
        Ok(())
    }
}

/// Object store recording every write, with the staged bytes it was handed.
#[derive(Default)]
pub struct RecordingStore {
    pub fail: AtomicBool,
    pub puts: Mutex<Vec<(String, String, Vec<u8>)>>,
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn put_object(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
    ) -> Result<(), ObjectStoreError> {
        let bytes = std::fs::read(local_path).map_err(|e| ObjectStoreError(e.to_string()))?;
        self.puts
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string(), bytes));
        if self.fail.load(Ordering::SeqCst) {
            return Err(ObjectStoreError("access denied".into()));
        }
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub temp: TempDir,
    pub mount_point: PathBuf,
    pub store: Arc<RecordingStore>,
    pub mount: Arc<FakeMount>,
    pub sessions: SessionStore,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_job_api("http://127.0.0.1:9").await
    }

    /// Builds the app over a temporary bucket holding:
    ///
    /// ```text
    /// reports/summary.txt
    /// depths.csv
    /// levee.gpkg
    /// meta.json
    /// ```
    pub async fn with_job_api(job_api_url: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let mount_root = temp.path().join("mnt");
        let mount_point = mount_root.join(BUCKET);
        std::fs::create_dir_all(mount_point.join("reports")).unwrap();
        std::fs::write(mount_point.join("reports/summary.txt"), "all dry").unwrap();
        std::fs::write(mount_point.join("depths.csv"), "x,y,depth\n1,2,0.5\n").unwrap();
        std::fs::write(mount_point.join("levee.gpkg"), b"gpkg").unwrap();
        std::fs::write(mount_point.join("meta.json"), r#"{"run": 7}"#).unwrap();

        let cfg = CoreConfig::new(
            BUCKET.to_string(),
            mount_root,
            temp.path().join("scratch"),
            job_api_url.to_string(),
            CommandLine::parse("true").unwrap(),
            CommandLine::parse("true").unwrap(),
        )
        .unwrap();
        let web = WebConfig::new(
            SECRET,
            temp.path().join("static"),
            Duration::from_secs(3600),
            Duration::from_secs(7 * 24 * 3600),
        )
        .unwrap();

        let users = SqliteUserStore::connect(&temp.path().join("users.db"))
            .await
            .unwrap();
        let email = EmailAddress::parse(EMAIL).unwrap();
        users
            .create(&User::new(&email, PASSWORD, 4).unwrap())
            .await
            .unwrap();

        let store = Arc::new(RecordingStore::default());
        let mount = Arc::new(FakeMount::default());
        let state = AppState::new(
            cfg,
            web,
            mount.clone(),
            Arc::new(users),
            store.clone(),
            reqwest::Client::new(),
        )
        .unwrap();
        let sessions = state.sessions.clone();

        Self {
            router: router(state),
            temp,
            mount_point,
            store,
            mount,
            sessions,
        }
    }

    /// Mount point as it appears after a route prefix.
    pub fn url(&self, relative: &str) -> String {
        let base = bucketview_core::paths::url_path(&self.mount_point);
        if relative.is_empty() {
            base
        } else {
            format!("{base}/{relative}")
        }
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.temp.path().join("scratch/staging")
    }

    pub fn archives_dir(&self) -> PathBuf {
        self.temp.path().join("scratch/archives")
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, form: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(form.to_string())).unwrap())
            .await
    }

    pub async fn post_multipart(&self, uri: &str, body: Vec<u8>, cookie: &str) -> Response<Body> {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(header::COOKIE, cookie)
            .body(Body::from(body))
            .unwrap();
        self.send(req).await
    }

    /// Signs in as the seeded user and returns the `Cookie` header value.
    pub async fn login(&self) -> String {
        let res = self
            .post_form("/login", &login_form(EMAIL, PASSWORD), None)
            .await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/");
        set_cookie(&res).expect("login sets a session cookie")
    }
}

pub fn login_form(email: &str, password: &str) -> String {
    format!(
        "email={}&password={}",
        email.replace('@', "%40"),
        password.replace(' ', "+")
    )
}

pub fn location(res: &Response<Body>) -> String {
    res.headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default()
}

/// `name=value` part of the first `Set-Cookie` header that sets a value.
pub fn set_cookie(res: &Response<Body>) -> Option<String> {
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().split(';').next().unwrap().to_string())
        .find(|pair| !pair.ends_with('='))
}

pub fn set_cookie_header(res: &Response<Body>) -> String {
    res.headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default()
}

pub async fn body_bytes(res: Response<Body>) -> Vec<u8> {
    res.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_string(res: Response<Body>) -> String {
    String::from_utf8(body_bytes(res).await).unwrap()
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

pub fn multipart(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, content) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(content);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn dir_is_empty(dir: &Path) -> bool {
    match std::fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => true,
        Err(e) => panic!("cannot read {}: {e}", dir.display()),
    }
}
