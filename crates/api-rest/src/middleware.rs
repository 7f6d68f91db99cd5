//! Login gate, no-cache headers and session cookie helpers.

use crate::AppState;
use api_shared::IssuedSession;
use axum::extract::{Request, State};
use axum::http::header::{CACHE_CONTROL, EXPIRES, PRAGMA};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::SignedCookieJar;

pub const SESSION_COOKIE: &str = "bucketview_session";

/// Signed cookie carrying the failed-login notice to the next `GET /login`.
pub const LOGIN_FLASH_COOKIE: &str = "bucketview_login_flash";

const LOGIN_FLASH_TTL_SECS: i64 = 60;

pub const NO_CACHE: &str = "no-store, no-cache, must-revalidate, private, max-age=0";

/// The signed-in operator, inserted into request extensions by [`require_login`].
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub email: String,
    pub session_id: String,
}

/// Session id from the signed cookie, if present and untampered.
pub fn session_id(jar: &SignedCookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

/// Cookie carrying a newly issued session id.
///
/// Without "remember me" it is a browser-session cookie.
pub fn session_cookie(issued: &IssuedSession) -> Cookie<'static> {
    let mut builder = Cookie::build((SESSION_COOKIE, issued.id.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    if issued.persistent {
        builder = builder.max_age(cookie::time::Duration::seconds(
            i64::try_from(issued.ttl.as_secs()).unwrap_or(i64::MAX),
        ));
    }
    builder.build()
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// Short-lived cookie marking a failed login for an anonymous visitor.
pub fn login_flash_cookie() -> Cookie<'static> {
    Cookie::build((LOGIN_FLASH_COOKIE, "1"))
        .path("/login")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::seconds(LOGIN_FLASH_TTL_SECS))
        .build()
}

pub fn login_flash_removal_cookie() -> Cookie<'static> {
    Cookie::build(LOGIN_FLASH_COOKIE).path("/login").build()
}

/// Lets the request through only for a live, signed-in session; everything
/// else is redirected to `/login` before the handler runs.
pub async fn require_login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(id) = session_id(&jar) {
        if let Some(email) = state.sessions.current_user(&id).await {
            req.extensions_mut().insert(CurrentUser {
                email,
                session_id: id,
            });
            return next.run(req).await;
        }
    }

    tracing::debug!("unauthenticated request to {}", req.uri().path());
    Redirect::to("/login").into_response()
}

/// Marks the response as uncacheable.
pub async fn no_cache(req: Request, next: Next) -> Response {
    let mut res = next.run(req).await;
    let headers = res.headers_mut();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(EXPIRES, HeaderValue::from_static("0"));
    res
}
