//! Sign-in and sign-out.

use crate::middleware::{
    login_flash_cookie, login_flash_removal_cookie, removal_cookie, session_cookie, session_id,
    CurrentUser, LOGIN_FLASH_COOKIE,
};
use crate::{views, ApiError, AppState};
use api_shared::{authenticate, AuthError, Flash};
use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use axum_extra::extract::SignedCookieJar;
use serde::Deserialize;

pub const LOGIN_FAILED: &str = "Invalid username or password";

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    /// Present (any value) when the box is ticked.
    pub remember_me: Option<String>,
}

/// `GET /login`: the sign-in form, or a redirect home when already signed in.
///
/// A pending failed-login notice is shown once and its cookie cleared.
pub async fn login_form(State(state): State<AppState>, jar: SignedCookieJar) -> Response {
    if let Some(id) = session_id(&jar) {
        if state.sessions.current_user(&id).await.is_some() {
            return Redirect::to("/").into_response();
        }
    }
    if jar.get(LOGIN_FLASH_COOKIE).is_none() {
        return Html(views::login_page(&[])).into_response();
    }
    let page = views::login_page(&[Flash::error(LOGIN_FAILED)]);
    (jar.remove(login_flash_removal_cookie()), Html(page)).into_response()
}

/// `POST /login`
///
/// On success the session id is rotated and the user is sent home. On any
/// credential failure the same notice is set in a signed cookie and the form
/// is shown again; no server-side state is created.
///
/// # Errors
///
/// Returns `500 Internal Server Error` if the credential store fails.
pub async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(SignedCookieJar, Redirect), ApiError> {
    let previous = session_id(&jar);

    match authenticate(state.users.as_ref(), &form.email, &form.password).await {
        Ok(user) => {
            let remember = form.remember_me.is_some();
            let issued = state
                .sessions
                .login(previous.as_deref(), &user.email, remember)
                .await;
            if let Err(e) = state.users.set_authenticated(&user.email, true).await {
                tracing::error!("Set authenticated error: {:?}", e);
            }
            tracing::warn!(actor = %user.email, "successfully logged in");
            let jar = jar
                .remove(login_flash_removal_cookie())
                .add(session_cookie(&issued));
            Ok((jar, Redirect::to("/")))
        }
        Err(AuthError::InvalidCredentials) => {
            tracing::warn!(actor = %form.email, "login failed");
            Ok((jar.add(login_flash_cookie()), Redirect::to("/login")))
        }
        Err(e) => Err(e.into()),
    }
}

/// `GET /logout`: ends the session and clears the cookie.
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    jar: SignedCookieJar,
) -> impl IntoResponse {
    state.sessions.logout(&user.session_id).await;
    if let Err(e) = state.users.set_authenticated(&user.email, false).await {
        tracing::error!("Clear authenticated error: {:?}", e);
    }
    tracing::warn!(actor = %user.email, "logged out");
    (jar.remove(removal_cookie()), Redirect::to("/"))
}
