//! Bug reporting.

use crate::middleware::CurrentUser;
use crate::{views, AppState};
use api_shared::Flash;
use axum::extract::State;
use axum::response::{Html, Redirect};
use axum::{Extension, Form};
use bucketview_core::issues::BugReport;
use bucketview_types::NonEmptyText;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct BugForm {
    pub bug_title: String,
    pub bug_report: String,
    pub urgent: Option<String>,
}

/// `GET /report_bug`
pub async fn report_form(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Html<String> {
    let flashes = state.sessions.take_flashes(&user.session_id).await;
    Html(views::bug_report_page(&user.email, &flashes))
}

/// `POST /report_bug`: file the report and come back to the form with a notice.
pub async fn report_bug(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<BugForm>,
) -> Redirect {
    let flash = submit(&state, &user, form).await;
    state
        .sessions
        .push_flash(&user.session_id, flash)
        .await;
    Redirect::to("/report_bug")
}

async fn submit(state: &AppState, user: &CurrentUser, form: BugForm) -> Flash {
    let Some(tracker) = state.issues.as_ref() else {
        tracing::error!(actor = %user.email, "bug report rejected: issue tracker is not configured");
        return Flash::error("Bug reporting is not configured");
    };

    let (title, body) = match (
        NonEmptyText::new(&form.bug_title),
        NonEmptyText::new(&form.bug_report),
    ) {
        (Ok(title), Ok(body)) => (title, body),
        _ => return Flash::error("Title and bug report are required"),
    };

    let report = BugReport {
        title,
        body,
        urgent: form.urgent.is_some(),
        submitted_by: user.email.clone(),
    };

    match tracker.create_issue(&report).await {
        Ok(issue) => {
            tracing::warn!(actor = %user.email, "successfully submitted a bug report - {}", issue.html_url);
            Flash::success("Bug report submitted successfully")
        }
        Err(e) => {
            tracing::error!(actor = %user.email, "bug report failed: {:?}", e);
            Flash::error("Error submitting bug report")
        }
    }
}
