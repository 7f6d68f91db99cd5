//! Bug reports filed as GitHub issues.

use crate::config::IssueTrackerConfig;
use crate::{ExplorerError, ExplorerResult};
use bucketview_types::NonEmptyText;
use serde::{Deserialize, Serialize};

/// A bug report submitted from the web form.
#[derive(Clone, Debug)]
pub struct BugReport {
    pub title: NonEmptyText,
    pub body: NonEmptyText,
    pub urgent: bool,
    /// Email of the operator who submitted the report.
    pub submitted_by: String,
}

impl BugReport {
    /// Issue body: the report text followed by the submitter, an urgency
    /// marker when flagged, and a provenance line.
    pub fn issue_body(&self) -> String {
        let mut body = format!("{}\n\n*Submitted by: {}*", self.body, self.submitted_by);
        if self.urgent {
            body.push_str("\n\n**This issue is urgent**");
        }
        body.push_str("\n\n*This issue was created through BucketView*");
        body
    }
}

#[derive(Debug, Deserialize)]
struct Contributor {
    login: String,
}

#[derive(Serialize)]
struct NewIssue<'a> {
    title: &'a str,
    body: String,
    assignees: Vec<String>,
}

/// Issue created on the tracker.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct CreatedIssue {
    pub number: u64,
    pub html_url: String,
}

/// Client for the GitHub issues API of one repository.
#[derive(Clone, Debug)]
pub struct IssueTracker {
    client: reqwest::Client,
    config: IssueTrackerConfig,
}

impl IssueTracker {
    pub fn new(client: reqwest::Client, config: IssueTrackerConfig) -> Self {
        Self { client, config }
    }

    fn repo_url(&self, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.org,
            self.config.repo,
            suffix
        )
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.config.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header(reqwest::header::USER_AGENT, "bucketview")
    }

    /// Creates an issue for `report`, assigned to the repository's contributors.
    ///
    /// # Errors
    ///
    /// - `ExplorerError::Http` if the API cannot be reached.
    /// - `ExplorerError::IssueTracker` if the API rejects either request.
    pub async fn create_issue(&self, report: &BugReport) -> ExplorerResult<CreatedIssue> {
        let response = self
            .request(reqwest::Method::GET, self.repo_url("contributors"))
            .send()
            .await?;
        let contributors: Vec<Contributor> = Self::check(response).await?.json().await?;

        let issue = NewIssue {
            title: report.title.as_str(),
            body: report.issue_body(),
            assignees: contributors.into_iter().map(|c| c.login).collect(),
        };
        let response = self
            .request(reqwest::Method::POST, self.repo_url("issues"))
            .json(&issue)
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn check(response: reqwest::Response) -> ExplorerResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ExplorerError::IssueTracker(format!("{status}: {body}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    fn report(urgent: bool) -> BugReport {
        BugReport {
            title: NonEmptyText::new("Upload fails").unwrap(),
            body: NonEmptyText::new("Large files time out.").unwrap(),
            urgent,
            submitted_by: "ops@example.com".into(),
        }
    }

    async fn spawn_github(accept_issues: bool) -> (String, Arc<Mutex<Option<Value>>>) {
        let received = Arc::new(Mutex::new(None));
        let sink = received.clone();
        let app = Router::new()
            .route(
                "/repos/acme/levees/contributors",
                get(|| async { Json(json!([{ "login": "alice" }, { "login": "bob" }])) }),
            )
            .route(
                "/repos/acme/levees/issues",
                post(move |headers: HeaderMap, Json(body): Json<Value>| async move {
                    assert_eq!(headers["authorization"], "Bearer secret");
                    *sink.lock().unwrap() = Some(body);
                    if accept_issues {
                        (
                            StatusCode::CREATED,
                            Json(json!({ "number": 7, "html_url": "https://github.com/acme/levees/issues/7" })),
                        )
                    } else {
                        (StatusCode::FORBIDDEN, Json(json!({ "message": "Bad credentials" })))
                    }
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), received)
    }

    fn tracker(api_url: String) -> IssueTracker {
        IssueTracker::new(
            reqwest::Client::new(),
            IssueTrackerConfig {
                token: "secret".into(),
                org: "acme".into(),
                repo: "levees".into(),
                api_url,
            },
        )
    }

    #[test]
    fn test_issue_body() {
        assert_eq!(
            report(false).issue_body(),
            "Large files time out.\n\n*Submitted by: ops@example.com*\n\n*This issue was created through BucketView*"
        );
        assert!(report(true)
            .issue_body()
            .contains("*Submitted by: ops@example.com*\n\n**This issue is urgent**\n\n*This issue"));
    }

    #[tokio::test]
    async fn test_create_issue_assigns_contributors() {
        let (url, received) = spawn_github(true).await;

        let issue = tracker(url).create_issue(&report(true)).await.unwrap();

        assert_eq!(issue.number, 7);
        let body = received.lock().unwrap().clone().unwrap();
        assert_eq!(body["title"], "Upload fails");
        assert_eq!(body["assignees"], json!(["alice", "bob"]));
        assert!(body["body"].as_str().unwrap().contains("**This issue is urgent**"));
    }

    #[tokio::test]
    async fn test_rejected_issue_is_an_error() {
        let (url, _) = spawn_github(false).await;

        let result = tracker(url).create_issue(&report(false)).await;

        match result {
            Err(ExplorerError::IssueTracker(message)) => assert!(message.contains("403")),
            other => panic!("expected IssueTracker error, got {other:?}"),
        }
    }
}
