//! GitHub REST API client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::errors::GitHubError;
use crate::lookup::ProfileSource;

const TIMELINE_ACCEPT: &str = "application/vnd.github.mockingbird-preview+json";
const PER_PAGE: &str = "100";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Kind of GitHub account, the `type` field of a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountKind {
    #[default]
    User,
    Organization,
    Bot,
    #[serde(other)]
    Other,
}

/// `GET /users/{login}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubProfile {
    pub login: String,
    #[serde(rename = "type", default)]
    pub account_type: AccountKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl GitHubProfile {
    /// The profile name, or `login` when the profile has none.
    pub fn display_name<'a>(&'a self, login: &'a str) -> &'a str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => login,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubUserSummary {
    pub login: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitHubGitActor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubCommitDetail {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: Option<GitHubGitActor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubCommit {
    pub sha: String,
    pub commit: GitHubCommitDetail,
    /// The linked account, absent when the commit email maps to no user.
    #[serde(default)]
    pub author: Option<GitHubUserSummary>,
}

/// `GET /repos/{repo}/compare/{base}...{head}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareResult {
    #[serde(default)]
    pub commits: Vec<GitHubCommit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub user: Option<GitHubUserSummary>,
    pub html_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    #[serde(default)]
    pub user: Option<GitHubUserSummary>,
    #[serde(default)]
    pub body: Option<String>,
    pub html_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    #[serde(default)]
    pub user: Option<GitHubUserSummary>,
    pub html_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineIssue {
    pub number: u64,
    /// Present only when the referencing issue is a pull request.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineSource {
    #[serde(default)]
    pub issue: Option<TimelineIssue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub source: Option<TimelineSource>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Asynchronous GitHub REST API client.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Result<Self, GitHubError> {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        let token = token.into();
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("cffauthors/0.1"));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        info!(api_url = %api_url, "created GitHubClient");
        Ok(Self {
            http,
            api_url,
            token,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, login: &str) -> Result<GitHubProfile, GitHubError> {
        let url = format!("{}/users/{}", self.api_url, login);
        let resp = self.http.get(&url).bearer_auth(&self.token).send().await?;
        check_response(&resp, &format!("users/{}", login))?;
        let profile: GitHubProfile = resp.json().await?;
        debug!(login = %profile.login, kind = ?profile.account_type, "fetched user");
        Ok(profile)
    }

    /// Commits between two refs of `repo`.
    #[instrument(skip(self))]
    pub async fn compare(
        &self,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Result<Vec<GitHubCommit>, GitHubError> {
        let url = format!("{}/repos/{}/compare/{}...{}", self.api_url, repo, base, head);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("per_page", PER_PAGE)])
            .send()
            .await?;
        check_response(&resp, &format!("repos/{}/compare", repo))?;
        let result: CompareResult = resp.json().await?;
        debug!(count = result.commits.len(), "fetched compared commits");
        Ok(result.commits)
    }

    #[instrument(skip(self))]
    pub async fn list_reviews(&self, repo: &str, pr_number: u64) -> Result<Vec<Review>, GitHubError> {
        let url = format!("{}/repos/{}/pulls/{}/reviews", self.api_url, repo, pr_number);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("per_page", PER_PAGE)])
            .send()
            .await?;
        check_response(&resp, &format!("repos/{}/pulls/{}/reviews", repo, pr_number))?;
        let reviews: Vec<Review> = resp.json().await?;
        debug!(count = reviews.len(), pr_number, "fetched reviews");
        Ok(reviews)
    }

    /// Comments on an issue or on the conversation tab of a pull request.
    #[instrument(skip(self))]
    pub async fn list_issue_comments(
        &self,
        repo: &str,
        number: u64,
    ) -> Result<Vec<IssueComment>, GitHubError> {
        let url = format!("{}/repos/{}/issues/{}/comments", self.api_url, repo, number);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("per_page", PER_PAGE)])
            .send()
            .await?;
        check_response(&resp, &format!("repos/{}/issues/{}/comments", repo, number))?;
        let comments: Vec<IssueComment> = resp.json().await?;
        debug!(count = comments.len(), number, "fetched issue comments");
        Ok(comments)
    }

    #[instrument(skip(self))]
    pub async fn list_timeline(
        &self,
        repo: &str,
        number: u64,
    ) -> Result<Vec<TimelineEvent>, GitHubError> {
        let url = format!("{}/repos/{}/issues/{}/timeline", self.api_url, repo, number);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header(ACCEPT, TIMELINE_ACCEPT)
            .query(&[("per_page", PER_PAGE)])
            .send()
            .await?;
        check_response(&resp, &format!("repos/{}/issues/{}/timeline", repo, number))?;
        let events: Vec<TimelineEvent> = resp.json().await?;
        debug!(count = events.len(), number, "fetched timeline");
        Ok(events)
    }

    #[instrument(skip(self))]
    pub async fn get_issue(&self, repo: &str, number: u64) -> Result<Issue, GitHubError> {
        let url = format!("{}/repos/{}/issues/{}", self.api_url, repo, number);
        let resp = self.http.get(&url).bearer_auth(&self.token).send().await?;
        check_response(&resp, &format!("repos/{}/issues/{}", repo, number))?;
        let issue: Issue = resp.json().await?;
        debug!(number = issue.number, "fetched issue");
        Ok(issue)
    }

    #[instrument(skip(self, body))]
    pub async fn create_issue_comment(
        &self,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<IssueComment, GitHubError> {
        let url = format!("{}/repos/{}/issues/{}/comments", self.api_url, repo, number);
        let payload = serde_json::json!({ "body": body });
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;
        check_response(&resp, &format!("repos/{}/issues/{}/comments", repo, number))?;
        let comment: IssueComment = resp.json().await?;
        info!(comment_id = comment.id, number, "created issue comment");
        Ok(comment)
    }

    #[instrument(skip(self, body))]
    pub async fn update_issue_comment(
        &self,
        repo: &str,
        comment_id: u64,
        body: &str,
    ) -> Result<IssueComment, GitHubError> {
        let url = format!("{}/repos/{}/issues/comments/{}", self.api_url, repo, comment_id);
        let payload = serde_json::json!({ "body": body });
        let resp = self
            .http
            .patch(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;
        check_response(&resp, &format!("repos/{}/issues/comments/{}", repo, comment_id))?;
        let comment: IssueComment = resp.json().await?;
        info!(comment_id = comment.id, "updated issue comment");
        Ok(comment)
    }
}

#[async_trait]
impl ProfileSource for GitHubClient {
    async fn fetch_profile(&self, login: &str) -> Result<GitHubProfile, GitHubError> {
        self.get_user(login).await
    }
}

fn check_response(resp: &reqwest::Response, resource: &str) -> Result<(), GitHubError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    match status.as_u16() {
        401 | 403 => Err(GitHubError::AuthenticationFailed(format!("HTTP {}", status))),
        404 => Err(GitHubError::NotFound(resource.to_string())),
        429 => {
            let reset = resp
                .headers()
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string();
            Err(GitHubError::RateLimited { reset_at: reset })
        }
        code => Err(GitHubError::ApiError {
            status: code,
            body: format!("HTTP {}", status),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_deserialize() {
        let profile: GitHubProfile = serde_json::from_str(
            r#"{"login": "acme-bot", "id": 7, "type": "Organization", "name": "ACME Inc",
                "email": null, "bio": null, "public_repos": 3}"#,
        )
        .unwrap();
        assert_eq!(profile.account_type, AccountKind::Organization);
        assert_eq!(profile.name.as_deref(), Some("ACME Inc"));
        assert_eq!(profile.email, None);
    }

    #[test]
    fn test_unknown_account_type() {
        let profile: GitHubProfile =
            serde_json::from_str(r#"{"login": "ghost", "type": "Mannequin"}"#).unwrap();
        assert_eq!(profile.account_type, AccountKind::Other);

        let profile: GitHubProfile = serde_json::from_str(r#"{"login": "plain"}"#).unwrap();
        assert_eq!(profile.account_type, AccountKind::User);
    }

    #[test]
    fn test_display_name_falls_back_to_login() {
        let mut profile: GitHubProfile =
            serde_json::from_str(r#"{"login": "octocat", "type": "User", "name": "  "}"#).unwrap();
        assert_eq!(profile.display_name("octocat"), "octocat");
        profile.name = Some("The Octocat".into());
        assert_eq!(profile.display_name("octocat"), "The Octocat");
    }

    #[test]
    fn test_compare_payload() {
        let result: CompareResult = serde_json::from_str(
            r#"{"status": "ahead", "commits": [
                {"sha": "abc", "author": {"login": "alice", "id": 1},
                 "commit": {"message": "Fix", "author": {"name": "Alice", "email": "a@x.com", "date": "2024-01-01T00:00:00Z"}}},
                {"sha": "def", "author": null,
                 "commit": {"message": "Docs", "author": {"name": "Bob Lee", "email": "bob@x.com"}}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(result.commits.len(), 2);
        assert_eq!(result.commits[0].author.as_ref().unwrap().login, "alice");
        assert!(result.commits[1].author.is_none());
    }

    #[test]
    fn test_timeline_payload() {
        let events: Vec<TimelineEvent> = serde_json::from_str(
            r#"[
                {"event": "labeled"},
                {"event": "cross-referenced", "source": {"type": "issue", "issue": {"number": 12}}},
                {"event": "cross-referenced", "source": {"issue": {"number": 13, "pull_request": {"url": "x"}}}}
            ]"#,
        )
        .unwrap();
        assert_eq!(events.len(), 3);
        assert!(events[2].source.as_ref().unwrap().issue.as_ref().unwrap().pull_request.is_some());
    }
}
