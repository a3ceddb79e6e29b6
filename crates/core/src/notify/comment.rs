//! Pull request summary comment.
//!
//! The comment carries a hidden marker so later runs edit it in place instead
//! of stacking new comments.

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use super::RunSummary;
use crate::errors::ReportError;
use crate::github::client::GitHubClient;

/// Hidden marker identifying the comment.
pub const COMMENT_MARKER: &str = "<!-- contributor-check-comment -->";

/// Render the comment body.
pub fn render_comment(summary: &RunSummary, now: DateTime<Utc>, sha: Option<&str>) -> String {
    let mut body = String::new();
    body.push_str(COMMENT_MARKER);
    body.push_str("\n### New Authors Detected\n\n**New GitHub Users or Commit Authors:**\n");
    if summary.new_authors.is_empty() {
        body.push_str("_None_\n");
    } else {
        for author in &summary.new_authors {
            body.push_str(&format!("- {}\n", author));
        }
    }

    body.push_str(&format!(
        "\n**Updated `{}` file:**\n```yaml\n{}",
        summary.cff_path, summary.updated_cff
    ));
    if !summary.updated_cff.ends_with('\n') {
        body.push('\n');
    }
    body.push_str("```\n");

    if !summary.warnings.is_empty() {
        body.push_str("\n**Warnings & Recommendations:**\n");
        body.push_str(&summary.warnings.join("\n"));
        body.push('\n');
    }

    if !summary.missing_authors.is_empty() {
        body.push_str(&format!(
            "\n**Contributors missing from `{}`:**\n",
            summary.cff_path
        ));
        for author in &summary.missing_authors {
            body.push_str(&format!("- {}\n", author));
        }
        if summary.missing_author_invalidates_pr {
            body.push_str(&format!(
                "\n> [!CAUTION]\n> This pull request is blocked until every contributor is listed in `{}`.\n",
                summary.cff_path
            ));
        }
    }

    if !summary.logs.is_empty() {
        body.push_str("\n<details>\n<summary><strong>ORCID Match Details</strong></summary>\n\n");
        body.push_str(&summary.logs.join("\n"));
        body.push_str("\n\n</details>\n");
    }

    let short_sha = sha.map(|s| s.get(..7).unwrap_or(s)).unwrap_or("unknown");
    body.push_str(&format!(
        "\n_Last updated: {} UTC · Commit `{}`_\n",
        now.format("%Y-%m-%d %H:%M"),
        short_sha
    ));
    body
}

/// Publishes the summary comment on a pull request.
pub struct CommentPublisher<'a> {
    client: &'a GitHubClient,
}

impl<'a> CommentPublisher<'a> {
    pub fn new(client: &'a GitHubClient) -> Self {
        Self { client }
    }

    /// Update the marked comment, or create it when none exists.
    #[instrument(skip(self, body))]
    pub async fn upsert(&self, repo: &str, pr_number: u64, body: &str) -> Result<(), ReportError> {
        let comments = self.client.list_issue_comments(repo, pr_number).await?;
        let existing = comments.iter().find(|c| {
            c.body
                .as_deref()
                .is_some_and(|b| b.contains(COMMENT_MARKER))
        });

        match existing {
            Some(comment) => {
                self.client
                    .update_issue_comment(repo, comment.id, body)
                    .await?;
                info!(comment_id = comment.id, "updated summary comment");
            }
            None => {
                self.client
                    .create_issue_comment(repo, pr_number, body)
                    .await?;
                info!(pr_number, "posted summary comment");
            }
        }
        Ok(())
    }
}
