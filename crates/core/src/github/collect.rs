//! Contributor collection from pull request activity.
//!
//! Each kind of activity is gated by an [`AuthorshipConfig`] switch. Every
//! signal found is recorded in [`ContributionEvidence`] together with the
//! commit SHA or `html_url` that justifies it.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex_lite::Regex;
use tracing::{info, instrument, warn};

use crate::config::{AuthorshipConfig, PullRequestContext};
use crate::errors::GitHubError;
use crate::github::client::{GitHubClient, GitHubCommit, GitHubUserSummary, TimelineEvent};
use crate::models::{ContributionCategory, ContributionEvidence, ContributorSignal};

fn coauthor_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^Co-authored-by:\s*(.+?)\s*<(.+?)>$").expect("static co-author pattern")
    })
}

/// Parse a `Co-authored-by: Name <email>` trailer line.
pub fn parse_coauthor(line: &str) -> Option<(String, String)> {
    let caps = coauthor_pattern().captures(line.trim())?;
    let name = caps.get(1)?.as_str().trim();
    let email = caps.get(2)?.as_str().trim();
    Some((name.to_string(), email.to_string()))
}

/// Record the signals of a list of commits.
///
/// A commit linked to an account yields its login; otherwise the commit
/// author yields a name/email pair when either part is set.
pub fn record_commits(
    commits: &[GitHubCommit],
    include_coauthors: bool,
    evidence: &mut ContributionEvidence,
) {
    for commit in commits {
        match commit.author.as_ref().filter(|a| !a.login.is_empty()) {
            Some(account) => evidence.record(
                ContributorSignal::handle(&account.login),
                ContributionCategory::Commits,
                &commit.sha,
            ),
            None => {
                let actor = commit.commit.author.clone().unwrap_or_default();
                let name = actor.name.unwrap_or_default();
                let email = actor.email.unwrap_or_default();
                if name.is_empty() && email.is_empty() {
                    warn!(sha = %commit.sha, "commit has no author identity");
                } else {
                    evidence.record(
                        ContributorSignal::commit_author(name, email),
                        ContributionCategory::Commits,
                        &commit.sha,
                    );
                }
            }
        }

        if include_coauthors {
            for (name, email) in commit.commit.message.lines().filter_map(parse_coauthor) {
                evidence.record(
                    ContributorSignal::commit_author(name, email),
                    ContributionCategory::Commits,
                    &commit.sha,
                );
            }
        }
    }
}

/// Record one piece of activity by a (possibly deleted) user.
pub fn record_activity(
    user: Option<&GitHubUserSummary>,
    category: ContributionCategory,
    url: &str,
    evidence: &mut ContributionEvidence,
) {
    if let Some(user) = user.filter(|u| !u.login.is_empty()) {
        evidence.record(ContributorSignal::handle(&user.login), category, url);
    }
}

/// Issues referenced from the pull request timeline, excluding pull requests.
pub fn linked_issue_numbers(events: &[TimelineEvent]) -> Vec<u64> {
    let mut numbers: Vec<u64> = events
        .iter()
        .filter(|e| e.event.as_deref() == Some("cross-referenced"))
        .filter_map(|e| e.source.as_ref()?.issue.as_ref())
        .filter(|issue| issue.pull_request.is_none())
        .map(|issue| issue.number)
        .collect();
    let mut seen = HashSet::new();
    numbers.retain(|n| seen.insert(*n));
    numbers
}

/// Gathers the contributors of one pull request.
pub struct ContributorCollector<'a> {
    client: &'a GitHubClient,
    flags: AuthorshipConfig,
}

impl<'a> ContributorCollector<'a> {
    pub fn new(client: &'a GitHubClient, flags: AuthorshipConfig) -> Self {
        Self { client, flags }
    }

    /// Collect every enabled kind of activity.
    ///
    /// An unreadable timeline only drops linked issues; any other API
    /// failure aborts collection.
    #[instrument(skip(self), fields(pr = pr.number))]
    pub async fn collect(
        &self,
        pr: &PullRequestContext,
    ) -> Result<ContributionEvidence, GitHubError> {
        let mut evidence = ContributionEvidence::new();

        if self.flags.commits {
            let commits = self
                .client
                .compare(&pr.compare_repo, &pr.base_ref, &pr.head_ref)
                .await?;
            record_commits(&commits, self.flags.include_coauthors, &mut evidence);
        }

        if self.flags.reviews {
            for review in self.client.list_reviews(&pr.repo, pr.number).await? {
                record_activity(
                    review.user.as_ref(),
                    ContributionCategory::Reviews,
                    &review.html_url,
                    &mut evidence,
                );
            }
        }

        if self.flags.pr_comments {
            for comment in self.client.list_issue_comments(&pr.repo, pr.number).await? {
                record_activity(
                    comment.user.as_ref(),
                    ContributionCategory::PrComments,
                    &comment.html_url,
                    &mut evidence,
                );
            }
        }

        if self.flags.issues || self.flags.issue_comments {
            let linked = match self.client.list_timeline(&pr.repo, pr.number).await {
                Ok(events) => linked_issue_numbers(&events),
                Err(e) => {
                    warn!(error = %e, "could not read pull request timeline, skipping linked issues");
                    Vec::new()
                }
            };

            for number in linked {
                if self.flags.issues {
                    let issue = self.client.get_issue(&pr.repo, number).await?;
                    record_activity(
                        issue.user.as_ref(),
                        ContributionCategory::Issues,
                        &issue.html_url,
                        &mut evidence,
                    );
                }
                if self.flags.issue_comments {
                    for comment in self.client.list_issue_comments(&pr.repo, number).await? {
                        record_activity(
                            comment.user.as_ref(),
                            ContributionCategory::IssueComments,
                            &comment.html_url,
                            &mut evidence,
                        );
                    }
                }
            }
        }

        info!(contributors = evidence.len(), "collected contributors");
        Ok(evidence)
    }
}
