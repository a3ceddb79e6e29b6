//! Provenance notes: a one-line justification citing the first known
//! contribution of a contributor, appended to warnings so every discarded or
//! special-cased signal can be audited from the pull request.

use std::fmt;

use crate::errors::ProvenanceError;
use crate::github::web_url;
use crate::models::{ContributionCategory, ContributionEvidence, ContributorSignal};

/// A formatted provenance note.
///
/// Renders as `- <subject>: <citation>`, e.g.
/// ``- @alice: Commit: [`abc1234`](https://github.com/o/r/commit/abc1234…)``.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceNote {
    /// `@login`, or the commit author in backticks.
    pub subject: String,
    /// Markdown link to the cited contribution.
    pub citation: String,
}

impl fmt::Display for ProvenanceNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "- {}: {}", self.subject, self.citation)
    }
}

/// Formats provenance notes for one repository.
#[derive(Debug, Clone)]
pub struct ProvenanceFormatter {
    web_base: String,
    compare_repo: String,
}

impl ProvenanceFormatter {
    /// `compare_repo` is the `owner/name` the commits were read from (the
    /// pull request head repository, which may be a fork).
    pub fn new(web_base: impl Into<String>, compare_repo: impl Into<String>) -> Self {
        Self {
            web_base: web_base.into(),
            compare_repo: compare_repo.into(),
        }
    }

    /// Build the note for `signal`.
    ///
    /// Fails when the signal has nothing to name it by, or when the evidence
    /// holds no contribution for it.
    pub fn note(
        &self,
        signal: &ContributorSignal,
        evidence: &ContributionEvidence,
    ) -> Result<ProvenanceNote, ProvenanceError> {
        let subject = subject(signal)?;

        let (category, reference) = evidence
            .get(signal)
            .and_then(|details| details.first())
            .ok_or_else(|| ProvenanceError::NoContribution(signal.clone()))?;

        let citation = match category {
            ContributionCategory::Commits => {
                let short = reference.get(..7).unwrap_or(reference);
                let url = web_url::commit_url(&self.web_base, &self.compare_repo, reference);
                format!("Commit: [`{}`]({})", short, url)
            }
            other => format!("[{}]({})", other.label(), reference),
        };

        Ok(ProvenanceNote { subject, citation })
    }
}

fn subject(signal: &ContributorSignal) -> Result<String, ProvenanceError> {
    match signal {
        ContributorSignal::Handle(login) if login.is_empty() => Err(ProvenanceError::EmptySignal),
        ContributorSignal::Handle(login) => Ok(format!("@{}", login)),
        ContributorSignal::CommitAuthor(name, email) => {
            match (name.is_empty(), email.is_empty()) {
                (false, false) => Ok(format!("`{} <{}>`", name, email)),
                (false, true) => Ok(format!("`{}`", name)),
                (true, false) => Ok(format!("`{}`", email)),
                (true, true) => Err(ProvenanceError::EmptySignal),
            }
        }
    }
}
