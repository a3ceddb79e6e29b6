//! Domain model types shared by the merge engine, the collectors and the
//! reporting layer.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Contributor signals
// ---------------------------------------------------------------------------

/// One contributor as observed in pull request activity.
///
/// Signals are the merge key: they are reported back as "already present" or
/// "missing", so they are compared and ordered by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContributorSignal {
    /// A GitHub login, resolved into profile data at run time.
    Handle(String),
    /// A `(display name, email)` pair from commit metadata or a co-author trailer.
    CommitAuthor(String, String),
}

impl ContributorSignal {
    pub fn handle(login: impl Into<String>) -> Self {
        Self::Handle(login.into())
    }

    pub fn commit_author(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self::CommitAuthor(name.into(), email.into())
    }

    /// Short identifier used in "already exists" warnings and the list of
    /// new authors: the case-folded login, or the email (falling back to the
    /// case-folded name) for commit authors.
    pub fn identifier(&self) -> String {
        match self {
            Self::Handle(login) => login.to_lowercase(),
            Self::CommitAuthor(name, email) => {
                if email.is_empty() {
                    name.to_lowercase()
                } else {
                    email.clone()
                }
            }
        }
    }
}

impl fmt::Display for ContributorSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handle(login) => write!(f, "@{}", login),
            Self::CommitAuthor(name, email) => match (name.is_empty(), email.is_empty()) {
                (false, false) => write!(f, "{} <{}>", name, email),
                (false, true) => write!(f, "{}", name),
                (true, false) => write!(f, "<{}>", email),
                (true, true) => write!(f, "<anonymous>"),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Contribution evidence
// ---------------------------------------------------------------------------

/// Kind of pull request activity a contributor took part in.
///
/// The declaration order is the order in which provenance notes look for a
/// reference to cite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionCategory {
    Commits,
    PrComments,
    Reviews,
    Issues,
    IssueComments,
}

impl ContributionCategory {
    pub const ALL: [ContributionCategory; 5] = [
        Self::Commits,
        Self::PrComments,
        Self::Reviews,
        Self::Issues,
        Self::IssueComments,
    ];

    /// Human-readable label used as link text in provenance notes.
    pub fn label(self) -> &'static str {
        match self {
            Self::Commits => "Commit",
            Self::PrComments => "Pull Request Comment",
            Self::Reviews => "Review",
            Self::Issues => "Issue",
            Self::IssueComments => "Issue Comment",
        }
    }
}

impl fmt::Display for ContributionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commits => write!(f, "commits"),
            Self::PrComments => write!(f, "pr_comments"),
            Self::Reviews => write!(f, "reviews"),
            Self::Issues => write!(f, "issues"),
            Self::IssueComments => write!(f, "issue_comments"),
        }
    }
}

/// References (commit SHAs or `html_url`s) per contribution category for one
/// contributor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionDetails {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commits: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pr_comments: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reviews: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issue_comments: Vec<String>,
}

impl ContributionDetails {
    pub fn references(&self, category: ContributionCategory) -> &[String] {
        match category {
            ContributionCategory::Commits => &self.commits,
            ContributionCategory::PrComments => &self.pr_comments,
            ContributionCategory::Reviews => &self.reviews,
            ContributionCategory::Issues => &self.issues,
            ContributionCategory::IssueComments => &self.issue_comments,
        }
    }

    fn references_mut(&mut self, category: ContributionCategory) -> &mut Vec<String> {
        match category {
            ContributionCategory::Commits => &mut self.commits,
            ContributionCategory::PrComments => &mut self.pr_comments,
            ContributionCategory::Reviews => &mut self.reviews,
            ContributionCategory::Issues => &mut self.issues,
            ContributionCategory::IssueComments => &mut self.issue_comments,
        }
    }

    /// The first reference of the first non-empty category.
    pub fn first(&self) -> Option<(ContributionCategory, &str)> {
        ContributionCategory::ALL.iter().find_map(|&category| {
            self.references(category)
                .first()
                .map(|reference| (category, reference.as_str()))
        })
    }

    pub fn is_empty(&self) -> bool {
        ContributionCategory::ALL
            .iter()
            .all(|&category| self.references(category).is_empty())
    }
}

/// Contribution details for every observed contributor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContributionEvidence {
    entries: BTreeMap<ContributorSignal, ContributionDetails>,
}

impl ContributionEvidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one reference; duplicates within a category are ignored.
    pub fn record(
        &mut self,
        signal: ContributorSignal,
        category: ContributionCategory,
        reference: impl Into<String>,
    ) {
        let reference = reference.into();
        let references = self.entries.entry(signal).or_default().references_mut(category);
        if !references.contains(&reference) {
            references.push(reference);
        }
    }

    pub fn get(&self, signal: &ContributorSignal) -> Option<&ContributionDetails> {
        self.entries.get(signal)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ContributorSignal, &ContributionDetails)> {
        self.entries.iter()
    }

    /// All contributors with at least one recorded reference.
    pub fn signals(&self) -> BTreeSet<ContributorSignal> {
        self.entries
            .iter()
            .filter(|(_, details)| !details.is_empty())
            .map(|(signal, _)| signal.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
