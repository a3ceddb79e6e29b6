//! Candidate author records built from contributor signals.
//!
//! The builder never performs I/O: profile and identifier lookups arrive as
//! [`Resolution`]s. Whenever a heuristic decides the shape of a record, or a
//! signal cannot produce one, a warning says so.

use tracing::debug;

use crate::errors::MergeError;
use crate::github::client::{AccountKind, GitHubProfile};
use crate::github::web_url;
use crate::identity::author::{ALIAS, EMAIL, FAMILY_NAMES, GIVEN_NAMES, ORCID};
use crate::identity::AuthorRecord;
use crate::lookup::{OrcidOutcome, Resolution};
use crate::models::ContributorSignal;
use crate::provenance::ProvenanceNote;

/// Result of building one signal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuiltEntry {
    /// The candidate, or `None` when the signal was skipped.
    pub record: Option<AuthorRecord>,
    pub warnings: Vec<String>,
}

impl BuiltEntry {
    fn skipped(warning: String) -> Self {
        Self {
            record: None,
            warnings: vec![warning],
        }
    }
}

/// Split a display name on its first space into given and family names.
///
/// Returns `None` when no family name can be derived (single token or blank).
/// Everything after the first space is the family name.
pub fn split_full_name(name: &str) -> Option<(&str, &str)> {
    let (given, family) = name.trim().split_once(' ')?;
    let family = family.trim();
    if given.is_empty() || family.is_empty() {
        return None;
    }
    Some((given, family))
}

/// Find a person in `authors` whose full name and email both equal the
/// commit author's, ignoring case and surrounding whitespace.
///
/// Only persons carrying `given-names`, `family-names` and `email` qualify.
pub fn find_commit_author<'a>(
    name: &str,
    email: &str,
    authors: &'a [AuthorRecord],
) -> Option<&'a AuthorRecord> {
    let name = name.trim().to_lowercase();
    let email = email.trim().to_lowercase();
    authors.iter().find(|existing| {
        match (
            existing.get(GIVEN_NAMES),
            existing.get(FAMILY_NAMES),
            existing.get(EMAIL),
        ) {
            (Some(given), Some(family), Some(existing_email)) => {
                format!("{} {}", given, family).trim().to_lowercase() == name
                    && existing_email.trim().to_lowercase() == email
            }
            _ => false,
        }
    })
}

/// Builds candidate records.
#[derive(Debug, Clone)]
pub struct EntryBuilder {
    web_base: String,
}

impl EntryBuilder {
    /// `web_base` is the GitHub web root used for profile aliases.
    pub fn new(web_base: impl Into<String>) -> Self {
        Self {
            web_base: web_base.into(),
        }
    }

    /// Build the candidate for `signal`.
    ///
    /// `authors` is the working list, including entries appended earlier in
    /// the same run.
    pub fn build(
        &self,
        signal: &ContributorSignal,
        resolution: &Resolution,
        note: &ProvenanceNote,
        authors: &[AuthorRecord],
    ) -> Result<BuiltEntry, MergeError> {
        match (signal, resolution) {
            (ContributorSignal::Handle(login), Resolution::ProfileUnavailable { detail }) => {
                Ok(BuiltEntry::skipped(format!(
                    "- @{}: Unable to fetch user data from GitHub API ({}). {}",
                    login, detail, note.citation
                )))
            }
            (ContributorSignal::Handle(login), Resolution::Profile { profile, orcid }) => {
                Ok(self.from_profile(login, profile, orcid.as_ref(), note))
            }
            (ContributorSignal::CommitAuthor(name, email), Resolution::CommitAuthor { orcid }) => {
                Ok(Self::from_commit_author(name, email, orcid.as_ref(), note, authors))
            }
            (signal, resolution) => Err(MergeError::ResolutionMismatch {
                signal: signal.clone(),
                detail: format!("{:?}", resolution),
            }),
        }
    }

    fn from_profile(
        &self,
        login: &str,
        profile: &GitHubProfile,
        orcid: Option<&OrcidOutcome>,
        note: &ProvenanceNote,
    ) -> BuiltEntry {
        let alias = web_url::profile_url(&self.web_base, login);
        let full_name = profile.display_name(login);
        let email = profile.email.as_deref().filter(|e| !e.is_empty());

        if profile.account_type == AccountKind::Organization {
            let mut record = AuthorRecord::entity(full_name).with(ALIAS, alias);
            if let Some(email) = email {
                record.set(EMAIL, email);
            }
            debug!(login, "built entity for organization");
            return BuiltEntry {
                record: Some(record),
                warnings: Vec::new(),
            };
        }

        let Some((given, family)) = split_full_name(full_name) else {
            debug!(login, name = full_name, "single name, building entity");
            return BuiltEntry {
                record: Some(AuthorRecord::entity(full_name.trim()).with(ALIAS, alias)),
                warnings: vec![format!(
                    "- @{}: Only one name part found, treated as entity for deduplication consistency. {}",
                    login, note.citation
                )],
            };
        };

        let mut record = AuthorRecord::person(given, family).with(ALIAS, alias);
        if let Some(email) = email {
            record.set(EMAIL, email);
        }
        let mut warnings = Vec::new();
        apply_orcid(&mut record, orcid, &format!("@{}", login), &mut warnings);
        BuiltEntry {
            record: Some(record),
            warnings,
        }
    }

    fn from_commit_author(
        name: &str,
        email: &str,
        orcid: Option<&OrcidOutcome>,
        note: &ProvenanceNote,
        authors: &[AuthorRecord],
    ) -> BuiltEntry {
        if let Some(existing) = find_commit_author(name, email, authors) {
            debug!(name, email, "commit author confirmed as existing person");
            let mut record = AuthorRecord::new();
            for key in [GIVEN_NAMES, FAMILY_NAMES, EMAIL, ORCID] {
                if let Some(value) = existing.get(key) {
                    record.set(key, value);
                }
            }
            return BuiltEntry {
                record: Some(record),
                warnings: Vec::new(),
            };
        }

        if name.trim().is_empty() {
            return BuiltEntry::skipped(format!(
                "- Commit author with email `{}` has no name and was skipped. {}",
                email, note.citation
            ));
        }

        let Some((given, family)) = split_full_name(name) else {
            let mut record = AuthorRecord::entity(name.trim());
            if !email.is_empty() {
                record.set(EMAIL, email);
            }
            return BuiltEntry {
                record: Some(record),
                warnings: vec![format!(
                    "- `{}`: Only one name part found, treated as entity for deduplication consistency. {}",
                    name, note.citation
                )],
            };
        };

        let mut record = AuthorRecord::person(given, family);
        if !email.is_empty() {
            record.set(EMAIL, email);
        }
        // No outcome means the search was skipped for a contributor already
        // known from this run's handles.
        let mut warnings = Vec::new();
        if orcid.is_some() {
            apply_orcid(&mut record, orcid, &format!("`{}`", name), &mut warnings);
        }
        BuiltEntry {
            record: Some(record),
            warnings,
        }
    }
}

/// Store a verified identifier, or explain why there is none.
fn apply_orcid(
    record: &mut AuthorRecord,
    orcid: Option<&OrcidOutcome>,
    subject: &str,
    warnings: &mut Vec<String>,
) {
    match orcid.unwrap_or(&OrcidOutcome::NotFound) {
        outcome @ OrcidOutcome::Verified(_) => {
            if let Some(url) = outcome.url() {
                record.set(ORCID, url);
            }
        }
        OrcidOutcome::Unverified(id) => warnings.push(format!(
            "- {}: ORCID `{}` is invalid or unreachable.",
            subject, id
        )),
        OrcidOutcome::NotFound => warnings.push(format!("- {}: No ORCID found.", subject)),
    }
}
