//! External lookups feeding the entry builder.
//!
//! Profile and ORCID lookups are the only I/O a merge depends on. They are
//! issued up front, concurrently, by [`Resolver`]; the merge itself then runs
//! as a synchronous fold over the pre-fetched [`Resolution`]s, so every
//! duplicate check sees all entries appended earlier in the same run.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use crate::errors::GitHubError;
use crate::github::client::{AccountKind, GitHubProfile};
use crate::identity::author::EMAIL;
use crate::identity::AuthorRecord;
use crate::merge::builder::{find_commit_author, split_full_name};
use crate::models::ContributorSignal;

/// Default number of signals resolved at the same time.
pub const DEFAULT_CONCURRENCY: usize = 8;

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Source of platform profiles for handle signals.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profile(&self, login: &str) -> Result<GitHubProfile, GitHubError>;
}

/// Result of an ORCID search: the identifier if one was confirmed, plus a
/// diagnostic line for the resolution log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrcidSearch {
    pub orcid: Option<String>,
    pub log: Option<String>,
}

/// Researcher identifier resolution.
#[async_trait]
pub trait OrcidSource: Send + Sync {
    /// Find an identifier embedded in free text such as a profile bio.
    fn extract(&self, text: &str) -> Option<String> {
        crate::orcid::extract_orcid(text)
    }

    /// Search the registry by full name and, optionally, email.
    async fn search(&self, full_name: &str, email: Option<&str>) -> OrcidSearch;

    /// Whether the identifier is well-formed and resolves in the registry.
    async fn validate(&self, orcid: &str) -> bool;
}

// ---------------------------------------------------------------------------
// Resolved data
// ---------------------------------------------------------------------------

/// What identifier resolution produced for a person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrcidOutcome {
    /// Found and validated; holds the bare `0000-0000-0000-0000` form.
    Verified(String),
    /// Found but invalid or unreachable.
    Unverified(String),
    NotFound,
}

impl OrcidOutcome {
    /// URL form stored in the `orcid` field of an author record.
    pub fn url(&self) -> Option<String> {
        match self {
            Self::Verified(id) => Some(crate::orcid::orcid_url(id)),
            Self::Unverified(_) | Self::NotFound => None,
        }
    }
}

/// Pre-fetched lookup results for one signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Profile of a handle. `orcid` is `None` when the contributor does not
    /// become a person (organization, single-token name).
    Profile {
        profile: GitHubProfile,
        orcid: Option<OrcidOutcome>,
    },
    /// The profile lookup failed; `detail` describes why.
    ProfileUnavailable { detail: String },
    /// A commit author. `orcid` is `None` when no search was needed.
    CommitAuthor { orcid: Option<OrcidOutcome> },
}

/// Lookup results for a whole run.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSignals {
    pub resolutions: BTreeMap<ContributorSignal, Resolution>,
    /// Diagnostic lines from identifier searches, in signal order.
    pub logs: Vec<String>,
}

impl ResolvedSignals {
    pub fn get(&self, signal: &ContributorSignal) -> Option<&Resolution> {
        self.resolutions.get(signal)
    }

    pub fn insert(&mut self, signal: ContributorSignal, resolution: Resolution) {
        self.resolutions.insert(signal, resolution);
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Issues profile and identifier lookups for a set of signals.
pub struct Resolver<'a> {
    profiles: &'a dyn ProfileSource,
    orcid: &'a dyn OrcidSource,
    concurrency: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(profiles: &'a dyn ProfileSource, orcid: &'a dyn OrcidSource) -> Self {
        Self {
            profiles,
            orcid,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Resolve every signal. Lookups run concurrently; results and logs come
    /// back in signal order.
    ///
    /// Handles are resolved first. Commit authors that match a person in
    /// `baseline`, or a person-shaped handle profile of the same run, by name
    /// and email are not searched: their identity is carried forward.
    #[instrument(skip_all, fields(signals = signals.len()))]
    pub async fn resolve(
        &self,
        signals: &BTreeSet<ContributorSignal>,
        baseline: &[AuthorRecord],
    ) -> ResolvedSignals {
        let (handles, commit_authors): (Vec<_>, Vec<_>) = signals
            .iter()
            .partition(|s| matches!(s, ContributorSignal::Handle(_)));

        let handle_results = self.resolve_all(&handles, baseline).await;

        let mut known = baseline.to_vec();
        known.extend(handle_results.iter().filter_map(|(_, r, _)| profile_person(r)));
        let author_results = self.resolve_all(&commit_authors, &known).await;

        let mut resolved = ResolvedSignals::default();
        for (signal, resolution, logs) in handle_results.into_iter().chain(author_results) {
            resolved.logs.extend(logs);
            resolved.insert(signal, resolution);
        }
        info!(
            resolved = resolved.resolutions.len(),
            logs = resolved.logs.len(),
            "resolved contributor lookups"
        );
        resolved
    }

    async fn resolve_all(
        &self,
        signals: &[&ContributorSignal],
        known: &[AuthorRecord],
    ) -> Vec<(ContributorSignal, Resolution, Vec<String>)> {
        stream::iter(signals.iter().map(|s| self.resolve_one(*s, known)))
            .buffered(self.concurrency)
            .collect()
            .await
    }

    async fn resolve_one(
        &self,
        signal: &ContributorSignal,
        baseline: &[AuthorRecord],
    ) -> (ContributorSignal, Resolution, Vec<String>) {
        let mut logs = Vec::new();
        let resolution = match signal {
            ContributorSignal::Handle(login) => match self.profiles.fetch_profile(login).await {
                Ok(profile) => {
                    let orcid = if profile.account_type == AccountKind::Organization {
                        None
                    } else {
                        let full_name = profile.display_name(login);
                        match split_full_name(full_name) {
                            Some(_) => {
                                let embedded = profile
                                    .bio
                                    .as_deref()
                                    .and_then(|bio| self.orcid.extract(bio));
                                Some(
                                    self.resolve_orcid(
                                        embedded,
                                        full_name,
                                        profile.email.as_deref(),
                                        &mut logs,
                                    )
                                    .await,
                                )
                            }
                            None => None,
                        }
                    };
                    Resolution::Profile { profile, orcid }
                }
                Err(e) => {
                    warn!(login = %login, error = %e, "profile lookup failed");
                    Resolution::ProfileUnavailable {
                        detail: e.to_string(),
                    }
                }
            },
            ContributorSignal::CommitAuthor(name, email) => {
                let carried = find_commit_author(name, email, baseline).is_some();
                let orcid = if carried || split_full_name(name).is_none() {
                    None
                } else {
                    let email = Some(email.as_str()).filter(|e| !e.is_empty());
                    Some(self.resolve_orcid(None, name, email, &mut logs).await)
                };
                Resolution::CommitAuthor { orcid }
            }
        };
        debug!(signal = %signal, "resolved signal");
        (signal.clone(), resolution, logs)
    }

    async fn resolve_orcid(
        &self,
        embedded: Option<String>,
        full_name: &str,
        email: Option<&str>,
        logs: &mut Vec<String>,
    ) -> OrcidOutcome {
        let candidate = match embedded {
            Some(id) => Some(id),
            None => {
                let search = self.orcid.search(full_name, email).await;
                logs.extend(search.log);
                search.orcid
            }
        };
        match candidate {
            Some(id) if self.orcid.validate(&id).await => OrcidOutcome::Verified(id),
            Some(id) => OrcidOutcome::Unverified(id),
            None => OrcidOutcome::NotFound,
        }
    }
}

/// The person a resolved handle will become, reduced to the fields a commit
/// author is matched on.
fn profile_person(resolution: &Resolution) -> Option<AuthorRecord> {
    let Resolution::Profile {
        profile,
        orcid: Some(_),
    } = resolution
    else {
        return None;
    };
    let email = profile.email.as_deref().filter(|e| !e.is_empty())?;
    let (given, family) = split_full_name(profile.display_name(&profile.login))?;
    Some(AuthorRecord::person(given, family).with(EMAIL, email))
}
