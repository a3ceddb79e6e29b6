//! Merging contributor signals into an author list.
//!
//! The merge is a serial fold: each candidate is compared against the working
//! list, which already holds everything appended earlier in the run. Lookups
//! must be resolved beforehand (see [`crate::lookup::Resolver`]).

pub mod builder;

use std::collections::BTreeSet;

use tracing::{debug, info, instrument};

use crate::errors::{CoreError, MergeError};
use crate::identity::{find_match, AuthorRecord};
use crate::lookup::ResolvedSignals;
use crate::models::{ContributionEvidence, ContributorSignal};
use crate::provenance::ProvenanceFormatter;

pub use builder::{BuiltEntry, EntryBuilder};

/// Everything a merge produced.
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    /// Baseline followed by the appended records.
    pub authors: Vec<AuthorRecord>,
    /// Signals whose candidate was appended, in append order.
    pub appended: Vec<ContributorSignal>,
    /// Signals whose candidate matched a record already in the list.
    pub already_present: BTreeSet<ContributorSignal>,
    pub warnings: Vec<String>,
    /// Diagnostic lines from identifier resolution.
    pub logs: Vec<String>,
}

impl MergeOutcome {
    /// Signals that did not match an existing author: appended ones plus those
    /// that produced no record at all.
    pub fn missing_authors(
        &self,
        signals: &BTreeSet<ContributorSignal>,
    ) -> BTreeSet<ContributorSignal> {
        signals.difference(&self.already_present).cloned().collect()
    }

    /// Signals that ended the run neither appended nor already present.
    pub fn unresolved(&self, signals: &BTreeSet<ContributorSignal>) -> BTreeSet<ContributorSignal> {
        signals
            .iter()
            .filter(|s| !self.already_present.contains(*s) && !self.appended.contains(*s))
            .cloned()
            .collect()
    }

    /// Whether the author list differs from the baseline.
    pub fn changed(&self) -> bool {
        !self.appended.is_empty()
    }
}

/// Drives [`EntryBuilder`] and the identity matcher over a signal set.
pub struct MergeOrchestrator<'a> {
    builder: EntryBuilder,
    notes: ProvenanceFormatter,
    evidence: &'a ContributionEvidence,
}

impl<'a> MergeOrchestrator<'a> {
    /// `web_base` is the GitHub web root; `compare_repo` is the repository
    /// the commits were read from; `evidence` cites each signal's first
    /// contribution in warnings.
    pub fn new(
        web_base: &str,
        compare_repo: &str,
        evidence: &'a ContributionEvidence,
    ) -> Self {
        Self {
            builder: EntryBuilder::new(web_base),
            notes: ProvenanceFormatter::new(web_base, compare_repo),
            evidence,
        }
    }

    /// Merge `signals` into a copy of `baseline`.
    ///
    /// Per-signal lookup failures become warnings. A signal without a
    /// resolution or without evidence, or a baseline record of unknown type,
    /// aborts the merge.
    #[instrument(skip_all, fields(signals = signals.len(), baseline = baseline.len()))]
    pub fn merge(
        &self,
        signals: &BTreeSet<ContributorSignal>,
        baseline: &[AuthorRecord],
        resolved: &ResolvedSignals,
    ) -> Result<MergeOutcome, CoreError> {
        let mut outcome = MergeOutcome {
            authors: baseline.to_vec(),
            logs: resolved.logs.clone(),
            ..Default::default()
        };

        for signal in signals {
            let resolution = resolved
                .get(signal)
                .ok_or_else(|| MergeError::MissingResolution(signal.clone()))?;
            let note = self.notes.note(signal, self.evidence)?;

            let built = self
                .builder
                .build(signal, resolution, &note, &outcome.authors)?;
            outcome.warnings.extend(built.warnings);

            let Some(candidate) = built.record else {
                debug!(signal = %signal, "no record built, skipping");
                continue;
            };

            if find_match(&candidate, &outcome.authors)?.is_some() {
                debug!(signal = %signal, "already present");
                outcome.warnings.push(format!(
                    "- {}: Already exists in CFF file. {}",
                    signal.identifier(),
                    note.citation
                ));
                outcome.already_present.insert(signal.clone());
                continue;
            }

            debug!(signal = %signal, candidate = %candidate, "appending author");
            outcome.authors.push(candidate);
            outcome.appended.push(signal.clone());
        }

        info!(
            appended = outcome.appended.len(),
            already_present = outcome.already_present.len(),
            warnings = outcome.warnings.len(),
            "merge complete"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::author::{ALIAS, EMAIL, FAMILY_NAMES, GIVEN_NAMES, NAME, ORCID};
    use crate::lookup::fakes::user;
    use crate::lookup::{OrcidOutcome, Resolution};
    use crate::models::ContributionCategory;

    struct Fixture {
        evidence: ContributionEvidence,
        resolved: ResolvedSignals,
        signals: BTreeSet<ContributorSignal>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                evidence: ContributionEvidence::new(),
                resolved: ResolvedSignals::default(),
                signals: BTreeSet::new(),
            }
        }

        fn add(mut self, signal: ContributorSignal, resolution: Resolution) -> Self {
            self.evidence
                .record(signal.clone(), ContributionCategory::Commits, "abcdef0123456789");
            self.resolved.insert(signal.clone(), resolution);
            self.signals.insert(signal);
            self
        }

        fn merge(&self, baseline: &[AuthorRecord]) -> Result<MergeOutcome, CoreError> {
            MergeOrchestrator::new("https://github.com", "o/r", &self.evidence).merge(
                &self.signals,
                baseline,
                &self.resolved,
            )
        }
    }

    fn alice() -> (ContributorSignal, Resolution) {
        (
            ContributorSignal::handle("alice"),
            Resolution::Profile {
                profile: user("alice", Some("Alice Smith")),
                orcid: Some(OrcidOutcome::NotFound),
            },
        )
    }

    #[test]
    fn test_new_user_is_appended() {
        let (signal, resolution) = alice();
        let fixture = Fixture::new().add(signal.clone(), resolution);
        let outcome = fixture.merge(&[]).unwrap();

        assert_eq!(
            outcome.authors,
            vec![AuthorRecord::person("Alice", "Smith").with(ALIAS, "https://github.com/alice")]
        );
        assert_eq!(outcome.appended, vec![signal]);
        assert_eq!(outcome.warnings, vec!["- @alice: No ORCID found."]);
        assert!(outcome.unresolved(&fixture.signals).is_empty());
        assert_eq!(outcome.missing_authors(&fixture.signals).len(), 1);
        assert!(outcome.changed());
    }

    #[test]
    fn test_commit_author_already_present() {
        let bob = ContributorSignal::commit_author("Bob Lee", "bob@x.com");
        let baseline = vec![AuthorRecord::person("Bob", "Lee").with(EMAIL, "bob@x.com")];
        let fixture = Fixture::new().add(bob.clone(), Resolution::CommitAuthor { orcid: None });

        let outcome = fixture.merge(&baseline).unwrap();

        assert_eq!(outcome.authors, baseline);
        assert!(outcome.appended.is_empty());
        assert_eq!(outcome.already_present, BTreeSet::from([bob]));
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].starts_with("- bob@x.com: Already exists in CFF file."));
        assert!(outcome.missing_authors(&fixture.signals).is_empty());
        assert!(!outcome.changed());
    }

    #[test]
    fn test_entity_matches_by_alias() {
        let mut acme = user("acme-bot", Some("ACME Inc"));
        acme.account_type = crate::github::client::AccountKind::Organization;
        let baseline = vec![AuthorRecord::entity("ACME Incorporated")
            .with(ALIAS, "https://github.com/acme-bot")];
        let fixture = Fixture::new().add(
            ContributorSignal::handle("acme-bot"),
            Resolution::Profile {
                profile: acme,
                orcid: None,
            },
        );

        let outcome = fixture.merge(&baseline).unwrap();
        assert_eq!(outcome.authors.len(), 1);
        assert_eq!(outcome.already_present.len(), 1);
    }

    #[test]
    fn test_person_and_entity_never_match() {
        let baseline = vec![AuthorRecord::person("Alice", "Smith")];
        let x = ContributorSignal::handle("x");
        let fixture = Fixture::new().add(
            x,
            Resolution::Profile {
                profile: user("x", Some("Madonna")),
                orcid: None,
            },
        );

        let outcome = fixture.merge(&baseline).unwrap();
        assert_eq!(outcome.authors.len(), 2);
        assert_eq!(outcome.authors[1].get(NAME), Some("Madonna"));
        assert_eq!(outcome.authors[1].get(ALIAS), Some("https://github.com/x"));
        assert!(outcome.warnings[0].contains("Only one name part found"));
    }

    #[test]
    fn test_nameless_commit_author_is_unresolved() {
        let anon = ContributorSignal::commit_author("", "a@b.com");
        let fixture = Fixture::new().add(anon.clone(), Resolution::CommitAuthor { orcid: None });

        let outcome = fixture.merge(&[]).unwrap();
        assert!(outcome.authors.is_empty());
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("a@b.com"));
        assert_eq!(outcome.unresolved(&fixture.signals), BTreeSet::from([anon.clone()]));
        assert_eq!(outcome.missing_authors(&fixture.signals), BTreeSet::from([anon]));
    }

    #[test]
    fn test_failed_lookup_degrades_to_warning() {
        let (signal, resolution) = alice();
        let ghost = ContributorSignal::handle("ghost");
        let fixture = Fixture::new().add(signal, resolution).add(
            ghost.clone(),
            Resolution::ProfileUnavailable {
                detail: "GitHub API error (HTTP 502): bad gateway".into(),
            },
        );

        let outcome = fixture.merge(&[]).unwrap();
        assert_eq!(outcome.authors.len(), 1);
        assert_eq!(outcome.unresolved(&fixture.signals), BTreeSet::from([ghost]));
    }

    #[test]
    fn test_same_person_twice_in_one_run_collapses() {
        let mut ada_profile = user("ada", Some("Ada Lovelace"));
        ada_profile.email = Some("ada@example.com".into());
        let handle = ContributorSignal::handle("ada");
        let commit = ContributorSignal::commit_author("Ada L.", "ADA@example.com");
        let fixture = Fixture::new()
            .add(
                handle.clone(),
                Resolution::Profile {
                    profile: ada_profile,
                    orcid: Some(OrcidOutcome::Verified("0000-0002-1825-0097".into())),
                },
            )
            .add(
                commit.clone(),
                Resolution::CommitAuthor {
                    orcid: Some(OrcidOutcome::NotFound),
                },
            );

        let outcome = fixture.merge(&[]).unwrap();
        assert_eq!(outcome.authors.len(), 1);
        assert_eq!(outcome.authors[0].get(GIVEN_NAMES), Some("Ada"));
        assert_eq!(outcome.authors[0].get(FAMILY_NAMES), Some("Lovelace"));
        assert_eq!(
            outcome.authors[0].get(ORCID),
            Some("https://orcid.org/0000-0002-1825-0097")
        );
        // Handles sort before commit authors.
        assert_eq!(outcome.appended, vec![handle]);
        assert_eq!(outcome.already_present, BTreeSet::from([commit]));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let (signal, resolution) = alice();
        let fixture = Fixture::new().add(signal.clone(), resolution).add(
            ContributorSignal::commit_author("Grace Hopper", "grace@navy.mil"),
            Resolution::CommitAuthor {
                orcid: Some(OrcidOutcome::NotFound),
            },
        );

        let first = fixture.merge(&[]).unwrap();
        assert_eq!(first.authors.len(), 2);

        let second = fixture.merge(&first.authors).unwrap();
        assert_eq!(second.authors, first.authors);
        assert!(second.appended.is_empty());
        assert_eq!(second.already_present, fixture.signals);
    }

    #[test]
    fn test_baseline_is_not_modified() {
        let (signal, resolution) = alice();
        let baseline = vec![AuthorRecord::entity("Existing Org")];
        let fixture = Fixture::new().add(signal, resolution);

        let outcome = fixture.merge(&baseline).unwrap();
        assert_eq!(baseline.len(), 1);
        assert_eq!(outcome.authors.len(), 2);
        assert_eq!(outcome.authors[0], baseline[0]);
    }

    #[test]
    fn test_unknown_baseline_record_aborts() {
        let (signal, resolution) = alice();
        let baseline = vec![AuthorRecord::new().with(EMAIL, "who@x.com")];
        let fixture = Fixture::new().add(signal, resolution);

        let err = fixture.merge(&baseline).unwrap_err();
        assert!(matches!(err, CoreError::Identity(_)));
    }

    #[test]
    fn test_missing_resolution_aborts() {
        let mut fixture = Fixture::new();
        let alice = ContributorSignal::handle("alice");
        fixture
            .evidence
            .record(alice.clone(), ContributionCategory::Reviews, "https://x/review");
        fixture.signals.insert(alice);

        let err = fixture.merge(&[]).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Merge(MergeError::MissingResolution(_))
        ));
    }

    #[test]
    fn test_missing_evidence_aborts() {
        let (signal, resolution) = alice();
        let mut fixture = Fixture::new();
        fixture.resolved.insert(signal.clone(), resolution);
        fixture.signals.insert(signal);

        let err = fixture.merge(&[]).unwrap_err();
        assert!(matches!(err, CoreError::Provenance(_)));
    }
}
