//! Reporting of a finished run.
//!
//! A [`RunSummary`] is rendered to two sinks: the workflow output file read by
//! later steps ([`output`]) and a pull request comment ([`comment`]).

pub mod comment;
pub mod output;

use std::collections::BTreeSet;

use serde::Serialize;

use crate::errors::ReportError;
use crate::merge::MergeOutcome;
use crate::models::{ContributionDetails, ContributionEvidence, ContributorSignal};

/// Everything the sinks need to know about a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Citation file path as shown to readers.
    pub cff_path: String,
    /// The updated document as YAML.
    pub updated_cff: String,
    /// Appended contributors, in append order.
    pub new_authors: Vec<String>,
    pub warnings: Vec<String>,
    /// ORCID resolution details.
    pub logs: Vec<String>,
    /// Contributors not credited before this run.
    pub missing_authors: Vec<String>,
    pub missing_author_invalidates_pr: bool,
    /// JSON array of `{contributor, contributions}` for every contributor seen.
    pub contributions_json: String,
}

impl RunSummary {
    pub fn new(
        cff_path: impl Into<String>,
        updated_cff: impl Into<String>,
        outcome: &MergeOutcome,
        signals: &BTreeSet<ContributorSignal>,
        evidence: &ContributionEvidence,
        missing_author_invalidates_pr: bool,
    ) -> Result<Self, ReportError> {
        Ok(Self {
            cff_path: cff_path.into(),
            updated_cff: updated_cff.into(),
            new_authors: outcome.appended.iter().map(ToString::to_string).collect(),
            warnings: outcome.warnings.clone(),
            logs: outcome.logs.clone(),
            missing_authors: outcome
                .missing_authors(signals)
                .iter()
                .map(ToString::to_string)
                .collect(),
            missing_author_invalidates_pr,
            contributions_json: contributions_json(evidence)?,
        })
    }

    /// Whether the run must fail the pull request check.
    pub fn blocks_pr(&self) -> bool {
        self.missing_author_invalidates_pr && !self.missing_authors.is_empty()
    }
}

#[derive(Serialize)]
struct ContributorEntry<'a> {
    contributor: &'a ContributorSignal,
    contributions: &'a ContributionDetails,
}

/// Serialize the evidence as a JSON array. Handles render as strings, commit
/// authors as `[name, email]`.
pub fn contributions_json(evidence: &ContributionEvidence) -> Result<String, ReportError> {
    let entries: Vec<_> = evidence
        .iter()
        .map(|(contributor, contributions)| ContributorEntry {
            contributor,
            contributions,
        })
        .collect();
    Ok(serde_json::to_string(&entries)?)
}
