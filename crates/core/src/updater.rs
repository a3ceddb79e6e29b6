//! End-to-end contributor check.
//!
//! [`CitationUpdater`] merges collected contributors into the citation file
//! and writes it back, restoring the previous contents if the written document
//! does not validate. [`run`] wires it to the GitHub and ORCID clients and the
//! reporting sinks.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use crate::cff::CffDocument;
use crate::config::{AppConfig, PullRequestContext};
use crate::errors::{CffError, CoreError};
use crate::github::client::GitHubClient;
use crate::github::collect::ContributorCollector;
use crate::github::web_url;
use crate::lookup::{OrcidSource, ProfileSource, Resolver, DEFAULT_CONCURRENCY};
use crate::merge::{MergeOrchestrator, MergeOutcome};
use crate::models::{ContributionEvidence, ContributorSignal};
use crate::notify::comment::{render_comment, CommentPublisher};
use crate::notify::output::write_outputs;
use crate::notify::RunSummary;
use crate::orcid::OrcidClient;

/// Result of merging contributors into a citation file.
#[derive(Debug, Clone)]
pub struct UpdateResult {
    pub signals: BTreeSet<ContributorSignal>,
    pub outcome: MergeOutcome,
    /// The document with the merged author list.
    pub document: CffDocument,
    /// Whether the file on disk was rewritten.
    pub written: bool,
}

/// Merges contributors into a citation file.
pub struct CitationUpdater<'a> {
    profiles: &'a dyn ProfileSource,
    orcid: &'a dyn OrcidSource,
    web_base: String,
    concurrency: usize,
}

impl<'a> CitationUpdater<'a> {
    pub fn new(
        profiles: &'a dyn ProfileSource,
        orcid: &'a dyn OrcidSource,
        web_base: impl Into<String>,
    ) -> Self {
        Self {
            profiles,
            orcid,
            web_base: web_base.into(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Merge every contributor in `evidence` into the file at `cff_path`.
    ///
    /// The input file must validate. Unless `dry_run` is set, a changed author
    /// list is written back and validated again.
    #[instrument(skip(self, evidence), fields(contributors = evidence.len()))]
    pub async fn update(
        &self,
        cff_path: &Path,
        evidence: &ContributionEvidence,
        compare_repo: &str,
        dry_run: bool,
    ) -> Result<UpdateResult, CoreError> {
        let original = CffDocument::load(cff_path)?;
        original.validate()?;
        let baseline = original.authors()?;
        let signals = evidence.signals();

        let resolved = Resolver::new(self.profiles, self.orcid)
            .with_concurrency(self.concurrency)
            .resolve(&signals, &baseline)
            .await;

        let outcome = MergeOrchestrator::new(&self.web_base, compare_repo, evidence).merge(
            &signals,
            &baseline,
            &resolved,
        )?;

        let mut document = original;
        document.set_authors(&outcome.authors);

        let written = outcome.changed() && !dry_run;
        if written {
            save_validated(cff_path, &document)?;
        } else {
            info!(dry_run, changed = outcome.changed(), "citation file left untouched");
        }

        Ok(UpdateResult {
            signals,
            outcome,
            document,
            written,
        })
    }
}

/// Write `document` to `path` and validate the result. On failure the
/// previous bytes are restored.
pub fn save_validated(path: &Path, document: &CffDocument) -> Result<(), CffError> {
    let previous = std::fs::read(path)?;
    document.save(path)?;

    let check = CffDocument::load(path).and_then(|written| written.validate());
    if let Err(e) = check {
        error!(path = %path.display(), error = %e, "written citation file is invalid, rolling back");
        std::fs::write(path, &previous)?;
        return Err(CffError::ValidationFailed {
            path: path.display().to_string(),
            detail: e.to_string(),
        });
    }
    Ok(())
}

/// Outcome of a full run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: RunSummary,
    pub update: UpdateResult,
}

impl RunReport {
    /// Whether the check must fail.
    pub fn blocks_pr(&self) -> bool {
        self.summary.blocks_pr()
    }
}

/// Run the contributor check for `pr`.
///
/// With `dry_run` nothing is written and no comment is posted.
#[instrument(skip(config), fields(repo = %config.github.repo, pr = pr.number))]
pub async fn run(
    config: &AppConfig,
    pr: &PullRequestContext,
    dry_run: bool,
) -> Result<RunReport, CoreError> {
    let token = config.token()?;
    let github = GitHubClient::new(&config.github.api_url, token)?;
    let orcid = OrcidClient::new(&config.orcid.api_url)?;
    let web_base = web_url::derive_web_base_url(&config.github.api_url);

    let evidence = ContributorCollector::new(&github, config.authorship)
        .collect(pr)
        .await?;

    let update = CitationUpdater::new(&github, &orcid, web_base)
        .with_concurrency(config.orcid.concurrency)
        .update(&config.cff.path, &evidence, &pr.compare_repo, dry_run)
        .await?;

    let summary = RunSummary::new(
        config.cff.path.display().to_string(),
        update.document.to_yaml()?,
        &update.outcome,
        &update.signals,
        &evidence,
        config.report.missing_author_invalidates_pr,
    )?;

    if dry_run {
        info!("dry run, skipping workflow outputs and comment");
    } else {
        write_outputs(&config.report.output_path, &summary)?;
        if config.report.post_comment {
            let sha = config.github.sha.as_deref().or(pr.head_sha.as_deref());
            let body = render_comment(&summary, Utc::now(), sha);
            CommentPublisher::new(&github)
                .upsert(&pr.repo, pr.number, &body)
                .await?;
        }
    }

    if summary.blocks_pr() {
        warn!(
            missing = summary.missing_authors.len(),
            "contributors missing from the citation file"
        );
    }
    info!(
        appended = update.outcome.appended.len(),
        already_present = update.outcome.already_present.len(),
        "contributor check complete"
    );
    Ok(RunReport { summary, update })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::client::AccountKind;
    use crate::identity::author::{ALIAS, NAME};
    use crate::lookup::fakes::{user, FakeOrcid, FakeProfiles};
    use crate::models::ContributionCategory;

    const DOC: &str = "cff-version: 1.2.0\nmessage: Cite me\ntitle: Demo\nauthors:\n  - name: Demo Org\n";

    fn write_doc(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("CITATION.cff");
        std::fs::write(&path, DOC).unwrap();
        path
    }

    fn evidence_for(logins: &[&str]) -> ContributionEvidence {
        let mut evidence = ContributionEvidence::new();
        for login in logins {
            evidence.record(
                ContributorSignal::handle(*login),
                ContributionCategory::Commits,
                "0123456789",
            );
        }
        evidence
    }

    #[tokio::test]
    async fn test_update_writes_new_author() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(&dir);
        let profiles = FakeProfiles::default().with(user("alice", Some("Alice Smith")));
        let orcid = FakeOrcid::default();

        let result = CitationUpdater::new(&profiles, &orcid, "https://github.com")
            .update(&path, &evidence_for(&["alice"]), "o/r", false)
            .await
            .unwrap();

        assert!(result.written);
        let saved = CffDocument::load(&path).unwrap();
        let authors = saved.authors().unwrap();
        assert_eq!(authors.len(), 2);
        assert_eq!(authors[1].get(ALIAS), Some("https://github.com/alice"));
        assert!(std::fs::read_to_string(&path).unwrap().starts_with("cff-version"));
    }

    #[tokio::test]
    async fn test_dry_run_leaves_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(&dir);
        let profiles = FakeProfiles::default().with(user("alice", Some("Alice Smith")));
        let orcid = FakeOrcid::default();

        let result = CitationUpdater::new(&profiles, &orcid, "https://github.com")
            .update(&path, &evidence_for(&["alice"]), "o/r", true)
            .await
            .unwrap();

        assert!(!result.written);
        assert_eq!(result.document.authors().unwrap().len(), 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DOC);
    }

    #[tokio::test]
    async fn test_unchanged_file_is_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(&dir);
        let mut org = user("demo", Some("Demo Org"));
        org.account_type = AccountKind::Organization;
        let profiles = FakeProfiles::default().with(org);
        let orcid = FakeOrcid::default();

        let result = CitationUpdater::new(&profiles, &orcid, "https://github.com")
            .update(&path, &evidence_for(&["demo"]), "o/r", false)
            .await
            .unwrap();

        assert!(!result.written);
        assert_eq!(result.outcome.already_present.len(), 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DOC);
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("CITATION.cff");
        std::fs::write(&path, "cff-version: 1.2.0\ntitle: Demo\nauthors: []\n").unwrap();
        let profiles = FakeProfiles::default();
        let orcid = FakeOrcid::default();

        let err = CitationUpdater::new(&profiles, &orcid, "https://github.com")
            .update(&path, &evidence_for(&["alice"]), "o/r", false)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Cff(CffError::Invalid { .. })));
    }

    #[test]
    fn test_save_validated_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(&dir);
        let mut doc = CffDocument::parse(DOC).unwrap();
        doc.set_authors(&[crate::identity::AuthorRecord::new().with(ALIAS, "x")]);

        let err = save_validated(&path, &doc).unwrap_err();
        assert!(matches!(err, CffError::ValidationFailed { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DOC);
    }

    #[test]
    fn test_save_validated_keeps_valid_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(&dir);
        let mut doc = CffDocument::parse(DOC).unwrap();
        doc.set_authors(&[crate::identity::AuthorRecord::new().with(NAME, "Other Org")]);

        save_validated(&path, &doc).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("Other Org"));
    }
}
