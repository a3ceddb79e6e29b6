//! cffauthors core library.
//!
//! Keeps the `authors` list of a `CITATION.cff` file in step with the people
//! who contribute to a pull request: contributor collection, identity
//! resolution, deduplicating merge, and reporting back to the pull request.

pub mod cff;
pub mod config;
pub mod errors;
pub mod github;
pub mod identity;
pub mod lookup;
pub mod merge;
pub mod models;
pub mod notify;
pub mod orcid;
pub mod provenance;
pub mod updater;

// Re-exports for convenience.
pub use cff::CffDocument;
pub use config::{AppConfig, PullRequestContext};
pub use errors::CoreError;
pub use identity::{AuthorKind, AuthorRecord};
pub use merge::{MergeOrchestrator, MergeOutcome};
pub use models::{ContributionEvidence, ContributorSignal};
pub use updater::{CitationUpdater, RunReport};
