//! Error types for the cffauthors core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use thiserror::Error;

use crate::models::ContributorSignal;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Provenance(#[from] ProvenanceError),

    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error(transparent)]
    Orcid(#[from] OrcidError),

    #[error(transparent)]
    Cff(#[from] CffError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

// ---------------------------------------------------------------------------
// Identity errors
// ---------------------------------------------------------------------------

/// Errors from author classification and identity comparison.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// A record that is neither a person nor an entity reached a comparison.
    #[error("cannot compare author of unknown type: {record}")]
    UnknownAuthorType { record: String },

    /// An author entry in the document is not a mapping of string fields.
    #[error("author entry #{index} is malformed: {detail}")]
    MalformedEntry { index: usize, detail: String },
}

// ---------------------------------------------------------------------------
// Merge errors
// ---------------------------------------------------------------------------

/// Usage errors detected by the merge orchestrator.
#[derive(Debug, Error)]
pub enum MergeError {
    /// A signal was handed to the merge without its pre-fetched lookup results.
    #[error("no lookup results were resolved for contributor {0}")]
    MissingResolution(ContributorSignal),

    /// The pre-fetched result does not fit the signal shape.
    #[error("lookup result for contributor {signal} does not match its kind: {detail}")]
    ResolutionMismatch {
        signal: ContributorSignal,
        detail: String,
    },
}

// ---------------------------------------------------------------------------
// Provenance errors
// ---------------------------------------------------------------------------

/// Errors from formatting a provenance note.
#[derive(Debug, Error)]
pub enum ProvenanceError {
    /// The signal carries no identifying text at all.
    #[error("contributor signal has no handle, name or email")]
    EmptySignal,

    /// No contribution category holds a reference for the signal.
    #[error("no contribution recorded for contributor {0}")]
    NoContribution(ContributorSignal),
}

// ---------------------------------------------------------------------------
// GitHub API errors
// ---------------------------------------------------------------------------

/// Errors from GitHub REST API interactions.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// HTTP-level transport error (network, TLS, etc.).
    #[error("GitHub HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The API returned a non-success status code.
    #[error("GitHub API error (HTTP {status}): {body}")]
    ApiError { status: u16, body: String },

    /// Authentication token is missing or invalid.
    #[error("GitHub authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Rate limit exceeded.
    #[error("GitHub rate limit exceeded, resets at {reset_at}")]
    RateLimited { reset_at: String },

    /// The requested user, repository or issue does not exist.
    #[error("GitHub resource not found: {0}")]
    NotFound(String),
}

// ---------------------------------------------------------------------------
// ORCID errors
// ---------------------------------------------------------------------------

/// Errors from the ORCID public API.
#[derive(Debug, Error)]
pub enum OrcidError {
    /// HTTP-level transport error.
    #[error("ORCID HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The API returned a non-success status code.
    #[error("ORCID API error (HTTP {status})")]
    ApiError { status: u16 },

    /// The response body did not have the expected shape.
    #[error("ORCID response parse error: {0}")]
    ParseError(String),
}

// ---------------------------------------------------------------------------
// Citation file errors
// ---------------------------------------------------------------------------

/// Errors from loading, validating and saving the citation file.
#[derive(Debug, Error)]
pub enum CffError {
    /// The citation file does not exist.
    #[error("citation file not found: {0}")]
    FileNotFound(String),

    /// YAML parse or emit error.
    #[error("citation file YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// The document does not have the required structure.
    #[error("citation file is invalid: {}", .problems.join("; "))]
    Invalid { problems: Vec<String> },

    /// The document written by this run failed validation and was rolled back.
    #[error("validation failed for output citation file '{path}': {detail}")]
    ValidationFailed { path: String, detail: String },

    /// An author entry could not be interpreted.
    #[error("citation file author error: {0}")]
    Author(#[from] IdentityError),

    /// Generic I/O wrapper.
    #[error("citation file I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML or JSON parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A required environment variable is not set.
    #[error("required environment variable '{var}' is not set (referenced by config field '{field}')")]
    EnvVarMissing { var: String, field: String },

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// The workflow event is not a pull request event.
    #[error("unsupported workflow event: {0}")]
    UnsupportedEvent(String),

    /// Generic I/O error reading the config or event file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Reporting errors
// ---------------------------------------------------------------------------

/// Errors from writing workflow outputs or publishing the summary comment.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The output file could not be written.
    #[error("workflow output I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization of the contribution details failed.
    #[error("workflow output serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Rendering the updated document failed.
    #[error("workflow output YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Publishing the pull request comment failed.
    #[error("pull request comment failed: {0}")]
    CommentFailed(#[from] GitHubError),
}
