//! Configuration for a contributor check run.
//!
//! A run is configured either from a TOML file ([`AppConfig::load_from_file`])
//! or from the GitHub Actions environment ([`AppConfig::from_env`]). The token
//! is never stored in the file: `github.token_env` names the environment
//! variable holding it, resolved by [`AppConfig::resolve_env_vars`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// GitHub repository and API settings.
    pub github: GitHubConfig,

    /// Citation file settings.
    #[serde(default)]
    pub cff: CffConfig,

    /// Which pull request activity earns authorship.
    #[serde(default)]
    pub authorship: AuthorshipConfig,

    /// Workflow outputs and the pull request comment.
    #[serde(default)]
    pub report: ReportConfig,

    /// ORCID registry settings.
    #[serde(default)]
    pub orcid: OrcidConfig,
}

// ---------------------------------------------------------------------------
// GitHub
// ---------------------------------------------------------------------------

/// GitHub repository and API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// REST API base URL. Default `https://api.github.com`.
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    /// Repository in `owner/repo` format.
    pub repo: String,

    /// Environment variable holding the token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Workflow event payload (`GITHUB_EVENT_PATH`).
    #[serde(default)]
    pub event_path: Option<PathBuf>,

    /// Head commit of the run (`GITHUB_SHA`), shown in the comment footer.
    #[serde(default)]
    pub sha: Option<String>,

    /// Resolved token (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub token: Option<String>,
}

fn default_github_api_url() -> String {
    "https://api.github.com".into()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".into()
}

// ---------------------------------------------------------------------------
// Citation file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CffConfig {
    /// Path of the citation file. Default `CITATION.cff`.
    #[serde(default = "default_cff_path")]
    pub path: PathBuf,
}

fn default_cff_path() -> PathBuf {
    PathBuf::from("CITATION.cff")
}

impl Default for CffConfig {
    fn default() -> Self {
        Self {
            path: default_cff_path(),
        }
    }
}

// ---------------------------------------------------------------------------
// Authorship
// ---------------------------------------------------------------------------

/// Switches for each kind of activity. All default to on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorshipConfig {
    #[serde(default = "default_true")]
    pub commits: bool,
    #[serde(default = "default_true")]
    pub reviews: bool,
    /// Authors of issues linked to the pull request.
    #[serde(default = "default_true")]
    pub issues: bool,
    /// Commenters on linked issues.
    #[serde(default = "default_true")]
    pub issue_comments: bool,
    /// Commenters on the pull request conversation.
    #[serde(default = "default_true")]
    pub pr_comments: bool,
    /// Honour `Co-authored-by:` commit trailers.
    #[serde(default = "default_true")]
    pub include_coauthors: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AuthorshipConfig {
    fn default() -> Self {
        Self {
            commits: true,
            reviews: true,
            issues: true,
            issue_comments: true,
            pr_comments: true,
            include_coauthors: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// File the workflow outputs are appended to (`GITHUB_OUTPUT`).
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Publish the summary as a pull request comment.
    #[serde(default = "default_true")]
    pub post_comment: bool,

    /// Fail the run when a contributor is missing from the citation file.
    #[serde(default)]
    pub missing_author_invalidates_pr: bool,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("/tmp/github_output.txt")
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            post_comment: true,
            missing_author_invalidates_pr: false,
        }
    }
}

// ---------------------------------------------------------------------------
// ORCID
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrcidConfig {
    /// Public API base URL.
    #[serde(default = "default_orcid_api_url")]
    pub api_url: String,

    /// Contributors resolved at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_orcid_api_url() -> String {
    crate::orcid::DEFAULT_API_URL.into()
}
fn default_concurrency() -> usize {
    crate::lookup::DEFAULT_CONCURRENCY
}

impl Default for OrcidConfig {
    fn default() -> Self {
        Self {
            api_url: default_orcid_api_url(),
            concurrency: default_concurrency(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve the token; call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from GitHub Actions style variables, read
    /// through `lookup`. The token is resolved as well.
    ///
    /// `REPO` is required. Flags are on unless set to something other than
    /// `true` (case-insensitive); `MISSING_AUTHOR_INVALIDATES_PR` is off
    /// unless set to `true`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let flag = |name: &str, default: bool| match lookup(name) {
            Some(value) => value.trim().eq_ignore_ascii_case("true"),
            None => default,
        };

        let repo = var("REPO").ok_or_else(|| ConfigError::EnvVarMissing {
            var: "REPO".into(),
            field: "github.repo".into(),
        })?;

        let token_env = default_token_env();
        let config = Self {
            github: GitHubConfig {
                api_url: var("GITHUB_API_URL").unwrap_or_else(default_github_api_url),
                repo,
                token: var(&token_env),
                token_env,
                event_path: var("GITHUB_EVENT_PATH").map(PathBuf::from),
                sha: var("GITHUB_SHA"),
            },
            cff: CffConfig {
                path: var("CFF_PATH").map(PathBuf::from).unwrap_or_else(default_cff_path),
            },
            authorship: AuthorshipConfig {
                commits: flag("AUTHORSHIP_FOR_PR_COMMITS", true),
                reviews: flag("AUTHORSHIP_FOR_PR_REVIEWS", true),
                issues: flag("AUTHORSHIP_FOR_PR_ISSUES", true),
                issue_comments: flag("AUTHORSHIP_FOR_PR_ISSUE_COMMENTS", true),
                pr_comments: flag("AUTHORSHIP_FOR_PR_COMMENT", true),
                include_coauthors: flag("INCLUDE_COAUTHORS", true),
            },
            report: ReportConfig {
                output_path: var("GITHUB_OUTPUT")
                    .map(PathBuf::from)
                    .unwrap_or_else(default_output_path),
                post_comment: flag("POST_COMMENT", true),
                missing_author_invalidates_pr: flag("MISSING_AUTHOR_INVALIDATES_PR", false),
            },
            orcid: OrcidConfig::default(),
        };
        debug!(repo = %config.github.repo, "configuration read from environment");
        Ok(config)
    }

    /// Resolve `github.token_env` from the environment.
    ///
    /// A missing variable logs a warning but does not fail; see
    /// [`token`](Self::token).
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        info!("resolving environment variable references in config");
        self.github.token = resolve_optional_env(&self.github.token_env, "github.token_env");
        debug!("environment variable resolution complete");
        Ok(())
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.github.repo.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "github.repo".into(),
                detail: "GitHub repo must not be empty".into(),
            });
        }
        if !self.github.repo.contains('/') {
            return Err(ConfigError::InvalidValue {
                field: "github.repo".into(),
                detail: "GitHub repo must be in 'owner/repo' format".into(),
            });
        }
        if self.github.api_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "github.api_url".into(),
                detail: "API URL must not be empty".into(),
            });
        }
        if self.cff.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "cff.path".into(),
                detail: "citation file path must not be empty".into(),
            });
        }
        if self.orcid.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "orcid.concurrency".into(),
                detail: "concurrency must be > 0".into(),
            });
        }

        Ok(())
    }

    /// The resolved token, required for every API call.
    pub fn token(&self) -> Result<&str, ConfigError> {
        self.github
            .token
            .as_deref()
            .ok_or_else(|| ConfigError::EnvVarMissing {
                var: self.github.token_env.clone(),
                field: "github.token_env".into(),
            })
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Pull request event
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct EventRepo {
    full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct EventRef {
    #[serde(rename = "ref")]
    ref_name: String,
    #[serde(default)]
    sha: Option<String>,
    #[serde(default)]
    repo: Option<EventRepo>,
}

#[derive(Debug, Clone, Deserialize)]
struct EventPullRequest {
    number: u64,
    head: EventRef,
    base: EventRef,
}

#[derive(Debug, Clone, Deserialize)]
struct WorkflowEvent {
    #[serde(default)]
    number: Option<u64>,
    #[serde(default)]
    pull_request: Option<EventPullRequest>,
}

/// The pull request a run is checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestContext {
    pub number: u64,
    /// Repository the pull request was opened against.
    pub repo: String,
    /// Repository the head branch lives in; commits are compared there.
    pub compare_repo: String,
    pub base_ref: String,
    pub head_ref: String,
    pub head_sha: Option<String>,
}

impl PullRequestContext {
    /// Read the workflow event payload at `path`.
    ///
    /// Only pull request events are supported.
    pub fn load_event(path: &Path, repo: &str) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::parse_event(&contents, repo)
    }

    pub fn parse_event(json: &str, repo: &str) -> Result<Self, ConfigError> {
        let event: WorkflowEvent =
            serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        let pr = event.pull_request.ok_or_else(|| {
            ConfigError::UnsupportedEvent("only pull_request events are supported".into())
        })?;

        let compare_repo = pr
            .head
            .repo
            .map(|r| r.full_name)
            .unwrap_or_else(|| repo.to_string());
        let context = Self {
            number: event.number.unwrap_or(pr.number),
            repo: repo.to_string(),
            compare_repo,
            base_ref: pr.base.ref_name,
            head_ref: pr.head.ref_name,
            head_sha: pr.head.sha,
        };
        info!(
            number = context.number,
            compare_repo = %context.compare_repo,
            base = %context.base_ref,
            head = %context.head_ref,
            "loaded pull request event"
        );
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn sample_toml() -> &'static str {
        r#"
[github]
api_url = "https://github.example.com/api/v3"
repo = "acme/myrepo"
token_env = "CFFAUTHORS_TEST_TOKEN"
event_path = "/tmp/event.json"

[cff]
path = "docs/CITATION.cff"

[authorship]
reviews = false
include_coauthors = false

[report]
output_path = "/tmp/out.txt"
post_comment = false
missing_author_invalidates_pr = true

[orcid]
concurrency = 2
"#
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_parse_full_config() {
        let config: AppConfig = toml::from_str(sample_toml()).expect("failed to parse toml");
        assert_eq!(config.github.repo, "acme/myrepo");
        assert_eq!(config.cff.path, PathBuf::from("docs/CITATION.cff"));
        assert!(!config.authorship.reviews);
        assert!(config.authorship.commits);
        assert!(!config.authorship.include_coauthors);
        assert!(!config.report.post_comment);
        assert!(config.report.missing_author_invalidates_pr);
        assert_eq!(config.orcid.concurrency, 2);
        assert_eq!(config.orcid.api_url, "https://pub.orcid.org/v3.0");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cffauthors.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample_toml().as_bytes()).unwrap();

        let config = AppConfig::load_from_file(&path).expect("load_from_file failed");
        assert_eq!(config.github.api_url, "https://github.example.com/api/v3");
        config.validate().unwrap();
    }

    #[test]
    fn test_file_not_found() {
        let result = AppConfig::load_from_file("/nonexistent/cffauthors.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_defaults() {
        let config: AppConfig = toml::from_str("[github]\nrepo = \"acme/repo\"\n").unwrap();
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.github.token_env, "GITHUB_TOKEN");
        assert_eq!(config.cff.path, PathBuf::from("CITATION.cff"));
        assert_eq!(config.authorship, AuthorshipConfig::default());
        assert_eq!(config.report.output_path, PathBuf::from("/tmp/github_output.txt"));
        assert!(config.report.post_comment);
        assert!(!config.report.missing_author_invalidates_pr);
        assert_eq!(config.orcid.concurrency, 8);
    }

    #[test]
    fn test_validate_rejects_bad_repo_format() {
        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.github.repo = "noslash".into();
        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "github.repo"
        ));
    }

    #[test]
    fn test_resolve_env_vars() {
        std::env::set_var("CFFAUTHORS_TEST_TOKEN", "ghp_abc");

        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        assert!(config.token().is_err());
        config.resolve_env_vars().unwrap();
        assert_eq!(config.token().unwrap(), "ghp_abc");

        std::env::remove_var("CFFAUTHORS_TEST_TOKEN");
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config =
            AppConfig::from_lookup(lookup(&[("REPO", "acme/repo"), ("GITHUB_TOKEN", "t")]))
                .unwrap();
        assert_eq!(config.github.repo, "acme/repo");
        assert_eq!(config.token().unwrap(), "t");
        assert_eq!(config.cff.path, PathBuf::from("CITATION.cff"));
        assert_eq!(config.authorship, AuthorshipConfig::default());
        assert!(config.report.post_comment);
        assert!(!config.report.missing_author_invalidates_pr);
        assert!(config.github.event_path.is_none());
    }

    #[test]
    fn test_from_lookup_flags() {
        let config = AppConfig::from_lookup(lookup(&[
            ("REPO", "acme/repo"),
            ("AUTHORSHIP_FOR_PR_REVIEWS", "False"),
            ("AUTHORSHIP_FOR_PR_COMMENT", "yes"),
            ("INCLUDE_COAUTHORS", "TRUE"),
            ("MISSING_AUTHOR_INVALIDATES_PR", "True"),
            ("CFF_PATH", "CITATION-dev.cff"),
            ("GITHUB_OUTPUT", "/tmp/gh-out"),
            ("GITHUB_EVENT_PATH", "/tmp/event.json"),
            ("GITHUB_SHA", "0123456789"),
        ]))
        .unwrap();
        assert!(!config.authorship.reviews);
        assert!(!config.authorship.pr_comments);
        assert!(config.authorship.include_coauthors);
        assert!(config.report.missing_author_invalidates_pr);
        assert_eq!(config.cff.path, PathBuf::from("CITATION-dev.cff"));
        assert_eq!(config.report.output_path, PathBuf::from("/tmp/gh-out"));
        assert_eq!(config.github.event_path, Some(PathBuf::from("/tmp/event.json")));
        assert_eq!(config.github.sha.as_deref(), Some("0123456789"));
        assert!(config.token().is_err());
    }

    #[test]
    fn test_from_lookup_requires_repo() {
        let result = AppConfig::from_lookup(lookup(&[]));
        assert!(matches!(
            result,
            Err(ConfigError::EnvVarMissing { ref var, .. }) if var == "REPO"
        ));
    }

    #[test]
    fn test_parse_pull_request_event() {
        let json = r#"{
            "action": "synchronize",
            "number": 42,
            "pull_request": {
                "number": 42,
                "head": {"ref": "feature", "sha": "abc123", "repo": {"full_name": "fork/myrepo"}},
                "base": {"ref": "main", "sha": "def456", "repo": {"full_name": "acme/myrepo"}}
            }
        }"#;
        let ctx = PullRequestContext::parse_event(json, "acme/myrepo").unwrap();
        assert_eq!(
            ctx,
            PullRequestContext {
                number: 42,
                repo: "acme/myrepo".into(),
                compare_repo: "fork/myrepo".into(),
                base_ref: "main".into(),
                head_ref: "feature".into(),
                head_sha: Some("abc123".into()),
            }
        );
    }

    #[test]
    fn test_push_event_is_unsupported() {
        let json = r#"{"ref": "refs/heads/main", "before": "a", "after": "b"}"#;
        assert!(matches!(
            PullRequestContext::parse_event(json, "acme/myrepo"),
            Err(ConfigError::UnsupportedEvent(_))
        ));
    }

    #[test]
    fn test_load_event_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event.json");
        std::fs::write(
            &path,
            r#"{"pull_request": {"number": 7, "head": {"ref": "fix"}, "base": {"ref": "main"}}}"#,
        )
        .unwrap();
        let ctx = PullRequestContext::load_event(&path, "acme/myrepo").unwrap();
        assert_eq!(ctx.number, 7);
        assert_eq!(ctx.compare_repo, "acme/myrepo");
        assert_eq!(ctx.head_sha, None);
    }
}
