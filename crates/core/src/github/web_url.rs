//! Host-aware GitHub web URLs.
//!
//! Author aliases and provenance links point at the web UI, not the API. The
//! web base is derived from the configured API URL so that GitHub Enterprise
//! Server installations produce links to their own host.

/// Derive the web base URL from the REST API base URL.
///
/// - `https://api.github.com`  → `https://github.com`
/// - `https://<host>/api/v3`   → `https://<host>`
/// - anything else             → trailing slash stripped, used as-is
pub fn derive_web_base_url(api_url: &str) -> String {
    let url = api_url.trim().trim_end_matches('/');

    if url.eq_ignore_ascii_case("https://api.github.com") {
        return "https://github.com".to_string();
    }

    if let Some(base) = url.strip_suffix("/api/v3") {
        return base.to_string();
    }

    url.to_string()
}

/// Canonical profile URL for a login. The login is case-folded so the same
/// account always yields the same alias.
pub fn profile_url(web_base: &str, login: &str) -> String {
    format!(
        "{}/{}",
        web_base.trim_end_matches('/'),
        login.trim().to_lowercase()
    )
}

/// Web URL of a commit in `owner/name`.
pub fn commit_url(web_base: &str, repo: &str, sha: &str) -> String {
    format!("{}/{}/commit/{}", web_base.trim_end_matches('/'), repo, sha)
}
