//! ORCID registry client.
//!
//! Identifiers are handled in their bare `0000-0000-0000-0000` form and only
//! turned into `https://orcid.org/...` URLs when stored in an author record.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex_lite::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::errors::OrcidError;
use crate::lookup::{OrcidSearch, OrcidSource};

/// Public API base.
pub const DEFAULT_API_URL: &str = "https://pub.orcid.org/v3.0";

const VALIDATE_TIMEOUT: Duration = Duration::from_secs(5);
const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

fn embedded_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"https?://orcid\.org/(\d{4}-\d{4}-\d{4}-\d{4})").expect("static ORCID URL pattern")
    })
}

fn format_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{4}-\d{4}-\d{4}$").expect("static ORCID format pattern")
    })
}

/// Find an `orcid.org` URL in free text and return its bare identifier.
pub fn extract_orcid(text: &str) -> Option<String> {
    embedded_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Whether `orcid` has the `dddd-dddd-dddd-dddd` shape.
pub fn is_valid_orcid_format(orcid: &str) -> bool {
    format_pattern().is_match(orcid)
}

/// Record URL of a bare identifier.
pub fn orcid_url(orcid: &str) -> String {
    format!("https://orcid.org/{}", orcid)
}

/// Registry search query for a full name and optional email.
pub fn search_query(full_name: &str, email: Option<&str>) -> String {
    let trimmed = full_name.trim();
    let (given, family) = trimmed.split_once(' ').unwrap_or((trimmed, ""));
    let mut query = format!("given-names:{}", given);
    if !family.is_empty() {
        query.push_str(&format!(" AND family-name:{}", family));
    }
    if let Some(email) = email.filter(|e| !e.is_empty()) {
        query.push_str(&format!(" OR email:\"{}\"", email));
    }
    query
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Option<Vec<SearchHit>>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "orcid-identifier")]
    orcid_identifier: OrcidIdentifier,
}

#[derive(Debug, Deserialize)]
struct OrcidIdentifier {
    path: String,
}

#[derive(Debug, Default, Deserialize)]
struct ValueField {
    #[serde(default)]
    value: String,
}

#[derive(Debug, Default, Deserialize)]
struct PersonName {
    #[serde(rename = "given-names", default)]
    given_names: Option<ValueField>,
    #[serde(rename = "family-name", default)]
    family_name: Option<ValueField>,
    #[serde(rename = "credit-name", default)]
    credit_name: Option<ValueField>,
}

#[derive(Debug, Deserialize)]
struct OtherName {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct OtherNames {
    #[serde(rename = "other-name", default)]
    other_name: Vec<OtherName>,
}

/// `GET /{id}/personal-details`.
#[derive(Debug, Default, Deserialize)]
pub struct PersonalDetails {
    #[serde(default)]
    name: Option<PersonName>,
    #[serde(rename = "other-names", default)]
    other_names: Option<OtherNames>,
}

impl PersonalDetails {
    fn value(field: &Option<ValueField>) -> &str {
        field.as_ref().map(|f| f.value.trim()).unwrap_or("")
    }

    pub fn credit_name(&self) -> &str {
        self.name
            .as_ref()
            .map(|n| Self::value(&n.credit_name))
            .unwrap_or("")
    }

    /// Given and family name joined by a space.
    pub fn combined_name(&self) -> String {
        match &self.name {
            Some(n) => format!(
                "{} {}",
                Self::value(&n.given_names),
                Self::value(&n.family_name)
            )
            .trim()
            .to_string(),
            None => String::new(),
        }
    }

    /// Whether `full_name` equals the credit name, an other name, or the
    /// combined given and family names, ignoring case.
    pub fn matches_name(&self, full_name: &str) -> bool {
        let target = full_name.trim().to_lowercase();
        if target.is_empty() {
            return false;
        }
        let credit = self.credit_name().to_lowercase();
        let combined = self.combined_name().to_lowercase();
        let mut others = self
            .other_names
            .iter()
            .flat_map(|o| o.other_name.iter())
            .map(|n| n.content.trim().to_lowercase());

        credit == target || combined == target || others.any(|n| n == target)
    }

    /// Name shown in the match log.
    pub fn display_name(&self) -> String {
        match self.credit_name() {
            "" => self.combined_name(),
            credit => credit.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Asynchronous client for the public ORCID API.
#[derive(Clone)]
pub struct OrcidClient {
    http: reqwest::Client,
    api_url: String,
}

impl OrcidClient {
    pub fn new(api_url: impl Into<String>) -> Result<Self, OrcidError> {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("cffauthors/0.1"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        info!(api_url = %api_url, "created OrcidClient");
        Ok(Self { http, api_url })
    }

    /// Whether the record exists in the registry.
    #[instrument(skip(self))]
    pub async fn record_exists(&self, orcid: &str) -> Result<bool, OrcidError> {
        let url = format!("{}/{}", self.api_url, orcid);
        let resp = self
            .http
            .get(&url)
            .header(ACCEPT, "application/json")
            .timeout(VALIDATE_TIMEOUT)
            .send()
            .await?;
        Ok(resp.status().as_u16() == 200)
    }

    /// First identifier returned by a registry search.
    #[instrument(skip(self))]
    pub async fn first_search_hit(&self, query: &str) -> Result<Option<String>, OrcidError> {
        let url = format!("{}/search/", self.api_url);
        let resp = self
            .http
            .get(&url)
            .header(ACCEPT, "application/vnd.orcid+json")
            .query(&[("q", query)])
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await?;
        check_response(&resp)?;
        let body = resp.text().await?;
        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|e| OrcidError::ParseError(e.to_string()))?;
        let hit = parsed
            .result
            .and_then(|hits| hits.into_iter().next())
            .map(|hit| hit.orcid_identifier.path);
        debug!(found = hit.is_some(), "searched registry");
        Ok(hit)
    }

    #[instrument(skip(self))]
    pub async fn personal_details(&self, orcid: &str) -> Result<PersonalDetails, OrcidError> {
        let url = format!("{}/{}/personal-details", self.api_url, orcid);
        let resp = self
            .http
            .get(&url)
            .header(ACCEPT, "application/vnd.orcid+json")
            .timeout(VALIDATE_TIMEOUT)
            .send()
            .await?;
        check_response(&resp)?;
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| OrcidError::ParseError(e.to_string()))
    }

    async fn try_search(
        &self,
        full_name: &str,
        email: Option<&str>,
    ) -> Result<OrcidSearch, OrcidError> {
        let query = search_query(full_name, email);
        let Some(orcid) = self.first_search_hit(&query).await? else {
            return Ok(OrcidSearch::default());
        };

        let details = self.personal_details(&orcid).await?;
        if details.matches_name(full_name) {
            let log = format!(
                "- `{}` matched to ORCID `{}` (record name: **{}**)",
                full_name,
                orcid,
                details.display_name()
            );
            Ok(OrcidSearch {
                orcid: Some(orcid),
                log: Some(log),
            })
        } else {
            Ok(OrcidSearch {
                orcid: None,
                log: Some(format!(
                    "- `{}`: ORCID `{}` found but name mismatch",
                    full_name, orcid
                )),
            })
        }
    }
}

#[async_trait]
impl OrcidSource for OrcidClient {
    async fn search(&self, full_name: &str, email: Option<&str>) -> OrcidSearch {
        match self.try_search(full_name, email).await {
            Ok(search) => search,
            Err(e) => {
                warn!(name = full_name, error = %e, "ORCID search failed");
                OrcidSearch {
                    orcid: None,
                    log: Some(format!("- `{}`: ORCID search failed: {}", full_name, e)),
                }
            }
        }
    }

    async fn validate(&self, orcid: &str) -> bool {
        if !is_valid_orcid_format(orcid) {
            return false;
        }
        match self.record_exists(orcid).await {
            Ok(exists) => exists,
            Err(e) => {
                debug!(orcid, error = %e, "ORCID validation request failed");
                false
            }
        }
    }
}

fn check_response(resp: &reqwest::Response) -> Result<(), OrcidError> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(OrcidError::ApiError {
            status: status.as_u16(),
        })
    }
}
