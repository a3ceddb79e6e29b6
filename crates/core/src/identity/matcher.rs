//! Identity comparison between author records.
//!
//! Two records denote the same contributor when any one identifying field
//! agrees after normalization. Fields are checked independently: a single
//! overlapping field is enough, and an empty field never counts.

use tracing::trace;

use super::author::{AuthorKind, AuthorRecord, ALIAS, EMAIL, FAMILY_NAMES, GIVEN_NAMES, NAME, ORCID};
use crate::errors::IdentityError;

/// Case-fold and trim a field value.
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Normalized full name of a person: given and family names joined by one
/// space, trimmed. Missing parts read as empty.
pub fn normalized_full_name(record: &AuthorRecord) -> String {
    let given = normalize(record.get(GIVEN_NAMES).unwrap_or(""));
    let family = normalize(record.get(FAMILY_NAMES).unwrap_or(""));
    format!("{} {}", given, family).trim().to_string()
}

/// Decide whether `a` and `b` denote the same contributor.
///
/// Records of different variants never match. Comparing a record of unknown
/// variant is an error: it means the author list is malformed.
pub fn same_identity(a: &AuthorRecord, b: &AuthorRecord) -> Result<bool, IdentityError> {
    let matched = match (a.kind(), b.kind()) {
        (AuthorKind::Unknown, _) => return Err(unknown(a)),
        (_, AuthorKind::Unknown) => return Err(unknown(b)),
        (AuthorKind::Entity, AuthorKind::Entity) => {
            field_matches(a, b, NAME) || field_matches(a, b, ALIAS)
        }
        (AuthorKind::Person, AuthorKind::Person) => {
            field_matches(a, b, ALIAS)
                || field_matches(a, b, EMAIL)
                || field_matches(a, b, ORCID)
                || non_empty_eq(&normalized_full_name(a), &normalized_full_name(b))
        }
        (AuthorKind::Person, AuthorKind::Entity) | (AuthorKind::Entity, AuthorKind::Person) => {
            false
        }
    };
    trace!(a = %a, b = %b, matched, "compared author identities");
    Ok(matched)
}

/// Whether any record in `authors` denotes the same contributor as `candidate`.
pub fn find_match<'a>(
    candidate: &AuthorRecord,
    authors: &'a [AuthorRecord],
) -> Result<Option<&'a AuthorRecord>, IdentityError> {
    for existing in authors {
        if same_identity(existing, candidate)? {
            return Ok(Some(existing));
        }
    }
    Ok(None)
}

fn field_matches(a: &AuthorRecord, b: &AuthorRecord, key: &str) -> bool {
    non_empty_eq(
        &normalize(a.get(key).unwrap_or("")),
        &normalize(b.get(key).unwrap_or("")),
    )
}

fn non_empty_eq(a: &str, b: &str) -> bool {
    !a.is_empty() && a == b
}

fn unknown(record: &AuthorRecord) -> IdentityError {
    IdentityError::UnknownAuthorType {
        record: record.to_string(),
    }
}
