//! Author records as stored in the `authors` list of a citation file.
//!
//! A record is an ordered mapping of field names to values. Its variant is
//! not stored but derived from which fields are present, see
//! [`AuthorRecord::kind`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::errors::IdentityError;

pub const GIVEN_NAMES: &str = "given-names";
pub const FAMILY_NAMES: &str = "family-names";
pub const NAME: &str = "name";
pub const ALIAS: &str = "alias";
pub const EMAIL: &str = "email";
pub const ORCID: &str = "orcid";

/// Variant of an author record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorKind {
    /// A human author with given and family names.
    Person,
    /// An organization, a bot, or a contributor known by a single name.
    Entity,
    /// Neither field set is satisfied. Never valid in a document.
    Unknown,
}

impl fmt::Display for AuthorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Person => write!(f, "person"),
            Self::Entity => write!(f, "entity"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// One author entry. Fields keep their insertion order so a rewritten
/// document lists them the way they were read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorRecord {
    fields: Mapping,
}

impl AuthorRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// A person with the two required name fields.
    pub fn person(given_names: impl Into<String>, family_names: impl Into<String>) -> Self {
        Self::new()
            .with(GIVEN_NAMES, given_names)
            .with(FAMILY_NAMES, family_names)
    }

    /// An entity with the required `name` field.
    pub fn entity(name: impl Into<String>) -> Self {
        Self::new().with(NAME, name)
    }

    /// Interpret a YAML node from the `authors` sequence.
    pub fn from_value(index: usize, value: Value) -> Result<Self, IdentityError> {
        match value {
            Value::Mapping(fields) => {
                if let Some(key) = fields.keys().find(|k| !k.is_string()) {
                    return Err(IdentityError::MalformedEntry {
                        index,
                        detail: format!("non-string field name {:?}", key),
                    });
                }
                Ok(Self { fields })
            }
            other => Err(IdentityError::MalformedEntry {
                index,
                detail: format!("expected a mapping, found {}", value_kind(&other)),
            }),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Mapping(self.fields)
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Insert or replace a string field. A new key goes to the end.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.fields
            .insert(Value::String(key.to_string()), Value::String(value.into()));
    }

    /// Whether the field exists, whatever its value.
    pub fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// The field as a string. Absent or non-string fields read as `None`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Classify the record.
    ///
    /// `name` takes precedence: a record carrying both `name` and the person
    /// name fields is an entity.
    pub fn kind(&self) -> AuthorKind {
        if self.has(NAME) {
            AuthorKind::Entity
        } else if self.has(GIVEN_NAMES) && self.has(FAMILY_NAMES) {
            AuthorKind::Person
        } else {
            AuthorKind::Unknown
        }
    }
}

impl fmt::Display for AuthorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            let key = key.as_str().unwrap_or("?");
            match value.as_str() {
                Some(s) => write!(f, "{}: {}", key, s)?,
                None => write!(f, "{}: <{}>", key, value_kind(value))?,
            }
        }
        write!(f, "}}")
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}
