//! Citation file (`CITATION.cff`) loading, validation and saving.
//!
//! The document is kept as an ordered YAML mapping so that keys the tool does
//! not know about survive a rewrite untouched and in place.

use std::path::Path;
use std::sync::OnceLock;

use regex_lite::Regex;
use serde_yaml::{Mapping, Value};
use tracing::{debug, info, instrument};

use crate::errors::CffError;
use crate::identity::author::ORCID;
use crate::identity::{AuthorKind, AuthorRecord};

const AUTHORS: &str = "authors";
const REQUIRED_TEXT_FIELDS: [&str; 3] = ["cff-version", "message", "title"];

/// `orcid` values accepted in a document, including the `X` checksum digit.
fn orcid_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^https://orcid\.org/\d{4}-\d{4}-\d{4}-\d{3}[0-9X]$")
            .expect("static ORCID URL pattern")
    })
}

/// An in-memory citation document.
#[derive(Debug, Clone, PartialEq)]
pub struct CffDocument {
    root: Mapping,
}

impl CffDocument {
    /// Read and parse the document at `path`.
    #[instrument]
    pub fn load(path: &Path) -> Result<Self, CffError> {
        if !path.exists() {
            return Err(CffError::FileNotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        let doc = Self::parse(&text)?;
        info!(path = %path.display(), keys = doc.root.len(), "loaded citation file");
        Ok(doc)
    }

    /// Parse document text. The root must be a mapping.
    pub fn parse(text: &str) -> Result<Self, CffError> {
        match serde_yaml::from_str::<Value>(text)? {
            Value::Mapping(root) => Ok(Self { root }),
            Value::Null => Ok(Self {
                root: Mapping::new(),
            }),
            _ => Err(CffError::Invalid {
                problems: vec!["document root is not a mapping".into()],
            }),
        }
    }

    /// The author list. A missing `authors` key reads as an empty list.
    pub fn authors(&self) -> Result<Vec<AuthorRecord>, CffError> {
        match self.root.get(AUTHORS) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Sequence(entries)) => entries
                .iter()
                .enumerate()
                .map(|(i, v)| AuthorRecord::from_value(i, v.clone()).map_err(CffError::from))
                .collect(),
            Some(_) => Err(CffError::Invalid {
                problems: vec!["'authors' is not a sequence".into()],
            }),
        }
    }

    /// Replace the author list, keeping the key's position.
    pub fn set_authors(&mut self, authors: &[AuthorRecord]) {
        let entries = authors.iter().cloned().map(AuthorRecord::into_value).collect();
        self.root
            .insert(Value::String(AUTHORS.into()), Value::Sequence(entries));
    }

    /// Structural validation of the document.
    ///
    /// Collects every problem instead of stopping at the first one.
    pub fn validate(&self) -> Result<(), CffError> {
        let mut problems = Vec::new();

        for field in REQUIRED_TEXT_FIELDS {
            match self.root.get(field) {
                Some(Value::String(s)) if !s.trim().is_empty() => {}
                Some(Value::Number(_)) if field == "cff-version" => {}
                Some(_) => problems.push(format!("'{}' must be a non-empty string", field)),
                None => problems.push(format!("missing required key '{}'", field)),
            }
        }

        match self.root.get(AUTHORS) {
            Some(Value::Sequence(entries)) if entries.is_empty() => {
                problems.push("'authors' must not be empty".into())
            }
            Some(Value::Sequence(entries)) => {
                for (i, entry) in entries.iter().enumerate() {
                    validate_author(i, entry, &mut problems);
                }
            }
            Some(_) => problems.push("'authors' is not a sequence".into()),
            None => problems.push(format!("missing required key '{}'", AUTHORS)),
        }

        if problems.is_empty() {
            debug!("citation file is valid");
            Ok(())
        } else {
            Err(CffError::Invalid { problems })
        }
    }

    /// Render as YAML, keeping key order.
    pub fn to_yaml(&self) -> Result<String, CffError> {
        Ok(serde_yaml::to_string(&self.root)?)
    }

    /// Write the document to `path`.
    #[instrument(skip(self))]
    pub fn save(&self, path: &Path) -> Result<(), CffError> {
        std::fs::write(path, self.to_yaml()?)?;
        info!(path = %path.display(), "wrote citation file");
        Ok(())
    }
}

fn validate_author(index: usize, entry: &Value, problems: &mut Vec<String>) {
    let record = match AuthorRecord::from_value(index, entry.clone()) {
        Ok(record) => record,
        Err(e) => {
            problems.push(e.to_string());
            return;
        }
    };

    if record.kind() == AuthorKind::Unknown {
        problems.push(format!(
            "author #{} needs 'given-names' and 'family-names', or 'name'",
            index
        ));
    }

    if record.has(ORCID) {
        let valid = record
            .get(ORCID)
            .is_some_and(|url| orcid_url_pattern().is_match(url));
        if !valid {
            problems.push(format!(
                "author #{} has a malformed orcid {:?}",
                index,
                record.get(ORCID).unwrap_or("<non-string>")
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::author::{ALIAS, EMAIL};

    const SAMPLE: &str = r#"cff-version: 1.2.0
message: If you use this software, please cite it as below.
title: Example Project
authors:
  - given-names: Alice
    family-names: Smith
    affiliation: Example University
    orcid: https://orcid.org/0000-0002-1825-0097
  - name: ACME Inc
    alias: https://github.com/acme-bot
version: 2.0.1
license: MIT
"#;

    #[test]
    fn test_load_and_read_authors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("CITATION.cff");
        std::fs::write(&path, SAMPLE).unwrap();

        let doc = CffDocument::load(&path).unwrap();
        doc.validate().unwrap();

        let authors = doc.authors().unwrap();
        assert_eq!(authors.len(), 2);
        assert_eq!(authors[0].kind(), AuthorKind::Person);
        assert_eq!(authors[0].get("affiliation"), Some("Example University"));
        assert_eq!(authors[1].kind(), AuthorKind::Entity);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CffDocument::load(&dir.path().join("nope.cff")).unwrap_err();
        assert!(matches!(err, CffError::FileNotFound(_)));
    }

    #[test]
    fn test_round_trip_preserves_unknown_keys_and_order() {
        let mut doc = CffDocument::parse(SAMPLE).unwrap();
        let mut authors = doc.authors().unwrap();
        authors.push(
            AuthorRecord::person("Bob", "Lee")
                .with(ALIAS, "https://github.com/bob")
                .with(EMAIL, "bob@x.com"),
        );
        doc.set_authors(&authors);

        let yaml = doc.to_yaml().unwrap();
        let keys: Vec<_> = yaml
            .lines()
            .filter(|l| !l.starts_with(' ') && !l.starts_with('-'))
            .filter_map(|l| l.split(':').next())
            .collect();
        assert_eq!(
            keys,
            vec!["cff-version", "message", "title", "authors", "version", "license"]
        );
        assert!(yaml.contains("affiliation: Example University"));

        let reparsed = CffDocument::parse(&yaml).unwrap();
        assert_eq!(reparsed.authors().unwrap(), authors);
        reparsed.validate().unwrap();
    }

    #[test]
    fn test_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("CITATION.cff");
        let doc = CffDocument::parse(SAMPLE).unwrap();
        doc.save(&path).unwrap();

        let loaded = CffDocument::load(&path).unwrap();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn test_missing_authors_key_reads_empty() {
        let doc = CffDocument::parse("cff-version: 1.2.0\ntitle: T\nmessage: M\n").unwrap();
        assert!(doc.authors().unwrap().is_empty());
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let doc = CffDocument::parse(
            r#"cff-version: ""
title: T
authors:
  - alias: https://github.com/nobody
  - given-names: Bob
    family-names: Lee
    orcid: 0000-0002-1825-0097
  - just a string
"#,
        )
        .unwrap();

        let err = doc.validate().unwrap_err();
        let CffError::Invalid { problems } = err else {
            panic!("expected Invalid, got {:?}", err);
        };
        assert_eq!(problems.len(), 5, "{:?}", problems);
        assert!(problems.iter().any(|p| p.contains("'cff-version'")));
        assert!(problems.iter().any(|p| p.contains("'message'")));
        assert!(problems.iter().any(|p| p.contains("author #0")));
        assert!(problems.iter().any(|p| p.contains("malformed orcid")));
        assert!(problems.iter().any(|p| p.contains("#2")));
    }

    #[test]
    fn test_orcid_with_checksum_x_is_valid() {
        let doc = CffDocument::parse(
            "cff-version: 1.2.0\nmessage: M\ntitle: T\nauthors:\n  - given-names: Ada\n    family-names: Lovelace\n    orcid: https://orcid.org/0000-0002-1694-233X\n",
        )
        .unwrap();
        doc.validate().unwrap();

        let doc = CffDocument::parse(
            "cff-version: 1.2.0\nmessage: M\ntitle: T\nauthors:\n  - given-names: Ada\n    family-names: Lovelace\n    orcid: https://orcid.org/0000-0002-1694-233Y\n",
        )
        .unwrap();
        assert!(matches!(doc.validate(), Err(CffError::Invalid { .. })));
    }

    #[test]
    fn test_non_mapping_root_is_invalid() {
        assert!(matches!(
            CffDocument::parse("- a\n- b\n"),
            Err(CffError::Invalid { .. })
        ));
    }

    #[test]
    fn test_non_sequence_authors() {
        let doc = CffDocument::parse("authors: someone\n").unwrap();
        assert!(matches!(doc.authors(), Err(CffError::Invalid { .. })));
    }
}
