//! Workflow outputs in the `$GITHUB_OUTPUT` heredoc format.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use tracing::{debug, info};

use super::RunSummary;
use crate::errors::ReportError;

const DELIMITER: &str = "EOF";

/// Render the output blocks. `warnings` and `orcid_logs` are omitted when
/// there is nothing to report.
pub fn render_outputs(summary: &RunSummary) -> String {
    let mut out = String::new();
    push_block(&mut out, "new_authors", &summary.contributions_json);
    push_block(&mut out, "updated_cff", &summary.updated_cff);
    if !summary.warnings.is_empty() {
        push_block(&mut out, "warnings", &summary.warnings.join("\n"));
    }
    if !summary.logs.is_empty() {
        push_block(&mut out, "orcid_logs", &summary.logs.join("\n"));
    }
    out
}

fn push_block(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    out.push_str("<<");
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(value);
    if !value.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(DELIMITER);
    out.push('\n');
}

/// Append the output blocks to `path`, creating the file if needed.
pub fn write_outputs(path: &Path, summary: &RunSummary) -> Result<(), ReportError> {
    let rendered = render_outputs(summary);
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(rendered.as_bytes())?;
    debug!(bytes = rendered.len(), "appended workflow outputs");
    info!(path = %path.display(), "wrote workflow outputs");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> RunSummary {
        RunSummary {
            cff_path: "CITATION.cff".into(),
            updated_cff: "cff-version: 1.2.0\ntitle: T\n".into(),
            contributions_json: "[]".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_render_minimal() {
        assert_eq!(
            render_outputs(&summary()),
            "new_authors<<EOF\n[]\nEOF\nupdated_cff<<EOF\ncff-version: 1.2.0\ntitle: T\nEOF\n"
        );
    }

    #[test]
    fn test_render_with_warnings_and_logs() {
        let mut s = summary();
        s.warnings = vec!["- @a: No ORCID found.".into(), "- @b: No ORCID found.".into()];
        s.logs = vec!["- `A B`: ORCID search failed: timeout".into()];
        let out = render_outputs(&s);
        assert!(out.contains("warnings<<EOF\n- @a: No ORCID found.\n- @b: No ORCID found.\nEOF\n"));
        assert!(out.ends_with("orcid_logs<<EOF\n- `A B`: ORCID search failed: timeout\nEOF\n"));
    }

    #[test]
    fn test_write_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("github_output");
        std::fs::write(&path, "previous=1\n").unwrap();

        write_outputs(&path, &summary()).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("previous=1\nnew_authors<<EOF\n"));
    }
}
