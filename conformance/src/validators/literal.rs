//! Literal constraint scan.
//!
//! Constraints are resources. A `motif:hasConstraint` followed by a quoted
//! string is the legacy literal form and is reported wherever it appears,
//! independent of shape validation.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use regex::Regex;

use crate::report::{ConformanceReport, TestResult};

const VALIDATOR: &str = "shacl/literal-constraint";

/// Pattern matching a literal constraint.
pub const LITERAL_CONSTRAINT: &str = r#"motif:hasConstraint\s+""#;

/// 1-based line numbers of literal constraints in `text`.
///
/// # Errors
///
/// Returns an error if the pattern fails to compile.
pub fn scan_text(text: &str) -> Result<Vec<usize>> {
    let pattern = Regex::new(LITERAL_CONSTRAINT).context("literal constraint pattern")?;
    Ok(pattern
        .find_iter(text)
        .map(|m| text[..m.start()].matches('\n').count() + 1)
        .collect())
}

/// Scans each file; one failure per offending file.
///
/// # Errors
///
/// Returns an error if a file cannot be read.
pub fn validate(files: &[PathBuf]) -> Result<ConformanceReport> {
    let mut report = ConformanceReport::new();
    let mut hits = 0usize;

    for path in files {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let lines = scan_text(&text)?;
        if lines.is_empty() {
            continue;
        }
        hits += lines.len();
        report.push(
            TestResult::fail(
                VALIDATOR,
                format!("{} uses literal motif:hasConstraint values", path.display()),
            )
            .with_details(lines.iter().map(|l| format!("line {l}")).collect()),
        );
    }

    if hits == 0 {
        report.push(TestResult::pass(
            VALIDATOR,
            format!("No literal constraints in {} files", files.len()),
        ));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_literal_constraints_with_line_numbers() {
        let text = "motif:A motif:hasConstraint motif:SameShape .\n\
                    motif:B rdfs:label \"B\" ;\n  motif:hasConstraint \"same shape\" .\n\
                    motif:C motif:hasConstraint\n    \"split\" .\n";
        assert_eq!(scan_text(text).unwrap(), [3, 4]);
    }

    #[test]
    fn reports_each_offending_file() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.ttl");
        let good = dir.path().join("good.ttl");
        fs::write(&bad, "motif:B motif:hasConstraint \"x\" .\n").unwrap();
        fs::write(&good, "motif:A motif:hasConstraint motif:X .\n").unwrap();

        let report = validate(&[bad, good.clone()]).unwrap();
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.results[0].details, ["line 1"]);
        assert!(validate(&[good]).unwrap().all_passed());
    }
}
