//! SHACL conformance runner for the motif knowledge base.
//!
//! A run has three stages:
//!
//! | Stage | Check | Outcome |
//! |-------|-------|---------|
//! | 1 | Every `ttl/**/*.ttl` parses strictly, without sanitizing | exit 2 on any failure |
//! | 2 | The merged graph conforms to `ttl/shacl/motif_shapes.ttl` | exit 1 on violations |
//! | 3 | No file carries a literal `motif:hasConstraint` | exit 1 on any hit |
//!
//! Stages 2 and 3 only run when stage 1 passes.
//!
//! # Entry Point
//!
//! ```no_run
//! use motif_conformance::{run_shacl, ShaclPaths};
//! use std::path::Path;
//!
//! let run = run_shacl(&ShaclPaths::for_root(Path::new("."), true)).expect("shacl run failed");
//! std::process::exit(run.exit_code());
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod report;
pub mod validators;

use std::path::{Path, PathBuf};

use motif_ontology::RdfManager;

pub use report::{ConformanceReport, Severity, TestResult};

/// Shapes file below the Turtle directory.
pub const DEFAULT_SHAPES: &str = "shacl/motif_shapes.ttl";

/// Exit code when a Turtle file fails the strict parse.
pub const EXIT_PARSE_ERRORS: i32 = 2;
/// Exit code when the graph does not conform.
pub const EXIT_NON_CONFORMING: i32 = 1;

/// Inputs of a SHACL run.
#[derive(Debug, Clone)]
pub struct ShaclPaths {
    /// Directory scanned recursively for `*.ttl`.
    pub ttl_dir: PathBuf,
    /// Shapes graph.
    pub shapes: PathBuf,
    /// Skip files under `<ttl_dir>/opset/`.
    pub skip_opset: bool,
}

impl ShaclPaths {
    /// `ttl/` and its default shapes file under a project root.
    pub fn for_root(root: &Path, skip_opset: bool) -> Self {
        let ttl_dir = root.join("ttl");
        Self {
            shapes: ttl_dir.join(DEFAULT_SHAPES),
            ttl_dir,
            skip_opset,
        }
    }
}

/// Outcome of a SHACL run.
#[derive(Debug)]
pub struct ShaclRun {
    /// Every check result.
    pub report: ConformanceReport,
    /// True when the run stopped at the parse gate.
    pub parse_failed: bool,
}

impl ShaclRun {
    /// 2 for parse errors, 1 for non-conformance, 0 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.parse_failed {
            EXIT_PARSE_ERRORS
        } else if !self.report.all_passed() {
            EXIT_NON_CONFORMING
        } else {
            0
        }
    }
}

/// Runs the parse gate, then shape validation and the literal scan.
///
/// # Errors
///
/// Returns an error if the store cannot be created, the shapes file cannot
/// be loaded, a file cannot be read for scanning, or a validation query fails.
pub fn run_shacl(paths: &ShaclPaths) -> anyhow::Result<ShaclRun> {
    let opset = paths.ttl_dir.join("opset");
    let data = RdfManager::load_strict(&paths.ttl_dir, |p| paths.skip_opset && p.starts_with(&opset))?;

    let mut report = validators::parse::validate(&data);
    if !report.all_passed() {
        return Ok(ShaclRun {
            report,
            parse_failed: true,
        });
    }

    report.extend(validators::shapes::validate(&data, &paths.shapes)?);
    report.extend(validators::literal::validate(&data.load_report().loaded)?);
    Ok(ShaclRun {
        report,
        parse_failed: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixtures() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures")
    }

    #[test]
    fn fixtures_conform_when_opset_is_skipped() {
        let run = run_shacl(&ShaclPaths::for_root(&fixtures(), true)).unwrap();
        let failures: Vec<_> = run.report.results.iter().filter(|r| r.is_failure()).collect();
        assert!(failures.is_empty(), "SHACL failures: {failures:#?}");
        assert_eq!(run.exit_code(), 0);
    }

    #[test]
    fn legacy_opset_fails_the_parse_gate() {
        let run = run_shacl(&ShaclPaths::for_root(&fixtures(), false)).unwrap();
        assert!(run.parse_failed);
        assert_eq!(run.exit_code(), EXIT_PARSE_ERRORS);
        let failure = run.report.results.iter().find(|r| r.is_failure()).unwrap();
        assert!(failure.message.contains("legacy.ttl"));
        assert!(run.report.by_validator("shacl/shapes").next().is_none());
    }

    #[test]
    fn literal_constraint_fails_the_run() {
        let root = tempfile::tempdir().unwrap();
        let ttl = root.path().join("ttl");
        fs::create_dir_all(ttl.join("shacl")).unwrap();
        fs::create_dir_all(ttl.join("motifs")).unwrap();
        fs::copy(
            fixtures().join("ttl/shacl/motif_shapes.ttl"),
            ttl.join("shacl/motif_shapes.ttl"),
        )
        .unwrap();
        fs::write(
            ttl.join("motifs/bad.ttl"),
            "@prefix motif: <https://ns.onnx.cloud/motif#> .\n\
             @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .\n\
             motif:Cat a motif:Category .\n\
             motif:Mul a motif:Motif ;\n  rdfs:label \"Mul\" ;\n  motif:hasCategory motif:Cat ;\n  \
             motif:hasConstraint \"same shape\" .\n",
        )
        .unwrap();

        let run = run_shacl(&ShaclPaths::for_root(root.path(), false)).unwrap();
        assert!(!run.parse_failed);
        assert_eq!(run.exit_code(), EXIT_NON_CONFORMING);
        assert_eq!(run.report.by_validator("shacl/literal-constraint").filter(|r| r.is_failure()).count(), 1);
        let shape = run
            .report
            .by_validator("shacl/shapes")
            .find(|r| r.is_failure())
            .unwrap();
        assert_eq!(shape.message, "Constraints are IRIs, not literals");
    }

    #[test]
    fn missing_category_is_a_violation() {
        let root = tempfile::tempdir().unwrap();
        let ttl = root.path().join("ttl");
        fs::create_dir_all(ttl.join("shacl")).unwrap();
        fs::copy(
            fixtures().join("ttl/shacl/motif_shapes.ttl"),
            ttl.join("shacl/motif_shapes.ttl"),
        )
        .unwrap();
        fs::write(
            ttl.join("m.ttl"),
            "@prefix motif: <https://ns.onnx.cloud/motif#> .\n\
             @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .\n\
             motif:Lonely a motif:Motif ; rdfs:label \"Lonely\" .\n",
        )
        .unwrap();
        let run = run_shacl(&ShaclPaths::for_root(root.path(), false)).unwrap();
        assert_eq!(run.exit_code(), EXIT_NON_CONFORMING);
        assert!(run
            .report
            .results
            .iter()
            .any(|r| r.message == "A motif belongs to at least one category"));
    }
}
