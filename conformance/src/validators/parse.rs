//! Strict Turtle parse gate.
//!
//! Every file must parse as written. The tolerant loader used by the
//! generators would hide exactly the files this gate exists to catch.

use motif_ontology::RdfManager;

use crate::report::{ConformanceReport, TestResult};

const VALIDATOR: &str = "shacl/parse";

/// Reports each file the strict load rejected, or one pass for the lot.
pub fn validate(data: &RdfManager) -> ConformanceReport {
    let mut report = ConformanceReport::new();
    let load = data.load_report();

    for (path, error) in &load.failed {
        report.push(
            TestResult::fail(VALIDATOR, format!("Failed to parse {}", path.display()))
                .with_details(vec![error.clone()]),
        );
    }

    if load.failed.is_empty() {
        report.push(TestResult::pass(
            VALIDATOR,
            format!("{} Turtle files parse strictly", load.loaded.len()),
        ));
    }
    report
}
