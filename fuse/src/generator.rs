//! Snippet generation over the motif query.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use motif_ontology::operator::is_operator_iri;
use motif_ontology::{Error, OperatorSpec, RdfManager, Result, Row};
use motif_site::{writer, Renderer, RendererOptions};
use walkdir::WalkDir;

use crate::snippet::{create_snippet_content, SnippetContext};

/// Query file listing every motif, looked up anywhere under the query directory.
pub const MOTIFS_QUERY: &str = "list_all_motifs.sparql";

/// Summary file written next to the snippets.
pub const SUMMARY_FILE: &str = "categories_summary.fuse";

/// Writes one `.fuse` snippet per motif plus a categories summary.
pub struct FuseGenerator<'a> {
    rdf: &'a RdfManager,
    sparql_dir: PathBuf,
    output_dir: PathBuf,
    template: Option<String>,
    renderer: Renderer,
}

impl<'a> FuseGenerator<'a> {
    /// Creates a generator and its output directory. A template that cannot
    /// be read is reported and the built-in layout is used instead.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the output directory cannot be created.
    pub fn new(
        rdf: &'a RdfManager,
        sparql_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        template_path: Option<&Path>,
    ) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).map_err(|e| Error::io(&output_dir, e))?;

        let template = template_path.and_then(|path| match fs::read_to_string(path) {
            Ok(text) => {
                tracing::info!("Loaded template: {}", path.display());
                Some(text)
            }
            Err(e) => {
                tracing::warn!("Failed to read template {}: {e}", path.display());
                None
            }
        });

        tracing::info!("Fuse generator initialized. Output: {}", output_dir.display());
        Ok(Self {
            rdf,
            sparql_dir: sparql_dir.into(),
            output_dir,
            template,
            renderer: Renderer::new(RendererOptions::default()),
        })
    }

    /// Where snippets are written.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Finds [`MOTIFS_QUERY`] under the query directory, first by path order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such file exists.
    pub fn find_motifs_query(&self) -> Result<PathBuf> {
        WalkDir::new(&self.sparql_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .find(|entry| entry.file_type().is_file() && entry.file_name() == MOTIFS_QUERY)
            .map(|entry| entry.into_path())
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "query file not found under {}: {MOTIFS_QUERY}",
                    self.sparql_dir.display()
                ))
            })
    }

    fn motif_rows(&self) -> Result<Vec<Row>> {
        let query = self.find_motifs_query()?;
        tracing::debug!("Using motifs query: {}", query.display());
        let result = self.rdf.execute_query_file(&query)?;
        Ok(self.rdf.results_to_dicts(&result))
    }

    /// Generates every snippet, then the categories summary. Returns the
    /// number of snippets written; per-motif failures are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the motif query is missing or fails.
    pub fn generate_all_motifs(&self) -> Result<usize> {
        let rows = self.motif_rows()?;
        tracing::info!("Found {} motifs", rows.len());

        let mut count = 0;
        for row in &rows {
            match self.generate_snippet(row) {
                Ok(path) => {
                    tracing::debug!("Created {}", path.display());
                    count += 1;
                }
                Err(e) => tracing::error!(
                    "Failed to generate snippet for motif {}: {e}",
                    row.get("label").map_or("?", String::as_str)
                ),
            }
        }

        if let Err(e) = self.generate_categories_summary() {
            tracing::warn!("Failed to generate categories summary: {e}");
        }
        tracing::info!("Generated {count} .fuse snippets");
        Ok(count)
    }

    /// Writes the snippet for one motif row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be written.
    pub fn generate_snippet(&self, row: &Row) -> Result<PathBuf> {
        let mut ctx = SnippetContext::from_row(row);
        ctx.operator_spec = self.operator_spec(&ctx.label_title);

        let snippet = match &self.template {
            Some(template) => match self.renderer.render_str(template, &ctx) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Template render failed for {}: {e}", ctx.label);
                    create_snippet_content(&ctx)
                }
            },
            None => create_snippet_content(&ctx),
        };

        let path = self.output_dir.join(ctx.file_name());
        writer::write(&path, snippet)?;
        Ok(path)
    }

    /// Best-effort operator spec for a motif label. A match that is neither
    /// an operator IRI nor carries any operator data is not an operator.
    fn operator_spec(&self, label: &str) -> Option<OperatorSpec> {
        match self.rdf.get_operator_spec(label) {
            Ok(Some(spec)) if describes_operator(&spec) => Some(spec),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!("Operator lookup failed for {label}: {e}");
                None
            }
        }
    }

    /// Regenerates [`SUMMARY_FILE`] from the motif query.
    ///
    /// # Errors
    ///
    /// Returns an error if the query is missing, fails, or the file cannot
    /// be written.
    pub fn generate_categories_summary(&self) -> Result<PathBuf> {
        let rows = self.motif_rows()?;
        let categories = group_by_category(&rows);
        let path = self.output_dir.join(SUMMARY_FILE);
        writer::write(&path, categories_summary(&categories))?;
        tracing::info!("Generated categories summary with {} categories", categories.len());
        Ok(path)
    }
}

fn describes_operator(spec: &OperatorSpec) -> bool {
    is_operator_iri(&spec.subject)
        || spec.domain.is_some()
        || !spec.inputs.is_empty()
        || !spec.outputs.is_empty()
        || !spec.attributes.is_empty()
}

/// Category label to motif labels, both sorted.
pub fn group_by_category(rows: &[Row]) -> BTreeMap<String, Vec<String>> {
    let mut categories: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for row in rows {
        let category = row
            .get("categoryLabel")
            .filter(|v| !v.is_empty())
            .map_or("Uncategorized", String::as_str);
        let label = row
            .get("label")
            .filter(|v| !v.is_empty())
            .map_or("Unknown", String::as_str);
        categories
            .entry(category.to_string())
            .or_default()
            .push(label.to_string());
    }
    for motifs in categories.values_mut() {
        motifs.sort();
    }
    categories
}

/// Renders the summary; the total equals the sum of the category counts.
pub fn categories_summary(categories: &BTreeMap<String, Vec<String>>) -> String {
    let total: usize = categories.values().map(Vec::len).sum();
    let mut out = format!("// Motif Categories Summary\n// Total motifs: {total}\n\n");
    for (category, motifs) in categories {
        out.push_str(&format!("// {category}\n"));
        out.push_str(&format!("//   Count: {}\n", motifs.len()));
        out.push_str(&format!("//   Motifs: {}\n\n", motifs.join(", ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixtures() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures")
    }

    fn rdf() -> RdfManager {
        RdfManager::new(fixtures().join("ttl")).unwrap()
    }

    fn summary_counts(text: &str) -> (usize, usize) {
        let total = text
            .lines()
            .find_map(|l| l.strip_prefix("// Total motifs: "))
            .unwrap()
            .parse()
            .unwrap();
        let sum = text
            .lines()
            .filter_map(|l| l.strip_prefix("//   Count: "))
            .map(|n| n.parse::<usize>().unwrap())
            .sum();
        (total, sum)
    }

    #[test]
    fn generates_snippets_and_consistent_summary() {
        let rdf = rdf();
        let out = tempfile::tempdir().unwrap();
        let gen = FuseGenerator::new(&rdf, fixtures().join("sparql"), out.path(), None).unwrap();
        let count = gen.generate_all_motifs().unwrap();
        assert_eq!(count, 5);

        let add = fs::read_to_string(out.path().join("add.fuse")).unwrap();
        assert!(add.contains("// Operator spec (onnx):"));
        assert!(add.contains("//     - A"));
        assert!(add.contains("  // URI: https://ns.onnx.cloud/motif#Add\n"));

        let residual = fs::read_to_string(out.path().join("residual_add.fuse")).unwrap();
        assert!(!residual.contains("// Operator spec"));
        assert!(residual.contains("// Adds the output of a sub-block back onto its input.\n// Used by"));

        let relu = fs::read_to_string(out.path().join("relu.fuse")).unwrap();
        assert!(relu.contains("//   attributes: none declared"));

        let summary = fs::read_to_string(out.path().join(SUMMARY_FILE)).unwrap();
        let (total, sum) = summary_counts(&summary);
        assert_eq!(total, sum);
        assert_eq!(total, 5);
        assert!(summary.contains("// Activation\n//   Count: 3\n//   Motifs: Gelu, Relu, Selu\n"));
    }

    #[test]
    fn template_renders_with_operator_spec() {
        let rdf = rdf();
        let out = tempfile::tempdir().unwrap();
        let template = fixtures().join("templates/fuse-motifs.jinja");
        let gen = FuseGenerator::new(&rdf, fixtures().join("sparql"), out.path(), Some(&template)).unwrap();
        gen.generate_all_motifs().unwrap();
        let selu = fs::read_to_string(out.path().join("selu.fuse")).unwrap();
        assert!(selu.starts_with("// Motif: Selu\n"));
        assert!(selu.contains("// Operator spec (onnx): Selu"));
        assert!(selu.contains("fuse selu {"));
    }

    #[test]
    fn broken_template_falls_back() {
        let rdf = rdf();
        let out = tempfile::tempdir().unwrap();
        let template = out.path().join("broken.jinja");
        fs::write(&template, "{% for %}").unwrap();
        let gen = FuseGenerator::new(&rdf, fixtures().join("sparql"), out.path().join("fuse"), Some(&template)).unwrap();
        assert_eq!(gen.generate_all_motifs().unwrap(), 5);
        let gelu = fs::read_to_string(gen.output_dir().join("gelu.fuse")).unwrap();
        assert!(gelu.starts_with("// Motif: Gelu\n// Category: Activation\n"));
    }

    #[test]
    fn missing_query_is_not_found() {
        let rdf = rdf();
        let out = tempfile::tempdir().unwrap();
        let gen = FuseGenerator::new(&rdf, out.path().join("nowhere"), out.path(), None).unwrap();
        assert!(gen.generate_all_motifs().unwrap_err().is_not_found());
    }

    #[test]
    fn uncategorized_rows_are_grouped() {
        let rows: Vec<Row> = vec![
            [("label".to_string(), "B".to_string())].into_iter().collect(),
            [("label".to_string(), "A".to_string())].into_iter().collect(),
        ];
        let categories = group_by_category(&rows);
        assert_eq!(categories["Uncategorized"], ["A", "B"]);
        assert!(categories_summary(&categories).starts_with("// Motif Categories Summary\n// Total motifs: 2\n\n"));
    }
}
