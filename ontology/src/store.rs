//! The in-memory knowledge base.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use oxigraph::sparql::{QueryResults, SparqlEvaluator};
use oxigraph::store::Store;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::loader::{self, LoadReport};
use crate::operator::{self, DefaultPatterns, OperatorSpec, PropertyGroup};
use crate::term::{QueryResult, Row, Solution, TermValue};
use crate::vocab;

/// Basic size figures for a loaded graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    /// Triple count.
    pub triples: usize,
    /// Distinct subjects.
    pub subjects: usize,
    /// Distinct predicates.
    pub predicates: usize,
    /// Distinct objects.
    pub objects: usize,
}

/// `rdfs:label` and `rdfs:comment` of a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceInfo {
    /// First label found.
    pub label: Option<String>,
    /// First comment found.
    pub comment: Option<String>,
}

/// A resource carrying an `rdfs:label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelledResource {
    /// Subject IRI (or blank node id).
    pub iri: String,
    /// Its label.
    pub label: String,
}

/// Loads every Turtle file under a directory into one graph and answers
/// SPARQL over it. The graph is built once and never modified afterwards.
pub struct RdfManager {
    root: PathBuf,
    store: Store,
    report: LoadReport,
    defaults: DefaultPatterns,
}

impl RdfManager {
    /// Loads all `*.ttl` files under `root`.
    ///
    /// Files that fail to parse are logged and skipped; an empty or missing
    /// directory yields an empty graph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the in-memory store cannot be created.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let store = Store::new().map_err(|e| Error::Store(e.to_string()))?;
        let report = loader::load_directory(&store, &root)?;
        let manager = Self {
            root,
            store,
            report,
            defaults: DefaultPatterns::new()?,
        };
        tracing::info!(
            "Loaded {} TTL files ({} skipped), graph has {} triples",
            manager.report.loaded.len(),
            manager.report.failed.len(),
            manager.len()?
        );
        Ok(manager)
    }

    /// Loads `*.ttl` files under `root` exactly as written, skipping paths
    /// for which `skip` returns true. Parse failures are recorded in the
    /// load report rather than logged; the caller decides what they mean.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the in-memory store cannot be created.
    pub fn load_strict(root: impl AsRef<Path>, skip: impl Fn(&Path) -> bool) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let store = Store::new().map_err(|e| Error::Store(e.to_string()))?;
        let files = loader::discover_ttl_files(&root)
            .into_iter()
            .filter(|path| {
                let skipped = skip(path);
                if skipped {
                    tracing::info!("Skipping {}", path.display());
                }
                !skipped
            })
            .collect();
        let report = loader::load_files_strict(&store, files);
        Ok(Self {
            root,
            store,
            report,
            defaults: DefaultPatterns::new()?,
        })
    }

    /// Builds a manager over a single Turtle document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the document is not valid Turtle.
    pub fn from_turtle(text: &str) -> Result<Self> {
        let store = Store::new().map_err(|e| Error::Store(e.to_string()))?;
        loader::load_turtle(&store, "<inline>", text)?;
        Ok(Self {
            root: PathBuf::new(),
            store,
            report: LoadReport::default(),
            defaults: DefaultPatterns::new()?,
        })
    }

    /// Directory the graph was loaded from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Which files loaded, needed sanitizing, or were skipped.
    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    /// Number of triples in the graph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the store cannot be read.
    pub fn len(&self) -> Result<usize> {
        self.store.len().map_err(|e| Error::Store(e.to_string()))
    }

    /// True when nothing was loaded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the store cannot be read.
    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|n| n == 0)
    }

    /// Executes SPARQL text and materializes the result.
    ///
    /// `ASK` queries yield a single `result` column holding a boolean literal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] for malformed SPARQL, evaluation errors, and
    /// `CONSTRUCT`/`DESCRIBE` queries.
    pub fn execute_query(&self, sparql: &str) -> Result<QueryResult> {
        let results = SparqlEvaluator::new()
            .parse_query(sparql)
            .map_err(|e| Error::Query(e.to_string()))?
            .on_store(&self.store)
            .execute()
            .map_err(|e| Error::Query(e.to_string()))?;

        match results {
            QueryResults::Solutions(solutions) => {
                let variables: Vec<String> = solutions
                    .variables()
                    .iter()
                    .map(|v| v.as_str().to_string())
                    .collect();
                let mut out = Vec::new();
                for solution in solutions {
                    let solution = solution.map_err(|e| Error::Query(e.to_string()))?;
                    let mut row = Solution::new();
                    for (var, term) in solution.iter() {
                        if let Some(value) = TermValue::from_term(term) {
                            row.insert(var.as_str().to_string(), value);
                        }
                    }
                    out.push(row);
                }
                Ok(QueryResult {
                    variables,
                    solutions: out,
                })
            }
            QueryResults::Boolean(b) => {
                let mut row = Solution::new();
                row.insert(
                    "result".to_string(),
                    TermValue::Literal {
                        value: b.to_string(),
                        datatype: format!("{}boolean", vocab::XSD),
                        language: None,
                    },
                );
                Ok(QueryResult {
                    variables: vec!["result".to_string()],
                    solutions: vec![row],
                })
            }
            QueryResults::Graph(_) => Err(Error::Query(
                "CONSTRUCT/DESCRIBE queries are not supported".into(),
            )),
        }
    }

    /// Reads a `.sparql` file and executes it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the file does not exist, [`Error::Io`] if
    /// it cannot be read, and [`Error::Query`] if execution fails.
    pub fn execute_query_file(&self, path: &Path) -> Result<QueryResult> {
        if !path.is_file() {
            return Err(Error::NotFound(format!(
                "SPARQL file not found: {}",
                path.display()
            )));
        }
        let sparql = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        tracing::debug!("Executing query from {}", path.display());
        self.execute_query(&sparql)
    }

    /// Converts a result into plain rows; see [`QueryResult::to_rows`].
    pub fn results_to_dicts(&self, result: &QueryResult) -> Vec<Row> {
        result.to_rows()
    }

    /// Executes SPARQL and returns rows directly.
    ///
    /// # Errors
    ///
    /// Same as [`RdfManager::execute_query`].
    pub fn select(&self, sparql: &str) -> Result<Vec<Row>> {
        Ok(self.execute_query(sparql)?.to_rows())
    }

    /// IRI subjects whose `rdfs:label` equals `label` exactly, in IRI order.
    /// Blank nodes are never returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] if the lookup query fails.
    pub fn find_resources_by_label(&self, label: &str) -> Result<Vec<String>> {
        let query = format!(
            "SELECT DISTINCT ?s WHERE {{ ?s <{}> ?l . FILTER(isIRI(?s) && STR(?l) = {}) }}",
            vocab::RDFS_LABEL,
            sparql_string(label)
        );
        let result = self.execute_query(&query)?;
        let mut subjects: Vec<String> = result
            .solutions
            .iter()
            .filter_map(|s| s.get("s"))
            .filter_map(TermValue::as_iri)
            .map(str::to_string)
            .collect();
        subjects.sort();
        Ok(subjects)
    }

    /// Label and comment of a resource given by label or IRI.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] if a lookup query fails.
    pub fn get_resource_info(&self, subject_or_label: &str) -> Result<Option<ResourceInfo>> {
        let subject = match self.find_resources_by_label(subject_or_label)?.into_iter().next() {
            Some(iri) => iri,
            None => subject_or_label.to_string(),
        };
        if !is_absolute_iri(&subject) {
            return Ok(None);
        }
        let query = format!(
            "SELECT ?label ?comment WHERE {{ OPTIONAL {{ <{subject}> <{}> ?label }} OPTIONAL {{ <{subject}> <{}> ?comment }} }} LIMIT 1",
            vocab::RDFS_LABEL,
            vocab::RDFS_COMMENT
        );
        let rows = self.select(&query)?;
        let info = rows
            .into_iter()
            .next()
            .map(|mut row| ResourceInfo {
                label: row.remove("label"),
                comment: row.remove("comment"),
            })
            .unwrap_or_default();
        if info.label.is_none() && info.comment.is_none() {
            return Ok(None);
        }
        Ok(Some(info))
    }

    /// All properties of one subject as predicate local name to display value.
    /// Later values for a repeated predicate replace earlier ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] if the query fails.
    pub fn get_motif_properties(&self, iri: &str) -> Result<BTreeMap<String, String>> {
        let query = format!(
            "SELECT ?predicate ?value WHERE {{ ?s ?predicate ?value . FILTER(STR(?s) = {}) }}",
            sparql_string(iri)
        );
        let result = self.execute_query(&query)?;
        let mut properties = BTreeMap::new();
        for solution in &result.solutions {
            if let (Some(p), Some(v)) = (solution.get("predicate"), solution.get("value")) {
                properties.insert(vocab::local_name(p.lexical()).to_string(), v.display());
            }
        }
        Ok(properties)
    }

    /// Triple, subject, predicate and object counts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] if the counting query fails.
    pub fn graph_stats(&self) -> Result<GraphStats> {
        let rows = self.select(
            "SELECT (COUNT(*) AS ?t) (COUNT(DISTINCT ?s) AS ?s_n) (COUNT(DISTINCT ?p) AS ?p_n) (COUNT(DISTINCT ?o) AS ?o_n) WHERE { ?s ?p ?o }",
        )?;
        let row = rows.into_iter().next().unwrap_or_default();
        let count = |key: &str| row.get(key).and_then(|v| v.parse().ok()).unwrap_or(0);
        Ok(GraphStats {
            triples: count("t"),
            subjects: count("s_n"),
            predicates: count("p_n"),
            objects: count("o_n"),
        })
    }

    /// Resources with an `rdfs:label`, optionally restricted to an `rdf:type`
    /// given as an IRI or a known prefixed name. Ordered by label, then IRI.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] if the query fails.
    pub fn labelled_resources(&self, class: Option<&str>) -> Result<Vec<LabelledResource>> {
        let type_pattern = class
            .map(|c| format!("?s <{}> {} .", vocab::RDF_TYPE, vocab::sparql_term(c)))
            .unwrap_or_default();
        let query = format!(
            "SELECT ?s ?label WHERE {{ {type_pattern} ?s <{}> ?label . FILTER(isIRI(?s)) }}",
            vocab::RDFS_LABEL
        );
        let result = self.execute_query(&query)?;
        let mut seen = HashSet::new();
        let mut out: Vec<LabelledResource> = result
            .solutions
            .iter()
            .filter_map(|s| Some((s.get("s")?.lexical().to_string(), s.get("label")?.lexical().to_string())))
            .filter(|(iri, _)| seen.insert(iri.clone()))
            .map(|(iri, label)| LabelledResource { iri, label })
            .collect();
        out.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.iri.cmp(&b.iri)));
        Ok(out)
    }

    /// Resolves the operator spec for an exact label.
    ///
    /// When several subjects carry the label, a subject whose IRI path has an
    /// `onnx` or `ops` segment is preferred; otherwise the first in IRI order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] if a lookup query fails.
    pub fn get_operator_spec(&self, label: &str) -> Result<Option<OperatorSpec>> {
        let candidates = self.find_resources_by_label(label)?;
        let chosen = candidates
            .iter()
            .find(|iri| operator::is_operator_iri(iri))
            .or_else(|| candidates.first());
        match chosen {
            Some(iri) => {
                tracing::debug!("get_operator_spec: {label} resolved to {iri}");
                self.get_operator_spec_for_iri(iri).map(Some)
            }
            None => {
                tracing::debug!("get_operator_spec: no matches for {label}");
                Ok(None)
            }
        }
    }

    /// Builds the operator spec for a known subject IRI.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] if `iri` is not an absolute IRI or the
    /// subject walk fails.
    pub fn get_operator_spec_for_iri(&self, iri: &str) -> Result<OperatorSpec> {
        if !is_absolute_iri(iri) || iri.contains(['<', '>']) {
            return Err(Error::Query(format!("not an absolute IRI: {iri}")));
        }
        let query = format!(
            "SELECT ?p ?o ?ip ?io WHERE {{ <{iri}> ?p ?o . OPTIONAL {{ ?o ?ip ?io . FILTER(isBlank(?o)) }} }}"
        );
        let result = self.execute_query(&query)?;

        let mut groups: Vec<PropertyGroup> = Vec::new();
        for solution in &result.solutions {
            let (Some(p), Some(o)) = (solution.get("p"), solution.get("o")) else {
                continue;
            };
            let index = match groups
                .iter()
                .position(|g| g.predicate == p.lexical() && &g.object == o)
            {
                Some(index) => index,
                None => {
                    groups.push(PropertyGroup {
                        predicate: p.lexical().to_string(),
                        object: o.clone(),
                        nested: Vec::new(),
                    });
                    groups.len() - 1
                }
            };
            if let (Some(ip), Some(io)) = (solution.get("ip"), solution.get("io")) {
                groups[index]
                    .nested
                    .push((ip.lexical().to_string(), io.clone()));
            }
        }

        Ok(operator::build_spec(iri, &groups, &self.defaults))
    }
}

/// Quotes a string as a SPARQL literal.
pub fn sparql_string(s: &str) -> String {
    let escaped = s
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r");
    format!("\"{escaped}\"")
}

fn is_absolute_iri(s: &str) -> bool {
    s.split_once(':')
        .is_some_and(|(scheme, rest)| !scheme.is_empty() && !rest.is_empty() && !s.contains(' '))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixtures() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures")
    }

    #[test]
    fn strict_load_reports_unsanitized_failures() {
        let root = fixtures().join("ttl");
        let strict = RdfManager::load_strict(&root, |_| false).unwrap();
        assert_eq!(strict.load_report().failed.len(), 1);
        assert!(strict.load_report().failed[0].0.ends_with("opset/legacy.ttl"));

        let opset = root.join("opset");
        let skipped = RdfManager::load_strict(&root, |p| p.starts_with(&opset)).unwrap();
        assert!(skipped.load_report().failed.is_empty());
        assert!(!skipped.is_empty().unwrap());
    }

    fn manager() -> RdfManager {
        RdfManager::new(fixtures().join("ttl")).unwrap()
    }

    #[test]
    fn loads_fixture_graph() {
        let rdf = manager();
        assert!(rdf.len().unwrap() > 0);
        assert!(rdf.load_report().failed.is_empty());
        let stats = rdf.graph_stats().unwrap();
        assert_eq!(stats.triples, rdf.len().unwrap());
        assert!(stats.subjects > 0 && stats.predicates > 0 && stats.objects > 0);
    }

    #[test]
    fn merged_graph_contains_every_single_file() {
        let rdf = manager();
        for file in loader::discover_ttl_files(&fixtures().join("ttl")) {
            let single = RdfManager::from_turtle(&fs::read_to_string(&file).unwrap());
            if let Ok(single) = single {
                assert!(rdf.len().unwrap() >= single.len().unwrap());
                let ask = "SELECT ?s ?p ?o WHERE { ?s ?p ?o . FILTER(!isBlank(?s) && !isBlank(?o)) }";
                for row in single.execute_query(ask).unwrap().solutions {
                    let term = |k: &str| match &row[k] {
                        TermValue::Iri(i) => format!("<{i}>"),
                        TermValue::Literal { value, datatype, language: None } => {
                            format!("{}^^<{datatype}>", sparql_string(value))
                        }
                        TermValue::Literal { value, language: Some(lang), .. } => {
                            format!("{}@{lang}", sparql_string(value))
                        }
                        TermValue::Blank(_) => unreachable!(),
                    };
                    let q = format!("ASK {{ {} {} {} }}", term("s"), term("p"), term("o"));
                    let res = rdf.execute_query(&q).unwrap();
                    assert_eq!(res.solutions[0]["result"].lexical(), "true", "{q}");
                }
            }
        }
    }

    #[test]
    fn add_spec_has_named_inputs() {
        let spec = manager().get_operator_spec("Add").unwrap().unwrap();
        assert_eq!(spec.label.as_deref(), Some("Add"));
        assert!(spec.subject.starts_with(vocab::ONNX));
        assert!(!spec.inputs.is_empty());
        assert!(spec.inputs.iter().all(|i| !i.name.is_empty()));
        assert_eq!(spec.inputs[0].name, "A");
    }

    #[test]
    fn selu_spec_has_domain_iri_and_numeric_default() {
        let spec = manager().get_operator_spec("Selu").unwrap().unwrap();
        assert!(spec.domain_iri.as_deref().unwrap().starts_with("https://"));
        assert_eq!(spec.domain.as_deref(), Some("ai.onnx"));
        let numeric = spec
            .attributes
            .iter()
            .filter(|a| a.name == "alpha" || a.name == "gamma")
            .filter_map(|a| a.default.as_ref())
            .any(|d| d.is_numeric());
        assert!(numeric, "{:?}", spec.attributes);
    }

    #[test]
    fn flattened_operator_loads_after_sanitizing() {
        let rdf = manager();
        assert_eq!(rdf.load_report().sanitized.len(), 1);
        let spec = rdf.get_operator_spec("Relu").unwrap().unwrap();
        assert_eq!(spec.inputs[0].name, "X");
        assert_eq!(spec.outputs[0].name, "Y");
        assert_eq!(spec.attributes_raw.as_deref(), Some("none declared"));
        assert_eq!(spec.since_version, Some(crate::SinceVersion::Int(14)));
        assert_eq!(spec.domain.as_deref(), Some("ai.onnx"));
        assert!(spec.domain_iri.is_none());
    }

    #[test]
    fn blank_labelled_nodes_are_not_operator_candidates() {
        let rdf = RdfManager::from_turtle(
            "@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .\n[ rdfs:label \"Relu\" ] .\n",
        )
        .unwrap();
        assert!(rdf.find_resources_by_label("Relu").unwrap().is_empty());
        assert!(rdf.get_operator_spec("Relu").unwrap().is_none());
        assert!(matches!(
            rdf.get_operator_spec_for_iri("b0").unwrap_err(),
            Error::Query(_)
        ));
    }

    #[test]
    fn unknown_label_has_no_spec() {
        assert!(manager().get_operator_spec("NoSuchOperator").unwrap().is_none());
    }

    #[test]
    fn label_lookup_is_exact() {
        let rdf = manager();
        assert!(!rdf.find_resources_by_label("Add").unwrap().is_empty());
        assert!(rdf.find_resources_by_label("add").unwrap().is_empty());
    }

    #[test]
    fn malformed_sparql_is_a_query_error() {
        let err = manager().execute_query("SELEC nothing").unwrap_err();
        assert!(matches!(err, Error::Query(_)));
    }

    #[test]
    fn missing_query_file_is_not_found() {
        let err = manager()
            .execute_query_file(Path::new("does/not/exist.sparql"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn ask_yields_result_column() {
        let result = manager().execute_query("ASK { ?s ?p ?o }").unwrap();
        assert_eq!(result.variables, ["result"]);
        assert_eq!(result.solutions[0]["result"].lexical(), "true");
    }

    #[test]
    fn resource_info_and_properties() {
        let rdf = manager();
        let info = rdf.get_resource_info("Residual Add").unwrap().unwrap();
        assert_eq!(info.label.as_deref(), Some("Residual Add"));
        assert!(info.comment.is_some());
        let props = rdf
            .get_motif_properties("https://ns.onnx.cloud/motif#ResidualAdd")
            .unwrap();
        assert_eq!(props.get("signature").map(String::as_str), Some("2→1"));
        assert!(rdf.get_resource_info("nothing here").unwrap().is_none());
    }

    #[test]
    fn labelled_resources_filter_by_class() {
        let rdf = manager();
        let models = rdf.labelled_resources(Some("motif:ModelArchitecture")).unwrap();
        assert_eq!(models.len(), 2);
        assert!(rdf.labelled_resources(None).unwrap().len() > models.len());
    }

    #[test]
    fn empty_directory_gives_empty_results() {
        let dir = tempfile::tempdir().unwrap();
        let rdf = RdfManager::new(dir.path()).unwrap();
        assert!(rdf.is_empty().unwrap());
        assert!(rdf.select("SELECT ?s WHERE { ?s ?p ?o }").unwrap().is_empty());
    }
}
