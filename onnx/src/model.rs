//! ONNX graph export.
//!
//! Models are read from the protobuf JSON mapping of `ModelProto`
//! (`onnx.ModelProto` serialized with camelCase field names). Only the
//! graph structure is used: graph inputs and outputs, and each node's
//! operator type, domain and wiring.

use std::fs;
use std::path::{Path, PathBuf};

use motif_ontology::{vocab, Error, Result};
use serde::Deserialize;

use crate::turtle;

/// A model: just its graph.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Model {
    /// Top-level graph.
    #[serde(default)]
    pub graph: Graph,
}

/// A computation graph.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Graph {
    /// Graph name; the model file stem is used when empty.
    #[serde(default)]
    pub name: String,
    /// Graph inputs.
    #[serde(default)]
    pub input: Vec<ValueInfo>,
    /// Graph outputs.
    #[serde(default)]
    pub output: Vec<ValueInfo>,
    /// Nodes in topological order.
    #[serde(default)]
    pub node: Vec<Node>,
}

/// A named graph value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValueInfo {
    /// Value name.
    #[serde(default)]
    pub name: String,
}

/// One operator application.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Operator type, e.g. `Add`.
    #[serde(alias = "op_type")]
    pub op_type: String,
    /// Operator domain; empty means `ai.onnx`.
    #[serde(default)]
    pub domain: String,
    /// Input value names; empty strings are omitted optional inputs.
    #[serde(default)]
    pub input: Vec<String>,
    /// Output value names.
    #[serde(default)]
    pub output: Vec<String>,
    /// Node name.
    #[serde(default)]
    pub name: String,
}

impl Model {
    /// Parses a model from its JSON mapping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the JSON does not describe a model.
    pub fn from_json(source: &str, text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::parse(source, e))
    }

    /// Reads a model from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the file is missing, [`Error::Io`] if it
    /// cannot be read and [`Error::Parse`] if it is not a model.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::NotFound(format!("model not found: {}", path.display())));
        }
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json(&path.display().to_string(), &text)
    }
}

/// Renders a model graph as Turtle.
///
/// `source` names the model in the header comment and, through its file
/// stem, names the graph when the graph itself is unnamed. `date` is the
/// generation date stamped into the header.
pub fn model_to_ttl(model: &Model, source: &str, date: &str) -> String {
    let graph = &model.graph;
    let graph_name = if graph.name.is_empty() {
        model_stem(source)
    } else {
        graph.name.clone()
    };
    let graph_id = local_name(&graph_name);

    let mut out = String::with_capacity(4096);
    out.push_str(&format!("# Generated from {source} on {date}\n"));
    out.push_str(turtle::MODEL_PREFIXES);

    out.push_str(&format!("motif:{graph_id} a onnx:Graph ;\n"));
    out.push_str(&format!("  rdfs:label {} ;\n", turtle::string(&graph_name)));
    for vi in &graph.input {
        out.push_str(&format!(
            "  onnx:hasInput [ a onnx:OperatorInput ; onnx:name {} ; ] ;\n",
            turtle::string(&vi.name)
        ));
    }
    for vi in &graph.output {
        out.push_str(&format!(
            "  onnx:hasOutput [ a onnx:OperatorOutput ; onnx:name {} ; ] ;\n",
            turtle::string(&vi.name)
        ));
    }
    let node_ids: Vec<String> = graph
        .node
        .iter()
        .enumerate()
        .map(|(idx, node)| format!("{graph_id}_node_{idx}_{}", local_name(&node.op_type)))
        .collect();
    for id in &node_ids {
        out.push_str(&format!("  onnx:hasNode motif:{id} ;\n"));
    }
    out.push_str("  .\n");

    for (node, id) in graph.node.iter().zip(&node_ids) {
        let domain = if node.domain.is_empty() { "ai.onnx" } else { &node.domain };
        out.push_str(&format!("\nmotif:{id} a onnx:Node ;\n"));
        out.push_str(&format!("  onnx:domain <{}> ;\n", vocab::domain_iri(domain)));
        for (pos, name) in node.input.iter().enumerate().filter(|(_, n)| !n.is_empty()) {
            out.push_str(&format!(
                "  onnx:hasInput [ a onnx:OperatorInput ; onnx:name {} ; onnx:required \"true\"^^xsd:boolean ; onnx:position {pos} ] ;\n",
                turtle::string(name)
            ));
        }
        for (pos, name) in node.output.iter().enumerate().filter(|(_, n)| !n.is_empty()) {
            out.push_str(&format!(
                "  onnx:hasOutput [ a onnx:OperatorOutput ; onnx:name {} ; onnx:position {pos} ] ;\n",
                turtle::string(name)
            ));
        }
        out.push_str(&format!("  rdfs:label {} .\n", turtle::string(&node.op_type)));
    }
    out
}

/// Exports a model JSON file to Turtle and returns the written path.
///
/// The default output is `<root>/ttl/models/<model stem>.ttl`.
///
/// # Errors
///
/// Returns an error if the model cannot be read or parsed, or the output
/// cannot be written.
pub fn export_model(model_path: &Path, out_path: Option<&Path>, root: &Path) -> Result<PathBuf> {
    let model = Model::load(model_path)?;
    let source = model_path.display().to_string();
    let out = match out_path {
        Some(p) => p.to_path_buf(),
        None => root
            .join("ttl")
            .join("models")
            .join(format!("{}.ttl", model_stem(&source))),
    };
    let ttl = model_to_ttl(&model, &source, &crate::today());
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::write(&out, ttl).map_err(|e| Error::io(&out, e))?;
    tracing::info!("Wrote TTL to {}", out.display());
    Ok(out)
}

/// A Turtle local name: characters outside `[A-Za-z0-9_-]` become `_`, and a
/// leading `-` gets a `_` in front.
fn local_name(s: &str) -> String {
    let cleaned = s.replace(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'), "_");
    if cleaned.starts_with('-') {
        format!("_{cleaned}")
    } else {
        cleaned
    }
}

fn model_stem(source: &str) -> String {
    let stem = Path::new(source)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    // `model.onnx.json` names the model `model`.
    match stem.strip_suffix(".onnx") {
        Some(s) => s.to_string(),
        None => stem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motif_ontology::RdfManager;

    const ADD_MODEL: &str = r#"{
        "irVersion": "8",
        "graph": {
            "name": "add_graph",
            "input": [{"name": "X"}, {"name": "Y"}],
            "output": [{"name": "Z"}],
            "node": [
                {"opType": "Add", "input": ["X", "Y"], "output": ["Z"], "name": "add0"}
            ]
        }
    }"#;

    fn add_ttl() -> String {
        let model = Model::from_json("add.onnx.json", ADD_MODEL).unwrap();
        model_to_ttl(&model, "add.onnx.json", "2024-01-01")
    }

    #[test]
    fn add_graph_has_one_graph_and_matching_node_io() {
        let ttl = add_ttl();
        assert_eq!(ttl.matches("a onnx:Graph").count(), 1);
        assert_eq!(ttl.matches("a onnx:Node").count(), 1);

        let node_block = ttl.split("motif:add_graph_node_0_Add a onnx:Node").nth(1).unwrap();
        assert_eq!(node_block.matches("onnx:hasInput").count(), 2);
        assert_eq!(node_block.matches("onnx:hasOutput").count(), 1);
        assert!(node_block.contains("<https://ns.onnx.cloud/onnx/domain/ai.onnx>"));
        assert!(ttl.starts_with("# Generated from add.onnx.json on 2024-01-01\n"));
    }

    #[test]
    fn exported_model_loads_into_the_graph() {
        let rdf = RdfManager::from_turtle(&add_ttl()).unwrap();
        let rows = rdf
            .select(
                "PREFIX onnx: <https://ns.onnx.cloud/onnx#>
                 SELECT ?name ?pos WHERE {
                   ?n a onnx:Node ; onnx:hasInput ?i .
                   ?i onnx:name ?name ; onnx:position ?pos .
                 } ORDER BY ?pos",
            )
            .unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r["name"].as_str()).collect();
        assert_eq!(names, ["X", "Y"]);

        let spec = rdf.get_operator_spec("Add").unwrap().unwrap();
        assert_eq!(spec.domain.as_deref(), Some("ai.onnx"));
        assert_eq!(spec.inputs.len(), 2);
    }

    #[test]
    fn empty_inputs_are_skipped_and_unnamed_graph_uses_stem() {
        let json = r#"{"graph": {"node": [
            {"opType": "Clip", "domain": "com.example", "input": ["x", "", "max"], "output": ["y"]}
        ]}}"#;
        let model = Model::from_json("clip.json", json).unwrap();
        let ttl = model_to_ttl(&model, "models/clip.json", "2024-01-01");
        assert!(ttl.contains("motif:clip a onnx:Graph"));
        assert_eq!(ttl.matches("onnx:required").count(), 2);
        assert!(ttl.contains("onnx:position 2 ]"));
        assert!(ttl.contains("domain/com.example>"));
        RdfManager::from_turtle(&ttl).unwrap();
    }

    #[test]
    fn leading_dash_names_stay_valid_turtle() {
        assert_eq!(local_name("-1x"), "_-1x");
        assert_eq!(local_name("a b.c"), "a_b_c");
        let json = r#"{"graph": {"name": "-edge", "node": [{"opType": "Relu", "input": ["x"], "output": ["y"]}]}}"#;
        let model = Model::from_json("edge.json", json).unwrap();
        let ttl = model_to_ttl(&model, "edge.json", "2024-01-01");
        assert!(ttl.contains("motif:_-edge a onnx:Graph"));
        assert!(ttl.contains("motif:_-edge_node_0_Relu a onnx:Node"));
        RdfManager::from_turtle(&ttl).unwrap();
    }

    #[test]
    fn export_writes_default_path() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("add.onnx.json");
        fs::write(&model_path, ADD_MODEL).unwrap();
        let out = export_model(&model_path, None, dir.path()).unwrap();
        assert_eq!(out, dir.path().join("ttl/models/add.ttl"));
        assert!(fs::read_to_string(out).unwrap().contains("onnx:hasNode"));
        assert!(export_model(&dir.path().join("missing.json"), None, dir.path())
            .unwrap_err()
            .is_not_found());
    }
}
