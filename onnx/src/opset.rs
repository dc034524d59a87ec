//! ONNX operator-schema registry export.
//!
//! A registry is a JSON dump of operator schemas, either a bare array or an
//! object `{"onnx_version": "...", "schemas": [...]}`. Each schema becomes an
//! `onnx:Operator` resource with structured inputs, outputs and attributes.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use motif_ontology::operator::DefaultPatterns;
use motif_ontology::{vocab, AttributeValue, Error, Result, SinceVersion};
use serde::Deserialize;
use serde_json::Value;

use crate::turtle;

/// One formal input or output parameter.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormalParameter {
    /// Parameter name.
    #[serde(default)]
    pub name: String,
    /// Type string, often a type parameter such as `T`.
    #[serde(default, alias = "type_str")]
    pub type_str: String,
    /// `Single`, `Optional` or `Variadic`.
    #[serde(default)]
    pub option: Option<String>,
}

impl FormalParameter {
    /// False when the parameter option mentions `optional`.
    pub fn is_required(&self) -> bool {
        !self
            .option
            .as_deref()
            .is_some_and(|o| o.to_ascii_lowercase().contains("optional"))
    }
}

/// Allowed concrete types for a type parameter.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeConstraint {
    /// Type parameter, e.g. `T`.
    #[serde(default, alias = "type_param_str")]
    pub type_param_str: String,
    /// Allowed types, e.g. `tensor(float)`.
    #[serde(default, alias = "allowed_type_strs")]
    pub allowed_type_strs: Vec<String>,
}

/// One schema attribute.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSchema {
    /// Attribute name.
    #[serde(default)]
    pub name: String,
    /// Attribute type name, e.g. `FLOAT`.
    #[serde(default, rename = "type")]
    pub attr_type: Option<String>,
    /// Default as a JSON value or as text such as `f: 1.0`.
    #[serde(default, alias = "default_value")]
    pub default_value: Option<Value>,
}

impl AttributeSchema {
    fn is_string_typed(&self) -> bool {
        self.attr_type
            .as_deref()
            .is_some_and(|t| t.to_ascii_lowercase().contains("string"))
    }
}

/// A schema version number as found in registries: integer or text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawVersion {
    Int(i64),
    Text(String),
}

/// One operator schema.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorSchema {
    /// Operator name.
    pub name: String,
    /// Domain; empty means `ai.onnx`.
    #[serde(default)]
    pub domain: String,
    /// Opset version introducing this schema.
    #[serde(default, alias = "since_version", deserialize_with = "since_version")]
    pub since_version: Option<SinceVersion>,
    /// Inputs in order.
    #[serde(default)]
    pub inputs: Vec<FormalParameter>,
    /// Outputs in order.
    #[serde(default)]
    pub outputs: Vec<FormalParameter>,
    /// Type parameter constraints.
    #[serde(default, alias = "type_constraints")]
    pub type_constraints: Vec<TypeConstraint>,
    /// Attributes.
    #[serde(default)]
    pub attributes: Vec<AttributeSchema>,
}

fn since_version<'de, D>(deserializer: D) -> std::result::Result<Option<SinceVersion>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<RawVersion>::deserialize(deserializer)?;
    Ok(raw.map(|v| match v {
        RawVersion::Int(i) => SinceVersion::Int(i),
        RawVersion::Text(s) => match s.trim().parse::<i64>() {
            Ok(i) => SinceVersion::Int(i),
            Err(_) => SinceVersion::Text(s),
        },
    }))
}

impl OperatorSchema {
    /// Domain with the empty domain read as `ai.onnx`.
    pub fn effective_domain(&self) -> &str {
        if self.domain.is_empty() {
            "ai.onnx"
        } else {
            &self.domain
        }
    }

    fn types_for(&self, param: &FormalParameter) -> Vec<String> {
        let constrained = self
            .type_constraints
            .iter()
            .filter(|tc| tc.type_param_str == param.type_str)
            .map(|tc| tc.allowed_type_strs.clone())
            .last()
            .unwrap_or_default();
        if !constrained.is_empty() {
            constrained
        } else if param.type_str.is_empty() {
            Vec::new()
        } else {
            vec![param.type_str.clone()]
        }
    }
}

/// A parsed registry.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// ONNX version the schemas were dumped from.
    pub onnx_version: Option<String>,
    /// Schemas in file order.
    pub schemas: Vec<OperatorSchema>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RegistryFile {
    Wrapped {
        #[serde(default, alias = "onnxVersion")]
        onnx_version: Option<String>,
        schemas: Vec<OperatorSchema>,
    },
    Bare(Vec<OperatorSchema>),
}

impl Registry {
    /// Parses registry JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the JSON is neither a schema array nor a
    /// wrapped registry object.
    pub fn from_json(source: &str, text: &str) -> Result<Self> {
        let file: RegistryFile = serde_json::from_str(text).map_err(|e| Error::parse(source, e))?;
        Ok(match file {
            RegistryFile::Wrapped {
                onnx_version,
                schemas,
            } => Self {
                onnx_version,
                schemas,
            },
            RegistryFile::Bare(schemas) => Self {
                onnx_version: None,
                schemas,
            },
        })
    }

    /// Reads a registry JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`], [`Error::Io`] or [`Error::Parse`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::NotFound(format!("registry not found: {}", path.display())));
        }
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json(&path.display().to_string(), &text)
    }

    /// Schemas sorted by (domain, name), first occurrence of each pair kept.
    pub fn sorted_unique(&self) -> Vec<&OperatorSchema> {
        let mut sorted: Vec<&OperatorSchema> = self.schemas.iter().collect();
        sorted.sort_by(|a, b| (&a.domain, &a.name).cmp(&(&b.domain, &b.name)));
        let mut seen = BTreeSet::new();
        sorted
            .into_iter()
            .filter(|s| seen.insert((s.effective_domain().to_string(), s.name.clone())))
            .collect()
    }
}

/// Turtle for one operator.
#[derive(Debug, Clone)]
pub struct OperatorTtl {
    /// Effective domain.
    pub domain: String,
    /// Operator name.
    pub name: String,
    /// Standalone document (header, prefixes, resource).
    pub document: String,
}

impl OperatorTtl {
    /// Relative path `ttl/onnx/operators/<domain>/<Name>.ttl`, with `.` and
    /// `/` in the domain replaced by `_`.
    pub fn relative_path(&self) -> PathBuf {
        let domain_dir = self.domain.replace(['.', '/'], "_");
        Path::new("ttl")
            .join("onnx")
            .join("operators")
            .join(domain_dir)
            .join(format!("{}.ttl", self.name))
    }
}

/// Turtle rendered from a registry.
#[derive(Debug, Clone)]
pub struct OpsetTtl {
    /// Combined document with every operator.
    pub combined: String,
    /// One standalone document per operator.
    pub operators: Vec<OperatorTtl>,
}

/// Renders a registry as Turtle.
///
/// # Errors
///
/// Returns [`Error::Config`] if the default-value patterns fail to compile.
pub fn opset_to_ttl(registry: &Registry, date: &str) -> Result<OpsetTtl> {
    let patterns = DefaultPatterns::new()?;
    let version = registry.onnx_version.as_deref().unwrap_or("unknown");

    let mut combined = format!(
        "\n# ONNX operator schemas, generated from a schema registry\n# generated: {date}\n# onnx version: {version}\n\n"
    );
    combined.push_str(turtle::OPSET_PREFIXES);

    let mut operators = Vec::new();
    for schema in registry.sorted_unique() {
        let body = operator_body(schema, &patterns);
        let name = turtle::string(&schema.name);
        combined.push_str(&format!(
            "onnx:{} a onnx:Operator ;\n  skos:prefLabel {name} ;\n  rdfs:label {name} ;\n{body}  .\n\n",
            schema.name
        ));

        let mut document = format!(
            "\n# ONNX operator schema, per-operator file\n# generated: {date}\n# onnx version: {version}\n\n"
        );
        document.push_str(turtle::OPSET_PREFIXES);
        document.push_str(&format!(
            "onnx:{} a onnx:Operator ;\n  rdfs:label {name} ;\n{body}  .\n",
            schema.name
        ));
        operators.push(OperatorTtl {
            domain: schema.effective_domain().to_string(),
            name: schema.name.clone(),
            document,
        });
    }

    Ok(OpsetTtl {
        combined,
        operators,
    })
}

/// Everything after the labels: domain, version, inputs, outputs, attributes.
fn operator_body(schema: &OperatorSchema, patterns: &DefaultPatterns) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "  onnx:domain <{}> ;\n",
        vocab::domain_iri(schema.effective_domain())
    ));
    match &schema.since_version {
        Some(SinceVersion::Int(v)) => {
            out.push_str(&format!("  onnx:sinceVersion \"{v}\"^^xsd:integer ;\n"))
        }
        Some(SinceVersion::Text(s)) => {
            out.push_str(&format!("  onnx:sinceVersion {} ;\n", turtle::string(s)))
        }
        None => {}
    }

    for (pos, input) in schema.inputs.iter().enumerate() {
        out.push_str(&format!(
            "  onnx:hasInput [ a onnx:OperatorInput ; onnx:name {} ;",
            turtle::string(&input.name)
        ));
        let types = schema.types_for(input);
        if !types.is_empty() {
            out.push_str(&format!(" onnx:types {} ;", turtle::string(&types.join(","))));
        }
        out.push_str(&format!(
            " onnx:required \"{}\"^^xsd:boolean ; onnx:position {pos} ] ;\n",
            input.is_required()
        ));
    }

    for (pos, output) in schema.outputs.iter().enumerate() {
        out.push_str(&format!(
            "  onnx:hasOutput [ a onnx:OperatorOutput ; onnx:name {} ;",
            turtle::string(&output.name)
        ));
        let types = schema.types_for(output);
        if !types.is_empty() {
            out.push_str(&format!(" onnx:types {} ;", turtle::string(&types.join(","))));
        }
        out.push_str(&format!(" onnx:position {pos} ] ;\n"));
    }

    for attr in schema.attributes.iter().filter(|a| !a.is_string_typed()) {
        out.push_str(&format!(
            "  onnx:hasAttribute [ a onnx:OperatorAttribute ; onnx:name {} ;",
            turtle::string(&attr.name)
        ));
        if let Some(t) = attr.attr_type.as_deref().filter(|t| !t.is_empty()) {
            out.push_str(&format!(" onnx:attrType {} ;", turtle::string(t)));
        }
        if let Some(default) = attr.default_value.as_ref().and_then(|v| typed_default(v, patterns)) {
            out.push_str(&format!(" onnx:default {} ;", turtle::literal(&default)));
        }
        out.push_str(" ] ;\n");
    }
    out
}

fn typed_default(value: &Value, patterns: &DefaultPatterns) -> Option<AttributeValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(AttributeValue::Boolean(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(AttributeValue::Integer)
            .or_else(|| n.as_f64().map(AttributeValue::Double)),
        Value::String(s) => Some(patterns.parse(s)),
        other => Some(AttributeValue::Text(other.to_string())),
    }
}

/// Paths written by [`write_opset`].
#[derive(Debug, Clone, Default)]
pub struct OpsetReport {
    /// Combined file `ttl/opset/onnx.ttl`.
    pub combined: PathBuf,
    /// Canonical copy `ttl/onnx/opset.ttl`, when written.
    pub canonical: Option<PathBuf>,
    /// Per-operator files that were written.
    pub operators: Vec<PathBuf>,
}

/// Writes the combined opset file, the per-operator files and the canonical
/// copy under `root`. Per-operator and canonical write failures only warn.
///
/// # Errors
///
/// Returns an error if rendering fails or the combined file cannot be written.
pub fn write_opset(registry: &Registry, root: &Path) -> Result<OpsetReport> {
    let ttl = opset_to_ttl(registry, &crate::today())?;

    let combined = root.join("ttl").join("opset").join("onnx.ttl");
    write_file(&combined, &ttl.combined)?;
    tracing::info!("Wrote operator TTL to {}", combined.display());

    let mut report = OpsetReport {
        combined,
        ..OpsetReport::default()
    };
    for op in &ttl.operators {
        let path = root.join(op.relative_path());
        match write_file(&path, &op.document) {
            Ok(()) => report.operators.push(path),
            Err(e) => tracing::warn!("could not write per-operator file for {}: {e}", op.name),
        }
    }

    let canonical = root.join("ttl").join("onnx").join("opset.ttl");
    match write_file(&canonical, &ttl.combined) {
        Ok(()) => {
            tracing::info!("Also wrote canonical opset to {}", canonical.display());
            report.canonical = Some(canonical);
        }
        Err(e) => tracing::warn!("could not write canonical opset copy: {e}"),
    }
    Ok(report)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::write(path, content).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use motif_ontology::RdfManager;

    const REGISTRY: &str = r#"{
        "onnx_version": "1.16.0",
        "schemas": [
            {
                "name": "Selu", "domain": "", "sinceVersion": 6,
                "inputs": [{"name": "X", "typeStr": "T", "option": "Single"}],
                "outputs": [{"name": "Y", "typeStr": "T", "option": "Single"}],
                "typeConstraints": [{"typeParamStr": "T", "allowedTypeStrs": ["tensor(float)", "tensor(double)"]}],
                "attributes": [
                    {"name": "alpha", "type": "FLOAT", "defaultValue": "f: 1.67326"},
                    {"name": "gamma", "type": "FLOAT", "defaultValue": 1.0507},
                    {"name": "mode", "type": "STRING", "defaultValue": "s: \"x\""}
                ]
            },
            {
                "name": "Add", "sinceVersion": "14",
                "inputs": [
                    {"name": "A", "typeStr": "T"},
                    {"name": "B", "typeStr": "T", "option": "Optional"}
                ],
                "outputs": [{"name": "C", "typeStr": "T"}]
            },
            {"name": "Add", "sinceVersion": 7},
            {
                "name": "FusedThing", "domain": "com.example/ext", "sinceVersion": "v1",
                "attributes": [{"name": "note", "type": "UNDEFINED", "defaultValue": "line one\nline \"two\""}]
            }
        ]
    }"#;

    fn registry() -> Registry {
        Registry::from_json("registry.json", REGISTRY).unwrap()
    }

    #[test]
    fn schemas_are_sorted_and_deduplicated() {
        let registry = registry();
        let names: Vec<(&str, &str)> = registry
            .sorted_unique()
            .iter()
            .map(|s| (s.effective_domain(), s.name.as_str()))
            .collect();
        assert_eq!(
            names,
            [("ai.onnx", "Add"), ("ai.onnx", "Selu"), ("com.example/ext", "FusedThing")]
        );
    }

    #[test]
    fn combined_document_round_trips_through_the_store() {
        let ttl = opset_to_ttl(&registry(), "2024-01-01").unwrap();
        assert!(ttl.combined.contains("# onnx version: 1.16.0"));
        assert!(ttl.combined.contains("onnx:sinceVersion \"14\"^^xsd:integer"));
        assert!(ttl.combined.contains("onnx:sinceVersion \"v1\""));
        assert!(ttl.combined.contains("domain/com.example%2Fext>"));
        assert!(!ttl.combined.contains("\"mode\""));

        let rdf = RdfManager::from_turtle(&ttl.combined).unwrap();
        let add = rdf.get_operator_spec("Add").unwrap().unwrap();
        assert_eq!(add.since_version, Some(SinceVersion::Int(14)));
        let names: Vec<&str> = add.inputs.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(add.inputs[0].required, Some(true));
        assert_eq!(add.inputs[1].required, Some(false));

        let selu = rdf.get_operator_spec("Selu").unwrap().unwrap();
        assert!(selu.domain_iri.unwrap().starts_with("https://"));
        assert_eq!(selu.inputs[0].types.as_deref(), Some("tensor(float),tensor(double)"));
        let alpha = selu.attributes.iter().find(|a| a.name == "alpha").unwrap();
        assert_eq!(alpha.default, Some(AttributeValue::Double(1.67326)));
        let gamma = selu.attributes.iter().find(|a| a.name == "gamma").unwrap();
        assert_eq!(gamma.default, Some(AttributeValue::Double(1.0507)));
    }

    #[test]
    fn multi_line_defaults_are_triple_quoted() {
        let ttl = opset_to_ttl(&registry(), "2024-01-01").unwrap();
        assert!(ttl.combined.contains("\"\"\"line one\nline \\\"two\\\"\"\"\""));
    }

    #[test]
    fn write_opset_lays_out_files() {
        let dir = tempfile::tempdir().unwrap();
        let report = write_opset(&registry(), dir.path()).unwrap();
        assert!(report.combined.ends_with("ttl/opset/onnx.ttl"));
        assert_eq!(report.operators.len(), 3);
        assert!(dir.path().join("ttl/onnx/operators/ai_onnx/Selu.ttl").is_file());
        assert!(dir
            .path()
            .join("ttl/onnx/operators/com_example_ext/FusedThing.ttl")
            .is_file());
        let canonical = fs::read_to_string(report.canonical.unwrap()).unwrap();
        assert_eq!(canonical, fs::read_to_string(&report.combined).unwrap());

        let selu = fs::read_to_string(dir.path().join("ttl/onnx/operators/ai_onnx/Selu.ttl")).unwrap();
        assert!(!selu.contains("skos:prefLabel"));
        RdfManager::from_turtle(&selu).unwrap();
    }
}
