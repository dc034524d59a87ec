//! SHACL shape validation.
//!
//! Covers the core subset the motif shapes use: node shapes selecting focus
//! nodes with `sh:targetClass` (subclass instances included), and property
//! shapes with an IRI `sh:path` constrained by `sh:minCount`,
//! `sh:maxCount`, `sh:nodeKind`, `sh:datatype` and `sh:class`. Each property
//! shape may carry `sh:message` and `sh:severity`; only `sh:Violation`
//! results fail the run.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use motif_ontology::{vocab, RdfManager, TermValue};

use crate::report::{ConformanceReport, TestResult};

const VALIDATOR: &str = "shacl/shapes";

/// Allowed kinds of value node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// `sh:IRI`
    Iri,
    /// `sh:Literal`
    Literal,
    /// `sh:BlankNode`
    BlankNode,
    /// `sh:BlankNodeOrIRI`
    BlankNodeOrIri,
    /// `sh:BlankNodeOrLiteral`
    BlankNodeOrLiteral,
    /// `sh:IRIOrLiteral`
    IriOrLiteral,
}

impl NodeKind {
    /// Parses a `sh:nodeKind` value.
    pub fn from_iri(iri: &str) -> Option<Self> {
        let local = iri.strip_prefix(vocab::SH)?;
        Some(match local {
            "IRI" => Self::Iri,
            "Literal" => Self::Literal,
            "BlankNode" => Self::BlankNode,
            "BlankNodeOrIRI" => Self::BlankNodeOrIri,
            "BlankNodeOrLiteral" => Self::BlankNodeOrLiteral,
            "IRIOrLiteral" => Self::IriOrLiteral,
            _ => return None,
        })
    }

    /// True if `value` is of this kind.
    pub fn accepts(self, value: &TermValue) -> bool {
        let (iri, literal, blank) = match value {
            TermValue::Iri(_) => (true, false, false),
            TermValue::Literal { .. } => (false, true, false),
            TermValue::Blank(_) => (false, false, true),
        };
        match self {
            Self::Iri => iri,
            Self::Literal => literal,
            Self::BlankNode => blank,
            Self::BlankNodeOrIri => blank || iri,
            Self::BlankNodeOrLiteral => blank || literal,
            Self::IriOrLiteral => iri || literal,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Iri => "IRI",
            Self::Literal => "Literal",
            Self::BlankNode => "BlankNode",
            Self::BlankNodeOrIri => "BlankNodeOrIRI",
            Self::BlankNodeOrLiteral => "BlankNodeOrLiteral",
            Self::IriOrLiteral => "IRIOrLiteral",
        }
    }
}

/// `sh:severity` of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapeSeverity {
    /// `sh:Violation`, the default.
    #[default]
    Violation,
    /// `sh:Warning`
    Warning,
    /// `sh:Info`
    Info,
}

impl ShapeSeverity {
    fn from_iri(iri: &str) -> Self {
        match vocab::local_name(iri) {
            "Warning" => Self::Warning,
            "Info" => Self::Info,
            _ => Self::Violation,
        }
    }
}

/// Constraints on the values of one predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyShape {
    /// Predicate IRI.
    pub path: String,
    /// `sh:minCount`
    pub min_count: Option<usize>,
    /// `sh:maxCount`
    pub max_count: Option<usize>,
    /// `sh:nodeKind`
    pub node_kind: Option<NodeKind>,
    /// `sh:datatype`
    pub datatype: Option<String>,
    /// `sh:class`
    pub class: Option<String>,
    /// `sh:message`, used instead of the generated message.
    pub message: Option<String>,
    /// `sh:severity`
    pub severity: ShapeSeverity,
}

/// A node shape with its targets and property shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeShape {
    /// Shape IRI or blank node id.
    pub id: String,
    /// `sh:targetClass` values.
    pub target_classes: Vec<String>,
    /// `sh:property` shapes.
    pub properties: Vec<PropertyShape>,
}

/// One validation result.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Shape the result came from.
    pub shape: String,
    /// Focus node.
    pub focus: String,
    /// Predicate checked.
    pub path: String,
    /// Offending value, for value-level constraints.
    pub value: Option<String>,
    /// Shape message or a generated one.
    pub message: String,
    /// Severity inherited from the property shape.
    pub severity: ShapeSeverity,
}

/// Reads the shapes graph from a Turtle file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the shape
/// queries fail.
pub fn load_shapes(path: &Path) -> Result<Vec<NodeShape>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read shapes {}", path.display()))?;
    let graph = RdfManager::from_turtle(&text)
        .with_context(|| format!("Failed to parse shapes {}", path.display()))?;
    parse_shapes(&graph)
}

/// Extracts node shapes from a shapes graph, ordered by id.
///
/// # Errors
///
/// Returns an error if a shape query fails.
pub fn parse_shapes(graph: &RdfManager) -> Result<Vec<NodeShape>> {
    let sh = vocab::SH;
    let targets = graph.execute_query(&format!(
        "SELECT ?shape ?target WHERE {{ ?shape <{sh}targetClass> ?target }} ORDER BY ?shape ?target"
    ))?;

    let mut shapes: BTreeMap<String, NodeShape> = BTreeMap::new();
    for row in &targets.solutions {
        let (Some(shape), Some(TermValue::Iri(target))) = (row.get("shape"), row.get("target")) else {
            continue;
        };
        let id = shape.lexical().to_string();
        shapes
            .entry(id.clone())
            .or_insert_with(|| NodeShape {
                id,
                target_classes: Vec::new(),
                properties: Vec::new(),
            })
            .target_classes
            .push(target.clone());
    }

    let properties = graph.execute_query(&format!(
        "SELECT ?shape ?prop ?path ?min ?max ?nodeKind ?datatype ?class ?message ?severity WHERE {{
            ?shape <{sh}property> ?prop .
            ?prop <{sh}path> ?path .
            OPTIONAL {{ ?prop <{sh}minCount> ?min }}
            OPTIONAL {{ ?prop <{sh}maxCount> ?max }}
            OPTIONAL {{ ?prop <{sh}nodeKind> ?nodeKind }}
            OPTIONAL {{ ?prop <{sh}datatype> ?datatype }}
            OPTIONAL {{ ?prop <{sh}class> ?class }}
            OPTIONAL {{ ?prop <{sh}message> ?message }}
            OPTIONAL {{ ?prop <{sh}severity> ?severity }}
        }}"
    ))?;

    let mut seen = HashSet::new();
    for row in &properties.solutions {
        let (Some(shape), Some(prop), Some(path)) = (row.get("shape"), row.get("prop"), row.get("path")) else {
            continue;
        };
        let Some(node) = shapes.get_mut(shape.lexical()) else {
            continue;
        };
        if !seen.insert((shape.lexical().to_string(), prop.lexical().to_string())) {
            continue;
        }
        let TermValue::Iri(path) = path else {
            tracing::warn!("Shape {}: only IRI paths are supported, skipping property", node.id);
            continue;
        };
        let count = |var: &str| row.get(var).and_then(|v| v.lexical().parse::<usize>().ok());
        let iri = |var: &str| row.get(var).and_then(TermValue::as_iri).map(str::to_string);
        node.properties.push(PropertyShape {
            path: path.clone(),
            min_count: count("min"),
            max_count: count("max"),
            node_kind: iri("nodeKind").as_deref().and_then(NodeKind::from_iri),
            datatype: iri("datatype"),
            class: iri("class"),
            message: row.get("message").map(|m| m.lexical().to_string()),
            severity: iri("severity")
                .as_deref()
                .map(ShapeSeverity::from_iri)
                .unwrap_or_default(),
        });
    }

    Ok(shapes.into_values().collect())
}

fn node_key(term: &TermValue) -> String {
    match term {
        TermValue::Blank(id) => format!("_:{id}"),
        other => other.lexical().to_string(),
    }
}

fn instances_query(class: &str) -> String {
    format!(
        "?x <{}>/<{}subClassOf>* <{class}>",
        vocab::RDF_TYPE,
        vocab::RDFS
    )
}

/// Validates `data` against `shapes` and returns every result.
///
/// # Errors
///
/// Returns an error if a validation query fails.
pub fn check(data: &RdfManager, shapes: &[NodeShape]) -> Result<Vec<Violation>> {
    let mut class_members: HashMap<String, HashSet<String>> = HashMap::new();
    let mut violations = Vec::new();

    for shape in shapes {
        for target in &shape.target_classes {
            for property in &shape.properties {
                let result = data.execute_query(&format!(
                    "SELECT DISTINCT ?x ?v WHERE {{ {} . OPTIONAL {{ ?x <{}> ?v }} }}",
                    instances_query(target),
                    property.path
                ))?;

                let mut values: BTreeMap<String, Vec<TermValue>> = BTreeMap::new();
                for row in &result.solutions {
                    let Some(focus) = row.get("x") else { continue };
                    let entry = values.entry(node_key(focus)).or_default();
                    if let Some(v) = row.get("v") {
                        entry.push(v.clone());
                    }
                }

                if let Some(class) = &property.class {
                    if !class_members.contains_key(class) {
                        let members = data.execute_query(&format!(
                            "SELECT DISTINCT ?x WHERE {{ {} }}",
                            instances_query(class)
                        ))?;
                        let set = members
                            .solutions
                            .iter()
                            .filter_map(|row| row.get("x").map(node_key))
                            .collect();
                        class_members.insert(class.clone(), set);
                    }
                }
                let members = property.class.as_ref().and_then(|c| class_members.get(c));

                for (focus, vals) in &values {
                    let report = |value: Option<&TermValue>, generated: String| Violation {
                        shape: shape.id.clone(),
                        focus: focus.clone(),
                        path: property.path.clone(),
                        value: value.map(node_key),
                        message: property.message.clone().unwrap_or(generated),
                        severity: property.severity,
                    };

                    if let Some(min) = property.min_count {
                        if vals.len() < min {
                            violations.push(report(
                                None,
                                format!("Less than {min} values on {focus}->{}", property.path),
                            ));
                        }
                    }
                    if let Some(max) = property.max_count {
                        if vals.len() > max {
                            violations.push(report(
                                None,
                                format!("More than {max} values on {focus}->{}", property.path),
                            ));
                        }
                    }
                    for value in vals {
                        if let Some(kind) = property.node_kind {
                            if !kind.accepts(value) {
                                violations.push(report(
                                    Some(value),
                                    format!("Value is not of node kind sh:{}", kind.name()),
                                ));
                            }
                        }
                        if let Some(datatype) = &property.datatype {
                            let matches = matches!(value, TermValue::Literal { datatype: dt, .. } if dt == datatype);
                            if !matches {
                                violations.push(report(
                                    Some(value),
                                    format!("Value does not have datatype <{datatype}>"),
                                ));
                            }
                        }
                        if let (Some(class), Some(members)) = (&property.class, members) {
                            if !members.contains(&node_key(value)) {
                                violations.push(report(
                                    Some(value),
                                    format!("Value does not have class <{class}>"),
                                ));
                            }
                        }
                    }
                }
            }
        }
    }
    Ok(violations)
}

/// Validates `data` against the shapes file and converts results to a
/// report: violations fail, warnings and infos warn.
///
/// # Errors
///
/// Returns an error if the shapes cannot be loaded or a query fails.
pub fn validate(data: &RdfManager, shapes_path: &Path) -> Result<ConformanceReport> {
    let shapes = load_shapes(shapes_path)?;
    let violations = check(data, &shapes)?;
    let mut report = ConformanceReport::new();

    for v in &violations {
        let details = std::iter::once(format!("focus: {}", v.focus))
            .chain(std::iter::once(format!("path: {}", v.path)))
            .chain(v.value.iter().map(|value| format!("value: {value}")))
            .chain(std::iter::once(format!("shape: {}", v.shape)))
            .collect();
        let result = match v.severity {
            ShapeSeverity::Violation => TestResult::fail(VALIDATOR, v.message.clone()),
            ShapeSeverity::Warning | ShapeSeverity::Info => TestResult::warn(VALIDATOR, v.message.clone()),
        };
        report.push(result.with_details(details));
    }

    if report.all_passed() {
        report.push(TestResult::pass(
            VALIDATOR,
            format!("Data graph conforms to {} node shapes", shapes.len()),
        ));
    }
    Ok(report)
}
