//! Structured ONNX operator specs assembled from ontology triples.
//!
//! Operators appear in two shapes: structured `onnx:hasInput` /
//! `onnx:hasOutput` / `onnx:hasAttribute` nodes, and older flattened
//! `onnx:inputs "A: desc; B: desc"` strings. Structured nodes win; flattened
//! strings are parsed as a fallback and always kept in the `*_raw` fields.

use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::term::TermValue;
use crate::vocab;

/// Operator version, integer when the ontology value parses as one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SinceVersion {
    /// Parsed integer version.
    Int(i64),
    /// Raw text that is not an integer.
    Text(String),
}

impl std::fmt::Display for SinceVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A typed attribute default.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Integer default.
    Integer(i64),
    /// Floating-point default.
    Double(f64),
    /// Boolean default.
    Boolean(bool),
    /// Anything else, verbatim.
    Text(String),
}

impl AttributeValue {
    /// True for integer and double defaults.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Double(_))
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v:?}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// An operator input or output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IoDescriptor {
    /// Argument name.
    pub name: String,
    /// Allowed element types, comma separated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<String>,
    /// Whether the argument is required (inputs only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    /// Free-text description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    /// Declared argument position, used for ordering.
    #[serde(skip)]
    pub position: Option<i64>,
}

/// An operator attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttributeDescriptor {
    /// Attribute name.
    pub name: String,
    /// ONNX attribute type name (`FLOAT`, `INT`, ...).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub attr_type: Option<String>,
    /// Typed default, when the schema declares one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<AttributeValue>,
}

/// Everything the ontology says about one operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OperatorSpec {
    /// IRI of the resolved subject.
    pub subject: String,
    /// `rdfs:label` (or any `label` predicate).
    pub label: Option<String>,
    /// Readable domain, e.g. `ai.onnx`.
    pub domain: Option<String>,
    /// Domain IRI when the domain is stored as an IRI.
    pub domain_iri: Option<String>,
    /// First version of the operator.
    #[serde(rename = "sinceVersion")]
    pub since_version: Option<SinceVersion>,
    /// Inputs in declaration order.
    pub inputs: Vec<IoDescriptor>,
    /// Outputs in declaration order.
    pub outputs: Vec<IoDescriptor>,
    /// Structured attributes.
    pub attributes: Vec<AttributeDescriptor>,
    /// Flattened `inputs` string, if present.
    pub inputs_raw: Option<String>,
    /// Flattened `outputs` string, if present.
    pub outputs_raw: Option<String>,
    /// Flattened `attributes` string, if present.
    pub attributes_raw: Option<String>,
}

/// One predicate/object pair of the operator subject, with the
/// predicate/object pairs of the object node itself.
#[derive(Debug, Clone)]
pub struct PropertyGroup {
    /// Predicate IRI.
    pub predicate: String,
    /// Object term.
    pub object: TermValue,
    /// Outgoing pairs of `object`.
    pub nested: Vec<(String, TermValue)>,
}

/// Recognizes defaults embedded in text, such as `f: 1.0507` or `i: 2`.
#[derive(Debug)]
pub struct DefaultPatterns {
    float: Regex,
    int: Regex,
}

impl DefaultPatterns {
    /// Compiles the patterns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a pattern fails to compile.
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| Error::Config(format!("bad pattern {pattern}: {e}")))
        };
        Ok(Self {
            float: compile(r"\bf:\s*([+-]?[0-9]*\.?[0-9]+(?:[eE][+-]?[0-9]+)?)")?,
            int: compile(r"\bi:\s*([+-]?[0-9]+)")?,
        })
    }

    /// Best-effort typed reading of a textual default.
    pub fn parse(&self, text: &str) -> AttributeValue {
        let capture = |re: &Regex| re.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str());
        if let Some(v) = capture(&self.float).and_then(|s| s.parse::<f64>().ok()) {
            return AttributeValue::Double(v);
        }
        if let Some(v) = capture(&self.int).and_then(|s| s.parse::<i64>().ok()) {
            return AttributeValue::Integer(v);
        }
        match text.trim().to_ascii_lowercase().as_str() {
            "true" => AttributeValue::Boolean(true),
            "false" => AttributeValue::Boolean(false),
            _ => AttributeValue::Text(text.to_string()),
        }
    }

    /// Reads a default from an RDF term: literal datatype first, then embedded patterns.
    pub fn from_term(&self, term: &TermValue) -> AttributeValue {
        let lexical = term.lexical();
        match term.datatype_local() {
            Some(dt) if is_integer_type(dt) => lexical
                .trim()
                .parse::<i64>()
                .map(AttributeValue::Integer)
                .unwrap_or_else(|_| self.parse(lexical)),
            Some("double" | "float" | "decimal") => lexical
                .trim()
                .parse::<f64>()
                .map(AttributeValue::Double)
                .unwrap_or_else(|_| self.parse(lexical)),
            Some("boolean") => AttributeValue::Boolean(matches!(lexical.trim(), "true" | "1")),
            _ => self.parse(lexical),
        }
    }
}

fn is_integer_type(local: &str) -> bool {
    matches!(
        local,
        "integer"
            | "int"
            | "long"
            | "short"
            | "byte"
            | "nonNegativeInteger"
            | "positiveInteger"
            | "negativeInteger"
            | "nonPositiveInteger"
            | "unsignedLong"
            | "unsignedInt"
            | "unsignedShort"
            | "unsignedByte"
    )
}

/// Parses a flattened `"A: desc; B: desc"` list.
pub fn parse_io_list(s: &str) -> Vec<IoDescriptor> {
    s.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once(':') {
            Some((name, rest)) => IoDescriptor {
                name: name.trim().to_string(),
                desc: Some(rest.trim().to_string()).filter(|d| !d.is_empty()),
                ..IoDescriptor::default()
            },
            None => IoDescriptor {
                name: part.to_string(),
                ..IoDescriptor::default()
            },
        })
        .collect()
}

/// Readable domain from a domain IRI: fragment or last path segment,
/// percent-decoded, with `_` read as `.`.
pub fn domain_label(iri: &str) -> String {
    let segment = vocab::local_name(iri);
    vocab::percent_decode(segment).replace('_', ".")
}

/// True when the IRI path has an `onnx` or `ops` segment.
pub fn is_operator_iri(iri: &str) -> bool {
    let without_scheme = iri.split_once("://").map_or(iri, |(_, rest)| rest);
    let path = without_scheme
        .split(['#', '?'])
        .next()
        .unwrap_or_default();
    path.split('/')
        .skip(1)
        .filter(|seg| !seg.is_empty())
        .any(|seg| seg.eq_ignore_ascii_case("onnx") || seg.eq_ignore_ascii_case("ops"))
}

fn as_bool(term: &TermValue) -> bool {
    matches!(term.lexical().trim().to_ascii_lowercase().as_str(), "true" | "1")
}

fn io_from_nested(nested: &[(String, TermValue)], with_required: bool) -> IoDescriptor {
    let mut io = IoDescriptor::default();
    for (predicate, value) in nested {
        match vocab::local_name(predicate) {
            "name" | "label" => io.name = value.lexical().to_string(),
            "types" | "type" if value.as_iri().is_none() => {
                io.types = Some(value.lexical().to_string())
            }
            "required" | "isRequired" if with_required => io.required = Some(as_bool(value)),
            "desc" | "description" => io.desc = Some(value.lexical().to_string()),
            "position" => io.position = value.lexical().trim().parse().ok(),
            _ => {}
        }
    }
    io
}

fn sort_by_position(items: &mut [IoDescriptor]) {
    if items.iter().all(|io| io.position.is_some()) {
        items.sort_by_key(|io| io.position);
    }
}

/// Assembles an [`OperatorSpec`] from the subject's property groups.
pub fn build_spec(subject: &str, groups: &[PropertyGroup], patterns: &DefaultPatterns) -> OperatorSpec {
    let mut spec = OperatorSpec {
        subject: subject.to_string(),
        ..OperatorSpec::default()
    };
    let mut since: Option<String> = None;

    for group in groups {
        let object = &group.object;
        match vocab::local_name(&group.predicate) {
            "label" if spec.label.is_none() => spec.label = Some(object.lexical().to_string()),
            "domain" | "opset_domain" if spec.domain.is_none() => match object.as_iri() {
                Some(iri) => {
                    spec.domain_iri = Some(iri.to_string());
                    spec.domain = Some(domain_label(iri));
                }
                None => spec.domain = Some(object.lexical().to_string()),
            },
            "sinceVersion" | "since" if since.is_none() => {
                since = Some(object.lexical().to_string())
            }
            "inputs" if spec.inputs_raw.is_none() => {
                spec.inputs_raw = Some(object.lexical().to_string())
            }
            "outputs" if spec.outputs_raw.is_none() => {
                spec.outputs_raw = Some(object.lexical().to_string())
            }
            "attributes" if spec.attributes_raw.is_none() => {
                spec.attributes_raw = Some(object.lexical().to_string())
            }
            "hasInput" => spec.inputs.push(io_from_nested(&group.nested, true)),
            "hasOutput" => spec.outputs.push(io_from_nested(&group.nested, false)),
            "hasAttribute" => {
                let mut attr = AttributeDescriptor::default();
                for (predicate, value) in &group.nested {
                    match vocab::local_name(predicate) {
                        "name" | "label" => attr.name = value.lexical().to_string(),
                        "attrType" | "type" if value.as_iri().is_none() => {
                            attr.attr_type = Some(value.lexical().to_string())
                        }
                        "default" | "default_value" => attr.default = Some(patterns.from_term(value)),
                        _ => {}
                    }
                }
                spec.attributes.push(attr);
            }
            _ => {}
        }
    }

    sort_by_position(&mut spec.inputs);
    sort_by_position(&mut spec.outputs);
    if spec.inputs.is_empty() {
        spec.inputs = spec.inputs_raw.as_deref().map(parse_io_list).unwrap_or_default();
    }
    if spec.outputs.is_empty() {
        spec.outputs = spec.outputs_raw.as_deref().map(parse_io_list).unwrap_or_default();
    }
    spec.since_version = since.map(|s| match s.trim().parse::<i64>() {
        Ok(v) => SinceVersion::Int(v),
        Err(_) => SinceVersion::Text(s),
    });
    spec
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(value: &str, datatype: &str) -> TermValue {
        TermValue::Literal {
            value: value.to_string(),
            datatype: format!("{}{datatype}", vocab::XSD),
            language: None,
        }
    }

    #[test]
    fn embedded_defaults_are_typed() {
        let p = DefaultPatterns::new().unwrap();
        assert_eq!(p.parse("f: 1.67326"), AttributeValue::Double(1.67326));
        assert_eq!(p.parse("name: \"axis\" i: -1 type: INT"), AttributeValue::Integer(-1));
        assert_eq!(p.parse(" True "), AttributeValue::Boolean(true));
        assert_eq!(p.parse("NOTSET"), AttributeValue::Text("NOTSET".into()));
    }

    #[test]
    fn typed_literals_win_over_patterns() {
        let p = DefaultPatterns::new().unwrap();
        assert_eq!(p.from_term(&lit("3", "integer")), AttributeValue::Integer(3));
        assert_eq!(p.from_term(&lit("1.5", "double")), AttributeValue::Double(1.5));
        assert_eq!(p.from_term(&lit("false", "boolean")), AttributeValue::Boolean(false));
        assert_eq!(p.from_term(&lit("f: 0.5", "string")), AttributeValue::Double(0.5));
    }

    #[test]
    fn flattened_io_lists_parse() {
        let items = parse_io_list("A:  (required); B:  (required);");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "A");
        assert_eq!(items[0].desc.as_deref(), Some("(required)"));
        assert_eq!(parse_io_list("X")[0].name, "X");
    }

    #[test]
    fn operator_iri_detection() {
        assert!(is_operator_iri("https://ns.onnx.cloud/onnx#Add"));
        assert!(is_operator_iri("https://example.org/ops/Add"));
        assert!(!is_operator_iri("https://ns.onnx.cloud/motif#Add"));
    }

    #[test]
    fn domain_label_decodes() {
        assert_eq!(domain_label("https://ns.onnx.cloud/onnx/domain/ai.onnx"), "ai.onnx");
        assert_eq!(
            domain_label("https://ns.onnx.cloud/onnx/domain/com_microsoft"),
            "com.microsoft"
        );
    }

    #[test]
    fn structured_inputs_beat_raw_strings() {
        let p = DefaultPatterns::new().unwrap();
        let name = format!("{}name", vocab::ONNX);
        let position = format!("{}position", vocab::ONNX);
        let groups = vec![
            PropertyGroup {
                predicate: format!("{}inputs", vocab::ONNX),
                object: lit("X: raw", "string"),
                nested: vec![],
            },
            PropertyGroup {
                predicate: format!("{}hasInput", vocab::ONNX),
                object: TermValue::Blank("b1".into()),
                nested: vec![
                    (name.clone(), lit("B", "string")),
                    (position.clone(), lit("1", "integer")),
                ],
            },
            PropertyGroup {
                predicate: format!("{}hasInput", vocab::ONNX),
                object: TermValue::Blank("b0".into()),
                nested: vec![(name, lit("A", "string")), (position, lit("0", "integer"))],
            },
            PropertyGroup {
                predicate: format!("{}sinceVersion", vocab::ONNX),
                object: lit("14", "integer"),
                nested: vec![],
            },
        ];
        let spec = build_spec("https://ns.onnx.cloud/onnx#Add", &groups, &p);
        let names: Vec<_> = spec.inputs.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(spec.inputs_raw.as_deref(), Some("X: raw"));
        assert_eq!(spec.since_version, Some(SinceVersion::Int(14)));
    }
}
