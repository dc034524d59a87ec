//! Turtle literal formatting.

use motif_ontology::AttributeValue;

/// Prefix block for exported models.
pub const MODEL_PREFIXES: &str = "@prefix onnx: <https://ns.onnx.cloud/onnx#> .\n\
@prefix motif: <https://ns.onnx.cloud/motif#> .\n\
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .\n\
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .\n\n";

/// Prefix block for exported operator schemas.
pub const OPSET_PREFIXES: &str = "@prefix rdf:  <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .\n\
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .\n\
@prefix skos: <http://www.w3.org/2004/02/skos/core#> .\n\
@prefix onnx: <https://ns.onnx.cloud/onnx#> .\n\
@prefix xsd:  <http://www.w3.org/2001/XMLSchema#> .\n\n";

/// Escapes text for a single-line `"..."` literal.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

/// A single-line string literal.
pub fn string(s: &str) -> String {
    format!("\"{}\"", escape(s))
}

/// A typed literal for an attribute default. Multi-line text becomes a
/// `"""..."""` literal.
pub fn literal(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Boolean(b) => format!("\"{b}\"^^xsd:boolean"),
        AttributeValue::Integer(i) => format!("\"{i}\"^^xsd:integer"),
        AttributeValue::Double(d) => format!("\"{}\"^^xsd:double", double_lexical(*d)),
        AttributeValue::Text(s) if s.contains('\n') => {
            let body = s.replace('\\', "\\\\").replace('"', "\\\"");
            format!("\"\"\"{body}\"\"\"")
        }
        AttributeValue::Text(s) => string(s),
    }
}

fn double_lexical(d: f64) -> String {
    if d.is_nan() {
        "NaN".to_string()
    } else if d == f64::INFINITY {
        "INF".to_string()
    } else if d == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        format!("{d:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_quotes_and_newlines() {
        assert_eq!(string("say \"hi\"\nnow"), r#""say \"hi\"\nnow""#);
        assert_eq!(string(r"a\b"), r#""a\\b""#);
    }

    #[test]
    fn typed_literals() {
        assert_eq!(literal(&AttributeValue::Boolean(true)), "\"true\"^^xsd:boolean");
        assert_eq!(literal(&AttributeValue::Integer(-1)), "\"-1\"^^xsd:integer");
        assert_eq!(literal(&AttributeValue::Double(1.0)), "\"1.0\"^^xsd:double");
        assert_eq!(literal(&AttributeValue::Double(f64::INFINITY)), "\"INF\"^^xsd:double");
        assert_eq!(
            literal(&AttributeValue::Text("a\n\"\"\"b".into())),
            "\"\"\"a\n\\\"\\\"\\\"b\"\"\""
        );
    }
}
