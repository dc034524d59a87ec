//! Owned RDF terms and materialized SPARQL results.

use std::collections::BTreeMap;

use oxigraph::model::Term;
use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::vocab;

/// An RDF term detached from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TermValue {
    /// A named node.
    Iri(String),
    /// A literal with its datatype IRI and optional language tag.
    Literal {
        /// Lexical form.
        value: String,
        /// Datatype IRI.
        datatype: String,
        /// Language tag, when present.
        language: Option<String>,
    },
    /// A blank node identifier.
    Blank(String),
}

impl TermValue {
    /// Converts an oxigraph term. Quoted triples are not supported and yield `None`.
    pub fn from_term(term: &Term) -> Option<Self> {
        #[allow(unreachable_patterns)]
        match term {
            Term::NamedNode(node) => Some(Self::Iri(node.as_str().to_string())),
            Term::BlankNode(node) => Some(Self::Blank(node.as_str().to_string())),
            Term::Literal(lit) => Some(Self::Literal {
                value: lit.value().to_string(),
                datatype: lit.datatype().as_str().to_string(),
                language: lit.language().map(str::to_string),
            }),
            _ => None,
        }
    }

    /// Display form: local name for IRIs, lexical value for literals, id for blank nodes.
    pub fn display(&self) -> String {
        match self {
            Self::Iri(iri) => vocab::local_name(iri).to_string(),
            Self::Literal { value, .. } => value.clone(),
            Self::Blank(id) => id.clone(),
        }
    }

    /// The IRI, if this is a named node.
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Self::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    /// The literal lexical form or IRI string, without shortening.
    pub fn lexical(&self) -> &str {
        match self {
            Self::Iri(s) | Self::Blank(s) => s,
            Self::Literal { value, .. } => value,
        }
    }

    /// JSON form: numeric and boolean literals become JSON numbers and
    /// booleans, everything else the [`TermValue::display`] string.
    pub fn to_json(&self) -> Value {
        let lexical = self.lexical().trim();
        let typed = match self.datatype_local() {
            Some("integer" | "int" | "long" | "short" | "nonNegativeInteger" | "positiveInteger") => {
                lexical.parse::<i64>().ok().map(Value::from)
            }
            Some("decimal" | "double" | "float") => lexical
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            Some("boolean") => match lexical {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        };
        typed.unwrap_or_else(|| Value::String(self.display()))
    }

    /// Datatype local name for literals (`integer`, `double`, ...).
    pub fn datatype_local(&self) -> Option<&str> {
        match self {
            Self::Literal { datatype, .. } => Some(vocab::local_name(datatype)),
            _ => None,
        }
    }
}

/// One solution: bound variables only.
pub type Solution = BTreeMap<String, TermValue>;

/// A plain row mapping variable names to display strings.
pub type Row = BTreeMap<String, String>;

/// A fully materialized query result.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    /// Projected variable names in query order.
    pub variables: Vec<String>,
    /// Solutions in result order.
    pub solutions: Vec<Solution>,
}

impl QueryResult {
    /// Number of solutions.
    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    /// True when the query produced no solutions.
    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    /// Converts every solution into a [`Row`].
    ///
    /// IRIs map to their local name and add `<var>_uri` with the full IRI.
    /// Unbound variables are omitted.
    pub fn to_rows(&self) -> Vec<Row> {
        self.solutions
            .iter()
            .map(|solution| {
                let mut row = Row::new();
                for (var, value) in solution {
                    row.insert(var.clone(), value.display());
                    if let TermValue::Iri(iri) = value {
                        row.insert(format!("{var}_uri"), iri.clone());
                    }
                }
                row
            })
            .collect()
    }

    /// Like [`QueryResult::to_rows`], with literals typed by [`TermValue::to_json`].
    pub fn to_json_rows(&self) -> Vec<Map<String, Value>> {
        self.solutions
            .iter()
            .map(|solution| {
                let mut row = Map::new();
                for (var, value) in solution {
                    row.insert(var.clone(), value.to_json());
                    if let TermValue::Iri(iri) = value {
                        row.insert(format!("{var}_uri"), Value::String(iri.clone()));
                    }
                }
                row
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_carry_local_name_and_uri() {
        let mut solution = Solution::new();
        solution.insert(
            "motif".to_string(),
            TermValue::Iri("https://ns.onnx.cloud/motif#Add".to_string()),
        );
        solution.insert(
            "label".to_string(),
            TermValue::Literal {
                value: "Add".to_string(),
                datatype: format!("{}string", vocab::XSD),
                language: None,
            },
        );
        let result = QueryResult {
            variables: vec!["motif".into(), "label".into(), "missing".into()],
            solutions: vec![solution],
        };
        let rows = result.to_rows();
        assert_eq!(rows[0]["motif"], "Add");
        assert_eq!(rows[0]["motif_uri"], "https://ns.onnx.cloud/motif#Add");
        assert_eq!(rows[0]["label"], "Add");
        assert!(!rows[0].contains_key("missing"));
    }

    #[test]
    fn json_rows_type_numbers_and_booleans() {
        let lit = |value: &str, dt: &str| TermValue::Literal {
            value: value.to_string(),
            datatype: format!("{}{dt}", vocab::XSD),
            language: None,
        };
        let mut solution = Solution::new();
        solution.insert("count".into(), lit("3", "integer"));
        solution.insert("ratio".into(), lit("0.5", "decimal"));
        solution.insert("flag".into(), lit("true", "boolean"));
        solution.insert("odd".into(), lit("many", "integer"));
        let result = QueryResult {
            variables: vec![],
            solutions: vec![solution],
        };
        let row = &result.to_json_rows()[0];
        assert_eq!(row["count"], Value::from(3));
        assert_eq!(row["ratio"], Value::from(0.5));
        assert_eq!(row["flag"], Value::Bool(true));
        assert_eq!(row["odd"], Value::String("many".into()));
    }
}
