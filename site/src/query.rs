//! Distinguishing inline SPARQL from query file references.

/// Leading keywords that mark text as inline SPARQL.
pub const SPARQL_KEYWORDS: &[&str] = &[
    "SELECT", "PREFIX", "ASK", "CONSTRUCT", "DESCRIBE", "WITH", "INSERT", "DELETE", "MERGE", "BASE",
];

/// True when `text` is SPARQL itself rather than a file reference: it spans
/// several lines or starts with a SPARQL keyword (case-insensitive).
pub fn is_inline_sparql(text: &str) -> bool {
    if text.contains('\n') {
        return true;
    }
    let upper = text.trim_start().to_ascii_uppercase();
    SPARQL_KEYWORDS.iter().any(|kw| upper.starts_with(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_inline_queries() {
        assert!(is_inline_sparql("select ?s where { ?s ?p ?o }"));
        assert!(is_inline_sparql("  PREFIX x: <urn:x>"));
        assert!(is_inline_sparql("a\nb"));
        assert!(!is_inline_sparql("charts/motifs.sparql"));
        assert!(!is_inline_sparql("./sparql/x.sparql"));
    }
}
