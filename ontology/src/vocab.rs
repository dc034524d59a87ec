//! Namespace IRIs and IRI helpers.

/// `rdf:` namespace.
pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
/// `rdfs:` namespace.
pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
/// `xsd:` namespace.
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
/// `skos:` namespace.
pub const SKOS: &str = "http://www.w3.org/2004/02/skos/core#";
/// `sh:` namespace.
pub const SH: &str = "http://www.w3.org/ns/shacl#";
/// `motif:` namespace.
pub const MOTIF: &str = "https://ns.onnx.cloud/motif#";
/// `onnx:` namespace.
pub const ONNX: &str = "https://ns.onnx.cloud/onnx#";
/// Base IRI for ONNX operator domains.
pub const ONNX_DOMAIN_BASE: &str = "https://ns.onnx.cloud/onnx/domain/";

/// `rdf:type`.
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
/// `rdfs:label`.
pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
/// `rdfs:comment`.
pub const RDFS_COMMENT: &str = "http://www.w3.org/2000/01/rdf-schema#comment";

/// Well-known prefixes, used to expand `prefix:local` names in configs.
pub const PREFIXES: &[(&str, &str)] = &[
    ("rdf", RDF),
    ("rdfs", RDFS),
    ("xsd", XSD),
    ("skos", SKOS),
    ("sh", SH),
    ("motif", MOTIF),
    ("onnx", ONNX),
];

/// Returns the local name of an IRI: the part after `#`, else after the last `/`.
pub fn local_name(iri: &str) -> &str {
    match iri.rfind('#') {
        Some(pos) => &iri[pos + 1..],
        None => iri.rsplit('/').next().unwrap_or(iri),
    }
}

/// Expands `prefix:local` against [`PREFIXES`].
///
/// Returns `None` for unknown prefixes and for values that are not prefixed names.
pub fn expand(curie: &str) -> Option<String> {
    let (prefix, local) = curie.split_once(':')?;
    if local.starts_with("//") {
        return None;
    }
    PREFIXES
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, ns)| format!("{ns}{local}"))
}

/// Renders a predicate or class reference for SPARQL: absolute IRIs and known
/// prefixed names become `<iri>`, anything else is passed through.
pub fn sparql_term(reference: &str) -> String {
    let trimmed = reference.trim();
    if trimmed.starts_with('<') {
        return trimmed.to_string();
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return format!("<{trimmed}>");
    }
    match expand(trimmed) {
        Some(iri) => format!("<{iri}>"),
        None => trimmed.to_string(),
    }
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
pub fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Decodes `%XX` escapes; malformed escapes are kept verbatim.
pub fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Builds the domain IRI for an ONNX operator domain (empty means `ai.onnx`).
pub fn domain_iri(domain: &str) -> String {
    let domain = if domain.is_empty() { "ai.onnx" } else { domain };
    format!("{ONNX_DOMAIN_BASE}{}", percent_encode(domain))
}
