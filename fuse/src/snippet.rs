//! Snippet context and the built-in snippet layout.

use motif_ontology::{OperatorSpec, Row};
use serde::Serialize;

/// Values available to a snippet template.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SnippetContext {
    /// Lower-cased motif label, used as the `fuse` block name.
    pub label: String,
    /// Motif label as written in the ontology.
    pub label_title: String,
    /// Arity signature, e.g. `2→1`.
    pub signature: String,
    /// Category label.
    pub category: String,
    /// Motif IRI, empty when unknown.
    pub motif_uri: String,
    /// Trimmed definition text.
    pub definition: String,
    /// Non-blank definition lines.
    pub definition_lines: Vec<String>,
    /// Matching operator spec, when one exists.
    pub operator_spec: Option<OperatorSpec>,
}

impl SnippetContext {
    /// Builds the context from a motif query row, applying the `Unknown`,
    /// `?→?` and `Uncategorized` defaults.
    pub fn from_row(row: &Row) -> Self {
        let non_empty = |key: &str| row.get(key).filter(|v| !v.is_empty()).cloned();
        let label_title = non_empty("label").unwrap_or_else(|| "Unknown".to_string());
        let definition = non_empty("definition").unwrap_or_default().trim().to_string();
        let definition_lines = definition
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            label: label_title.to_lowercase(),
            signature: non_empty("signature").unwrap_or_else(|| "?→?".to_string()),
            category: non_empty("categoryLabel").unwrap_or_else(|| "Uncategorized".to_string()),
            motif_uri: non_empty("motif_uri").unwrap_or_default(),
            definition,
            definition_lines,
            operator_spec: None,
            label_title,
        }
    }

    /// Output file name: the label with spaces and `/` as `_`, plus `.fuse`.
    pub fn file_name(&self) -> String {
        format!("{}.fuse", self.label.replace([' ', '/'], "_"))
    }
}

/// Renders the built-in snippet layout.
pub fn create_snippet_content(ctx: &SnippetContext) -> String {
    let uri_comment = if ctx.motif_uri.is_empty() {
        String::new()
    } else {
        format!("  // URI: {}\n", ctx.motif_uri)
    };

    let mut def_block = String::new();
    if !ctx.definition_lines.is_empty() {
        def_block.push_str("// Definition:\n");
        for line in &ctx.definition_lines {
            def_block.push_str(&format!("// {line}\n"));
        }
        def_block.push('\n');
    }

    let op_block = ctx.operator_spec.as_ref().map(operator_block).unwrap_or_default();
    let label = &ctx.label;
    let label_title = &ctx.label_title;

    format!(
        "// Motif: {label_title}
// Category: {category}
// Signature: {signature}
{uri_comment}{def_block}{op_block}// Description:
// This .fuse snippet demonstrates the '{label_title}' motif pattern.
// It illustrates the computation graph structure and data flow.

fuse {label} {{
    // Input tensors
    input x: Tensor

    // Core computation
    // Define the computation pattern based on motif semantics

    // Output tensors
    output y: Tensor
}}

// Example usage:
// fuse_graph = {label}(x)
",
        category = ctx.category,
        signature = ctx.signature,
    )
}

fn operator_block(spec: &OperatorSpec) -> String {
    let mut out = String::from("// Operator spec (onnx):\n");
    if let Some(label) = spec.label.as_deref().filter(|s| !s.is_empty()) {
        out.push_str(&format!("//   label: {label}\n"));
    }
    if let Some(domain) = spec.domain.as_deref().filter(|s| !s.is_empty()) {
        out.push_str(&format!("//   domain: {domain}\n"));
    }
    if let Some(since) = &spec.since_version {
        out.push_str(&format!("//   since: {since}\n"));
    }
    for (heading, items) in [("inputs", &spec.inputs), ("outputs", &spec.outputs)] {
        if items.is_empty() {
            continue;
        }
        out.push_str(&format!("//   {heading}:\n"));
        for item in items {
            match item.desc.as_deref().filter(|d| !d.is_empty()) {
                Some(desc) => out.push_str(&format!("//     - {} {desc}\n", item.name)),
                None => out.push_str(&format!("//     - {}\n", item.name)),
            }
        }
    }
    if let Some(attrs) = spec.attributes_raw.as_deref().filter(|s| !s.is_empty()) {
        out.push_str(&format!("//   attributes: {attrs}\n"));
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use motif_ontology::IoDescriptor;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_apply_to_missing_fields() {
        let ctx = SnippetContext::from_row(&row(&[]));
        assert_eq!(ctx.label_title, "Unknown");
        assert_eq!(ctx.signature, "?→?");
        assert_eq!(ctx.category, "Uncategorized");
        assert_eq!(ctx.file_name(), "unknown.fuse");
    }

    #[test]
    fn file_name_replaces_spaces_and_slashes() {
        let ctx = SnippetContext::from_row(&row(&[("label", "Conv / Residual Add")]));
        assert_eq!(ctx.file_name(), "conv___residual_add.fuse");
    }

    #[test]
    fn fallback_layout() {
        let mut ctx = SnippetContext::from_row(&row(&[
            ("label", "Add"),
            ("signature", "2→1"),
            ("categoryLabel", "Arithmetic"),
            ("motif_uri", "https://ns.onnx.cloud/motif#Add"),
            ("definition", "  Sum.\n\n  Elementwise.  "),
        ]));
        ctx.operator_spec = Some(OperatorSpec {
            label: Some("Add".into()),
            domain: Some("ai.onnx".into()),
            inputs: vec![IoDescriptor {
                name: "A".into(),
                desc: Some("(required)".into()),
                ..IoDescriptor::default()
            }],
            ..OperatorSpec::default()
        });
        let text = create_snippet_content(&ctx);
        let expected_head = "// Motif: Add\n// Category: Arithmetic\n// Signature: 2→1\n  // URI: https://ns.onnx.cloud/motif#Add\n// Definition:\n// Sum.\n// Elementwise.\n\n// Operator spec (onnx):\n//   label: Add\n//   domain: ai.onnx\n//   inputs:\n//     - A (required)\n\n// Description:\n";
        assert!(text.starts_with(expected_head), "{text}");
        assert!(text.contains("\nfuse add {\n"));
        assert!(text.ends_with("// fuse_graph = add(x)\n"));
    }
}
