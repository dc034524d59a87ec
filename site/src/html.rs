//! HTML helpers shared by the generators.

use pulldown_cmark::{html, Options, Parser};

/// Escapes text for use in HTML content and double-quoted attributes.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Converts Markdown to HTML using pulldown-cmark.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, opts);
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

/// Script tags loading Vega, Vega-Lite and vega-embed from the CDN.
pub const VEGA_SCRIPTS: &str = "<script src=\"https://cdn.jsdelivr.net/npm/vega@5\"></script>\n\
<script src=\"https://cdn.jsdelivr.net/npm/vega-lite@5\"></script>\n\
<script src=\"https://cdn.jsdelivr.net/npm/vega-embed@6\"></script>";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn renders_tables() {
        let html = markdown_to_html("| a |\n|---|\n| 1 |\n");
        assert!(html.contains("<table>"));
    }
}
