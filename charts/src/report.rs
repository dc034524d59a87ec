//! HTML reports embedding generated Vega-Lite figures.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use motif_ontology::{Error, Result};
use motif_site::{escape_html, writer, ReportSection, ReportingConfig};
use walkdir::WalkDir;

const REPORT_CSS: &str = r#"
body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
    max-width: 1200px;
    margin: 0 auto;
    padding: 20px;
    line-height: 1.6;
    color: #333;
}
h1 { color: #222; border-bottom: 3px solid #0066cc; padding-bottom: 10px; }
h2 { color: #0066cc; margin-top: 30px; }
section { margin-bottom: 40px; padding: 20px; background: #f9f9f9; border-radius: 8px; }
.toc { background: #eef5ff; padding: 15px 20px; border-left: 4px solid #0066cc; }
.toc ul { list-style: none; padding-left: 0; }
.toc a { color: #0066cc; text-decoration: none; }
.toc a:hover { text-decoration: underline; }
.figure { background: white; padding: 15px; margin: 15px 0; border-radius: 4px; }
p { color: #555; }
"#;

/// Assembles figures into a single HTML report.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    figures_dir: PathBuf,
    output_dir: PathBuf,
}

impl ReportGenerator {
    /// Creates a generator reading figures from `figures_dir` and writing
    /// reports into `output_dir`.
    pub fn new(figures_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            figures_dir: figures_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Every `*.json` file in the figures directory, keyed by file stem.
    /// `.data.json` files are data dumps, not specs, and are left out.
    pub fn discover_figures(&self) -> BTreeMap<String, PathBuf> {
        let figures: BTreeMap<String, PathBuf> = WalkDir::new(&self.figures_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|p| {
                let stem = p.file_stem()?.to_string_lossy().into_owned();
                (!stem.ends_with(".data")).then_some((stem, p))
            })
            .collect();
        tracing::info!("Discovered {} figures", figures.len());
        figures
    }

    /// Builds the report HTML: table of contents, then one section per
    /// entry with its figures embedded. Unknown figure names are skipped
    /// with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if a discovered figure cannot be read or is not JSON.
    pub fn generate_html_report(&self, title: &str, sections: &[ReportSection]) -> Result<String> {
        let figures = self.discover_figures();
        let title = escape_html(title);
        let mut parts: Vec<String> = vec![
            "<!DOCTYPE html>".into(),
            "<html>".into(),
            "<head>".into(),
            format!("<title>{title}</title>"),
            "<meta charset='utf-8'>".into(),
            "<style>".into(),
            REPORT_CSS.into(),
            "</style>".into(),
            "<script src='https://cdn.jsdelivr.net/npm/vega@5'></script>".into(),
            "<script src='https://cdn.jsdelivr.net/npm/vega-lite@5'></script>".into(),
            "<script src='https://cdn.jsdelivr.net/npm/vega-embed@6'></script>".into(),
            "</head>".into(),
            "<body>".into(),
            format!("<h1>{title}</h1>"),
            "<div class='toc'>".into(),
            "<h2>Contents</h2>".into(),
            "<ul>".into(),
        ];

        for (i, section) in sections.iter().enumerate() {
            parts.push(format!(
                "<li><a href='#section-{}'>{}</a></li>",
                i + 1,
                escape_html(&section.title)
            ));
        }
        parts.push("</ul>".into());
        parts.push("</div>".into());

        for (i, section) in sections.iter().enumerate() {
            parts.push(format!("<section id='section-{}'>", i + 1));
            parts.push(format!("<h2>{}</h2>", escape_html(&section.title)));
            parts.push(format!("<p>{}</p>", escape_html(&section.description)));
            for name in &section.figures {
                let Some(path) = figures.get(name) else {
                    tracing::warn!("Figure {name} not found in {}; skipping", self.figures_dir.display());
                    continue;
                };
                let spec_json = read_spec(path)?;
                let fig_id = format!("vis-{name}");
                parts.push(format!("<div id='{fig_id}' class='figure'></div>"));
                parts.push(format!("<script>vegaEmbed('#{fig_id}', {spec_json});</script>"));
            }
            parts.push("</section>".into());
        }

        parts.push("</body>".into());
        parts.push("</html>".into());
        Ok(parts.join("\n"))
    }

    /// Generates the configured report and writes it to
    /// `<output_dir>/<report_filename>`.
    ///
    /// # Errors
    ///
    /// Returns an error if generation or the write fails.
    pub fn write_report(&self, reporting: &ReportingConfig) -> Result<PathBuf> {
        let html = self.generate_html_report(&reporting.title, &reporting.sections)?;
        let path = self.output_dir.join(&reporting.report_filename);
        writer::write(&path, html)?;
        tracing::info!("Report written to {}", path.display());
        Ok(path)
    }
}

/// Reads a spec and re-serializes it compactly for a `<script>` block.
fn read_spec(path: &Path) -> Result<String> {
    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let spec: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| Error::parse(path.display().to_string(), e))?;
    let compact = serde_json::to_string(&spec)
        .map_err(|e| Error::Render(format!("cannot serialize {}: {e}", path.display())))?;
    Ok(compact.replace("</", "<\\/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(title: &str, figures: &[&str]) -> ReportSection {
        ReportSection {
            title: title.into(),
            description: format!("About {title}"),
            figures: figures.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn report_embeds_known_figures_and_skips_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let figures = tmp.path().join("figures");
        fs::create_dir_all(&figures).unwrap();
        fs::write(figures.join("bars.json"), r#"{"mark": "bar"}"#).unwrap();
        fs::write(figures.join("bars.data.json"), "[]").unwrap();

        let gen = ReportGenerator::new(&figures, tmp.path());
        assert_eq!(gen.discover_figures().len(), 1);

        let html = gen
            .generate_html_report("R & D", &[section("One", &["bars", "ghost"]), section("Two", &[])])
            .unwrap();
        assert!(html.contains("<title>R &amp; D</title>"));
        assert!(html.contains("<li><a href='#section-1'>One</a></li>"));
        assert!(html.contains("<section id='section-2'>"));
        assert!(html.contains("<div id='vis-bars' class='figure'></div>"));
        assert!(html.contains(r#"vegaEmbed('#vis-bars', {"mark":"bar"});"#));
        assert!(!html.contains("vis-ghost"));
    }

    #[test]
    fn script_close_tags_in_figures_are_escaped() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("tricky.json"),
            r#"{"title": "</script><b>x</b>"}"#,
        )
        .unwrap();
        let gen = ReportGenerator::new(tmp.path(), tmp.path());
        let html = gen.generate_html_report("R", &[section("S", &["tricky"])]).unwrap();
        assert!(html.contains(r#"{"title":"<\/script><b>x<\/b>"}"#));
        assert_eq!(html.matches("</script>").count(), 4);
    }

    #[test]
    fn write_report_uses_configured_filename() {
        let tmp = tempfile::tempdir().unwrap();
        let gen = ReportGenerator::new(tmp.path().join("none"), tmp.path());
        let path = gen.write_report(&ReportingConfig::default()).unwrap();
        assert_eq!(path, tmp.path().join("motif_analysis_report.html"));
        assert!(fs::read_to_string(path).unwrap().contains("Motif Ontology Analysis"));
    }
}
