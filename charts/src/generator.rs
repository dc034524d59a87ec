//! SPARQL-driven Vega-Lite chart generation.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use motif_ontology::{Error, RdfManager, Result};
use motif_site::{escape_html, html::VEGA_SCRIPTS, is_inline_sparql, writer, Renderer};
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::{self, ChartConfig, QuerySource};
use crate::transform::{self, DataRow};

/// Vega-Lite schema URL stamped into every spec.
pub const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

/// A query source after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedQuery {
    /// SPARQL text used as given.
    Inline(String),
    /// An existing query file.
    File(PathBuf),
}

/// Everything produced for one chart config.
#[derive(Debug, Clone)]
pub struct ChartResult {
    /// Chart title.
    pub title: String,
    /// The config the chart came from.
    pub config: ChartConfig,
    /// Rows as returned by the query.
    pub query_data: Vec<DataRow>,
    /// Rows after transforms.
    pub transformed_data: Vec<DataRow>,
    /// The Vega-Lite spec.
    pub vega_spec: Value,
}

/// A row of a chart index page.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexEntry {
    /// Chart title.
    pub title: String,
    /// Chart description.
    pub desc: String,
    /// Source YAML file name.
    pub yaml: String,
    /// Vega-Lite spec link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<String>,
    /// Chart page link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// PNG link, when PNG output was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub png: Option<String>,
    /// Standalone spec name next to the YAML.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vljson: Option<String>,
}

/// Output of [`ChartGenerator::run`].
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Chart results in config order.
    pub charts: Vec<ChartResult>,
    /// Entries for the spec-level index.
    pub spec_entries: Vec<IndexEntry>,
    /// Entries for the output index.
    pub output_entries: Vec<IndexEntry>,
    /// Configs that failed, with the error text.
    pub failed: Vec<(PathBuf, String)>,
}

impl RunSummary {
    /// Number of configs that failed.
    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }
}

/// Turns chart configs into Vega-Lite artifacts.
pub struct ChartGenerator<'a> {
    rdf: &'a RdfManager,
    sparql_dir: PathBuf,
    renderer: Renderer,
}

impl<'a> ChartGenerator<'a> {
    /// Creates a generator over a loaded graph.
    pub fn new(rdf: &'a RdfManager, sparql_dir: impl Into<PathBuf>, renderer: Renderer) -> Self {
        Self {
            rdf,
            sparql_dir: sparql_dir.into(),
            renderer,
        }
    }

    /// Directory file-name queries resolve against.
    pub fn sparql_dir(&self) -> &Path {
        &self.sparql_dir
    }

    /// Resolves a query source without executing it.
    ///
    /// Inline SPARQL never touches the filesystem. Text starting with `.` or
    /// `/` must name an existing file. Anything else must exist inside the
    /// query directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the referenced file does not exist,
    /// and [`Error::Config`] when a query-directory name resolves outside it.
    pub fn resolve_query(&self, source: &QuerySource) -> Result<ResolvedQuery> {
        let name = match source {
            QuerySource::Text(text) if is_inline_sparql(text) => {
                return Ok(ResolvedQuery::Inline(text.clone()))
            }
            QuerySource::Text(text) if text.trim_start().starts_with(['.', '/']) => {
                let path = PathBuf::from(text.trim());
                return if path.is_file() {
                    Ok(ResolvedQuery::File(path))
                } else {
                    Err(not_found(&path))
                };
            }
            QuerySource::Text(text) => text.trim(),
            QuerySource::File { file } => file.as_str(),
        };
        let candidate = self.sparql_dir.join(name);
        if !candidate.is_file() {
            return Err(not_found(&candidate));
        }
        let inside = match (candidate.canonicalize(), self.sparql_dir.canonicalize()) {
            (Ok(file), Ok(dir)) => file.starts_with(dir),
            _ => false,
        };
        if !inside {
            return Err(Error::Config(format!(
                "query {name} resolves outside {}",
                self.sparql_dir.display()
            )));
        }
        Ok(ResolvedQuery::File(candidate))
    }

    /// Resolves and executes a query source, returning typed rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for missing query files and
    /// [`Error::Query`] when execution fails.
    pub fn execute(&self, source: &QuerySource) -> Result<Vec<DataRow>> {
        let result = match self.resolve_query(source)? {
            ResolvedQuery::Inline(text) => {
                tracing::debug!("Using inline SPARQL query");
                self.rdf.execute_query(&text)?
            }
            ResolvedQuery::File(path) => self.rdf.execute_query_file(&path)?,
        };
        let rows = result.to_json_rows();
        tracing::info!("Query returned {} rows", rows.len());
        Ok(rows)
    }

    /// Builds the Vega-Lite spec: schema, title, description and data, with
    /// the config's `vega` keys merged on top.
    pub fn generate_vega_spec(&self, config: &ChartConfig, data: &[DataRow]) -> Value {
        let mut spec = serde_json::Map::new();
        spec.insert("$schema".into(), Value::from(VEGA_LITE_SCHEMA));
        let title = if config.title.is_empty() { "Untitled" } else { &config.title };
        spec.insert("title".into(), Value::from(title));
        spec.insert("description".into(), Value::from(config.description.as_str()));
        spec.insert("data".into(), json!({ "values": data }));
        for (key, value) in &config.vega {
            spec.insert(key.clone(), value.clone());
        }
        Value::Object(spec)
    }

    /// Executes, transforms and wraps one config.
    ///
    /// # Errors
    ///
    /// Propagates query resolution and execution errors.
    pub fn process_config(&self, config: &ChartConfig) -> Result<ChartResult> {
        let query_data = self.execute(&config.query)?;
        let transformed_data = transform::apply(&query_data, config.transform.as_ref());
        let vega_spec = self.generate_vega_spec(config, &transformed_data);
        Ok(ChartResult {
            title: config.title.clone(),
            config: config.clone(),
            query_data,
            transformed_data,
            vega_spec,
        })
    }

    /// Writes the requested formats (`json`, `html`, `data`, `png`) and
    /// returns the files written. PNG failures only warn.
    ///
    /// # Errors
    ///
    /// Returns an error if a JSON, HTML or data file cannot be written or
    /// the HTML cannot be rendered.
    pub fn write_output(&self, result: &ChartResult, output_dir: &Path, formats: &[String]) -> Result<Vec<PathBuf>> {
        let default_formats = ["json".to_string(), "html".to_string()];
        let formats = if formats.is_empty() { &default_formats[..] } else { formats };
        let wants = |f: &str| formats.iter().any(|x| x == f);
        let base = config::base_name(&result.title);
        let mut written = Vec::new();

        if wants("json") {
            let path = output_dir.join(format!("{base}.json"));
            writer::write_json(&path, &result.vega_spec)?;
            tracing::info!("Written {}", path.display());
            written.push(path);
        }
        if wants("html") {
            let path = output_dir.join(format!("{base}.html"));
            writer::write(&path, self.render_html(&result.vega_spec, &result.title)?)?;
            tracing::info!("Written {}", path.display());
            written.push(path);
        }
        if wants("data") {
            let path = output_dir.join(format!("{base}.data.json"));
            writer::write_json(&path, &result.transformed_data)?;
            tracing::info!("Written {}", path.display());
            written.push(path);
        }
        if wants("png") {
            let path = output_dir.join(format!("{base}.png"));
            match export_png(&result.vega_spec, &path) {
                Ok(()) => {
                    tracing::info!("Written {}", path.display());
                    written.push(path);
                }
                Err(e) => tracing::warn!("PNG generation failed: {e}"),
            }
        }
        Ok(written)
    }

    /// Renders the chart page inside the charts layout. A missing chart page
    /// template falls back to a plain `<pre>` dump of the spec.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Render`] if a template fails, or the layout is missing.
    pub fn render_html(&self, spec: &Value, title: &str) -> Result<String> {
        let spec_json = serde_json::to_string(spec)
            .map_err(|e| Error::Render(format!("cannot serialize spec: {e}")))?
            .replace("</", "<\\/");
        let content = match self
            .renderer
            .render("chart_page.html", json!({ "title": title, "spec_json": spec_json }))
        {
            Ok(html) => html,
            Err(e) if e.is_not_found() => format!(
                "<div><h1>{}</h1><pre>{}</pre></div>",
                escape_html(title),
                escape_html(&spec_json)
            ),
            Err(e) => return Err(e),
        };
        self.renderer.render(
            "charts_layout.html",
            json!({
                "title": title,
                "content": content,
                "head_extra": VEGA_SCRIPTS,
                "nav": "",
                "nav_footer": "",
            }),
        )
    }

    /// Writes an index page listing charts.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or writing fails.
    pub fn write_index(&self, path: &Path, title: &str, subtitle: &str, charts: &[IndexEntry]) -> Result<()> {
        let html = self.renderer.render(
            "charts_index.html",
            json!({ "title": title, "subtitle": subtitle, "charts": charts }),
        )?;
        writer::write(path, html)?;
        tracing::info!("Written {}", path.display());
        Ok(())
    }

    /// Processes every config, writes outputs, then the spec-level index into
    /// `spec_index_dir` and the output index into `output_dir`. A config that
    /// fails is logged, recorded in [`RunSummary::failed`] and left out of
    /// the indexes. Index failures only warn.
    pub fn run(
        &self,
        configs: &[PathBuf],
        output_dir: &Path,
        formats: &[String],
        spec_index_dir: &Path,
    ) -> RunSummary {
        tracing::info!("Processing {} config(s)", configs.len());
        let out_name = output_dir
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
        let mut summary = RunSummary::default();

        for path in configs {
            let (config, result) = match self.run_config(path, output_dir, formats) {
                Ok(done) => done,
                Err(e) => {
                    tracing::error!("Chart {} failed: {e}", path.display());
                    summary.failed.push((path.clone(), e.to_string()));
                    continue;
                }
            };

            let yaml = path
                .file_name()
                .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
            let stem = path
                .file_stem()
                .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
            let title = if result.title.is_empty() { stem.clone() } else { result.title.clone() };
            let base = config::base_name(&title);

            summary.spec_entries.push(IndexEntry {
                title: title.clone(),
                desc: config.description.clone(),
                yaml: yaml.clone(),
                json: Some(format!("../{out_name}/{base}.json")),
                html: Some(format!("../{out_name}/{base}.html")),
                png: None,
                vljson: Some(format!("{stem}.vl.json")),
            });
            summary.output_entries.push(IndexEntry {
                title,
                desc: config.description.clone(),
                yaml,
                json: Some(format!("{base}.json")),
                html: Some(format!("{base}.html")),
                png: formats.iter().any(|f| f == "png").then(|| format!("{base}.png")),
                vljson: None,
            });
            summary.charts.push(result);
        }

        if let Err(e) = self.write_index(
            &spec_index_dir.join("index.html"),
            "Charts (specs)",
            "Spec-level index of charts",
            &summary.spec_entries,
        ) {
            tracing::warn!("Failed to write {}/index.html: {e}", spec_index_dir.display());
        }
        if let Err(e) = self.write_index(
            &output_dir.join("index.html"),
            "Generated Figures",
            "Generated output artifacts",
            &summary.output_entries,
        ) {
            tracing::warn!("Failed to write {}/index.html: {e}", output_dir.display());
        }
        if summary.failed.is_empty() {
            tracing::info!("All figures written to {}", output_dir.display());
        } else {
            tracing::warn!(
                "{} of {} chart(s) failed; the rest were written to {}",
                summary.failed.len(),
                configs.len(),
                output_dir.display()
            );
        }
        summary
    }

    fn run_config(&self, path: &Path, output_dir: &Path, formats: &[String]) -> Result<(ChartConfig, ChartResult)> {
        let config = ChartConfig::load(path)?;
        let result = self.process_config(&config)?;
        self.write_output(&result, output_dir, formats)?;
        Ok((config, result))
    }
}

fn not_found(path: &Path) -> Error {
    Error::NotFound(format!("SPARQL file not found: {}", path.display()))
}

/// Renders a spec to PNG with the external `vl-convert` tool.
fn export_png(spec: &Value, png: &Path) -> Result<()> {
    let input = png.with_extension("png.vl.json");
    writer::write_json(&input, spec)?;
    let status = Command::new("vl-convert")
        .arg("vl2png")
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(png)
        .arg("--scale")
        .arg("2")
        .status();
    if let Err(e) = fs::remove_file(&input) {
        tracing::warn!("Failed to remove {}: {e}", input.display());
    }
    match status {
        Ok(s) if s.success() => Ok(()),
        Ok(s) => Err(Error::Render(format!("vl-convert exited with {s}"))),
        Err(e) => Err(Error::Render(format!("vl-convert not available: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motif_site::RendererOptions;

    fn fixtures() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures")
    }

    fn rdf() -> RdfManager {
        RdfManager::new(fixtures().join("ttl")).unwrap()
    }

    fn generator(rdf: &RdfManager, sparql_dir: PathBuf) -> ChartGenerator<'_> {
        ChartGenerator::new(rdf, sparql_dir, Renderer::new(RendererOptions::builtin()))
    }

    #[test]
    fn inline_select_never_touches_the_filesystem() {
        let rdf = rdf();
        let gen = generator(&rdf, PathBuf::from("/definitely/not/here"));
        let source = QuerySource::Text(
            "SELECT ?m WHERE { ?m a <https://ns.onnx.cloud/motif#Motif> }".into(),
        );
        assert!(matches!(gen.resolve_query(&source).unwrap(), ResolvedQuery::Inline(_)));
        assert_eq!(gen.execute(&source).unwrap().len(), 5);
    }

    #[test]
    fn file_references_must_exist() {
        let rdf = rdf();
        let gen = generator(&rdf, fixtures().join("sparql"));
        let missing = QuerySource::Text("./no/such.sparql".into());
        assert!(gen.resolve_query(&missing).unwrap_err().is_not_found());
        let missing = QuerySource::Text("charts/nope.sparql".into());
        assert!(gen.resolve_query(&missing).unwrap_err().is_not_found());
        let found = QuerySource::File {
            file: "charts/motifs_by_category.sparql".into(),
        };
        assert_eq!(
            gen.resolve_query(&found).unwrap(),
            ResolvedQuery::File(fixtures().join("sparql/charts/motifs_by_category.sparql"))
        );
    }

    #[test]
    fn query_names_cannot_leave_the_query_directory() {
        let rdf = rdf();
        let tmp = tempfile::tempdir().unwrap();
        let sparql = tmp.path().join("sparql");
        fs::create_dir_all(sparql.join("sub")).unwrap();
        fs::write(tmp.path().join("outside.sparql"), "SELECT * WHERE { ?s ?p ?o }").unwrap();
        fs::write(sparql.join("inside.sparql"), "SELECT * WHERE { ?s ?p ?o }").unwrap();
        let gen = generator(&rdf, sparql.clone());

        let escaping = QuerySource::File {
            file: "sub/../../outside.sparql".into(),
        };
        assert!(matches!(gen.resolve_query(&escaping).unwrap_err(), Error::Config(_)));
        let escaping = QuerySource::Text("sub/../../outside.sparql".into());
        assert!(matches!(gen.resolve_query(&escaping).unwrap_err(), Error::Config(_)));

        let nested = QuerySource::Text("sub/../inside.sparql".into());
        assert!(matches!(gen.resolve_query(&nested).unwrap(), ResolvedQuery::File(_)));
    }

    #[test]
    fn spec_merges_vega_over_base() {
        let rdf = rdf();
        let gen = generator(&rdf, fixtures().join("sparql"));
        let config = ChartConfig::load(&fixtures().join("charts/motifs_by_category.yaml")).unwrap();
        let result = gen.process_config(&config).unwrap();
        let spec = &result.vega_spec;
        assert_eq!(spec["$schema"], VEGA_LITE_SCHEMA);
        assert_eq!(spec["title"], "Motifs by Category");
        assert_eq!(spec["mark"], "bar");
        let values = spec["data"]["values"].as_array().unwrap();
        assert_eq!(values.len(), 3);
        let activation = values.iter().find(|v| v["category"] == "Activation").unwrap();
        assert_eq!(activation["count"], 3);
        assert_eq!(activation["caption"], "Activation (3)");
        assert!(activation.get("categoryLabel").is_none());
    }

    #[test]
    fn run_writes_outputs_and_indexes() {
        let rdf = rdf();
        let gen = generator(&rdf, fixtures().join("sparql"));
        let tmp = tempfile::tempdir().unwrap();
        let charts_dir = tmp.path().join("charts");
        fs::create_dir_all(&charts_dir).unwrap();
        for name in ["motifs_by_category.yaml", "motif_signatures.yaml"] {
            fs::copy(fixtures().join("charts").join(name), charts_dir.join(name)).unwrap();
        }
        let out = tmp.path().join("figures");
        let formats = vec!["json".to_string(), "html".to_string(), "data".to_string()];

        let configs = config::discover_configs(&charts_dir);
        let summary = gen.run(&configs, &out, &formats, &charts_dir);
        assert_eq!(summary.failure_count(), 0);
        assert_eq!(summary.charts.len(), 2);
        assert_eq!(summary.spec_entries[1].json.as_deref(), Some("../figures/motifs_by_category.json"));
        assert_eq!(summary.spec_entries[1].vljson.as_deref(), Some("motifs_by_category.vl.json"));
        assert!(summary.output_entries[0].png.is_none());

        let html = fs::read_to_string(out.join("motifs_by_category.html")).unwrap();
        assert!(html.contains("vegaEmbed"));
        assert!(html.contains("vega-lite@5"));
        assert!(out.join("motif_signatures.data.json").is_file());
        let index = fs::read_to_string(out.join("index.html")).unwrap();
        assert!(index.contains("Generated Figures"));
        assert!(fs::read_to_string(charts_dir.join("index.html"))
            .unwrap()
            .contains("Charts (specs)"));
    }

    #[test]
    fn failing_config_is_recorded_and_the_rest_are_indexed() {
        let rdf = rdf();
        let gen = generator(&rdf, fixtures().join("sparql"));
        let tmp = tempfile::tempdir().unwrap();
        let charts_dir = tmp.path().join("charts");
        fs::create_dir_all(&charts_dir).unwrap();
        fs::copy(
            fixtures().join("charts/motifs_by_category.yaml"),
            charts_dir.join("b_good.yaml"),
        )
        .unwrap();
        fs::write(
            charts_dir.join("a_broken.yaml"),
            "title: Broken\nquery: {file: no_such.sparql}\nvega: {mark: bar}\n",
        )
        .unwrap();
        let out = tmp.path().join("figures");

        let configs = config::discover_configs(&charts_dir);
        let summary = gen.run(&configs, &out, &[], &charts_dir);
        assert_eq!(summary.failure_count(), 1);
        assert!(summary.failed[0].0.ends_with("a_broken.yaml"));
        assert_eq!(summary.charts.len(), 1);
        assert_eq!(summary.output_entries.len(), 1);
        assert!(out.join("motifs_by_category.json").is_file());

        let index = fs::read_to_string(out.join("index.html")).unwrap();
        assert!(index.contains("Motifs by Category"));
        assert!(!index.contains("Broken"));
    }

    #[test]
    fn missing_chart_page_falls_back_to_pre() {
        let rdf = rdf();
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("charts_layout.html"), "<main>{{ content|safe }}</main>").unwrap();
        let renderer = Renderer::new(RendererOptions {
            template_dir: Some(dir.path().to_path_buf()),
            builtin: false,
        });
        let gen = ChartGenerator::new(&rdf, fixtures().join("sparql"), renderer);
        let html = gen.render_html(&json!({"mark": "bar"}), "A & B").unwrap();
        assert!(html.starts_with("<main><div><h1>A &amp; B</h1><pre>"));
        assert!(html.contains("&quot;mark&quot;"));
    }
}
