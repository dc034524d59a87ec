//! Page hydration and rendering.
//!
//! Each page section pulls data from the graph, either by aggregating the
//! objects of a predicate or by running a query, and files it under the
//! context key its declared shape names. Pages with a `detail` block get one
//! page per item, and type indexes get an index page plus one page per
//! member. Every written page adds a search index entry.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use motif_ontology::{vocab, Error, RdfManager, Result, Row};
use motif_site::{escape_html, generated_at, is_inline_sparql, slugify, writer, Renderer, SearchIndex};
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::config::{ContextShape, DetailSpec, PageSpec, SectionSpec, TypeSpec, WikiConfig, SECTIONS};

/// Search index file name inside the output directory.
pub const SEARCH_INDEX_FILE: &str = "search_index.json";

/// One object of an aggregated predicate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate {
    /// Object IRI, empty for literal objects.
    pub uri: String,
    /// Object label, else its display form.
    pub label: String,
    /// Number of subjects pointing at the object.
    pub count: u64,
    /// Anchor slug of the label.
    pub slug: String,
}

/// A query row normalized for list templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Item {
    /// Display title.
    pub title: String,
    /// Description text.
    pub description: String,
    /// Link target; the resource IRI until a detail page replaces it.
    pub url: String,
    /// Secondary text such as a signature.
    pub meta: String,
    /// Category label.
    pub category: String,
    /// Free notes.
    pub notes: String,
}

impl Item {
    /// Normalizes a row, taking the first present field for each slot.
    pub fn from_row(row: &Row) -> Self {
        let pick = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| row.get(*k).filter(|v| !v.is_empty()))
                .cloned()
                .unwrap_or_default()
        };
        let url = resource_uri(row).unwrap_or("#").to_string();
        Self {
            title: pick(&["label", "title", "name"]),
            description: pick(&["definition", "comment", "description"]),
            url,
            meta: pick(&["signature", "meta"]),
            category: pick(&["categoryLabel", "category"]),
            notes: pick(&["notes"]),
        }
    }

    fn links_to_resource(&self) -> bool {
        self.url.starts_with("http://") || self.url.starts_with("https://")
    }
}

/// Columns naming the row's own resource, in lookup order.
pub const URI_KEYS: &[&str] = &["item_uri", "motif_uri", "model_uri", "uri", "s_uri"];

/// The first non-empty [`URI_KEYS`] column of a row.
pub fn resource_uri(row: &Row) -> Option<&str> {
    URI_KEYS
        .iter()
        .find_map(|k| row.get(*k).filter(|v| !v.is_empty()))
        .map(String::as_str)
}

/// Data gathered for one page, keyed by context name.
#[derive(Debug, Clone, Default)]
pub struct PageData {
    /// `{label, count, slug, uri}` records.
    pub categories: Vec<Value>,
    /// Plain strings.
    pub fingerprints: Vec<String>,
    /// Normalized items.
    pub items: Vec<Item>,
    /// Runtime rows.
    pub runtimes: Vec<Value>,
    /// Raw rows.
    pub rows: Vec<Value>,
}

/// What a run wrote.
#[derive(Debug, Clone, Default)]
pub struct WikiSummary {
    /// Top-level pages, in config order.
    pub pages: Vec<PathBuf>,
    /// Per-item detail pages.
    pub detail_pages: usize,
    /// Type index and member pages.
    pub type_pages: usize,
    /// The search index file.
    pub search_index: Option<PathBuf>,
}

/// Renders a wiki configuration into static HTML.
pub struct WikiGenerator<'a> {
    rdf: &'a RdfManager,
    config: WikiConfig,
    base_dir: PathBuf,
    output_dir: PathBuf,
    renderer: Renderer,
    search: SearchIndex,
    where_clause: Regex,
}

impl<'a> WikiGenerator<'a> {
    /// Creates a generator. `base_dir` anchors relative query references.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the `WHERE` pattern fails to compile.
    pub fn new(
        rdf: &'a RdfManager,
        config: WikiConfig,
        base_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        renderer: Renderer,
    ) -> Result<Self> {
        let where_clause =
            Regex::new(r"(?i)WHERE\s*\{").map_err(|e| Error::Config(format!("bad WHERE pattern: {e}")))?;
        Ok(Self {
            rdf,
            config,
            base_dir: base_dir.into(),
            output_dir: output_dir.into(),
            renderer,
            search: SearchIndex::new(),
            where_clause,
        })
    }

    /// Search entries collected so far.
    pub fn search_index(&self) -> &SearchIndex {
        &self.search
    }

    /// Writes type indexes, then pages, then the search index. A failing
    /// page or type is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the search index cannot be written.
    pub fn generate_all(&mut self) -> Result<WikiSummary> {
        let mut summary = WikiSummary::default();

        let types = self.config.types.clone();
        for spec in &types {
            match self.generate_type(spec) {
                Ok(written) => summary.type_pages += written,
                Err(e) => tracing::error!("Type {} failed: {e}", spec.id),
            }
        }

        let pages = self.config.pages.clone();
        for (name, page) in &pages {
            match self.generate_page(name, page) {
                Ok((path, details)) => {
                    summary.pages.push(path);
                    summary.detail_pages += details;
                }
                Err(e) => tracing::error!("Page {name} failed: {e}"),
            }
        }

        summary.search_index = Some(self.save_index()?);
        Ok(summary)
    }

    /// Hydrates and writes one page with its detail pages. Returns the page
    /// path and the number of detail pages written.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be written.
    pub fn generate_page(&mut self, name: &str, page: &PageSpec) -> Result<(PathBuf, usize)> {
        let mut data = self.hydrate(page);
        let details = match &page.detail {
            Some(detail) => self.generate_details(detail, &mut data.items),
            None => 0,
        };

        let html = match self.render_page(name, page, &data) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("Failed to render page {name}: {e}");
                error_page(name, &e)
            }
        };
        let file = format!("{name}.html");
        let path = self.output_dir.join(&file);
        writer::write(&path, html)?;
        tracing::info!("Wrote {}", path.display());

        let title = page.title.clone().unwrap_or_else(|| name.to_string());
        let text = page.description.clone().unwrap_or_default();
        self.search.push(title, text, name, file);
        Ok((path, details))
    }

    /// Fills the page data from its sections. Failing sections are logged and
    /// contribute nothing.
    pub fn hydrate(&self, page: &PageSpec) -> PageData {
        let mut data = PageData::default();
        for name in SECTIONS {
            let Some(section) = page.section(name) else {
                continue;
            };
            if let Err(e) = self.hydrate_section(section, &mut data) {
                tracing::error!("Section {name} failed: {e}");
            }
        }
        data
    }

    fn hydrate_section(&self, section: &SectionSpec, data: &mut PageData) -> Result<()> {
        if let Some(predicate) = &section.predicate {
            let aggregates = self.find_by_predicate(predicate)?;
            match section.predicate_shape() {
                ContextShape::Categories => {
                    data.categories.extend(aggregates.iter().map(aggregate_value));
                }
                ContextShape::Fingerprints => {
                    data.fingerprints.extend(aggregates.into_iter().map(|a| a.label));
                }
                ContextShape::Items => data.items.extend(aggregates.into_iter().map(|a| Item {
                    url: if a.uri.is_empty() { "#".to_string() } else { a.uri },
                    meta: a.count.to_string(),
                    title: a.label,
                    ..Item::default()
                })),
                ContextShape::Runtimes => data.runtimes.extend(aggregates.iter().map(aggregate_value)),
                ContextShape::Raw => data.rows.extend(aggregates.iter().map(aggregate_value)),
            }
        }

        if let Some(query) = &section.query {
            let rows = self.find_by_sparql(query)?;
            match section.query_shape() {
                ContextShape::Items => data.items.extend(rows.iter().map(Item::from_row)),
                ContextShape::Fingerprints => data.fingerprints.extend(rows.iter().filter_map(|row| {
                    ["label", "f", "value"]
                        .iter()
                        .find_map(|k| row.get(*k).filter(|v| !v.is_empty()))
                        .cloned()
                })),
                ContextShape::Categories => data.categories.extend(rows.iter().map(|row| {
                    let label = row
                        .get("label")
                        .or_else(|| row.get("o"))
                        .cloned()
                        .unwrap_or_default();
                    json!({
                        "label": label,
                        "count": row.get("count").and_then(|c| c.parse::<u64>().ok()).unwrap_or(0),
                        "slug": slugify(&label),
                        "uri": row.get("o_uri").or_else(|| row.get("item_uri")).cloned().unwrap_or_default(),
                    })
                })),
                ContextShape::Runtimes => data.runtimes.extend(rows.iter().map(row_value)),
                ContextShape::Raw => data.rows.extend(rows.iter().map(row_value)),
            }
        }
        Ok(())
    }

    /// Objects of `predicate` with their labels and subject counts, ordered
    /// by label.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] if the aggregation query fails.
    pub fn find_by_predicate(&self, predicate: &str) -> Result<Vec<Aggregate>> {
        let query = format!(
            "SELECT ?o ?label (COUNT(?s) AS ?count) WHERE {{ ?s {} ?o . OPTIONAL {{ ?o <{}> ?label }} }} GROUP BY ?o ?label ORDER BY ?label ?o",
            vocab::sparql_term(predicate),
            vocab::RDFS_LABEL
        );
        let result = self.rdf.execute_query(&query)?;
        Ok(result
            .solutions
            .iter()
            .filter_map(|solution| {
                let object = solution.get("o")?;
                let label = solution
                    .get("label")
                    .map(|l| l.lexical().to_string())
                    .unwrap_or_else(|| object.display());
                Some(Aggregate {
                    uri: object.as_iri().unwrap_or_default().to_string(),
                    count: solution
                        .get("count")
                        .and_then(|c| c.lexical().parse().ok())
                        .unwrap_or(0),
                    slug: slugify(&label),
                    label,
                })
            })
            .collect())
    }

    /// Runs inline SPARQL or a query file reference.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for a reference that resolves nowhere and
    /// [`Error::Query`] if execution fails.
    pub fn find_by_sparql(&self, query: &str) -> Result<Vec<Row>> {
        let text = self.query_text(query)?;
        self.rdf.select(&text)
    }

    fn query_text(&self, query: &str) -> Result<String> {
        if is_inline_sparql(query) {
            return Ok(query.to_string());
        }
        let path = self.resolve_query_path(query)?;
        fs::read_to_string(&path).map_err(|e| Error::io(&path, e))
    }

    /// Resolves a query reference: as given, under the base directory, under
    /// `<base>/sparql/`, then by file name under the configured query
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no candidate exists.
    pub fn resolve_query_path(&self, reference: &str) -> Result<PathBuf> {
        let given = Path::new(reference);
        let sparql_dir = self.base_dir.join(self.config.sparql_path());
        let mut candidates = vec![
            given.to_path_buf(),
            self.base_dir.join(given),
            self.base_dir.join("sparql").join(given),
            sparql_dir.join(given),
        ];
        if let Some(file_name) = given.file_name() {
            candidates.push(sparql_dir.join(file_name));
        }
        candidates
            .into_iter()
            .find(|p| p.is_file())
            .ok_or_else(|| Error::NotFound(format!("SPARQL file not found: {reference}")))
    }

    /// Binds `var` to `iri` with a `VALUES` block after the first `WHERE {`,
    /// or as a trailing clause when the query has none.
    pub fn inject_values(&self, query: &str, var: &str, iri: &str) -> String {
        let values = format!("VALUES ?{var} {{ <{iri}> }}");
        match self.where_clause.find(query) {
            Some(m) => format!("{}\n  {values}\n{}", &query[..m.end()], &query[m.end()..]),
            None => format!("{}\n{values}\n", query.trim_end()),
        }
    }

    /// Runs a detail query for one resource and returns the first row.
    fn detail_row(&self, query: &str, var: &str, iri: &str) -> Result<Option<Row>> {
        let text = self.query_text(query)?;
        let bound = self.inject_values(&text, var, iri);
        Ok(self.rdf.select(&bound)?.into_iter().next())
    }

    /// Writes `<slug>/index.html` for every item that links to a resource
    /// and points the item at it. Returns the number written.
    fn generate_details(&mut self, detail: &DetailSpec, items: &mut [Item]) -> usize {
        let mut written = 0;
        for item in items.iter_mut().filter(|i| i.links_to_resource()) {
            let slug = slugify(&item.title);
            if slug.is_empty() {
                tracing::warn!("Skipping detail page for {}: empty slug", item.url);
                continue;
            }
            let row = match self.detail_row(&detail.query, &detail.var, &item.url) {
                Ok(row) => row.unwrap_or_default(),
                Err(e) => {
                    tracing::error!("Detail query for {} failed: {e}", item.url);
                    continue;
                }
            };
            let title = row.get("label").cloned().unwrap_or_else(|| item.title.clone());
            let ctx = json!({
                "page": {"title": title},
                "site": self.config.site,
                "detail": row,
                "generated_at": generated_at(),
                "root": "../",
            });
            let html = match self.renderer.render(&detail.template, &ctx) {
                Ok(html) => html,
                Err(e) => {
                    tracing::error!("Failed to render detail {slug}: {e}");
                    continue;
                }
            };
            let url = format!("{slug}/index.html");
            if let Err(e) = writer::write(&self.output_dir.join(&url), html) {
                tracing::error!("Failed to write detail {slug}: {e}");
                continue;
            }
            let text = row
                .get("definition")
                .cloned()
                .unwrap_or_else(|| item.description.clone());
            self.search.push(title, text, "motif", url.clone());
            item.url = url;
            written += 1;
        }
        written
    }

    /// Renders a page with `{page, site, generated_at}` and its data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Render`] if the page names no template, and any
    /// renderer error.
    pub fn render_page(&self, name: &str, page: &PageSpec, data: &PageData) -> Result<String> {
        let template = page
            .template_name()
            .ok_or_else(|| Error::Render(format!("no template for page {name}")))?;
        let ctx = json!({
            "page": page,
            "site": self.config.site,
            "generated_at": generated_at(),
            "root": "",
            "categories": data.categories,
            "fingerprints": data.fingerprints,
            "items": data.items,
            "runtimes": data.runtimes,
            "rows": data.rows,
        });
        self.renderer.render(template, ctx)
    }

    /// Writes a type index and one page per member. Returns pages written.
    ///
    /// # Errors
    ///
    /// Returns an error if members cannot be listed or the index cannot be
    /// rendered or written. Member page failures are logged.
    pub fn generate_type(&mut self, spec: &TypeSpec) -> Result<usize> {
        let dir = self.output_dir.join(spec.dir_name());
        let members = self.type_members(spec)?;
        let mut written = 0;
        let mut listed = Vec::new();

        for (iri, label, slug) in members {
            if slug.is_empty() {
                tracing::warn!("Skipping {iri} in {}: empty slug", spec.id);
                continue;
            }
            match self.generate_member(spec, &iri, &label, &slug) {
                Ok(comment) => {
                    let url = format!("{}/{slug}/index.html", spec.dir_name());
                    self.search.push(label.clone(), comment, spec.id.clone(), url);
                    listed.push(json!({"iri": iri, "label": label, "url": format!("{slug}/index.html")}));
                    written += 1;
                }
                Err(e) => tracing::error!("Member {iri} of {} failed: {e}", spec.id),
            }
        }

        let ctx = json!({
            "page": {"title": spec.display_title()},
            "site": self.config.site,
            "type": type_value(spec),
            "members": listed,
            "generated_at": generated_at(),
            "root": "../",
        });
        let html = self.renderer.render(&spec.index_template, ctx)?;
        writer::write(&dir.join("index.html"), html)?;
        self.search.push(
            spec.display_title(),
            String::new(),
            spec.id.clone(),
            format!("{}/index.html", spec.dir_name()),
        );
        tracing::info!("Wrote type {} with {written} members", spec.id);
        Ok(written + 1)
    }

    /// `(iri, label, slug)` for each member of a type.
    fn type_members(&self, spec: &TypeSpec) -> Result<Vec<(String, String, String)>> {
        if let Some(query) = &spec.list_query {
            let rows = self.find_by_sparql(query)?;
            return Ok(rows
                .iter()
                .filter_map(|row| {
                    let iri = resource_uri(row)?.to_string();
                    let label = row
                        .get("label")
                        .cloned()
                        .unwrap_or_else(|| vocab::local_name(&iri).to_string());
                    let slug = slugify(row.get(&spec.slug_field).unwrap_or(&label));
                    Some((iri, label, slug))
                })
                .collect());
        }
        Ok(self
            .rdf
            .labelled_resources(spec.class.as_deref())?
            .into_iter()
            .map(|r| {
                let slug = slugify(&r.label);
                (r.iri, r.label, slug)
            })
            .collect())
    }

    /// Writes one member page and returns its comment for the search index.
    fn generate_member(&self, spec: &TypeSpec, iri: &str, label: &str, slug: &str) -> Result<String> {
        let info = self.rdf.get_resource_info(iri)?.unwrap_or_default();
        let detail = match &spec.detail_query {
            Some(query) => self.detail_row(query, &spec.detail_var, iri)?.unwrap_or_default(),
            None => Row::new(),
        };
        let properties: BTreeMap<String, String> = self.rdf.get_motif_properties(iri)?;
        let comment = info.comment.clone().unwrap_or_default();
        let ctx = json!({
            "page": {"title": label},
            "site": self.config.site,
            "type": type_value(spec),
            "resource": {
                "iri": iri,
                "label": info.label.unwrap_or_else(|| label.to_string()),
                "comment": info.comment,
            },
            "detail": detail,
            "properties": properties,
            "generated_at": generated_at(),
            "root": "../../",
        });
        let html = self.renderer.render(&spec.detail_template, ctx)?;
        let path = self.output_dir.join(spec.dir_name()).join(slug).join("index.html");
        writer::write(&path, html)?;
        Ok(comment)
    }

    /// Writes the collected search entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_index(&self) -> Result<PathBuf> {
        let path = self.output_dir.join(SEARCH_INDEX_FILE);
        self.search.save(&path)?;
        tracing::info!("Wrote {} search entries to {}", self.search.len(), path.display());
        Ok(path)
    }
}

fn aggregate_value(aggregate: &Aggregate) -> Value {
    serde_json::to_value(aggregate).unwrap_or(Value::Null)
}

fn row_value(row: &Row) -> Value {
    Value::Object(row.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect::<Map<_, _>>())
}

fn type_value(spec: &TypeSpec) -> Value {
    json!({
        "id": spec.id,
        "title": spec.display_title(),
        "class": spec.class,
        "nav": spec.nav,
    })
}

fn error_page(name: &str, err: &Error) -> String {
    format!(
        "<html><body><h1>{}</h1><pre>{}</pre></body></html>",
        escape_html(name),
        escape_html(&err.to_string())
    )
}
