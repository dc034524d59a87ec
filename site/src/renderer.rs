//! Template rendering.
//!
//! One renderer serves every generator. Its capabilities are explicit: an
//! optional template directory searched first, and the built-in templates
//! shipped with this crate as the fallback. Templates whose names end in
//! `.html` are auto-escaped.

use std::fs;
use std::path::{Component, Path, PathBuf};

use minijinja::{Environment, ErrorKind, Value};
use motif_ontology::{Error, Result};
use serde::Serialize;

use crate::html::markdown_to_html;

/// Templates compiled into the binary.
const BUILTIN: &[(&str, &str)] = &[
    ("layout.html", include_str!("../templates/layout.html")),
    ("charts_layout.html", include_str!("../templates/charts_layout.html")),
    ("chart_page.html", include_str!("../templates/chart_page.html")),
    ("charts_index.html", include_str!("../templates/charts_index.html")),
    ("wiki/page.html", include_str!("../templates/wiki/page.html")),
    ("wiki/detail/motif.html", include_str!("../templates/wiki/detail/motif.html")),
    ("wiki/type_index.html", include_str!("../templates/wiki/type_index.html")),
    ("wiki/type_detail.html", include_str!("../templates/wiki/type_detail.html")),
];

/// Returns the source of a built-in template.
pub fn builtin_template(name: &str) -> Option<&'static str> {
    BUILTIN.iter().find(|(n, _)| *n == name).map(|(_, src)| *src)
}

/// Where templates come from.
#[derive(Debug, Clone, Default)]
pub struct RendererOptions {
    /// Directory searched first, if set.
    pub template_dir: Option<PathBuf>,
    /// Whether the built-in templates are available.
    pub builtin: bool,
}

impl RendererOptions {
    /// Built-in templates only.
    pub fn builtin() -> Self {
        Self {
            template_dir: None,
            builtin: true,
        }
    }

    /// A template directory with the built-ins behind it.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: Some(dir.into()),
            builtin: true,
        }
    }
}

/// A minijinja environment with the motif loader and filters installed.
pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    /// Creates a renderer.
    pub fn new(options: RendererOptions) -> Self {
        let mut env = Environment::new();
        let RendererOptions {
            template_dir,
            builtin,
        } = options;
        env.set_loader(move |name| {
            if let Some(dir) = &template_dir {
                if let Some(path) = safe_join(dir, name) {
                    if path.is_file() {
                        return fs::read_to_string(&path).map(Some).map_err(|e| {
                            minijinja::Error::new(
                                ErrorKind::InvalidOperation,
                                format!("cannot read template {}", path.display()),
                            )
                            .with_source(e)
                        });
                    }
                }
            }
            Ok(builtin
                .then(|| builtin_template(name))
                .flatten()
                .map(str::to_string))
        });
        env.add_filter("markdown", |source: String| {
            Value::from_safe_string(markdown_to_html(&source))
        });
        Self { env }
    }

    /// True when `name` resolves to a template.
    pub fn has_template(&self, name: &str) -> bool {
        self.env.get_template(name).is_ok()
    }

    /// Renders a named template.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no source provides the template and
    /// [`Error::Render`] if it fails to compile or render.
    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String> {
        let template = self.env.get_template(name).map_err(|e| classify(name, e))?;
        template.render(ctx).map_err(|e| classify(name, e))
    }

    /// Renders template source text that is not registered under a name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Render`] if the source fails to compile or render.
    pub fn render_str<S: Serialize>(&self, source: &str, ctx: S) -> Result<String> {
        self.env
            .render_str(source, ctx)
            .map_err(|e| Error::Render(format!("{e:#}")))
    }
}

fn classify(name: &str, err: minijinja::Error) -> Error {
    if err.kind() == ErrorKind::TemplateNotFound {
        Error::NotFound(format!("template not found: {name}"))
    } else {
        Error::Render(format!("{name}: {err:#}"))
    }
}

/// Joins a template name onto a directory, refusing names that escape it.
fn safe_join(dir: &Path, name: &str) -> Option<PathBuf> {
    let relative = Path::new(name);
    relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
        .then(|| dir.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builtin_templates_render() {
        let renderer = Renderer::new(RendererOptions::builtin());
        let html = renderer
            .render("chart_page.html", json!({"title": "A < B", "spec_json": "{}"}))
            .unwrap();
        assert!(html.contains("A &lt; B"));
    }

    #[test]
    fn missing_template_is_not_found() {
        let renderer = Renderer::new(RendererOptions::builtin());
        assert!(renderer.render("nope.html", json!({})).unwrap_err().is_not_found());
        let bare = Renderer::new(RendererOptions::default());
        assert!(!bare.has_template("layout.html"));
    }

    #[test]
    fn directory_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("chart_page.html"), "custom {{ title }}").unwrap();
        let renderer = Renderer::new(RendererOptions::with_dir(dir.path()));
        let out = renderer.render("chart_page.html", json!({"title": "t"})).unwrap();
        assert_eq!(out, "custom t");
        assert!(renderer.has_template("layout.html"));
    }

    #[test]
    fn markdown_filter_is_safe_html() {
        let renderer = Renderer::new(RendererOptions::builtin());
        let out = renderer
            .render_str("{{ text|markdown }}", json!({"text": "**bold**"}))
            .unwrap();
        assert!(out.contains("<strong>bold</strong>"));
    }

    #[test]
    fn render_errors_are_classified() {
        let renderer = Renderer::new(RendererOptions::builtin());
        let err = renderer.render_str("{% for %}", json!({})).unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }

    #[test]
    fn parent_components_are_rejected() {
        assert!(safe_join(Path::new("/t"), "../etc/passwd").is_none());
        assert!(safe_join(Path::new("/t"), "wiki/page.html").is_some());
    }
}
