//! Template engine for rendering documentation pages.

use std::fmt::Write;
use std::fs;
use std::path::Path;

use minijinja::{escape_formatter, AutoEscape, Environment, Output, State, Value};
use walkdir::WalkDir;

use crate::render::escape_html;

/// A navigation item.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NavItem {
    /// Display title
    pub title: String,
    /// URL relative to the site root, or absolute for external links
    pub path: String,
    /// Child items
    pub children: Vec<NavItem>,
    /// Whether this is a section heading rather than a link
    pub section: bool,
    /// Whether this is the active page or contains it
    pub active: bool,
    /// Whether `path` points outside the site
    pub external: bool,
}

/// A table of contents entry.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TocEntry {
    /// Heading text
    pub title: String,
    /// Anchor ID
    pub id: String,
    /// Heading level (1-6)
    pub level: u8,
}

/// Context for rendering a page template.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Context {
    /// Page title
    pub title: String,
    /// Site title
    pub site_title: String,
    /// Page or site description
    pub description: Option<String>,
    /// Rendered content HTML
    pub content: String,
    /// Navigation items
    pub nav: Vec<NavItem>,
    /// Table of contents
    pub toc: Vec<TocEntry>,
    /// Relative prefix from this page to the site root ("./", "../", ...)
    pub base_url: String,
    /// Absolute URL of this page when `site_url` is configured
    pub canonical_url: Option<String>,
    /// Stylesheets to include, relative to the site root
    pub styles: Vec<String>,
    pub primary_color: Option<String>,
    pub logo: Option<String>,
    pub favicon: Option<String>,
    pub repo_url: Option<String>,
    pub copyright: Option<String>,
    /// Project name and version from the manifest
    pub project_label: Option<String>,
    /// Version being deployed, when building a versioned site
    pub version: Option<String>,
    pub version_selector: bool,
    pub search: bool,
}

/// Template engine using minijinja.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Create a new template engine with default templates.
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_formatter(html_formatter);

        env.add_template_owned("base.html".to_string(), BASE_TEMPLATE.to_string())
            .expect("Failed to add base template");
        env.add_template_owned("doc.html".to_string(), DOC_TEMPLATE.to_string())
            .expect("Failed to add doc template");
        env.add_template_owned("nav.html".to_string(), NAV_TEMPLATE.to_string())
            .expect("Failed to add nav template");
        env.add_template_owned("redirect.html".to_string(), REDIRECT_TEMPLATE.to_string())
            .expect("Failed to add redirect template");

        Self { env }
    }

    /// Create an engine whose built-in templates are overridden by the
    /// `*.html` files found in `custom_dir`.
    pub fn with_overrides(custom_dir: &Path) -> Result<Self, minijinja::Error> {
        let mut engine = Self::new();

        for entry in WalkDir::new(custom_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("html") {
                continue;
            }

            let name = path
                .strip_prefix(custom_dir)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");
            let source = fs::read_to_string(path).map_err(|e| {
                minijinja::Error::new(
                    minijinja::ErrorKind::TemplateNotFound,
                    format!("failed to read {}: {}", path.display(), e),
                )
            })?;

            tracing::debug!("Using custom template {}", name);
            engine.env.add_template_owned(name, source)?;
        }

        Ok(engine)
    }

    /// Render a page using the specified template.
    pub fn render_page(&self, template: &str, context: &Context) -> Result<String, minijinja::Error> {
        self.env.get_template(template)?.render(context)
    }

    /// Render a redirect page pointing at `target`.
    pub fn render_redirect(&self, target: &str) -> Result<String, minijinja::Error> {
        self.env
            .get_template("redirect.html")?
            .render(minijinja::context! { target => target })
    }
}

/// Like the default formatter, but leaves `/` unescaped in strings.
fn html_formatter(
    out: &mut Output<'_>,
    state: &State<'_, '_>,
    value: &Value,
) -> Result<(), minijinja::Error> {
    match value.as_str() {
        Some(s) if matches!(state.auto_escape(), AutoEscape::Html) && !value.is_safe() => {
            out.write_str(&escape_html(s))?;
            Ok(())
        }
        _ => escape_formatter(out, state, value),
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

const BASE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{% if title and title != site_title %}{{ title }} - {% endif %}{{ site_title }}</title>
  {% if description %}<meta name="description" content="{{ description }}">
  {% endif %}{% if canonical_url %}<link rel="canonical" href="{{ canonical_url }}">
  {% endif %}{% if favicon %}<link rel="icon" href="{{ base_url }}{{ favicon }}">
  {% endif %}<link rel="stylesheet" href="{{ base_url }}assets/main.css">
  {% for style in styles %}<link rel="stylesheet" href="{{ base_url }}{{ style }}">
  {% endfor %}{% if primary_color %}<style>:root { --primary: {{ primary_color }}; }</style>
  {% endif %}
</head>
<body data-base="{{ base_url }}">
  <button class="menu-btn" type="button" aria-label="Menu">&#9776;</button>
  <div class="layout">
    <nav class="sidebar">
      {% include "nav.html" %}
    </nav>
    <main class="main">
      {% block content %}{% endblock %}
    </main>
  </div>
  <footer class="footer">
    {% if project_label %}<span class="project">{{ project_label }}</span>{% endif %}
    {% if copyright %}<span class="copyright">{{ copyright }}</span>{% endif %}
    {% if repo_url %}<a class="repo" href="{{ repo_url }}">Source</a>{% endif %}
  </footer>
  <script src="{{ base_url }}assets/main.js"></script>
</body>
</html>"##;

const DOC_TEMPLATE: &str = r##"{% extends "base.html" %}

{% block content %}
<article class="doc">
  <div class="content">
    {{ content | safe }}
  </div>
</article>

{% if toc %}
<aside class="toc">
  <h2>On this page</h2>
  <ul>
  {% for entry in toc %}
    <li class="toc-level-{{ entry.level }}">
      <a href="#{{ entry.id }}">{{ entry.title }}</a>
    </li>
  {% endfor %}
  </ul>
</aside>
{% endif %}
{% endblock %}"##;

const NAV_TEMPLATE: &str = r##"<div class="nav-header">
  <a href="{{ base_url }}" class="nav-logo">{% if logo %}<img src="{{ base_url }}{{ logo }}" alt="">{% endif %}{{ site_title }}</a>
  {% if version_selector and version %}
  <select class="version-select" data-current="{{ version }}" aria-label="Version">
    <option value="{{ version }}" selected>{{ version }}</option>
  </select>
  {% endif %}
  {% if search %}
  <input class="search-input" type="search" placeholder="Search" aria-label="Search">
  <ul class="search-results"></ul>
  {% endif %}
</div>
<ul class="nav-list">
{% for item in nav recursive %}
  <li class="nav-item{% if item.active %} active{% endif %}{% if item.section %} nav-section{% endif %}">
    {% if item.section %}
    <span class="nav-section-title">{{ item.title }}</span>
    <ul class="nav-children">{{ loop(item.children) }}</ul>
    {% elif item.external %}
    <a href="{{ item.path }}" class="external" rel="noopener">{{ item.title }}</a>
    {% else %}
    <a href="{{ base_url }}{{ item.path }}">{{ item.title }}</a>
    {% endif %}
  </li>
{% endfor %}
</ul>"##;

const REDIRECT_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Redirecting</title>
  <meta http-equiv="refresh" content="0; url={{ target }}">
  <link rel="canonical" href="{{ target }}">
</head>
<body>
  <a href="{{ target }}">Redirecting to {{ target }}</a>
</body>
</html>"##;
