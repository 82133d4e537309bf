//! Static site builder.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use pulldown_cmark::Options;
use serde::Serialize;
use walkdir::WalkDir;

use atomdocs_config::{
    ConfigError, NavNode, NotebookOptions, PageKind, ProjectManifest, ResolvedNav, ResolvedPage,
    SiteConfig,
};
use atomdocs_exec::python::script_dir;
use atomdocs_exec::{
    CodeCell, ExecutionError, ExecutionOutput, ExecutionPolicy, ExecutionRequest, PythonExecutor,
    ScriptExecutor,
};
use atomdocs_source::{parse_markdown, parse_script, ParsedPage, ParsedScript, SlugRegistry};

use crate::apiref::{self, ApiModule};
use crate::assets::AssetPipeline;
use crate::render::{escape_html, markdown_options, root_prefix, MarkdownRenderer, Rendered};
use crate::staging::StagingDir;
use crate::templates::{Context, NavItem, TemplateEngine, TocEntry};

/// Configuration for building a static site.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Validated site configuration
    pub site: SiteConfig,

    /// Output directory, replaced as a whole on success
    pub output_dir: PathBuf,

    /// Minify CSS output
    pub minify: bool,

    /// Version being built, for versioned deployments
    pub version: Option<String>,
}

impl BuildConfig {
    /// Build into the configured `site_dir`.
    pub fn new(site: SiteConfig) -> Self {
        Self {
            output_dir: site.site_dir.clone(),
            minify: site.minify,
            version: None,
            site,
        }
    }
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of pages generated, API reference pages included
    pub pages: usize,

    /// Number of example scripts executed
    pub scripts: usize,

    /// Number of figures embedded
    pub figures: usize,

    /// Number of files copied from the docs directory
    pub static_files: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that can occur during build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("Failed to render {path}: {message}")]
    Render { path: PathBuf, message: String },

    #[error("Failed to read {0}")]
    ReadError(String),

    #[error("Failed to write output: {0}")]
    WriteError(String),

    #[error("Failed to render template: {0}")]
    TemplateError(String),

    #[error("Version error: {0}")]
    Version(String),
}

/// A navigation page with its parsed source.
struct SourcePage<'a> {
    page: &'a ResolvedPage,
    content: PageContent,
}

enum PageContent {
    Markdown(ParsedPage),
    Script(ParsedScript),
}

impl SourcePage<'_> {
    /// Label from configuration, then the page's own title, then the file stem.
    fn nav_label(&self) -> String {
        self.page
            .label
            .clone()
            .or_else(|| self.own_title())
            .unwrap_or_else(|| self.page.fallback_label())
    }

    /// Title from the page itself, then the navigation label.
    fn title(&self) -> String {
        self.own_title()
            .unwrap_or_else(|| self.page.fallback_label())
    }

    fn own_title(&self) -> Option<String> {
        match &self.content {
            PageContent::Markdown(parsed) => parsed.title(),
            PageContent::Script(parsed) => parsed.title(),
        }
    }
}

/// Search index record.
#[derive(Debug, Serialize)]
struct SearchEntry {
    title: String,
    url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    content: String,
}

#[derive(Debug, Default)]
struct Stats {
    pages: usize,
    scripts: usize,
    figures: usize,
}

/// Static site builder.
pub struct StaticBuilder {
    config: BuildConfig,
    executor: Box<dyn ScriptExecutor>,
    templates: TemplateEngine,
    markdown: Options,
}

impl StaticBuilder {
    /// Create a builder that runs scripts with the configured interpreter.
    pub fn new(config: BuildConfig) -> Result<Self, BuildError> {
        let templates = match &config.site.theme.custom_dir {
            Some(dir) => TemplateEngine::with_overrides(dir)
                .map_err(|e| BuildError::TemplateError(e.to_string()))?,
            None => TemplateEngine::new(),
        };

        let interpreter = config
            .site
            .plugins
            .notebooks
            .as_ref()
            .map_or("python3", |n| n.interpreter.as_str());
        let executor = Box::new(PythonExecutor::new(interpreter));

        Ok(Self {
            markdown: markdown_options(&config.site.markdown_extensions),
            config,
            executor,
            templates,
        })
    }

    /// Replace the script executor.
    pub fn with_executor(mut self, executor: Box<dyn ScriptExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build the site.
    ///
    /// Everything is written to a staging directory that replaces the output
    /// directory only when every page, asset and index was produced.
    pub fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        let site = &self.config.site;

        if !site.docs_dir.is_dir() {
            return Err(BuildError::ReadError(format!(
                "Docs directory not found: {}",
                site.docs_dir.display()
            )));
        }

        let nav = site.resolve_nav()?;
        let manifest = site.manifest()?;
        let modules = match &site.plugins.api_reference {
            Some(options) => apiref::collect_modules(options, &site.root)?,
            None => Vec::new(),
        };

        let pages = self.load_pages(&nav)?;
        if !pages.iter().any(|p| p.page.url.is_empty()) {
            tracing::warn!("No page renders to the site root; add docs/index.md");
        }

        let nav_items = self.build_navigation(&nav.nodes, &pages, &modules);

        let staging = StagingDir::new(&self.config.output_dir)?;
        let out = staging.path();

        let mut stats = Stats::default();
        let mut search = Vec::new();

        for page in &pages {
            let entry = self.build_page(page, &nav, &nav_items, manifest.as_ref(), out, &mut stats)?;
            search.push(entry);
        }

        for module in &modules {
            let entry = self.build_api_page(module, &nav_items, manifest.as_ref(), out)?;
            stats.pages += 1;
            search.push(entry);
        }

        let static_files = self.copy_static_files(&nav, out)?;
        self.generate_assets(out)?;

        if site.plugins.search.is_some() {
            self.generate_search_index(&search, out)?;
        }
        if site.site_url.is_some() {
            self.generate_sitemap(&search, out)?;
        }

        let output_dir = staging.commit()?;

        Ok(BuildResult {
            pages: stats.pages,
            scripts: stats.scripts,
            figures: stats.figures,
            static_files,
            duration_ms: start.elapsed().as_millis() as u64,
            output_dir,
        })
    }

    /// Read and parse every navigation page.
    fn load_pages<'a>(&self, nav: &'a ResolvedNav) -> Result<Vec<SourcePage<'a>>, BuildError> {
        nav.pages()
            .into_iter()
            .map(|page| {
                let source = fs::read_to_string(&page.source_path).map_err(|e| {
                    BuildError::ReadError(format!("{}: {}", page.source_path.display(), e))
                })?;

                let content = match page.kind {
                    PageKind::Markdown => parse_markdown(&source).map(PageContent::Markdown),
                    PageKind::Script => parse_script(&source).map(PageContent::Script),
                }
                .map_err(|e| BuildError::Render {
                    path: page.source_path.clone(),
                    message: e.to_string(),
                })?;

                Ok(SourcePage { page, content })
            })
            .collect()
    }

    /// Build the navigation tree shared by every page, API reference last.
    fn build_navigation(
        &self,
        nodes: &[NavNode],
        pages: &[SourcePage<'_>],
        modules: &[ApiModule],
    ) -> Vec<NavItem> {
        let mut nav = nav_items(nodes, pages);

        if let (Some(options), false) = (&self.config.site.plugins.api_reference, modules.is_empty())
        {
            nav.push(NavItem {
                title: options.title.clone(),
                path: String::new(),
                section: true,
                children: modules
                    .iter()
                    .map(|m| NavItem {
                        title: m.name.clone(),
                        path: m.url(),
                        children: Vec::new(),
                        section: false,
                        active: false,
                        external: false,
                    })
                    .collect(),
                active: false,
                external: false,
            });
        }

        nav
    }

    /// Render one navigation page into the output tree.
    fn build_page(
        &self,
        source: &SourcePage<'_>,
        nav: &ResolvedNav,
        nav_items: &[NavItem],
        manifest: Option<&ProjectManifest>,
        out: &Path,
        stats: &mut Stats,
    ) -> Result<SearchEntry, BuildError> {
        let page = source.page;
        let page_dir = out.join(&page.url);
        fs::create_dir_all(&page_dir).map_err(|e| BuildError::WriteError(e.to_string()))?;

        let renderer = MarkdownRenderer::new(self.markdown).with_links(nav, page);

        let (rendered, content, description, show_toc) = match &source.content {
            PageContent::Markdown(parsed) => {
                let rendered = renderer.render(&parsed.content, &mut SlugRegistry::default());
                let frontmatter = parsed.frontmatter.as_ref();
                (
                    rendered.clone(),
                    rendered.html,
                    frontmatter.and_then(|f| f.description.clone()),
                    frontmatter.map_or(true, |f| f.toc),
                )
            }
            PageContent::Script(script) => {
                let (rendered, content) = self.render_script(page, script, &renderer, &page_dir, stats)?;
                (rendered, content, None, true)
            }
        };

        let toc = if show_toc { page_toc(&rendered) } else { Vec::new() };
        let title = source.title();

        let context = self.context(
            &title,
            description,
            content,
            mark_active(nav_items, &page.url),
            toc,
            &page.url,
            manifest,
        );
        self.write_page(&page_dir, &context)?;

        tracing::info!("Rendered {} -> /{}", page.relative_path.display(), page.url);
        stats.pages += 1;

        Ok(SearchEntry {
            title,
            url: page.url.clone(),
            content: rendered.text,
        })
    }

    /// Execute and render an example script. Returns the rendered cells and
    /// the page body.
    fn render_script(
        &self,
        page: &ResolvedPage,
        script: &ParsedScript,
        renderer: &MarkdownRenderer<'_>,
        page_dir: &Path,
        stats: &mut Stats,
    ) -> Result<(Rendered, String), BuildError> {
        if let Some(language) = script.header.as_ref().and_then(|h| h.language()) {
            if !language.eq_ignore_ascii_case("python") {
                return Err(BuildError::Render {
                    path: page.source_path.clone(),
                    message: format!("unsupported kernel language '{}'", language),
                });
            }
        }

        let options = self.notebook_options();
        let outputs = if options.execute {
            Some(self.execute_script(page, script, &options, page_dir)?)
        } else {
            None
        };

        if let Some(outputs) = &outputs {
            stats.scripts += 1;
            stats.figures += outputs.figure_count();
        }

        let rendered = renderer.render_script(script, outputs.as_ref(), options.include_source);

        let mut content = String::new();
        if options.download_source {
            let file_name = page
                .source_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("example.py");
            fs::copy(&page.source_path, page_dir.join(file_name))
                .map_err(|e| BuildError::WriteError(e.to_string()))?;
            content.push_str(&format!(
                "<a class=\"download\" href=\"{0}\" download>Download {0}</a>\n",
                escape_html(file_name)
            ));
        }
        content.push_str(&rendered.html);

        Ok((rendered, content))
    }

    fn execute_script(
        &self,
        page: &ResolvedPage,
        script: &ParsedScript,
        options: &NotebookOptions,
        page_dir: &Path,
    ) -> Result<ExecutionOutput, BuildError> {
        let cells: Vec<CodeCell<'_>> = script
            .code_cells()
            .map(|cell| CodeCell {
                source: &cell.source,
                line: cell.line_number,
                source_line: cell.source_line,
            })
            .collect();
        if cells.is_empty() {
            return Ok(ExecutionOutput::default());
        }

        let figures_dir = page_dir.join("figures");
        fs::create_dir_all(&figures_dir).map_err(|e| BuildError::WriteError(e.to_string()))?;

        let request = ExecutionRequest {
            script_path: &page.source_path,
            cells,
            working_dir: script_dir(&page.source_path),
            figures_dir: &figures_dir,
            policy: ExecutionPolicy {
                allow_errors: options.allow_errors,
                timeout: options.timeout.map(Duration::from_secs),
            },
        };

        tracing::info!(
            "Executing {} ({} cells) with {}",
            page.relative_path.display(),
            request.cells.len(),
            self.executor.name()
        );
        let output = self.executor.execute(&request)?;

        // Only succeeds when no figure was written
        let _ = fs::remove_dir(&figures_dir);

        Ok(output)
    }

    /// Notebook options, with execution off when the plugin is disabled.
    fn notebook_options(&self) -> NotebookOptions {
        self.config
            .site
            .plugins
            .notebooks
            .clone()
            .unwrap_or_else(|| NotebookOptions {
                execute: false,
                download_source: false,
                ..Default::default()
            })
    }

    fn build_api_page(
        &self,
        module: &ApiModule,
        nav_items: &[NavItem],
        manifest: Option<&ProjectManifest>,
        out: &Path,
    ) -> Result<SearchEntry, BuildError> {
        let url = module.url();
        let page_dir = out.join(&url);
        fs::create_dir_all(&page_dir).map_err(|e| BuildError::WriteError(e.to_string()))?;

        let rendered = apiref::render_module(module, &MarkdownRenderer::new(self.markdown));
        let context = self.context(
            &module.name,
            module.doc.as_ref().and_then(|d| d.lines().next()).map(str::to_string),
            rendered.html.clone(),
            mark_active(nav_items, &url),
            page_toc(&rendered),
            &url,
            manifest,
        );
        self.write_page(&page_dir, &context)?;

        tracing::debug!("Rendered API reference for {}", module.name);

        Ok(SearchEntry {
            title: module.name.clone(),
            url,
            content: rendered.text,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn context(
        &self,
        title: &str,
        description: Option<String>,
        content: String,
        nav: Vec<NavItem>,
        toc: Vec<TocEntry>,
        url: &str,
        manifest: Option<&ProjectManifest>,
    ) -> Context {
        let site = &self.config.site;
        let depth = url.split('/').filter(|s| !s.is_empty()).count();
        let version_selector = site
            .plugins
            .versioning
            .as_ref()
            .is_some_and(|v| v.version_selector);

        Context {
            title: title.to_string(),
            site_title: site.site_name.clone(),
            description: description.or_else(|| site.site_description.clone()),
            content,
            nav,
            toc,
            base_url: root_prefix(depth),
            canonical_url: self.absolute_url(url),
            styles: site
                .extra_css
                .iter()
                .map(|path| format!("assets/{}", file_name(path)))
                .collect(),
            primary_color: site.theme.primary_color.clone(),
            logo: site.theme.logo.clone(),
            favicon: site.theme.favicon.clone(),
            repo_url: site.repo_url.clone(),
            copyright: site.copyright.clone(),
            project_label: manifest.map(|m| match &m.version {
                Some(version) => format!("{} {}", m.name, version),
                None => m.name.clone(),
            }),
            version: self.config.version.clone(),
            version_selector,
            search: site.plugins.search.is_some(),
        }
    }

    /// Absolute URL of a page when `site_url` is configured.
    fn absolute_url(&self, url: &str) -> Option<String> {
        let base = self.config.site.site_url.as_ref()?.trim_end_matches('/');
        Some(match &self.config.version {
            Some(version) => format!("{}/{}/{}", base, version, url),
            None => format!("{}/{}", base, url),
        })
    }

    fn write_page(&self, page_dir: &Path, context: &Context) -> Result<(), BuildError> {
        let html = self
            .templates
            .render_page("doc.html", context)
            .map_err(|e: minijinja::Error| BuildError::TemplateError(e.to_string()))?;

        fs::write(page_dir.join("index.html"), html)
            .map_err(|e| BuildError::WriteError(e.to_string()))
    }

    /// Copy non-page files from the docs directory (images, data files).
    fn copy_static_files(&self, nav: &ResolvedNav, out: &Path) -> Result<usize, BuildError> {
        let docs_dir = &self.config.site.docs_dir;
        let pages: HashSet<&Path> = nav
            .pages()
            .into_iter()
            .map(|p| p.relative_path.as_path())
            .collect();

        let mut copied = 0;
        for entry in WalkDir::new(docs_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let name = e.file_name().to_string_lossy();
                e.depth() == 0 || !(name.starts_with('.') || name == "__pycache__")
            })
        {
            let entry = entry.map_err(|e| BuildError::ReadError(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(docs_dir).unwrap_or(path);
            if pages.contains(relative) || path.extension().and_then(|e| e.to_str()) == Some("md") {
                continue;
            }

            let target = out.join(relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| BuildError::WriteError(e.to_string()))?;
            }
            fs::copy(path, &target)
                .map_err(|e| BuildError::WriteError(format!("{}: {}", target.display(), e)))?;
            copied += 1;
        }

        tracing::debug!("Copied {} static files", copied);
        Ok(copied)
    }

    /// Generate theme assets and copy extra stylesheets.
    fn generate_assets(&self, out: &Path) -> Result<(), BuildError> {
        let assets_dir = out.join("assets");
        fs::create_dir_all(&assets_dir).map_err(|e| BuildError::WriteError(e.to_string()))?;

        let css = AssetPipeline::generate_css();
        let css = if self.config.minify {
            AssetPipeline::minify_css(&css).unwrap_or(css)
        } else {
            css
        };
        fs::write(assets_dir.join("main.css"), css)
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        fs::write(assets_dir.join("main.js"), AssetPipeline::generate_js())
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        for style_path in &self.config.site.extra_css {
            let content = fs::read_to_string(style_path).map_err(|e| {
                BuildError::ReadError(format!("stylesheet {}: {}", style_path.display(), e))
            })?;
            let content = if self.config.minify {
                AssetPipeline::minify_css(&content).unwrap_or(content)
            } else {
                content
            };
            fs::write(assets_dir.join(file_name(style_path)), content)
                .map_err(|e| BuildError::WriteError(e.to_string()))?;
            tracing::debug!("Copied stylesheet {}", style_path.display());
        }

        Ok(())
    }

    /// Generate search index.
    fn generate_search_index(&self, entries: &[SearchEntry], out: &Path) -> Result<(), BuildError> {
        let include_content = self
            .config
            .site
            .plugins
            .search
            .as_ref()
            .is_some_and(|s| s.include_content);

        let index: Vec<SearchEntry> = entries
            .iter()
            .map(|e| SearchEntry {
                title: e.title.clone(),
                url: e.url.clone(),
                content: if include_content {
                    e.content.clone()
                } else {
                    String::new()
                },
            })
            .collect();

        let json = serde_json::to_string_pretty(&index)
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        fs::write(out.join("search-index.json"), json)
            .map_err(|e| BuildError::WriteError(e.to_string()))
    }

    /// Generate sitemap.
    fn generate_sitemap(&self, entries: &[SearchEntry], out: &Path) -> Result<(), BuildError> {
        let urls: Vec<String> = entries
            .iter()
            .filter_map(|e| self.absolute_url(&e.url))
            .map(|loc| format!("  <url>\n    <loc>{}</loc>\n  </url>", escape_html(&loc)))
            .collect();

        let sitemap = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
{}
</urlset>
"#,
            urls.join("\n")
        );

        fs::write(out.join("sitemap.xml"), sitemap)
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        // A versioned build is not the site root
        if self.config.version.is_none() {
            if let Some(sitemap_url) = self.absolute_url("sitemap.xml") {
                let robots = format!("User-agent: *\nAllow: /\nSitemap: {}\n", sitemap_url);
                fs::write(out.join("robots.txt"), robots)
                    .map_err(|e| BuildError::WriteError(e.to_string()))?;
            }
        }

        Ok(())
    }
}

fn nav_items(nodes: &[NavNode], pages: &[SourcePage<'_>]) -> Vec<NavItem> {
    nodes
        .iter()
        .map(|node| match node {
            NavNode::Section { label, children } => NavItem {
                title: label.clone(),
                path: String::new(),
                children: nav_items(children, pages),
                section: true,
                active: false,
                external: false,
            },
            NavNode::Link { label, url } => NavItem {
                title: label.clone(),
                path: url.clone(),
                children: Vec::new(),
                section: false,
                active: false,
                external: true,
            },
            NavNode::Page(page) => NavItem {
                title: page.label.clone().unwrap_or_else(|| {
                    pages
                        .iter()
                        .find(|p| p.page.url == page.url)
                        .map_or_else(|| page.fallback_label(), |p| p.nav_label())
                }),
                path: page.url.clone(),
                children: Vec::new(),
                section: false,
                active: false,
                external: false,
            },
        })
        .collect()
}

/// Copy of the navigation with the page at `url` and its sections active.
fn mark_active(items: &[NavItem], url: &str) -> Vec<NavItem> {
    items
        .iter()
        .map(|item| {
            let mut item = item.clone();
            if item.section {
                item.children = mark_active(&item.children, url);
                item.active = item.children.iter().any(|c| c.active);
            } else {
                item.active = !item.external && item.path == url;
            }
            item
        })
        .collect()
}

/// Outline shown beside the page: headings below the title.
fn page_toc(rendered: &Rendered) -> Vec<TocEntry> {
    rendered
        .toc
        .iter()
        .filter(|e| (2..=4).contains(&e.level))
        .map(|e| TocEntry {
            title: e.title.clone(),
            id: e.id.clone(),
            level: e.level,
        })
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|f| f.to_str())
        .unwrap_or("style.css")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use atomdocs_exec::CellOutput;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    /// Executor that prints each cell's line number, or fails on cells
    /// containing `raise`.
    struct FakeExecutor {
        runs: Arc<AtomicUsize>,
    }

    impl ScriptExecutor for FakeExecutor {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn execute(&self, request: &ExecutionRequest<'_>) -> Result<ExecutionOutput, ExecutionError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let mut cells = Vec::new();
            for cell in &request.cells {
                if cell.source.contains("raise") {
                    return Err(ExecutionError::Failed {
                        script: request.script_path.to_path_buf(),
                        line: cell.line,
                        output: "RuntimeError: detuning out of range".to_string(),
                    });
                }
                cells.push(CellOutput {
                    stdout: format!("line {}\n", cell.line),
                    ..Default::default()
                });
            }
            Ok(ExecutionOutput { cells })
        }
    }

    const CONFIG: &str = r#"
site_name: Bloqade Analog Examples
site_url: https://queracomputing.github.io/bloqade-analog-examples/
nav:
  - Home: index.md
  - Tutorials:
      - Tutorial 1: examples/example-1-rabi.py
  - SDK: https://queracomputing.github.io/bloqade-analog/latest/
"#;

    const RABI: &str = r#"# %% [markdown]
# # Rabi Oscillations
# ## Setup

# %%
import numpy as np

# %% tags=["remove-input"]
print(np.pi)
"#;

    struct Project {
        temp: tempfile::TempDir,
        runs: Arc<AtomicUsize>,
    }

    impl Project {
        fn new() -> Self {
            let temp = tempdir().unwrap();
            let docs = temp.path().join("docs");
            fs::create_dir_all(docs.join("examples/data")).unwrap();
            fs::write(temp.path().join("atomdocs.yml"), CONFIG).unwrap();
            fs::write(
                docs.join("index.md"),
                "---\ndescription: Example gallery\n---\n# Welcome\n\nStart with [Rabi](examples/example-1-rabi.py).\n",
            )
            .unwrap();
            fs::write(docs.join("examples/example-1-rabi.py"), RABI).unwrap();
            fs::write(docs.join("examples/data/rabi.json"), "{}").unwrap();

            Self {
                temp,
                runs: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn root(&self) -> &Path {
            self.temp.path()
        }

        fn builder(&self) -> StaticBuilder {
            let site = SiteConfig::load(&self.root().join("atomdocs.yml")).unwrap();
            StaticBuilder::new(BuildConfig::new(site))
                .unwrap()
                .with_executor(Box::new(FakeExecutor {
                    runs: self.runs.clone(),
                }))
        }

        fn read(&self, relative: &str) -> String {
            fs::read_to_string(self.root().join("site").join(relative)).unwrap()
        }
    }

    #[test]
    fn builds_site_in_navigation_order() {
        let project = Project::new();

        let result = project.builder().build().unwrap();

        assert_eq!(result.pages, 2);
        assert_eq!(result.scripts, 1);
        assert_eq!(project.runs.load(Ordering::SeqCst), 1);

        let home = project.read("index.html");
        assert!(home.contains(r#"href="./examples/example-1-rabi/""#));
        assert!(home.contains(r#"<meta name="description" content="Example gallery">"#));

        let rabi = project.read("examples/example-1-rabi/index.html");
        assert!(rabi.contains("<title>Rabi Oscillations - Bloqade Analog Examples</title>"));
        assert!(rabi.contains(r#"href="../../assets/main.css""#));
        assert!(rabi.contains("import numpy as np"));
        assert!(!rabi.contains("print(np.pi)"));
        assert!(rabi.contains("line 8"));
        assert!(rabi.contains(r##"<a href="#setup">Setup</a>"##));
        assert!(rabi.contains("nav-item active"));
        assert!(project
            .root()
            .join("site/examples/example-1-rabi/example-1-rabi.py")
            .exists());
    }

    #[test]
    fn writes_indexes_and_static_files() {
        let project = Project::new();

        let result = project.builder().build().unwrap();

        assert_eq!(result.static_files, 1);
        assert!(project.root().join("site/examples/data/rabi.json").exists());
        assert!(project.root().join("site/assets/main.css").exists());

        let index: serde_json::Value =
            serde_json::from_str(&project.read("search-index.json")).unwrap();
        let urls: Vec<&str> = index
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["url"].as_str().unwrap())
            .collect();
        assert_eq!(urls, vec!["", "examples/example-1-rabi/"]);

        let sitemap = project.read("sitemap.xml");
        assert!(sitemap.contains(
            "<loc>https://queracomputing.github.io/bloqade-analog-examples/examples/example-1-rabi/</loc>"
        ));
    }

    #[test]
    fn rebuilds_are_byte_identical() {
        let project = Project::new();
        let builder = project.builder();

        let snapshot = |root: &Path| -> Vec<(PathBuf, Vec<u8>)> {
            WalkDir::new(root)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| {
                    (
                        e.path().strip_prefix(root).unwrap().to_path_buf(),
                        fs::read(e.path()).unwrap(),
                    )
                })
                .collect()
        };

        builder.build().unwrap();
        let first = snapshot(&project.root().join("site"));
        builder.build().unwrap();
        let second = snapshot(&project.root().join("site"));

        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn failing_example_keeps_previous_site() {
        let project = Project::new();
        project.builder().build().unwrap();
        let before = project.read("index.html");

        fs::write(
            project.root().join("docs/examples/example-1-rabi.py"),
            "# %%\nraise RuntimeError('detuning out of range')\n",
        )
        .unwrap();

        let err = project.builder().build().unwrap_err();
        match err {
            BuildError::Execution(ExecutionError::Failed { script, line, output }) => {
                assert!(script.ends_with("examples/example-1-rabi.py"));
                assert_eq!(line, 1);
                assert!(output.contains("detuning out of range"));
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(project.read("index.html"), before);
        // No staging leftovers next to the site
        let entries: Vec<_> = fs::read_dir(project.root())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| n.starts_with(".atomdocs"))
            .collect();
        assert!(entries.is_empty());
    }

    #[test]
    fn missing_example_is_a_configuration_error() {
        let project = Project::new();
        fs::remove_file(project.root().join("docs/examples/example-1-rabi.py")).unwrap();

        let err = project.builder().build().unwrap_err();

        match err {
            BuildError::Configuration(ConfigError::MissingPage { path, .. }) => {
                assert!(path.ends_with("examples/example-1-rabi.py"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!project.root().join("site").exists());
    }

    #[test]
    fn rejects_non_python_kernels() {
        let project = Project::new();
        fs::write(
            project.root().join("docs/examples/example-1-rabi.py"),
            "# ---\n# jupyter:\n#   kernelspec:\n#     language: julia\n#     name: julia\n# ---\n\n# %%\nx = 1\n",
        )
        .unwrap();

        let err = project.builder().build().unwrap_err();

        assert!(matches!(err, BuildError::Render { .. }));
        assert_eq!(project.runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn execution_can_be_disabled() {
        let project = Project::new();
        fs::write(
            project.root().join("atomdocs.yml"),
            format!("{}plugins:\n  - notebooks:\n      execute: false\n      download_source: false\n", CONFIG),
        )
        .unwrap();

        let result = project.builder().build().unwrap();

        assert_eq!(result.scripts, 0);
        assert_eq!(project.runs.load(Ordering::SeqCst), 0);
        assert!(!project.read("examples/example-1-rabi/index.html").contains("line 8"));
        assert!(!project.root().join("site/search-index.json").exists());
    }

    fn page_item(title: &str, path: &str) -> NavItem {
        NavItem {
            title: title.to_string(),
            path: path.to_string(),
            children: vec![],
            section: false,
            active: false,
            external: false,
        }
    }

    fn section_item(title: &str, children: Vec<NavItem>) -> NavItem {
        NavItem {
            section: true,
            children,
            ..page_item(title, "")
        }
    }

    #[test]
    fn marks_active_navigation() {
        let items = vec![
            section_item(
                "Tutorials",
                vec![page_item("Tutorial 1", "examples/example-1-rabi/")],
            ),
            page_item("Home", ""),
        ];

        let marked = mark_active(&items, "examples/example-1-rabi/");

        assert!(marked[0].active);
        assert!(marked[0].children[0].active);
        assert!(!marked[1].active);
    }

    #[test]
    fn empty_section_is_not_active_on_home() {
        let items = vec![page_item("Home", ""), section_item("Drafts", vec![])];

        let marked = mark_active(&items, "");

        assert!(marked[0].active);
        assert!(!marked[1].active);
    }
}
