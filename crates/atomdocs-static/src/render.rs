//! Rendering of markdown pages and example scripts to HTML.

use std::path::{Component, Path};

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};

use atomdocs_config::nav::is_external;
use atomdocs_config::{MarkdownExtension, ResolvedNav, ResolvedPage};
use atomdocs_exec::{CellOutput, ExecutionOutput};
use atomdocs_source::{CellKind, ParsedScript, SlugRegistry, TocEntry};

/// Rendered page body.
#[derive(Debug, Clone, Default)]
pub struct Rendered {
    pub html: String,

    /// Headings with the ids assigned in `html`
    pub toc: Vec<TocEntry>,

    /// Plain text, for the search index
    pub text: String,
}

impl Rendered {
    fn append(&mut self, other: Rendered) {
        self.html.push_str(&other.html);
        self.toc.extend(other.toc);
        if !other.text.is_empty() {
            if !self.text.is_empty() {
                self.text.push(' ');
            }
            self.text.push_str(&other.text);
        }
    }
}

/// pulldown-cmark options for the configured extensions.
pub fn markdown_options(extensions: &[MarkdownExtension]) -> Options {
    extensions.iter().fold(Options::empty(), |options, ext| {
        options
            | match ext {
                MarkdownExtension::Tables => Options::ENABLE_TABLES,
                MarkdownExtension::Footnotes => Options::ENABLE_FOOTNOTES,
                MarkdownExtension::Strikethrough => Options::ENABLE_STRIKETHROUGH,
                MarkdownExtension::Tasklists => Options::ENABLE_TASKLISTS,
                MarkdownExtension::SmartPunctuation => Options::ENABLE_SMART_PUNCTUATION,
                MarkdownExtension::HeadingAttributes => Options::ENABLE_HEADING_ATTRIBUTES,
                MarkdownExtension::Math => Options::ENABLE_MATH,
            }
    })
}

/// Relative prefix leading from a page at `depth` back to the site root.
pub fn root_prefix(depth: usize) -> String {
    if depth == 0 {
        "./".to_string()
    } else {
        "../".repeat(depth)
    }
}

/// Markdown renderer for one page.
///
/// With a link context, relative links are resolved against the page's
/// source directory: links to navigation pages point at their URLs and other
/// links point at the copied static file.
pub struct MarkdownRenderer<'a> {
    options: Options,
    links: Option<(&'a ResolvedNav, &'a ResolvedPage)>,
}

impl<'a> MarkdownRenderer<'a> {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            links: None,
        }
    }

    /// Rewrite relative links as seen from `page`.
    pub fn with_links(mut self, nav: &'a ResolvedNav, page: &'a ResolvedPage) -> Self {
        self.links = Some((nav, page));
        self
    }

    /// Render markdown, assigning heading ids from `slugs`.
    pub fn render(&self, markdown: &str, slugs: &mut SlugRegistry) -> Rendered {
        let mut events: Vec<Event> = Parser::new_ext(markdown, self.options)
            .map(|event| self.rewrite_link(event))
            .collect();

        for event in &events {
            if let Event::Start(Tag::Heading { id: Some(id), .. }) = event {
                slugs.reserve(id);
            }
        }

        let mut toc = Vec::new();
        let mut text = String::new();

        let mut i = 0;
        while i < events.len() {
            if let Event::Start(Tag::Heading { level, id, .. }) = &events[i] {
                let level = *level as u8;
                let explicit = id.as_ref().map(|id| id.to_string());

                let mut title = String::new();
                let mut j = i + 1;
                while j < events.len() && !matches!(events[j], Event::End(TagEnd::Heading(_))) {
                    if let Event::Text(t) | Event::Code(t) = &events[j] {
                        title.push_str(t);
                    }
                    j += 1;
                }

                let anchor = match explicit {
                    Some(anchor) => anchor,
                    None => {
                        let anchor = slugs.assign(&title);
                        if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
                            *id = Some(CowStr::from(anchor.clone()));
                        }
                        anchor
                    }
                };

                push_text(&mut text, &title);
                toc.push(TocEntry {
                    title,
                    id: anchor,
                    level,
                });
                i = j;
            } else if let Event::Text(t) | Event::Code(t) = &events[i] {
                push_text(&mut text, t);
            }
            i += 1;
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        Rendered {
            html: html_output,
            toc,
            text,
        }
    }

    /// Render an example script: markdown cells as prose, code cells with
    /// their source and captured output.
    ///
    /// `outputs` holds one entry per code cell in order; cells past the end
    /// render without output.
    pub fn render_script(
        &self,
        script: &ParsedScript,
        outputs: Option<&ExecutionOutput>,
        include_source: bool,
    ) -> Rendered {
        let mut slugs = SlugRegistry::default();
        let mut rendered = Rendered::default();
        let mut code_index = 0;

        for cell in &script.cells {
            if cell.kind == CellKind::Code {
                let output = outputs.and_then(|o| o.cells.get(code_index));
                code_index += 1;

                if cell.is_removed() {
                    continue;
                }

                let mut body = String::new();
                if include_source && cell.shows_input() && !cell.source.is_empty() {
                    body.push_str(&format!(
                        "<pre class=\"cell-input\"><code class=\"language-python\">{}</code></pre>\n",
                        escape_html(&cell.source)
                    ));
                }
                if let Some(output) = output.filter(|_| cell.shows_output()) {
                    body.push_str(&render_output(output));
                }

                if !body.is_empty() {
                    rendered.html.push_str(&format!(
                        "<div class=\"cell cell-code\" id=\"{}\">\n{}</div>\n",
                        cell.id, body
                    ));
                }
            } else if cell.kind == CellKind::Markdown && !cell.is_removed() {
                let markdown = self.render(&cell.source, &mut slugs);
                rendered.html.push_str("<div class=\"cell cell-markdown\">\n");
                rendered.append(markdown);
                rendered.html.push_str("</div>\n");
            }
        }

        rendered
    }

    fn rewrite_link<'e>(&self, event: Event<'e>) -> Event<'e> {
        match event {
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => {
                let dest_url = self.resolve_target(&dest_url).map_or(dest_url, CowStr::from);
                Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                })
            }
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) => {
                let dest_url = self.resolve_target(&dest_url).map_or(dest_url, CowStr::from);
                Event::Start(Tag::Image {
                    link_type,
                    dest_url,
                    title,
                    id,
                })
            }
            other => other,
        }
    }

    /// Site-relative replacement for a relative link, if it needs one.
    fn resolve_target(&self, dest: &str) -> Option<String> {
        let (nav, page) = self.links?;
        if dest.is_empty() || dest.starts_with('#') || dest.starts_with('/') || is_external(dest) {
            return None;
        }

        let (path, fragment) = match dest.split_once('#') {
            Some((path, fragment)) => (path, format!("#{}", fragment)),
            None => (dest, String::new()),
        };

        let mut parts: Vec<String> = page
            .relative_path
            .parent()
            .unwrap_or(Path::new(""))
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().to_string()),
                _ => None,
            })
            .collect();
        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    // Links above the docs root are left alone
                    parts.pop()?;
                }
                s => parts.push(s.to_string()),
            }
        }

        let target = parts.join("/");
        let url = match nav.page_for(Path::new(&target)) {
            Some(linked) => linked.url.clone(),
            None => {
                if target.ends_with(".md") {
                    tracing::warn!(
                        "{} links to {}, which is not in the navigation",
                        page.relative_path.display(),
                        target
                    );
                }
                target
            }
        };

        Some(format!("{}{}{}", root_prefix(page.depth()), url, fragment))
    }
}

fn render_output(output: &CellOutput) -> String {
    let mut html = String::new();

    if !output.stdout.is_empty() {
        html.push_str(&format!(
            "<pre class=\"cell-output\">{}</pre>\n",
            escape_html(output.stdout.trim_end())
        ));
    }
    if !output.stderr.is_empty() {
        html.push_str(&format!(
            "<pre class=\"cell-output cell-stderr\">{}</pre>\n",
            escape_html(output.stderr.trim_end())
        ));
    }
    for (n, figure) in output.figures.iter().enumerate() {
        html.push_str(&format!(
            "<figure class=\"cell-figure\"><img src=\"figures/{}\" alt=\"Figure {}\" loading=\"lazy\"></figure>\n",
            escape_html(figure),
            n + 1
        ));
    }
    if let Some(error) = &output.error {
        html.push_str(&format!(
            "<pre class=\"cell-output cell-error\">{}</pre>\n",
            escape_html(error.trim_end())
        ));
    }

    html
}

fn push_text(text: &mut String, fragment: &str) {
    let fragment = fragment.trim();
    if fragment.is_empty() {
        return;
    }
    if !text.is_empty() {
        text.push(' ');
    }
    text.push_str(fragment);
}

/// Escape text for inclusion in HTML content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
