//! API reference pages generated from Python sources.
//!
//! Sources are read, never imported: module docstrings, top-level classes and
//! functions, and the methods of classes are recovered from the text with a
//! handful of patterns.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use walkdir::WalkDir;

use atomdocs_config::{ApiReferenceOptions, ConfigError};
use atomdocs_source::{SlugRegistry, TocEntry};

use crate::builder::BuildError;
use crate::render::{escape_html, MarkdownRenderer, Rendered};

/// One documented Python module.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiModule {
    /// Dotted module name
    pub name: String,
    pub source: PathBuf,
    pub doc: Option<String>,
    pub items: Vec<ApiItem>,
}

impl ApiModule {
    /// Output URL of the module's page.
    pub fn url(&self) -> String {
        format!("reference/{}/", self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Class,
    Function,
}

/// A class, function or method.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiItem {
    pub kind: ItemKind,
    pub name: String,
    /// Declaration as written, whitespace-normalized (`def f(x: int) -> str`)
    pub signature: String,
    pub decorators: Vec<String>,
    pub doc: Option<String>,
    /// Methods, for classes
    pub members: Vec<ApiItem>,
}

fn def_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<indent>[ \t]*)(?P<async>async\s+)?def\s+(?P<name>\w+)")
            .expect("valid def pattern")
    })
}

fn class_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<indent>[ \t]*)class\s+(?P<name>\w+)").expect("valid class pattern")
    })
}

/// Find and parse every module of the configured packages.
///
/// Each package is looked up under the configured source paths, either as a
/// package directory or a single module file. Modules come back sorted by
/// name, packages before their submodules.
pub fn collect_modules(
    options: &ApiReferenceOptions,
    root: &Path,
) -> Result<Vec<ApiModule>, BuildError> {
    let mut modules = Vec::new();

    for package in &options.packages {
        let relative: PathBuf = package.split('.').collect();

        let location = options
            .paths
            .iter()
            .map(|p| root.join(p).join(&relative))
            .find(|dir| dir.join("__init__.py").is_file() || dir.with_extension("py").is_file())
            .ok_or_else(|| {
                BuildError::Configuration(ConfigError::InvalidPluginOptions {
                    plugin: "api-reference".to_string(),
                    message: format!(
                        "package '{}' not found under {}",
                        package,
                        options
                            .paths
                            .iter()
                            .map(|p| p.display().to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                })
            })?;

        if location.is_dir() {
            for entry in WalkDir::new(&location)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| {
                    e.depth() == 0
                        || e.file_type().is_file()
                        || is_public_package_dir(e.path(), options.show_private)
                })
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("py") {
                    continue;
                }

                let Some(name) = module_name(package, &location, path) else {
                    continue;
                };
                if !options.show_private && is_private_module(&name) {
                    continue;
                }

                modules.push(read_module(&name, path, options.show_private)?);
            }
        } else {
            let file = location.with_extension("py");
            modules.push(read_module(package, &file, options.show_private)?);
        }
    }

    modules.sort_by(|a, b| a.name.cmp(&b.name));
    modules.dedup_by(|a, b| a.name == b.name);

    tracing::debug!("Collected {} API modules", modules.len());
    Ok(modules)
}

fn is_public_package_dir(path: &Path, show_private: bool) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if name == "__pycache__" || name.starts_with('.') {
        return false;
    }
    show_private || !name.starts_with('_')
}

fn module_name(package: &str, package_dir: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(package_dir).ok()?.with_extension("");
    let mut name = package.to_string();
    for part in relative.components() {
        let part = part.as_os_str().to_str()?;
        if part != "__init__" {
            name.push('.');
            name.push_str(part);
        }
    }
    Some(name)
}

fn is_private_module(name: &str) -> bool {
    name.rsplit('.')
        .next()
        .is_some_and(|last| last.starts_with('_'))
}

fn read_module(name: &str, path: &Path, show_private: bool) -> Result<ApiModule, BuildError> {
    let source = fs::read_to_string(path)
        .map_err(|e| BuildError::ReadError(format!("{}: {}", path.display(), e)))?;

    let mut module = parse_module(name, &source, show_private);
    module.source = path.to_path_buf();
    Ok(module)
}

/// Extract the documented items of one module's source.
pub fn parse_module(name: &str, source: &str, show_private: bool) -> ApiModule {
    let lines: Vec<&str> = source.lines().collect();
    let in_string = string_mask(&lines);

    let doc = lines
        .iter()
        .position(|l| {
            let t = l.trim();
            !t.is_empty() && !t.starts_with('#')
        })
        .and_then(|start| docstring_at(&lines, start))
        .map(|(doc, _)| doc);

    let items = scan_items(&lines, &in_string, 0, lines.len(), "", show_private);

    ApiModule {
        name: name.to_string(),
        source: PathBuf::new(),
        doc,
        items,
    }
}

/// Items declared at exactly `indent` within `lines[start..end]`.
fn scan_items(
    lines: &[&str],
    in_string: &[bool],
    start: usize,
    end: usize,
    indent: &str,
    show_private: bool,
) -> Vec<ApiItem> {
    let mut items = Vec::new();
    let mut i = start;

    while i < end {
        let line = lines[i];
        if in_string[i] {
            i += 1;
            continue;
        }

        let (kind, captures) = match class_pattern().captures(line) {
            Some(c) => (ItemKind::Class, c),
            None => match def_pattern().captures(line) {
                Some(c) => (ItemKind::Function, c),
                None => {
                    i += 1;
                    continue;
                }
            },
        };

        if &captures["indent"] != indent {
            i += 1;
            continue;
        }

        let name = captures["name"].to_string();
        let name_end = captures.name("name").map_or(line.len(), |m| m.end());
        let Some((tail, header_end)) = declaration_tail(lines, i, name_end) else {
            i += 1;
            continue;
        };

        let body_end = block_end(lines, in_string, header_end + 1, end, indent);

        if is_public(&name) || show_private {
            let keyword = match kind {
                ItemKind::Class => "class".to_string(),
                ItemKind::Function if captures.name("async").is_some() => "async def".to_string(),
                ItemKind::Function => "def".to_string(),
            };

            let doc = (header_end + 1..body_end)
                .find(|&k| !lines[k].trim().is_empty())
                .and_then(|k| docstring_at(lines, k))
                .map(|(doc, _)| doc);

            let members = match kind {
                ItemKind::Class => {
                    let member_indent = body_indent(lines, header_end + 1, body_end);
                    scan_items(lines, in_string, header_end + 1, body_end, member_indent, show_private)
                        .into_iter()
                        .filter(|m| m.kind == ItemKind::Function)
                        .collect()
                }
                ItemKind::Function => Vec::new(),
            };

            items.push(ApiItem {
                kind,
                signature: format!("{} {}{}", keyword, name, tail),
                name,
                decorators: decorators_before(lines, i, indent),
                doc,
                members,
            });
        }

        i = body_end.max(i + 1);
    }

    items
}

fn is_public(name: &str) -> bool {
    !name.starts_with('_') || name == "__init__" || name == "__call__"
}

/// Text between the item name and the colon ending its declaration, which
/// may span lines. Returns the normalized text and the line the declaration
/// ends on.
fn declaration_tail(lines: &[&str], start: usize, column: usize) -> Option<(String, usize)> {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut text = String::new();

    for (index, line) in lines.iter().enumerate().skip(start) {
        let segment = if index == start { line.get(column..)? } else { *line };

        for c in segment.chars() {
            match quote {
                Some(q) => {
                    if c == q {
                        quote = None;
                    }
                }
                None => match c {
                    '\'' | '"' => quote = Some(c),
                    '(' | '[' | '{' => depth += 1,
                    ')' | ']' | '}' => depth -= 1,
                    '#' if depth == 0 => break,
                    ':' if depth == 0 => return Some((normalize_declaration(&text), index)),
                    _ => {}
                },
            }
            text.push(c);
        }
        text.push(' ');
    }

    None
}

fn normalize_declaration(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace("( ", "(")
        .replace(" )", ")")
        .replace(",)", ")")
}

/// First line at or after `start` that closes a block opened at `indent`.
fn block_end(lines: &[&str], in_string: &[bool], start: usize, end: usize, indent: &str) -> usize {
    (start..end)
        .find(|&k| {
            let line = lines[k];
            !in_string[k]
                && !line.trim().is_empty()
                && leading_whitespace(line).len() <= indent.len()
        })
        .unwrap_or(end)
}

fn body_indent<'a>(lines: &[&'a str], start: usize, end: usize) -> &'a str {
    (start..end)
        .map(|k| lines[k])
        .find(|l| !l.trim().is_empty())
        .map_or("    ", leading_whitespace)
}

fn leading_whitespace(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

fn decorators_before(lines: &[&str], index: usize, indent: &str) -> Vec<String> {
    let mut decorators: Vec<String> = lines[..index]
        .iter()
        .rev()
        .take_while(|l| l.starts_with(indent) && l.trim_start().starts_with('@'))
        .map(|l| l.trim().to_string())
        .collect();
    decorators.reverse();
    decorators
}

/// Whether each line starts inside a triple-quoted string.
fn string_mask(lines: &[&str]) -> Vec<bool> {
    let mut open: Option<&str> = None;
    lines
        .iter()
        .map(|line| {
            let inside = open.is_some();
            let mut rest = *line;
            loop {
                let next = match open {
                    Some(q) => rest.find(q).map(|p| (p, q)),
                    None => ["\"\"\"", "'''"]
                        .iter()
                        .filter_map(|q| rest.find(q).map(|p| (p, *q)))
                        .min_by_key(|(p, _)| *p),
                };
                let Some((position, q)) = next else { break };
                open = if open.is_some() { None } else { Some(q) };
                rest = &rest[position + 3..];
            }
            inside
        })
        .collect()
}

/// Docstring starting at `start`, cleaned of indentation.
fn docstring_at(lines: &[&str], start: usize) -> Option<(String, usize)> {
    let first = lines.get(start)?.trim_start();
    let body = first.trim_start_matches(['r', 'R', 'u', 'U']);
    let quote = if body.starts_with("\"\"\"") {
        "\"\"\""
    } else if body.starts_with("'''") {
        "'''"
    } else {
        return None;
    };

    let rest = &body[3..];
    if let Some(end) = rest.find(quote) {
        return clean_docstring(&rest[..end]).map(|doc| (doc, start));
    }

    let mut text = rest.to_string();
    for (index, line) in lines.iter().enumerate().skip(start + 1) {
        text.push('\n');
        if let Some(end) = line.find(quote) {
            text.push_str(&line[..end]);
            return clean_docstring(&text).map(|doc| (doc, index));
        }
        text.push_str(line);
    }

    None
}

/// Strip the common indentation of all lines after the first.
fn clean_docstring(text: &str) -> Option<String> {
    let mut lines = text.lines();
    let first = lines.next().unwrap_or("").trim().to_string();
    let rest: Vec<&str> = lines.collect();

    let margin = rest
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| leading_whitespace(l).len())
        .min()
        .unwrap_or(0);

    let mut cleaned = vec![first];
    cleaned.extend(
        rest.iter()
            .map(|l| l.get(margin..).unwrap_or("").trim_end().to_string()),
    );

    let doc = cleaned.join("\n").trim().to_string();
    (!doc.is_empty()).then_some(doc)
}

/// Render a module page.
pub fn render_module(module: &ApiModule, renderer: &MarkdownRenderer<'_>) -> Rendered {
    let mut slugs = SlugRegistry::default();
    let mut rendered = Rendered::default();

    let module_id = slugs.assign(&module.name);
    rendered.html.push_str(&format!(
        "<h1 id=\"{}\"><code>{}</code></h1>\n",
        module_id,
        escape_html(&module.name)
    ));
    rendered.toc.push(TocEntry {
        title: module.name.clone(),
        id: module_id,
        level: 1,
    });
    rendered.text.push_str(&module.name);

    if let Some(doc) = &module.doc {
        render_doc(doc, renderer, &mut rendered);
    }

    for item in &module.items {
        render_item(item, 2, renderer, &mut slugs, &mut rendered);
    }

    rendered
}

fn render_item(
    item: &ApiItem,
    level: u8,
    renderer: &MarkdownRenderer<'_>,
    slugs: &mut SlugRegistry,
    rendered: &mut Rendered,
) {
    let id = slugs.assign(&item.name);
    let kind = match item.kind {
        ItemKind::Class => "class",
        ItemKind::Function if level > 2 => "method",
        ItemKind::Function => "function",
    };

    rendered.html.push_str(&format!(
        "<section class=\"api-item\">\n<h{level} id=\"{id}\"><span class=\"api-kind\">{kind}</span> <code>{name}</code></h{level}>\n",
        level = level,
        id = id,
        kind = kind,
        name = escape_html(&item.name)
    ));

    let mut signature = String::new();
    for decorator in &item.decorators {
        signature.push_str(decorator);
        signature.push('\n');
    }
    signature.push_str(&item.signature);
    rendered.html.push_str(&format!(
        "<pre class=\"api-signature\">{}</pre>\n",
        escape_html(&signature)
    ));

    rendered.toc.push(TocEntry {
        title: item.name.clone(),
        id,
        level,
    });
    rendered.text.push(' ');
    rendered.text.push_str(&item.name);

    if let Some(doc) = &item.doc {
        render_doc(doc, renderer, rendered);
    }

    if !item.members.is_empty() {
        rendered.html.push_str("<div class=\"api-members\">\n");
        for member in &item.members {
            render_item(member, level + 1, renderer, slugs, rendered);
        }
        rendered.html.push_str("</div>\n");
    }

    rendered.html.push_str("</section>\n");
}

fn render_doc(doc: &str, renderer: &MarkdownRenderer<'_>, rendered: &mut Rendered) {
    // Docstring headings stay out of the page outline
    let body = renderer.render(doc, &mut SlugRegistry::default());
    rendered.html.push_str("<div class=\"api-doc\">\n");
    rendered.html.push_str(&body.html);
    rendered.html.push_str("</div>\n");
    if !body.text.is_empty() {
        rendered.text.push(' ');
        rendered.text.push_str(&body.text);
    }
}
