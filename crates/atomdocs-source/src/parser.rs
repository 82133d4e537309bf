//! Page parsers for markdown pages and percent-format scripts.

use std::collections::{HashMap, HashSet};

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

use crate::cell::{Cell, CellKind, CellMarker};
use crate::frontmatter::{extract_frontmatter, Frontmatter, FrontmatterError};
use crate::header::{extract_header, uncomment, HeaderError, NotebookHeader};

/// A parsed markdown page.
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// Parsed frontmatter (if present)
    pub frontmatter: Option<Frontmatter>,

    /// Markdown content (without frontmatter)
    pub content: String,

    /// Table of contents entries
    pub toc: Vec<TocEntry>,
}

impl ParsedPage {
    /// Page title from frontmatter, falling back to the first level-1 heading.
    pub fn title(&self) -> Option<String> {
        self.frontmatter
            .as_ref()
            .and_then(|f| f.title.clone())
            .or_else(|| first_title(&self.toc))
    }
}

/// A parsed percent-format script.
#[derive(Debug, Clone)]
pub struct ParsedScript {
    /// Jupytext header (if present)
    pub header: Option<NotebookHeader>,

    /// Cells in source order
    pub cells: Vec<Cell>,

    /// Table of contents built from markdown cells
    pub toc: Vec<TocEntry>,
}

impl ParsedScript {
    /// Title from the first level-1 heading of a markdown cell.
    pub fn title(&self) -> Option<String> {
        first_title(&self.toc)
    }

    /// Code cells in execution order.
    pub fn code_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|c| c.is_code())
    }
}

/// A table of contents entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TocEntry {
    /// Heading text
    pub title: String,
    /// Anchor ID
    pub id: String,
    /// Heading level (1-6)
    pub level: u8,
}

/// Errors that can occur when parsing a page.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Frontmatter error: {0}")]
    Frontmatter(#[from] FrontmatterError),

    #[error("Header error: {0}")]
    Header(#[from] HeaderError),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Unsupported script format '{0}', expected percent")]
    UnsupportedFormat(String),
}

/// Parse a markdown page.
pub fn parse_markdown(source: &str) -> Result<ParsedPage, ParseError> {
    let (frontmatter, content) = extract_frontmatter(source)?;

    let mut slugs = SlugRegistry::default();
    let toc = collect_toc(content, &mut slugs);

    Ok(ParsedPage {
        frontmatter,
        content: content.to_string(),
        toc,
    })
}

/// Parse a percent-format script into cells.
pub fn parse_script(source: &str) -> Result<ParsedScript, ParseError> {
    let (header, body, header_lines) = extract_header(source)?;

    if let Some(format) = header.as_ref().and_then(|h| h.format_name()) {
        if format != "percent" {
            return Err(ParseError::UnsupportedFormat(format.to_string()));
        }
    }

    let mut cells = Vec::new();
    let mut current: Option<(CellMarker, usize)> = None;
    let mut buffer: Vec<&str> = Vec::new();

    for (index, line) in body.lines().enumerate() {
        let line_number = header_lines + index + 1;

        let marker = CellMarker::parse(line).map_err(|message| ParseError::Parse {
            line: line_number,
            message,
        })?;

        match marker {
            Some(marker) => {
                flush_cell(&mut cells, current.take(), &buffer, header_lines + 1);
                buffer.clear();
                current = Some((marker, line_number));
            }
            None => buffer.push(line),
        }
    }
    flush_cell(&mut cells, current, &buffer, header_lines + 1);

    let mut slugs = SlugRegistry::default();
    let toc = cells
        .iter()
        .filter(|c| c.kind == CellKind::Markdown && !c.is_removed())
        .flat_map(|c| collect_toc(&c.source, &mut slugs))
        .collect();

    Ok(ParsedScript {
        header,
        cells,
        toc,
    })
}

/// Turn buffered lines into a cell.
///
/// Lines before the first marker form an implicit code cell when not blank.
fn flush_cell(
    cells: &mut Vec<Cell>,
    marker: Option<(CellMarker, usize)>,
    lines: &[&str],
    implicit_line: usize,
) {
    let (marker, line_number, first_line) = match marker {
        Some((m, line)) => (m, line, line + 1),
        None => {
            if lines.iter().all(|l| l.trim().is_empty()) {
                return;
            }
            (CellMarker::default(), implicit_line, implicit_line)
        }
    };

    let source = match marker.kind {
        CellKind::Markdown => lines
            .iter()
            .map(|l| uncomment(l.trim_end()).unwrap_or(*l))
            .collect::<Vec<_>>()
            .join("\n"),
        CellKind::Code | CellKind::Raw => lines.join("\n"),
    };

    let leading_blank = source.lines().take_while(|l| l.trim().is_empty()).count();

    let mut cell = Cell::new(marker.kind, trim_blank_lines(&source), line_number);
    cell.source_line = first_line + leading_blank;
    cell.title = marker.title;
    cell.tags = marker.tags;
    cells.push(cell);
}

/// Remove leading and trailing blank lines, keeping indentation.
fn trim_blank_lines(source: &str) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());

    match (start, end) {
        (Some(s), Some(e)) => lines[s..=e].join("\n"),
        _ => String::new(),
    }
}

fn first_title(toc: &[TocEntry]) -> Option<String> {
    toc.iter().find(|e| e.level == 1).map(|e| e.title.clone())
}

/// Collect headings from markdown, assigning ids from the registry.
pub fn collect_toc(markdown: &str, slugs: &mut SlugRegistry) -> Vec<TocEntry> {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS;

    let mut toc = Vec::new();
    let mut current_heading: Option<(u8, String)> = None;

    for event in Parser::new_ext(markdown, options) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                current_heading = Some((level as u8, String::new()));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, ref mut heading_text)) = current_heading {
                    heading_text.push_str(&text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, title)) = current_heading.take() {
                    let id = slugs.assign(&title);
                    toc.push(TocEntry { title, id, level });
                }
            }
            _ => {}
        }
    }

    toc
}

/// Hands out unique heading anchors within one page.
///
/// Repeated headings get `-1`, `-2`, ... suffixes in order of appearance.
/// Reserved ids are never handed out.
#[derive(Debug, Default)]
pub struct SlugRegistry {
    seen: HashMap<String, usize>,
    taken: HashSet<String>,
}

impl SlugRegistry {
    /// Mark an id set explicitly on the page as taken.
    pub fn reserve(&mut self, id: &str) {
        self.taken.insert(id.to_string());
    }

    pub fn assign(&mut self, title: &str) -> String {
        let base = slugify(title);
        loop {
            let count = self.seen.entry(base.clone()).or_insert(0);
            let id = if *count == 0 {
                base.clone()
            } else {
                format!("{}-{}", base, count)
            };
            *count += 1;
            if self.taken.insert(id.clone()) {
                return id;
            }
        }
    }
}

/// Convert a heading to a URL-safe slug.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else if c.is_whitespace() || c == '-' || c == '_' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|c| *c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
