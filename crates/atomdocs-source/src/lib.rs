//! Source parsing for atomdocs pages.
//!
//! This crate parses the two kinds of pages a site is built from: markdown pages
//! with optional YAML frontmatter, and example scripts in the Jupytext "percent"
//! format, split into code, markdown and raw cells.

pub mod cell;
pub mod frontmatter;
pub mod header;
pub mod parser;

pub use cell::{Cell, CellKind, CellMarker};
pub use frontmatter::Frontmatter;
pub use header::{Kernelspec, NotebookHeader};
pub use parser::{
    collect_toc, parse_markdown, parse_script, slugify, ParseError, ParsedPage, ParsedScript,
    SlugRegistry, TocEntry,
};
