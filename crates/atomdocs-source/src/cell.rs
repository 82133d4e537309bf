//! Cell markers and cells of percent-format scripts.

/// Kind of a script cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellKind {
    /// Executable source (default)
    #[default]
    Code,
    /// Commented markdown prose
    Markdown,
    /// Raw content, never executed or rendered
    Raw,
}

impl CellKind {
    /// Parse the bracketed kind after a `# %%` marker.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "markdown" | "md" => Some(Self::Markdown),
            "raw" => Some(Self::Raw),
            "code" => Some(Self::Code),
            _ => None,
        }
    }
}

/// A parsed `# %%` marker line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CellMarker {
    pub kind: CellKind,
    pub title: Option<String>,
    pub tags: Vec<String>,
}

impl CellMarker {
    /// Parse a line as a cell marker.
    ///
    /// Returns `Ok(None)` when the line is not a marker at all, and an error
    /// message when it is a marker with malformed metadata.
    ///
    /// Supports forms like:
    /// - `# %%`
    /// - `# %% [markdown]`
    /// - `# %% Setup tags=["remove-input"]`
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim_end();
        let Some(rest) = line.strip_prefix("# %%") else {
            return Ok(None);
        };

        // `# %%%` and similar are ordinary comments
        if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
            return Ok(None);
        }

        let mut rest = rest.trim().to_string();
        let mut kind = CellKind::Code;

        if rest.starts_with('[') {
            let close = rest
                .find(']')
                .ok_or_else(|| "unclosed cell kind bracket".to_string())?;
            kind = CellKind::from_tag(&rest[1..close])
                .ok_or_else(|| format!("unknown cell kind '{}'", &rest[1..close]))?;
            rest = rest[close + 1..].trim().to_string();
        }

        let mut tags = Vec::new();
        if let Some(start) = rest.find("tags=") {
            let list = &rest[start + 5..];
            if !list.starts_with('[') {
                return Err("tags must be a list".to_string());
            }
            let close = list
                .find(']')
                .ok_or_else(|| "unclosed tags list".to_string())?;
            tags = serde_json::from_str::<Vec<String>>(&list[..=close])
                .map_err(|e| format!("invalid tags list: {}", e))?;
            rest = format!("{}{}", &rest[..start], &list[close + 1..])
                .trim()
                .to_string();
        }

        let title = if rest.is_empty() { None } else { Some(rest) };

        Ok(Some(Self { kind, title, tags }))
    }
}

/// A cell of a parsed script.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// Unique identifier for this cell (format: cell-{line_number})
    pub id: String,

    pub kind: CellKind,

    /// Cell content; for markdown cells the comment prefix is already removed
    pub source: String,

    /// Line of the marker, or of the first line for an implicit cell (1-indexed)
    pub line_number: usize,

    /// Script line holding the first line of `source` (1-indexed)
    pub source_line: usize,

    pub title: Option<String>,

    pub tags: Vec<String>,
}

impl Cell {
    /// Create a new cell.
    pub fn new(kind: CellKind, source: String, line_number: usize) -> Self {
        Self {
            id: format!("cell-{}", line_number),
            kind,
            source,
            line_number,
            source_line: line_number + 1,
            title: None,
            tags: Vec::new(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Whether the cell is executed.
    pub fn is_code(&self) -> bool {
        self.kind == CellKind::Code
    }

    /// Whether the cell is left out of the rendered page entirely.
    pub fn is_removed(&self) -> bool {
        self.kind == CellKind::Raw || self.has_tag("remove-cell")
    }

    /// Whether the source of a code cell is shown.
    pub fn shows_input(&self) -> bool {
        !self.is_removed() && !self.has_tag("remove-input")
    }

    /// Whether the execution output of a code cell is shown.
    pub fn shows_output(&self) -> bool {
        !self.is_removed() && !self.has_tag("remove-output")
    }
}
