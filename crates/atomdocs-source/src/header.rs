//! Jupytext header extraction for percent-format scripts.
//!
//! A script may open with a commented YAML block:
//!
//! ```text
//! # ---
//! # jupyter:
//! #   kernelspec:
//! #     language: python
//! # ---
//! ```

use serde::Deserialize;

/// Parsed notebook header.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct NotebookHeader {
    #[serde(default)]
    pub jupyter: JupyterMeta,
}

/// The `jupyter` section of a header.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct JupyterMeta {
    #[serde(default)]
    pub jupytext: Option<JupytextMeta>,

    #[serde(default)]
    pub kernelspec: Option<Kernelspec>,
}

/// Jupytext pairing metadata.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct JupytextMeta {
    #[serde(default)]
    pub formats: Option<String>,

    #[serde(default)]
    pub text_representation: Option<TextRepresentation>,
}

/// How the notebook is represented as text.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TextRepresentation {
    #[serde(default)]
    pub extension: Option<String>,

    #[serde(default)]
    pub format_name: Option<String>,
}

/// Kernel the script was authored against.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Kernelspec {
    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub name: Option<String>,
}

impl NotebookHeader {
    /// Kernel language declared in the header, if any.
    pub fn language(&self) -> Option<&str> {
        self.jupyter
            .kernelspec
            .as_ref()
            .and_then(|k| k.language.as_deref())
    }

    /// Text format name declared in the header, if any.
    pub fn format_name(&self) -> Option<&str> {
        self.jupyter
            .jupytext
            .as_ref()
            .and_then(|j| j.text_representation.as_ref())
            .and_then(|t| t.format_name.as_deref())
    }
}

/// Extract the header block from a script.
///
/// Returns the header, the remaining source, and the number of lines consumed.
pub fn extract_header(source: &str) -> Result<(Option<NotebookHeader>, &str, usize), HeaderError> {
    let mut lines = source.split_inclusive('\n');

    match lines.next() {
        Some(first) if first.trim_end() == "# ---" => {}
        _ => return Ok((None, source, 0)),
    }

    let mut offset = source.split_inclusive('\n').next().map_or(0, str::len);
    let mut consumed = 1;
    let mut yaml = String::new();

    for line in lines {
        offset += line.len();
        consumed += 1;

        let trimmed = line.trim_end();
        if trimmed == "# ---" {
            let header = if yaml.trim().is_empty() {
                NotebookHeader::default()
            } else {
                serde_yaml::from_str(&yaml).map_err(|e| HeaderError::InvalidYaml(e.to_string()))?
            };
            return Ok((Some(header), &source[offset..], consumed));
        }

        let Some(body) = uncomment(trimmed) else {
            return Err(HeaderError::NotCommented(consumed));
        };
        yaml.push_str(body);
        yaml.push('\n');
    }

    Err(HeaderError::Unclosed)
}

/// Strip the comment prefix from a header or markdown line.
pub(crate) fn uncomment(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix("# ") {
        Some(rest)
    } else {
        line.strip_prefix('#')
    }
}

/// Errors that can occur when parsing a notebook header.
#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    #[error("Unclosed notebook header - missing closing # ---")]
    Unclosed,

    #[error("Header line {0} is not a comment")]
    NotCommented(usize),

    #[error("Invalid YAML in notebook header: {0}")]
    InvalidYaml(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const RABI_HEADER: &str = r#"# ---
# jupyter:
#   jupytext:
#     formats: ipynb,py:percent
#     hide_notebook_metadata: false
#     text_representation:
#       extension: .py
#       format_name: percent
#       format_version: '1.3'
#       jupytext_version: 1.14.5
#   kernelspec:
#     display_name: .venv
#     language: python
#     name: python3
# ---

# %% [markdown]
# # Single Qubit Rabi Oscillations
"#;

    #[test]
    fn extracts_jupytext_header() {
        let (header, rest, consumed) = extract_header(RABI_HEADER).unwrap();
        let header = header.unwrap();

        assert_eq!(header.language(), Some("python"));
        assert_eq!(header.format_name(), Some("percent"));
        assert_eq!(consumed, 15);
        assert!(rest.starts_with("\n# %% [markdown]"));
    }

    #[test]
    fn handles_missing_header() {
        let source = "# %%\nprint('hi')\n";

        let (header, rest, consumed) = extract_header(source).unwrap();

        assert!(header.is_none());
        assert_eq!(rest, source);
        assert_eq!(consumed, 0);
    }

    #[test]
    fn errors_on_unclosed_header() {
        let result = extract_header("# ---\n# jupyter: {}\nprint(1)\n");

        assert!(matches!(result, Err(HeaderError::NotCommented(3))));

        let result = extract_header("# ---\n# jupyter: {}\n");
        assert!(matches!(result, Err(HeaderError::Unclosed)));
    }

    #[test]
    fn errors_on_invalid_yaml() {
        let result = extract_header("# ---\n# jupyter: [oops\n# ---\n");

        assert!(matches!(result, Err(HeaderError::InvalidYaml(_))));
    }
}
