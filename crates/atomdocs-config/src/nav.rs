//! Navigation tree parsing and resolution.
//!
//! The `nav` list of the site configuration is an ordered, arbitrarily nested
//! list of `(label, target)` entries. Targets with a URL scheme are external
//! links and are never checked against the filesystem; all other targets are
//! paths relative to the docs directory and must exist.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use serde_yaml::Value;
use walkdir::WalkDir;

use crate::error::ConfigError;

/// A navigation entry as declared in configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum NavEntry {
    /// Sub-menu
    Section {
        label: String,
        children: Vec<NavEntry>,
    },

    /// External URL
    Link { label: String, url: String },

    /// Local page; the label falls back to the page title when absent
    Page { label: Option<String>, path: String },
}

impl NavEntry {
    /// Parse the `nav` list.
    pub fn parse_list(value: &Value, location: &str) -> Result<Vec<NavEntry>, ConfigError> {
        let Value::Sequence(items) = value else {
            return Err(ConfigError::InvalidNav {
                location: location.to_string(),
                message: "expected a list of entries".to_string(),
            });
        };

        items
            .iter()
            .enumerate()
            .map(|(index, item)| Self::parse_item(item, &format!("{}[{}]", location, index)))
            .collect()
    }

    fn parse_item(value: &Value, location: &str) -> Result<NavEntry, ConfigError> {
        let invalid = |message: &str| ConfigError::InvalidNav {
            location: location.to_string(),
            message: message.to_string(),
        };

        match value {
            Value::String(target) => Ok(Self::leaf(None, target)),
            Value::Mapping(map) => {
                if map.len() != 1 {
                    return Err(invalid("expected exactly one `label: target` pair"));
                }
                let Some((key, target)) = map.iter().next() else {
                    return Err(invalid("empty entry"));
                };
                let label = key
                    .as_str()
                    .ok_or_else(|| invalid("label must be a string"))?
                    .to_string();

                match target {
                    Value::String(target) => Ok(Self::leaf(Some(label), target)),
                    Value::Sequence(_) => {
                        let children =
                            Self::parse_list(target, &format!("{}/{}", location, label))?;
                        Ok(NavEntry::Section { label, children })
                    }
                    _ => Err(invalid("target must be a path, a URL, or a list of entries")),
                }
            }
            _ => Err(invalid("expected a path or a `label: target` pair")),
        }
    }

    fn leaf(label: Option<String>, target: &str) -> NavEntry {
        if is_external(target) {
            NavEntry::Link {
                label: label.unwrap_or_else(|| target.to_string()),
                url: target.to_string(),
            }
        } else {
            NavEntry::Page {
                label,
                path: target.to_string(),
            }
        }
    }

    /// Build a navigation list from the contents of the docs directory.
    ///
    /// `index.md` comes first, then pages by file name, then subdirectories as
    /// sections. Only `.md` and `.py` files become pages.
    pub fn discover(docs_dir: &Path) -> Result<Vec<NavEntry>, ConfigError> {
        if !docs_dir.is_dir() {
            return Err(ConfigError::Read {
                path: docs_dir.to_path_buf(),
                message: "docs directory not found".to_string(),
            });
        }
        Ok(discover_dir(docs_dir, Path::new("")))
    }
}

fn discover_dir(dir: &Path, relative: &Path) -> Vec<NavEntry> {
    let mut pages = Vec::new();
    let mut sections = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || name.starts_with('_') {
            continue;
        }
        let rel = relative.join(&name);

        if entry.file_type().is_dir() {
            let children = discover_dir(entry.path(), &rel);
            if !children.is_empty() {
                sections.push(NavEntry::Section {
                    label: capitalize(&name.replace(['-', '_'], " ")),
                    children,
                });
            }
        } else if PageKind::from_path(&rel).is_some() {
            let page = NavEntry::Page {
                label: None,
                path: to_url_path(&rel),
            };
            if rel.file_stem().is_some_and(|s| s == "index") {
                pages.insert(0, page);
            } else {
                pages.push(page);
            }
        }
    }

    pages.extend(sections);
    pages
}

/// Whether a target is an external URL rather than a local path.
pub fn is_external(target: &str) -> bool {
    let Some((scheme, _)) = target.split_once(':') else {
        return false;
    };
    // Single letters are Windows drive prefixes
    scheme.len() > 1
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Kind of a local page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Markdown page with optional frontmatter
    Markdown,
    /// Percent-format example script, executed at build time
    Script,
}

impl PageKind {
    /// Classify a page by extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("md") => Some(Self::Markdown),
            Some("py") => Some(Self::Script),
            _ => None,
        }
    }
}

/// A local page leaf after resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPage {
    /// Label from configuration, if given
    pub label: Option<String>,

    /// Path on disk
    pub source_path: PathBuf,

    /// Path relative to the docs directory
    pub relative_path: PathBuf,

    pub kind: PageKind,

    /// Directory-style URL relative to the site root ("" for the home page)
    pub url: String,
}

impl ResolvedPage {
    /// Label from configuration, or a fallback derived from the file stem.
    pub fn fallback_label(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        let stem = self
            .relative_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Untitled");
        if stem == "index" {
            "Home".to_string()
        } else {
            capitalize(&stem.replace(['-', '_'], " "))
        }
    }

    /// Number of directory levels between this page's output and the site root.
    pub fn depth(&self) -> usize {
        self.url.split('/').filter(|s| !s.is_empty()).count()
    }
}

/// A node of the resolved navigation tree.
#[derive(Debug, Clone, PartialEq)]
pub enum NavNode {
    Section {
        label: String,
        children: Vec<NavNode>,
    },
    Link {
        label: String,
        url: String,
    },
    Page(ResolvedPage),
}

/// Navigation tree with every local leaf validated against the filesystem.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedNav {
    pub nodes: Vec<NavNode>,
}

impl ResolvedNav {
    /// Resolve entries against the docs directory.
    ///
    /// Fails on the first entry whose local target is missing, escapes the
    /// docs directory, or is not a page type.
    pub fn resolve(entries: &[NavEntry], docs_dir: &Path) -> Result<Self, ConfigError> {
        let nodes = resolve_entries(entries, docs_dir, "nav")?;
        let nav = Self { nodes };

        // Distinct sources must not collide on one output URL
        let mut seen: HashMap<&str, &Path> = HashMap::new();
        for page in nav.all_pages() {
            if let Some(first) = seen.insert(page.url.as_str(), page.source_path.as_path()) {
                if first != page.source_path.as_path() {
                    return Err(ConfigError::DuplicateUrl {
                        url: page.url.clone(),
                        first: first.to_path_buf(),
                        second: page.source_path.clone(),
                    });
                }
            }
        }

        Ok(nav)
    }

    /// Unique pages in navigation order.
    pub fn pages(&self) -> Vec<&ResolvedPage> {
        let mut seen = std::collections::HashSet::new();
        self.all_pages()
            .into_iter()
            .filter(|p| seen.insert(p.url.as_str()))
            .collect()
    }

    fn all_pages(&self) -> Vec<&ResolvedPage> {
        fn walk<'a>(nodes: &'a [NavNode], out: &mut Vec<&'a ResolvedPage>) {
            for node in nodes {
                match node {
                    NavNode::Section { children, .. } => walk(children, out),
                    NavNode::Page(page) => out.push(page),
                    NavNode::Link { .. } => {}
                }
            }
        }

        let mut out = Vec::new();
        walk(&self.nodes, &mut out);
        out
    }

    /// Look up a page by its docs-relative path.
    pub fn page_for(&self, relative: &Path) -> Option<&ResolvedPage> {
        self.all_pages()
            .into_iter()
            .find(|p| p.relative_path == relative)
    }
}

fn resolve_entries(
    entries: &[NavEntry],
    docs_dir: &Path,
    location: &str,
) -> Result<Vec<NavNode>, ConfigError> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let location = format!("{}[{}]", location, index);
            match entry {
                NavEntry::Section { label, children } => Ok(NavNode::Section {
                    label: label.clone(),
                    children: resolve_entries(
                        children,
                        docs_dir,
                        &format!("{}/{}", location, label),
                    )?,
                }),
                NavEntry::Link { label, url } => Ok(NavNode::Link {
                    label: label.clone(),
                    url: url.clone(),
                }),
                NavEntry::Page { label, path } => {
                    resolve_page(label.clone(), path, docs_dir, &location).map(NavNode::Page)
                }
            }
        })
        .collect()
}

fn resolve_page(
    label: Option<String>,
    path: &str,
    docs_dir: &Path,
    location: &str,
) -> Result<ResolvedPage, ConfigError> {
    let relative = Path::new(path);

    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(ConfigError::InvalidNav {
            location: location.to_string(),
            message: format!("path must stay inside the docs directory: {}", path),
        });
    }
    let relative: PathBuf = relative
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    let kind = PageKind::from_path(&relative).ok_or_else(|| ConfigError::UnsupportedPage {
        location: location.to_string(),
        path: relative.clone(),
    })?;

    let source_path = docs_dir.join(&relative);
    if !source_path.is_file() {
        return Err(ConfigError::MissingPage {
            location: location.to_string(),
            path: source_path,
        });
    }

    tracing::debug!("Resolved {} -> {}", location, source_path.display());

    let url = page_url(&relative);
    Ok(ResolvedPage {
        label,
        source_path,
        relative_path: relative,
        kind,
        url,
    })
}

/// Directory-style URL for a docs-relative page path.
///
/// `examples/example-1-rabi.py` -> `examples/example-1-rabi/`, `index.md` -> ``.
pub fn page_url(relative: &Path) -> String {
    let stem = relative
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("index");
    let parent = relative.parent().map(to_url_path).unwrap_or_default();

    let mut url = String::new();
    if !parent.is_empty() {
        url.push_str(&parent);
        url.push('/');
    }
    if stem != "index" {
        url.push_str(stem);
        url.push('/');
    }
    url
}

/// Join path components with `/`, dropping `.` components.
pub fn to_url_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Capitalize first letter of a string.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn nav_yaml(source: &str) -> Vec<NavEntry> {
        let value: Value = serde_yaml::from_str(source).unwrap();
        NavEntry::parse_list(&value, "nav").unwrap()
    }

    fn docs_with(files: &[&str]) -> tempfile::TempDir {
        let temp = tempdir().unwrap();
        for file in files {
            let path = temp.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "# page\n").unwrap();
        }
        temp
    }

    #[test]
    fn parses_nested_entries() {
        let entries = nav_yaml(
            r#"
- index.md
- Tutorials:
    - Tutorial 1: examples/example-1-rabi.py
    - Tutorial 2: examples/example-1-ramsey.py
- Blog: https://queracomputing.github.io/bloqade-analog/latest/blog/
"#,
        );

        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries[0],
            NavEntry::Page {
                label: None,
                path: "index.md".to_string()
            }
        );
        assert!(matches!(&entries[1], NavEntry::Section { label, children }
            if label == "Tutorials" && children.len() == 2));
        assert!(matches!(&entries[2], NavEntry::Link { label, .. } if label == "Blog"));
    }

    #[test]
    fn resolves_local_page_leaf() {
        let docs = docs_with(&["examples/example-1-rabi.py"]);
        let entries = nav_yaml("- Tutorial 1: examples/example-1-rabi.py\n");

        let nav = ResolvedNav::resolve(&entries, docs.path()).unwrap();
        let pages = nav.pages();

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].label.as_deref(), Some("Tutorial 1"));
        assert_eq!(pages[0].kind, PageKind::Script);
        assert_eq!(
            pages[0].source_path,
            docs.path().join("examples/example-1-rabi.py")
        );
        assert_eq!(pages[0].url, "examples/example-1-rabi/");
        assert_eq!(pages[0].depth(), 2);
    }

    #[test]
    fn external_links_are_not_checked_on_disk() {
        let docs = docs_with(&[]);
        let entries = nav_yaml("- Docs: https://queracomputing.github.io/bloqade-analog/\n");

        let nav = ResolvedNav::resolve(&entries, docs.path()).unwrap();

        assert!(nav.pages().is_empty());
        assert!(matches!(&nav.nodes[0], NavNode::Link { url, .. }
            if url == "https://queracomputing.github.io/bloqade-analog/"));
    }

    #[test]
    fn missing_page_names_entry_and_path() {
        let docs = docs_with(&["index.md"]);
        let entries = nav_yaml(
            "- index.md\n- Tutorials:\n    - Tutorial 1: examples/example-1-rabi.py\n",
        );

        let err = ResolvedNav::resolve(&entries, docs.path()).unwrap_err();

        match err {
            ConfigError::MissingPage { location, path } => {
                assert_eq!(location, "nav[1]/Tutorials[0]");
                assert!(path.ends_with("examples/example-1-rabi.py"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_unsupported_and_escaping_targets() {
        let docs = docs_with(&["data.json"]);

        let err = ResolvedNav::resolve(&nav_yaml("- Data: data.json\n"), docs.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedPage { .. }));

        let err =
            ResolvedNav::resolve(&nav_yaml("- Up: ../secret.md\n"), docs.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNav { .. }));
    }

    #[test]
    fn rejects_url_collisions() {
        let docs = docs_with(&["rabi.md", "rabi.py"]);
        let entries = nav_yaml("- A: rabi.md\n- B: rabi.py\n");

        let err = ResolvedNav::resolve(&entries, docs.path()).unwrap_err();

        assert!(matches!(err, ConfigError::DuplicateUrl { url, .. } if url == "rabi/"));
    }

    #[test]
    fn dot_prefixed_paths_resolve_like_plain_ones() {
        let docs = docs_with(&["index.md", "guide/about.md"]);
        let entries = nav_yaml("- ./index.md\n- About: guide/./about.md\n");

        let nav = ResolvedNav::resolve(&entries, docs.path()).unwrap();

        let about = nav.page_for(Path::new("guide/about.md")).unwrap();
        assert_eq!(about.relative_path, PathBuf::from("guide/about.md"));
        assert_eq!(about.url, "guide/about/");
        assert_eq!(nav.page_for(Path::new("index.md")).unwrap().url, "");
    }

    #[test]
    fn repeated_page_is_listed_once() {
        let docs = docs_with(&["index.md"]);
        let entries = nav_yaml("- Home: index.md\n- Again: index.md\n");

        let nav = ResolvedNav::resolve(&entries, docs.path()).unwrap();

        assert_eq!(nav.pages().len(), 1);
    }

    #[test]
    fn rejects_malformed_entries() {
        let value: Value = serde_yaml::from_str("- {a: x.md, b: y.md}\n").unwrap();
        assert!(NavEntry::parse_list(&value, "nav").is_err());

        let value: Value = serde_yaml::from_str("- Label: 3\n").unwrap();
        assert!(NavEntry::parse_list(&value, "nav").is_err());
    }

    #[test]
    fn discovers_pages_from_docs_dir() {
        let docs = docs_with(&[
            "about.md",
            "index.md",
            "examples/example-1-rabi.py",
            "examples/data/job.json",
            "_drafts/wip.md",
        ]);

        let entries = NavEntry::discover(docs.path()).unwrap();

        assert_eq!(
            entries,
            vec![
                NavEntry::Page {
                    label: None,
                    path: "index.md".to_string()
                },
                NavEntry::Page {
                    label: None,
                    path: "about.md".to_string()
                },
                NavEntry::Section {
                    label: "Examples".to_string(),
                    children: vec![NavEntry::Page {
                        label: None,
                        path: "examples/example-1-rabi.py".to_string()
                    }],
                },
            ]
        );
    }

    #[test]
    fn page_urls() {
        assert_eq!(page_url(Path::new("index.md")), "");
        assert_eq!(page_url(Path::new("guide/index.md")), "guide/");
        assert_eq!(page_url(Path::new("./about.md")), "about/");
    }

    #[test]
    fn detects_external_targets() {
        assert!(is_external("https://example.com"));
        assert!(is_external("mailto:team@example.com"));
        assert!(!is_external("examples/rabi.py"));
        assert!(!is_external("C:/docs/rabi.py"));
    }
}
