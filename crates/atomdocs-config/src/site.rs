//! Site configuration file (`atomdocs.yml`).

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;

use crate::error::ConfigError;
use crate::manifest::ProjectManifest;
use crate::nav::{NavEntry, ResolvedNav};
use crate::plugins::PluginSet;

/// Theme settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    /// Theme name; only the built-in `default` theme exists
    pub name: String,

    /// Accent color, any CSS color value
    pub primary_color: Option<String>,

    /// Logo path relative to the docs directory
    pub logo: Option<String>,

    /// Favicon path relative to the docs directory
    pub favicon: Option<String>,

    /// Directory of templates overriding the built-in ones
    pub custom_dir: Option<PathBuf>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            primary_color: None,
            logo: None,
            favicon: None,
            custom_dir: None,
        }
    }
}

/// Markdown syntax extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkdownExtension {
    Tables,
    Footnotes,
    Strikethrough,
    Tasklists,
    SmartPunctuation,
    HeadingAttributes,
    Math,
}

impl MarkdownExtension {
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name {
            "tables" => Ok(Self::Tables),
            "footnotes" => Ok(Self::Footnotes),
            "strikethrough" => Ok(Self::Strikethrough),
            "tasklists" => Ok(Self::Tasklists),
            "smart_punctuation" => Ok(Self::SmartPunctuation),
            "heading_attributes" => Ok(Self::HeadingAttributes),
            "math" => Ok(Self::Math),
            other => Err(ConfigError::UnknownExtension(other.to_string())),
        }
    }

    /// Extensions enabled when the configuration names none.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::Tables,
            Self::Footnotes,
            Self::Strikethrough,
            Self::Tasklists,
        ]
    }
}

/// Configuration file structure (atomdocs.yml).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSiteConfig {
    site_name: String,
    #[serde(default)]
    site_url: Option<String>,
    #[serde(default)]
    site_description: Option<String>,
    #[serde(default)]
    repo_url: Option<String>,
    #[serde(default)]
    copyright: Option<String>,
    #[serde(default = "default_docs_dir")]
    docs_dir: PathBuf,
    #[serde(default = "default_site_dir")]
    site_dir: PathBuf,
    #[serde(default = "default_manifest")]
    manifest: PathBuf,
    #[serde(default)]
    theme: ThemeConfig,
    #[serde(default)]
    extra_css: Vec<PathBuf>,
    #[serde(default)]
    markdown_extensions: Option<Vec<String>>,
    #[serde(default)]
    nav: Option<Value>,
    #[serde(default)]
    plugins: Option<Value>,
    #[serde(default = "default_minify")]
    minify: bool,
}

fn default_docs_dir() -> PathBuf {
    PathBuf::from("docs")
}
fn default_site_dir() -> PathBuf {
    PathBuf::from("site")
}
fn default_manifest() -> PathBuf {
    PathBuf::from("pyproject.toml")
}
fn default_minify() -> bool {
    true
}

/// Validated site configuration. All paths are resolved against the
/// directory containing the configuration file.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Directory containing the configuration file
    pub root: PathBuf,
    pub site_name: String,
    pub site_url: Option<String>,
    pub site_description: Option<String>,
    pub repo_url: Option<String>,
    pub copyright: Option<String>,
    pub docs_dir: PathBuf,
    pub site_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub theme: ThemeConfig,
    pub extra_css: Vec<PathBuf>,
    pub markdown_extensions: Vec<MarkdownExtension>,
    /// Declared navigation; `None` means discover it from the docs directory
    pub nav: Option<Vec<NavEntry>>,
    pub plugins: PluginSet,
    pub minify: bool,
}

impl SiteConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        let config = Self::from_yaml_str(&content, root).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;

        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse configuration content with relative paths resolved against `root`.
    pub fn from_yaml_str(content: &str, root: &Path) -> Result<Self, ConfigError> {
        let raw: RawSiteConfig = serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("atomdocs.yml"),
            message: e.to_string(),
        })?;

        if raw.site_name.trim().is_empty() {
            return Err(ConfigError::Invalid("site_name must not be empty".to_string()));
        }
        if raw.theme.name != "default" {
            return Err(ConfigError::Invalid(format!(
                "Unknown theme '{}', only 'default' is available",
                raw.theme.name
            )));
        }

        let markdown_extensions = match raw.markdown_extensions {
            Some(names) => names
                .iter()
                .map(|n| MarkdownExtension::parse(n))
                .collect::<Result<Vec<_>, _>>()?,
            None => MarkdownExtension::defaults(),
        };

        let nav = raw
            .nav
            .as_ref()
            .map(|value| NavEntry::parse_list(value, "nav"))
            .transpose()?;

        let plugins = PluginSet::from_yaml(raw.plugins.as_ref())?;

        let mut theme = raw.theme;
        theme.custom_dir = theme.custom_dir.map(|d| root.join(d));

        Ok(Self {
            root: root.to_path_buf(),
            site_name: raw.site_name,
            site_url: raw.site_url,
            site_description: raw.site_description,
            repo_url: raw.repo_url,
            copyright: raw.copyright,
            docs_dir: root.join(raw.docs_dir),
            site_dir: root.join(raw.site_dir),
            manifest_path: root.join(raw.manifest),
            theme,
            extra_css: raw.extra_css.into_iter().map(|p| root.join(p)).collect(),
            markdown_extensions,
            nav,
            plugins,
            minify: raw.minify,
        })
    }

    /// Resolve the navigation tree against the docs directory.
    pub fn resolve_nav(&self) -> Result<ResolvedNav, ConfigError> {
        match &self.nav {
            Some(entries) => ResolvedNav::resolve(entries, &self.docs_dir),
            None => {
                let entries = NavEntry::discover(&self.docs_dir)?;
                ResolvedNav::resolve(&entries, &self.docs_dir)
            }
        }
    }

    /// Load the project manifest, if one exists.
    pub fn manifest(&self) -> Result<Option<ProjectManifest>, ConfigError> {
        ProjectManifest::load(&self.manifest_path)
    }

    /// Resolve a path relative to the configuration root.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::NavNode;
    use std::fs;
    use tempfile::tempdir;

    const CONFIG: &str = r##"
site_name: Bloqade Analog Examples
site_url: https://queracomputing.github.io/bloqade-analog-examples/
repo_url: https://github.com/QuEraComputing/bloqade-analog-examples
docs_dir: docs
theme:
  primary_color: "#6437FF"
markdown_extensions: [tables, math]
nav:
  - Home: index.md
  - Tutorials:
      - Tutorial 1: examples/example-1-rabi.py
  - SDK: https://queracomputing.github.io/bloqade-analog/latest/
plugins:
  - search
  - notebooks:
      allow_errors: false
"##;

    #[test]
    fn loads_configuration_file() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("atomdocs.yml");
        fs::write(&config_path, CONFIG).unwrap();

        let config = SiteConfig::load(&config_path).unwrap();

        assert_eq!(config.site_name, "Bloqade Analog Examples");
        assert_eq!(config.docs_dir, temp.path().join("docs"));
        assert_eq!(config.site_dir, temp.path().join("site"));
        assert_eq!(
            config.markdown_extensions,
            vec![MarkdownExtension::Tables, MarkdownExtension::Math]
        );
        assert_eq!(config.theme.primary_color.as_deref(), Some("#6437FF"));
        assert_eq!(config.nav.as_ref().unwrap().len(), 3);
        assert!(config.plugins.is_enabled("notebooks"));
        assert!(config.minify);
    }

    #[test]
    fn resolves_navigation_against_docs_dir() {
        let temp = tempdir().unwrap();
        let docs = temp.path().join("docs");
        fs::create_dir_all(docs.join("examples")).unwrap();
        fs::write(docs.join("index.md"), "# Home").unwrap();
        fs::write(docs.join("examples/example-1-rabi.py"), "# %%\n").unwrap();

        let config = SiteConfig::from_yaml_str(CONFIG, temp.path()).unwrap();
        let nav = config.resolve_nav().unwrap();

        assert_eq!(nav.pages().len(), 2);
        assert!(matches!(&nav.nodes[2], NavNode::Link { label, .. } if label == "SDK"));
    }

    #[test]
    fn missing_file_reports_read_error() {
        let err = SiteConfig::load(Path::new("/nonexistent/atomdocs.yml")).unwrap_err();

        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn rejects_unknown_fields_and_extensions() {
        let root = Path::new(".");

        let err = SiteConfig::from_yaml_str("site_name: X\nsite_nmae: Y\n", root).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let err =
            SiteConfig::from_yaml_str("site_name: X\nmarkdown_extensions: [admonition]\n", root)
                .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownExtension(e) if e == "admonition"));

        let err = SiteConfig::from_yaml_str("site_name: X\ntheme:\n  name: material\n", root)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn absent_nav_is_discovered() {
        let temp = tempdir().unwrap();
        let docs = temp.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("index.md"), "# Home").unwrap();

        let config = SiteConfig::from_yaml_str("site_name: X\n", temp.path()).unwrap();

        assert!(config.nav.is_none());
        assert_eq!(config.resolve_nav().unwrap().pages().len(), 1);
        assert_eq!(
            config.markdown_extensions,
            MarkdownExtension::defaults()
        );
    }
}
