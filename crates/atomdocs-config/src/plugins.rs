//! Plugin option set.
//!
//! Plugins are declared as an ordered list, each item either a bare name or a
//! single `name: { options }` pair. Options are deserialized strictly: unknown
//! keys are configuration errors.

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_yaml::Value;

use crate::error::ConfigError;

pub const SEARCH: &str = "search";
pub const NOTEBOOKS: &str = "notebooks";
pub const API_REFERENCE: &str = "api-reference";
pub const VERSIONING: &str = "versioning";

const KNOWN_PLUGINS: &[&str] = &[SEARCH, NOTEBOOKS, API_REFERENCE, VERSIONING];

/// Options for the search index plugin.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchOptions {
    /// Include page text in the index, not only titles
    pub include_content: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            include_content: true,
        }
    }
}

/// Options for executing and rendering example scripts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotebookOptions {
    /// Run scripts and embed their output
    pub execute: bool,

    /// Show code cells on the rendered page
    pub include_source: bool,

    /// Render failing cells instead of aborting the build
    pub allow_errors: bool,

    /// Per-script timeout in seconds
    pub timeout: Option<u64>,

    /// Interpreter used to run scripts
    pub interpreter: String,

    /// Copy the script next to its page and link it
    pub download_source: bool,
}

impl Default for NotebookOptions {
    fn default() -> Self {
        Self {
            execute: true,
            include_source: true,
            allow_errors: false,
            timeout: None,
            interpreter: "python3".to_string(),
            download_source: true,
        }
    }
}

/// Options for generating API reference pages from Python sources.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiReferenceOptions {
    /// Search paths, relative to the configuration file
    pub paths: Vec<PathBuf>,

    /// Dotted package names to document
    pub packages: Vec<String>,

    /// Navigation section title
    pub title: String,

    /// Include names starting with an underscore
    pub show_private: bool,
}

impl Default for ApiReferenceOptions {
    fn default() -> Self {
        Self {
            paths: vec![PathBuf::from("src")],
            packages: Vec::new(),
            title: "API Reference".to_string(),
            show_private: false,
        }
    }
}

/// How version aliases are materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasType {
    /// Full copy of the aliased version
    #[default]
    Copy,
    /// Redirect page pointing at the aliased version
    Redirect,
}

/// Options for versioned deployments.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VersioningOptions {
    pub alias_type: AliasType,

    /// Version or alias the site root redirects to
    pub default_version: Option<String>,

    /// Render a version selector in the page header
    pub version_selector: bool,
}

impl Default for VersioningOptions {
    fn default() -> Self {
        Self {
            alias_type: AliasType::Copy,
            default_version: None,
            version_selector: true,
        }
    }
}

/// The validated plugin option set.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginSet {
    order: Vec<String>,
    pub search: Option<SearchOptions>,
    pub notebooks: Option<NotebookOptions>,
    pub api_reference: Option<ApiReferenceOptions>,
    pub versioning: Option<VersioningOptions>,
}

impl Default for PluginSet {
    /// `search` and `notebooks` with default options.
    fn default() -> Self {
        Self {
            order: vec![SEARCH.to_string(), NOTEBOOKS.to_string()],
            search: Some(SearchOptions::default()),
            notebooks: Some(NotebookOptions::default()),
            api_reference: None,
            versioning: None,
        }
    }
}

impl PluginSet {
    /// Parse the `plugins` list. `None` yields the default set.
    pub fn from_yaml(value: Option<&Value>) -> Result<Self, ConfigError> {
        let Some(value) = value else {
            return Ok(Self::default());
        };

        let items = match value {
            Value::Sequence(items) => items.as_slice(),
            Value::Null => &[],
            _ => {
                return Err(ConfigError::Invalid(
                    "plugins must be a list of names or `name: options` pairs".to_string(),
                ))
            }
        };

        let mut set = Self {
            order: Vec::new(),
            search: None,
            notebooks: None,
            api_reference: None,
            versioning: None,
        };

        for item in items {
            let (name, options) = match item {
                Value::String(name) => (name.clone(), Value::Null),
                Value::Mapping(map) if map.len() == 1 => {
                    let Some((key, options)) = map.iter().next() else {
                        continue;
                    };
                    let name = key.as_str().ok_or_else(|| {
                        ConfigError::Invalid("plugin name must be a string".to_string())
                    })?;
                    (name.to_string(), options.clone())
                }
                _ => {
                    return Err(ConfigError::Invalid(
                        "plugin entries must be a name or a single `name: options` pair"
                            .to_string(),
                    ))
                }
            };

            if !KNOWN_PLUGINS.contains(&name.as_str()) {
                return Err(ConfigError::UnknownPlugin(name));
            }
            if set.order.contains(&name) {
                return Err(ConfigError::DuplicatePlugin(name));
            }

            match name.as_str() {
                SEARCH => set.search = Some(parse_options(&name, options)?),
                NOTEBOOKS => set.notebooks = Some(parse_options(&name, options)?),
                API_REFERENCE => {
                    let opts: ApiReferenceOptions = parse_options(&name, options)?;
                    if opts.packages.is_empty() {
                        return Err(ConfigError::InvalidPluginOptions {
                            plugin: name,
                            message: "at least one package is required".to_string(),
                        });
                    }
                    set.api_reference = Some(opts);
                }
                VERSIONING => set.versioning = Some(parse_options(&name, options)?),
                _ => unreachable!("checked against KNOWN_PLUGINS"),
            }

            set.order.push(name);
        }

        Ok(set)
    }

    /// Enabled plugin names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.order.iter().any(|n| n == name)
    }
}

fn parse_options<T: DeserializeOwned + Default>(name: &str, options: Value) -> Result<T, ConfigError> {
    if options.is_null() {
        return Ok(T::default());
    }
    serde_yaml::from_value(options).map_err(|e| ConfigError::InvalidPluginOptions {
        plugin: name.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugins(source: &str) -> Result<PluginSet, ConfigError> {
        let value: Value = serde_yaml::from_str(source).unwrap();
        PluginSet::from_yaml(Some(&value))
    }

    #[test]
    fn defaults_when_absent() {
        let set = PluginSet::from_yaml(None).unwrap();

        assert_eq!(set.names().collect::<Vec<_>>(), vec!["search", "notebooks"]);
        assert_eq!(set.notebooks, Some(NotebookOptions::default()));
        assert!(!set.notebooks.unwrap().allow_errors);
    }

    #[test]
    fn parses_plugin_options() {
        let set = plugins(
            r#"
- search
- notebooks:
    include_source: true
    allow_errors: false
    timeout: 600
- api-reference:
    paths: [src]
    packages: [bloqade.analog]
- versioning:
    alias_type: redirect
"#,
        )
        .unwrap();

        assert_eq!(
            set.names().collect::<Vec<_>>(),
            vec!["search", "notebooks", "api-reference", "versioning"]
        );
        assert_eq!(set.notebooks.as_ref().unwrap().timeout, Some(600));
        assert_eq!(
            set.api_reference.as_ref().unwrap().packages,
            vec!["bloqade.analog"]
        );
        assert_eq!(set.versioning.unwrap().alias_type, AliasType::Redirect);
    }

    #[test]
    fn empty_list_disables_everything() {
        let set = plugins("[]").unwrap();

        assert!(set.search.is_none());
        assert!(set.notebooks.is_none());
        assert!(!set.is_enabled(SEARCH));
    }

    #[test]
    fn rejects_unknown_and_duplicate_plugins() {
        assert!(matches!(
            plugins("- gallery\n"),
            Err(ConfigError::UnknownPlugin(name)) if name == "gallery"
        ));
        assert!(matches!(
            plugins("- search\n- search\n"),
            Err(ConfigError::DuplicatePlugin(_))
        ));
    }

    #[test]
    fn rejects_unknown_options() {
        let err = plugins("- notebooks:\n    execute_all: true\n").unwrap_err();

        assert!(matches!(err, ConfigError::InvalidPluginOptions { plugin, .. } if plugin == "notebooks"));
    }

    #[test]
    fn api_reference_requires_packages() {
        assert!(plugins("- api-reference\n").is_err());
    }
}
