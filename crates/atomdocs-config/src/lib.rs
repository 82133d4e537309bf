//! Site configuration for atomdocs.
//!
//! Loads the `atomdocs.yml` site configuration, resolves its navigation tree
//! against the docs directory, validates the plugin option set, and reads the
//! project's `pyproject.toml` manifest.

pub mod error;
pub mod manifest;
pub mod nav;
pub mod plugins;
pub mod site;

pub use error::ConfigError;
pub use manifest::{License, ProjectManifest};
pub use nav::{NavEntry, NavNode, PageKind, ResolvedNav, ResolvedPage};
pub use plugins::{
    AliasType, ApiReferenceOptions, NotebookOptions, PluginSet, SearchOptions, VersioningOptions,
};
pub use site::{MarkdownExtension, SiteConfig, ThemeConfig};
