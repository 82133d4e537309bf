//! Configuration errors.

use std::path::PathBuf;

/// Errors raised while loading or validating configuration.
///
/// Navigation variants carry the location of the offending entry, written as
/// `nav[1]/Tutorials[0]`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid navigation entry at {location}: {message}")]
    InvalidNav { location: String, message: String },

    #[error("Navigation entry at {location} references a missing file: {path}")]
    MissingPage { location: String, path: PathBuf },

    #[error("Navigation entry at {location} has unsupported page type: {path} (expected .md or .py)")]
    UnsupportedPage { location: String, path: PathBuf },

    #[error("Pages {first} and {second} both render to URL '/{url}'")]
    DuplicateUrl {
        url: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Unknown plugin: {0}")]
    UnknownPlugin(String),

    #[error("Plugin configured more than once: {0}")]
    DuplicatePlugin(String),

    #[error("Invalid options for plugin '{plugin}': {message}")]
    InvalidPluginOptions { plugin: String, message: String },

    #[error("Unknown markdown extension: {0}")]
    UnknownExtension(String),

    #[error("Invalid manifest {path}: {message}")]
    InvalidManifest { path: PathBuf, message: String },

    #[error("{0}")]
    Invalid(String),
}
