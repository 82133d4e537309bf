//! Project manifest (`pyproject.toml`) reading.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// License declaration, in any of the accepted `pyproject.toml` forms.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum License {
    Expression(String),
    Text { text: String },
    File { file: String },
}

impl License {
    /// Short human-readable form.
    pub fn label(&self) -> &str {
        match self {
            License::Expression(s) => s,
            License::Text { text } => text,
            License::File { file } => file,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    project: Option<RawProject>,
    #[serde(rename = "build-system")]
    build_system: Option<RawBuildSystem>,
}

#[derive(Debug, Deserialize)]
struct RawProject {
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    license: Option<License>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default, rename = "optional-dependencies")]
    optional_dependencies: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawBuildSystem {
    #[serde(default, rename = "build-backend")]
    build_backend: Option<String>,
}

/// Package metadata of the documented project.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectManifest {
    pub name: String,
    pub version: Option<String>,
    pub license: Option<License>,
    pub dependencies: Vec<String>,
    pub optional_dependencies: BTreeMap<String, Vec<String>>,
    pub build_backend: Option<String>,
}

impl ProjectManifest {
    /// Load a manifest. A missing file is not an error.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            tracing::debug!("No manifest at {}", path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Self::from_toml_str(&content, path).map(Some)
    }

    /// Parse manifest content; `path` is only used in error messages.
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidManifest {
            path: path.to_path_buf(),
            message,
        };

        let raw: RawManifest = toml::from_str(content).map_err(|e| invalid(e.to_string()))?;
        let project = raw
            .project
            .ok_or_else(|| invalid("missing [project] table".to_string()))?;

        Ok(Self {
            name: project.name,
            version: project.version,
            license: project.license,
            dependencies: project.dependencies,
            optional_dependencies: project.optional_dependencies,
            build_backend: raw.build_system.and_then(|b| b.build_backend),
        })
    }

    /// Distribution names of all required and optional dependencies.
    pub fn dependency_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .dependencies
            .iter()
            .chain(self.optional_dependencies.values().flatten())
            .map(|req| normalize_name(requirement_name(req)))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Whether a distribution is declared as a dependency.
    pub fn requires(&self, name: &str) -> bool {
        let wanted = normalize_name(name);
        self.dependency_names().iter().any(|n| *n == wanted)
    }
}

/// Name part of a PEP 508 requirement string.
fn requirement_name(requirement: &str) -> &str {
    let end = requirement
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        .unwrap_or(requirement.len());
    &requirement[..end]
}

/// PEP 503 normalization: lowercase, runs of `-_.` become `-`.
fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_dash = false;
    for c in name.trim().chars() {
        if matches!(c, '-' | '_' | '.') {
            if !last_dash {
                out.push('-');
            }
            last_dash = true;
        } else {
            out.extend(c.to_lowercase());
            last_dash = false;
        }
    }
    out
}
