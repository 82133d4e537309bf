//! Versioned deployments.
//!
//! Each version lives in `site_dir/<version>/`. `site_dir/versions.json`
//! records the deployed versions newest first, and aliases such as `latest`
//! are realized as directories next to them, holding either a copy of the
//! version or redirect pages into it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use atomdocs_config::nav::to_url_path;
use atomdocs_config::AliasType;

use crate::builder::BuildError;
use crate::templates::TemplateEngine;

/// Name of the version record inside the site directory.
pub const VERSIONS_FILE: &str = "versions.json";

/// One deployed version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub version: String,
    pub title: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// The `versions.json` record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionRecord {
    entries: Vec<VersionEntry>,
}

impl VersionRecord {
    /// Load the record from a site directory; a missing file is an empty record.
    pub fn load(site_dir: &Path) -> Result<Self, BuildError> {
        let path = site_dir.join(VERSIONS_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| BuildError::ReadError(format!("{}: {}", path.display(), e)))?;
        let entries = serde_json::from_str(&content)
            .map_err(|e| BuildError::Version(format!("invalid {}: {}", path.display(), e)))?;

        Ok(Self { entries })
    }

    pub fn save(&self, site_dir: &Path) -> Result<(), BuildError> {
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        fs::create_dir_all(site_dir).map_err(|e| BuildError::WriteError(e.to_string()))?;
        fs::write(site_dir.join(VERSIONS_FILE), json + "\n")
            .map_err(|e| BuildError::WriteError(e.to_string()))
    }

    /// Entries, newest first.
    pub fn entries(&self) -> &[VersionEntry] {
        &self.entries
    }

    /// Find an entry by version or alias.
    pub fn find(&self, name: &str) -> Option<&VersionEntry> {
        self.entries
            .iter()
            .find(|e| e.version == name)
            .or_else(|| self.entries.iter().find(|e| e.aliases.iter().any(|a| a == name)))
    }

    /// Check that `version` and `aliases` can be recorded without clashing
    /// with existing names. Changes nothing.
    pub fn check(&self, version: &str, aliases: &[String]) -> Result<(), BuildError> {
        if let Some(owner) = self
            .entries
            .iter()
            .find(|e| e.version != version && e.aliases.iter().any(|a| a == version))
        {
            return Err(BuildError::Version(format!(
                "'{}' is already an alias of {}",
                version, owner.version
            )));
        }
        for alias in aliases {
            if alias == version || self.entries.iter().any(|e| &e.version == alias) {
                return Err(BuildError::Version(format!(
                    "alias '{}' collides with a version name",
                    alias
                )));
            }
        }

        Ok(())
    }

    /// Add or replace a version.
    ///
    /// A new version goes first; a redeployed one keeps its place and its
    /// existing aliases. Aliases held by other versions move to this one.
    /// Returns the aliases that moved.
    pub fn upsert(
        &mut self,
        version: &str,
        title: &str,
        aliases: &[String],
    ) -> Result<Vec<String>, BuildError> {
        self.check(version, aliases)?;

        let mut moved = Vec::new();
        for entry in self.entries.iter_mut().filter(|e| e.version != version) {
            let (taken, kept): (Vec<String>, Vec<String>) =
                entry.aliases.drain(..).partition(|a| aliases.contains(a));
            entry.aliases = kept;
            moved.extend(taken);
        }
        moved.sort();
        moved.dedup();

        match self.entries.iter_mut().find(|e| e.version == version) {
            Some(entry) => {
                entry.title = title.to_string();
                for alias in aliases {
                    if !entry.aliases.contains(alias) {
                        entry.aliases.push(alias.clone());
                    }
                }
            }
            None => self.entries.insert(
                0,
                VersionEntry {
                    version: version.to_string(),
                    title: title.to_string(),
                    aliases: dedup(aliases),
                },
            ),
        }

        Ok(moved)
    }

    /// Remove a version by its exact name.
    pub fn remove(&mut self, version: &str) -> Option<VersionEntry> {
        let index = self.entries.iter().position(|e| e.version == version)?;
        Some(self.entries.remove(index))
    }
}

fn dedup(names: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        if !out.contains(name) {
            out.push(name.clone());
        }
    }
    out
}

/// Check that a version or alias name is a usable directory name.
pub fn validate_name(name: &str) -> Result<(), BuildError> {
    let valid = !name.is_empty()
        && name != VERSIONS_FILE
        && name != "index.html"
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !name.chars().any(char::is_whitespace);

    if valid {
        Ok(())
    } else {
        Err(BuildError::Version(format!("invalid version name '{}'", name)))
    }
}

/// Lays out versions and aliases in a site directory.
pub struct Deployer {
    site_dir: PathBuf,
    alias_type: AliasType,
    templates: TemplateEngine,
}

impl Deployer {
    pub fn new(site_dir: impl Into<PathBuf>, alias_type: AliasType) -> Self {
        Self {
            site_dir: site_dir.into(),
            alias_type,
            templates: TemplateEngine::new(),
        }
    }

    /// Directory a version is built into.
    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.site_dir.join(version)
    }

    pub fn record(&self) -> Result<VersionRecord, BuildError> {
        VersionRecord::load(&self.site_dir)
    }

    /// Record a version already built into [`Deployer::version_dir`] and
    /// realize its aliases.
    pub fn publish(
        &self,
        version: &str,
        title: Option<&str>,
        aliases: &[String],
    ) -> Result<VersionEntry, BuildError> {
        validate_name(version)?;
        for alias in aliases {
            validate_name(alias)?;
        }

        let version_dir = self.version_dir(version);
        if !version_dir.is_dir() {
            return Err(BuildError::Version(format!(
                "version {} has not been built into {}",
                version,
                version_dir.display()
            )));
        }

        let mut record = self.record()?;
        let moved = record.upsert(version, title.unwrap_or(version), aliases)?;
        for alias in &moved {
            tracing::info!("Moving alias {} to {}", alias, version);
        }

        let entry = record
            .find(version)
            .cloned()
            .ok_or_else(|| BuildError::Version(format!("version {} was not recorded", version)))?;

        for alias in &entry.aliases {
            self.realize_alias(alias, version)?;
        }

        record.save(&self.site_dir)?;
        tracing::info!("Deployed {} to {}", version, version_dir.display());
        Ok(entry)
    }

    /// Remove a version, its alias directories and its record entry.
    pub fn delete(&self, version: &str) -> Result<VersionEntry, BuildError> {
        let mut record = self.record()?;
        let entry = record
            .remove(version)
            .ok_or_else(|| BuildError::Version(format!("version {} is not deployed", version)))?;

        for name in entry.aliases.iter().chain(std::iter::once(&entry.version)) {
            remove_dir_if_exists(&self.site_dir.join(name))?;
        }

        // Drop the root redirect when it pointed at the deleted version
        let root_index = self.site_dir.join("index.html");
        if root_index.exists() {
            let current = fs::read_to_string(&root_index).unwrap_or_default();
            let pointed = std::iter::once(&entry.version)
                .chain(entry.aliases.iter())
                .any(|name| self.redirect_to(name).is_ok_and(|html| html == current));
            if pointed {
                fs::remove_file(&root_index).map_err(|e| BuildError::WriteError(e.to_string()))?;
            }
        }

        record.save(&self.site_dir)?;
        tracing::info!("Deleted version {}", version);
        Ok(entry)
    }

    /// Point the site root at a version or alias.
    pub fn set_default(&self, name: &str) -> Result<(), BuildError> {
        let record = self.record()?;
        if record.find(name).is_none() {
            return Err(BuildError::Version(format!("version {} is not deployed", name)));
        }

        let html = self.redirect_to(name)?;
        fs::write(self.site_dir.join("index.html"), html)
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        tracing::info!("Default version set to {}", name);
        Ok(())
    }

    fn redirect_to(&self, name: &str) -> Result<String, BuildError> {
        self.templates
            .render_redirect(&format!("{}/", name))
            .map_err(|e| BuildError::TemplateError(e.to_string()))
    }

    fn realize_alias(&self, alias: &str, version: &str) -> Result<(), BuildError> {
        let source = self.version_dir(version);
        let target = self.site_dir.join(alias);
        remove_dir_if_exists(&target)?;

        match self.alias_type {
            AliasType::Copy => copy_dir(&source, &target),
            AliasType::Redirect => self.write_redirects(&source, &target, version),
        }
    }

    /// One redirect page per page of the version, so deep links keep working.
    fn write_redirects(&self, source: &Path, target: &Path, version: &str) -> Result<(), BuildError> {
        for entry in WalkDir::new(source)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && e.file_name() == "index.html")
        {
            let page_dir = entry
                .path()
                .parent()
                .and_then(|p| p.strip_prefix(source).ok())
                .unwrap_or(Path::new(""));
            let url = to_url_path(page_dir);
            let depth = page_dir.components().count() + 1;

            let mut destination = format!("{}{}/", "../".repeat(depth), version);
            if !url.is_empty() {
                destination.push_str(&url);
                destination.push('/');
            }

            let html = self
                .templates
                .render_redirect(&destination)
                .map_err(|e| BuildError::TemplateError(e.to_string()))?;
            let out_dir = target.join(page_dir);
            fs::create_dir_all(&out_dir).map_err(|e| BuildError::WriteError(e.to_string()))?;
            fs::write(out_dir.join("index.html"), html)
                .map_err(|e| BuildError::WriteError(e.to_string()))?;
        }

        Ok(())
    }
}

fn remove_dir_if_exists(path: &Path) -> Result<(), BuildError> {
    if path.is_dir() {
        fs::remove_dir_all(path)
            .map_err(|e| BuildError::WriteError(format!("{}: {}", path.display(), e)))?;
    }
    Ok(())
}

/// Recursively copy a directory tree.
pub fn copy_dir(source: &Path, target: &Path) -> Result<(), BuildError> {
    for entry in WalkDir::new(source).sort_by_file_name().into_iter() {
        let entry = entry.map_err(|e| BuildError::ReadError(e.to_string()))?;
        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let destination = target.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)
                .map_err(|e| BuildError::WriteError(format!("{}: {}", destination.display(), e)))?;
        } else {
            fs::copy(entry.path(), &destination)
                .map_err(|e| BuildError::WriteError(format!("{}: {}", destination.display(), e)))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn fake_build(site: &Path, version: &str) {
        let dir = site.join(version);
        fs::create_dir_all(dir.join("examples/example-1-rabi")).unwrap();
        fs::write(dir.join("index.html"), format!("home {}", version)).unwrap();
        fs::write(
            dir.join("examples/example-1-rabi/index.html"),
            format!("rabi {}", version),
        )
        .unwrap();
    }

    fn aliases(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn publishes_versions_newest_first() {
        let temp = tempdir().unwrap();
        let deployer = Deployer::new(temp.path(), AliasType::Copy);

        fake_build(temp.path(), "0.1");
        deployer.publish("0.1", None, &aliases(&["latest"])).unwrap();
        fake_build(temp.path(), "0.2");
        deployer
            .publish("0.2", Some("0.2 (beta)"), &aliases(&["latest"]))
            .unwrap();

        let record = deployer.record().unwrap();
        assert_eq!(
            record.entries(),
            &[
                VersionEntry {
                    version: "0.2".to_string(),
                    title: "0.2 (beta)".to_string(),
                    aliases: aliases(&["latest"]),
                },
                VersionEntry {
                    version: "0.1".to_string(),
                    title: "0.1".to_string(),
                    aliases: vec![],
                },
            ]
        );
        assert_eq!(
            fs::read_to_string(temp.path().join("latest/index.html")).unwrap(),
            "home 0.2"
        );

        let json = fs::read_to_string(temp.path().join(VERSIONS_FILE)).unwrap();
        assert!(json.contains("\"version\": \"0.2\""));
    }

    #[test]
    fn redirect_aliases_cover_every_page() {
        let temp = tempdir().unwrap();
        let deployer = Deployer::new(temp.path(), AliasType::Redirect);

        fake_build(temp.path(), "0.1");
        deployer.publish("0.1", None, &aliases(&["stable"])).unwrap();

        let root = fs::read_to_string(temp.path().join("stable/index.html")).unwrap();
        assert!(root.contains("url=../0.1/\""));

        let page =
            fs::read_to_string(temp.path().join("stable/examples/example-1-rabi/index.html"))
                .unwrap();
        assert!(page.contains("url=../../../0.1/examples/example-1-rabi/\""));
    }

    #[test]
    fn rejects_alias_named_like_a_version() {
        let mut record = VersionRecord::default();
        record.upsert("0.1", "0.1", &[]).unwrap();

        let err = record.upsert("0.2", "0.2", &aliases(&["0.1"])).unwrap_err();
        assert!(matches!(err, BuildError::Version(_)));

        let err = record.upsert("0.3", "0.3", &aliases(&["0.3"])).unwrap_err();
        assert!(matches!(err, BuildError::Version(_)));
    }

    #[test]
    fn check_leaves_record_unchanged() {
        let mut record = VersionRecord::default();
        record.upsert("0.1", "0.1", &aliases(&["latest"])).unwrap();

        assert!(record.check("latest", &[]).is_err());
        assert!(record.check("0.2", &aliases(&["0.1"])).is_err());
        record.check("0.2", &aliases(&["latest"])).unwrap();

        assert_eq!(record.find("latest").unwrap().version, "0.1");
        assert_eq!(record.entries().len(), 1);
    }

    #[test]
    fn moved_aliases_are_reported() {
        let mut record = VersionRecord::default();
        record.upsert("0.1", "0.1", &aliases(&["latest", "stable"])).unwrap();

        let moved = record.upsert("0.2", "0.2", &aliases(&["latest"])).unwrap();

        assert_eq!(moved, aliases(&["latest"]));
        assert_eq!(record.find("latest").unwrap().version, "0.2");
        assert_eq!(record.find("stable").unwrap().version, "0.1");
    }

    #[test]
    fn redeploy_keeps_position() {
        let mut record = VersionRecord::default();
        record.upsert("0.1", "0.1", &[]).unwrap();
        record.upsert("0.2", "0.2", &[]).unwrap();
        record.upsert("0.1", "0.1.1", &[]).unwrap();

        let order: Vec<&str> = record.entries().iter().map(|e| e.version.as_str()).collect();
        assert_eq!(order, vec!["0.2", "0.1"]);
        assert_eq!(record.find("0.1").unwrap().title, "0.1.1");
    }

    #[test]
    fn delete_removes_version_and_aliases() {
        let temp = tempdir().unwrap();
        let deployer = Deployer::new(temp.path(), AliasType::Copy);

        fake_build(temp.path(), "0.1");
        deployer.publish("0.1", None, &aliases(&["latest"])).unwrap();
        deployer.set_default("latest").unwrap();

        deployer.delete("0.1").unwrap();

        assert!(!temp.path().join("0.1").exists());
        assert!(!temp.path().join("latest").exists());
        assert!(!temp.path().join("index.html").exists());
        assert!(deployer.record().unwrap().entries().is_empty());
    }

    #[test]
    fn set_default_requires_a_deployed_version() {
        let temp = tempdir().unwrap();
        let deployer = Deployer::new(temp.path(), AliasType::Copy);

        assert!(matches!(
            deployer.set_default("0.9"),
            Err(BuildError::Version(_))
        ));

        fake_build(temp.path(), "0.1");
        deployer.publish("0.1", None, &[]).unwrap();
        deployer.set_default("0.1").unwrap();

        let root = fs::read_to_string(temp.path().join("index.html")).unwrap();
        assert!(root.contains("url=0.1/\""));
    }

    #[test]
    fn validates_names() {
        assert!(validate_name("0.2").is_ok());
        assert!(validate_name("latest").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("../x").is_err());
        assert!(validate_name(".hidden").is_err());
        assert!(validate_name(VERSIONS_FILE).is_err());
    }
}
