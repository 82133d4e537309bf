//! Commands managing deployed versions.

use std::path::Path;

use anyhow::Result;
use atomdocs_config::SiteConfig;
use atomdocs_static::{Deployer, VersionEntry};

use super::load_config;

fn deployer(site: &SiteConfig) -> Deployer {
    let alias_type = site
        .plugins
        .versioning
        .as_ref()
        .map(|v| v.alias_type)
        .unwrap_or_default();
    Deployer::new(&site.site_dir, alias_type)
}

/// One line per version: name, title when it differs, and aliases.
fn format_entry(entry: &VersionEntry) -> String {
    let mut line = entry.version.clone();
    if entry.title != entry.version {
        line.push_str(&format!(" \"{}\"", entry.title));
    }
    if !entry.aliases.is_empty() {
        line.push_str(&format!(" [{}]", entry.aliases.join(", ")));
    }
    line
}

/// Run the versions command.
pub fn list(config_path: &Path) -> Result<()> {
    let site = load_config(config_path)?;
    let record = deployer(&site).record()?;

    if record.entries().is_empty() {
        tracing::info!("No versions deployed in {}", site.site_dir.display());
        return Ok(());
    }

    for entry in record.entries() {
        println!("{}", format_entry(entry));
    }

    Ok(())
}

/// Run the delete command.
pub fn delete(config_path: &Path, version: &str) -> Result<()> {
    let site = load_config(config_path)?;
    let entry = deployer(&site).delete(version)?;

    if !entry.aliases.is_empty() {
        tracing::info!("Removed aliases: {}", entry.aliases.join(", "));
    }

    Ok(())
}

/// Run the set-default command.
pub fn set_default(config_path: &Path, version: &str) -> Result<()> {
    let site = load_config(config_path)?;
    deployer(&site).set_default(version)?;
    Ok(())
}
