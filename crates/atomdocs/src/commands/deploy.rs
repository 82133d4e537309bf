//! Versioned deployment command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use atomdocs_static::versions::validate_name;
use atomdocs_static::{BuildConfig, Deployer, StaticBuilder, VersionEntry};

use super::load_config;

/// Build `version` into its own directory of the site and record it.
pub fn deploy(
    config_path: &Path,
    version: Option<String>,
    aliases: &[String],
    title: Option<&str>,
    set_default: bool,
) -> Result<VersionEntry> {
    let site = load_config(config_path)?;
    let versioning = site.plugins.versioning.clone().unwrap_or_default();
    if site.plugins.versioning.is_none() {
        tracing::debug!("versioning plugin not configured, using default options");
    }

    let version = match version {
        Some(version) => version,
        None => site
            .manifest()?
            .and_then(|m| m.version)
            .context("No version given and the package manifest declares none")?,
    };
    validate_name(&version)?;
    for alias in aliases {
        validate_name(alias)?;
    }

    let deployer = Deployer::new(&site.site_dir, versioning.alias_type);
    // Name clashes must fail before the build touches the site directory
    deployer.record()?.check(&version, aliases)?;

    let mut config = BuildConfig::new(site);
    config.output_dir = deployer.version_dir(&version);
    config.version = Some(version.clone());

    tracing::info!("Building version {}...", version);
    let result = StaticBuilder::new(config)?.build()?;
    tracing::info!(
        "Built {} pages in {}ms",
        result.pages,
        result.duration_ms
    );

    let entry = deployer.publish(&version, title, aliases)?;

    if set_default {
        deployer.set_default(&version)?;
    } else if let Some(default) = &versioning.default_version {
        if deployer.record()?.find(default).is_some() {
            deployer.set_default(default)?;
        } else {
            tracing::warn!("Default version {} is not deployed yet", default);
        }
    }

    Ok(entry)
}

/// Run the deploy command.
pub async fn run(
    config_path: &Path,
    version: Option<String>,
    aliases: Vec<String>,
    title: Option<String>,
    set_default: bool,
) -> Result<()> {
    let config_path: PathBuf = config_path.to_path_buf();
    let entry = tokio::task::spawn_blocking(move || {
        deploy(&config_path, version, &aliases, title.as_deref(), set_default)
    })
    .await
    .context("Deploy task failed")??;

    if entry.aliases.is_empty() {
        tracing::info!("Deployed {}", entry.version);
    } else {
        tracing::info!(
            "Deployed {} [{}]",
            entry.version,
            entry.aliases.join(", ")
        );
    }

    Ok(())
}
