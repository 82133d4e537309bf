//! CLI subcommands.

pub mod build;
pub mod check;
pub mod deploy;
pub mod init;
pub mod serve;
pub mod versions;

use std::path::Path;

use anyhow::{Context, Result};
use atomdocs_config::SiteConfig;

/// Load the site configuration, pointing at `init` when it is missing.
pub fn load_config(path: &Path) -> Result<SiteConfig> {
    if !path.exists() {
        anyhow::bail!(
            "Config file not found: {}. Run 'atomdocs init' first.",
            path.display()
        );
    }

    SiteConfig::load(path).with_context(|| format!("Invalid config {}", path.display()))
}
