//! Static site build command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use atomdocs_static::{BuildConfig, BuildResult, StaticBuilder};

use super::load_config;

/// Build the site described by `config_path`. Blocking.
pub fn build_site(
    config_path: &Path,
    output: Option<PathBuf>,
    minify: Option<bool>,
    version: Option<String>,
) -> Result<BuildResult> {
    let site = load_config(config_path)?;

    let mut config = BuildConfig::new(site);
    if let Some(output) = output {
        config.output_dir = output;
    }
    if let Some(minify) = minify {
        config.minify = minify;
    }
    config.version = version;

    let result = StaticBuilder::new(config)?.build()?;

    tracing::info!(
        "Built {} pages with {} examples and {} figures in {}ms",
        result.pages,
        result.scripts,
        result.figures,
        result.duration_ms
    );

    Ok(result)
}

/// Run the build command.
pub async fn run(config_path: &Path, output: Option<PathBuf>, minify: Option<bool>) -> Result<()> {
    tracing::info!("Building site...");

    let config_path = config_path.to_path_buf();
    let result = tokio::task::spawn_blocking(move || build_site(&config_path, output, minify, None))
        .await
        .context("Build task failed")??;

    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}
