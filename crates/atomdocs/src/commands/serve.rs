//! Preview server command.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use atomdocs_config::SiteConfig;
use atomdocs_server::{PreviewConfig, PreviewServer, RebuildFn};
use atomdocs_static::{BuildConfig, BuildError, BuildResult, StaticBuilder};

use super::build::build_site;
use super::load_config;

/// Sources whose changes affect the built site.
fn watch_paths(config_path: &Path, site: &SiteConfig) -> Vec<PathBuf> {
    let mut paths = vec![
        config_path.to_path_buf(),
        site.docs_dir.clone(),
        site.manifest_path.clone(),
    ];
    paths.extend(site.extra_css.iter().cloned());
    paths.extend(site.theme.custom_dir.iter().cloned());
    if let Some(api) = &site.plugins.api_reference {
        paths.extend(api.paths.iter().map(|p| site.path(p)));
    }

    paths
        .into_iter()
        .filter(|p| p.exists())
        .map(|p| fs::canonicalize(&p).unwrap_or(p))
        .collect()
}

/// Run the serve command.
pub async fn run(config_path: &Path, port: u16, build: bool, watch: bool, open: bool) -> Result<()> {
    let site = load_config(config_path)?;

    if build {
        let path = config_path.to_path_buf();
        tokio::task::spawn_blocking(move || build_site(&path, None, None, None))
            .await
            .context("Build task failed")??;
    }

    if !site.site_dir.is_dir() {
        anyhow::bail!(
            "Directory not found: {}. Run 'atomdocs build' first.",
            site.site_dir.display()
        );
    }

    let site_dir = fs::canonicalize(&site.site_dir)
        .with_context(|| format!("Failed to resolve {}", site.site_dir.display()))?;

    let config = PreviewConfig {
        site_dir,
        watch_paths: watch_paths(config_path, &site),
        port,
        open,
        ..Default::default()
    };

    let mut server = PreviewServer::new(config);
    if watch {
        let path = config_path.to_path_buf();
        let rebuild: RebuildFn = Arc::new(move || -> Result<BuildResult, BuildError> {
            let site = SiteConfig::load(&path)?;
            StaticBuilder::new(BuildConfig::new(site))?.build()
        });
        server = server.with_rebuild(rebuild);
    }

    server.start().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn watches_existing_sources_only() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("atomdocs.yml");
        fs::write(&config_path, "site_name: Docs\n").unwrap();
        fs::create_dir_all(temp.path().join("docs")).unwrap();
        let site = SiteConfig::load(&config_path).unwrap();

        let paths = watch_paths(&config_path, &site);

        let root = fs::canonicalize(temp.path()).unwrap();
        assert_eq!(paths, vec![root.join("atomdocs.yml"), root.join("docs")]);
    }
}
