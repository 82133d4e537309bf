//! Configuration check command.

use std::path::Path;

use anyhow::{Context, Result};
use atomdocs_config::{NavNode, PageKind, SiteConfig};
use atomdocs_exec::python::interpreter_available;
use atomdocs_static::apiref;

/// What a build of the current configuration would produce.
#[derive(Debug, Default, PartialEq)]
pub struct CheckSummary {
    pub pages: usize,
    pub scripts: usize,
    pub external_links: usize,
    pub api_modules: usize,
    pub plugins: Vec<String>,
    pub project: Option<String>,
    pub dependencies: Vec<String>,
    pub warnings: Vec<String>,
}

/// Resolve navigation, plugins and the manifest without executing anything.
pub fn summarize(site: &SiteConfig) -> Result<CheckSummary> {
    if !site.docs_dir.is_dir() {
        anyhow::bail!("Docs directory not found: {}", site.docs_dir.display());
    }

    let nav = site.resolve_nav().context("Navigation check failed")?;
    let manifest = site.manifest()?;

    let pages = nav.pages();
    let mut summary = CheckSummary {
        pages: pages.len(),
        scripts: pages
            .iter()
            .filter(|p| p.kind == PageKind::Script)
            .count(),
        external_links: count_links(&nav.nodes),
        plugins: site.plugins.names().map(str::to_string).collect(),
        ..Default::default()
    };

    if let Some(manifest) = &manifest {
        summary.project = Some(match &manifest.version {
            Some(version) => format!("{} {}", manifest.name, version),
            None => manifest.name.clone(),
        });
        summary.dependencies = manifest.dependency_names();
    }

    if let Some(options) = &site.plugins.api_reference {
        summary.api_modules = apiref::collect_modules(options, &site.root)?.len();
    }

    if let Some(notebooks) = &site.plugins.notebooks {
        if notebooks.execute
            && summary.scripts > 0
            && !interpreter_available(&notebooks.interpreter)
        {
            summary.warnings.push(format!(
                "interpreter '{}' is not available, example scripts will fail to run",
                notebooks.interpreter
            ));
        }
    }

    if site.plugins.versioning.is_some() && manifest.as_ref().and_then(|m| m.version.as_ref()).is_none() {
        summary
            .warnings
            .push("no package version found, 'deploy' needs an explicit version".to_string());
    }

    Ok(summary)
}

fn count_links(nodes: &[NavNode]) -> usize {
    nodes
        .iter()
        .map(|node| match node {
            NavNode::Section { children, .. } => count_links(children),
            NavNode::Link { .. } => 1,
            NavNode::Page(_) => 0,
        })
        .sum()
}

/// Run the check command.
pub fn run(config_path: &Path) -> Result<()> {
    let site = super::load_config(config_path)?;
    let summary = summarize(&site)?;

    println!("Site:         {}", site.site_name);
    if let Some(project) = &summary.project {
        println!("Project:      {}", project);
    }
    println!(
        "Pages:        {} ({} example scripts)",
        summary.pages, summary.scripts
    );
    println!("Links:        {}", summary.external_links);
    if summary.api_modules > 0 {
        println!("API modules:  {}", summary.api_modules);
    }
    println!("Plugins:      {}", summary.plugins.join(", "));
    if !summary.dependencies.is_empty() {
        println!("Dependencies:");
        for dependency in &summary.dependencies {
            println!("  {}", dependency);
        }
    }

    for warning in &summary.warnings {
        tracing::warn!("{}", warning);
    }

    tracing::info!("Configuration is valid");
    Ok(())
}
