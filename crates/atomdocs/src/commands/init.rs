//! Initialize documentation in a project.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Run the init command. Files go next to `config_path`; existing files are
/// kept unless `yes` is set.
pub fn run(config_path: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing atomdocs...");

    let root = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let files = [
        (config_path.to_path_buf(), DEFAULT_CONFIG),
        (root.join("docs/index.md"), DEFAULT_INDEX),
        (root.join("docs/examples/example-1-rabi.py"), DEFAULT_EXAMPLE),
    ];

    for (path, content) in &files {
        if path.exists() && !yes {
            tracing::warn!("{} already exists. Use --yes to overwrite.", path.display());
            continue;
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Created {}", path.display());
    }

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'atomdocs serve --watch' to preview the site.");

    Ok(())
}

const DEFAULT_CONFIG: &str = r##"# atomdocs configuration

site_name: My Examples
# site_url: https://example.org/docs/

docs_dir: docs
site_dir: site

theme:
  primary_color: "#6437FF"

nav:
  - Home: index.md
  - Tutorials:
      - Rabi Oscillations: examples/example-1-rabi.py

plugins:
  - search
  - notebooks:
      include_source: true
      allow_errors: false
"##;

const DEFAULT_INDEX: &str = r#"---
title: Home
---

# Welcome

This site is built with **atomdocs**. Every example under
`docs/examples/` is executed during the build, and its output is embedded
in the page.

Start with [Rabi Oscillations](examples/example-1-rabi.py).
"#;

const DEFAULT_EXAMPLE: &str = r#"# ---
# jupyter:
#   jupytext:
#     text_representation:
#       extension: .py
#       format_name: percent
#   kernelspec:
#     display_name: Python 3
#     language: python
#     name: python3
# ---

# %% [markdown]
# # Rabi Oscillations
#
# A two-level system driven on resonance with Rabi frequency $\Omega$
# oscillates between its ground and excited states. The excited state
# population after time $t$ is $\sin^2(\Omega t / 2)$.

# %%
import math

rabi_frequency = 2 * math.pi * 0.5

for step in range(9):
    t = step * 0.25
    population = math.sin(rabi_frequency * t / 2) ** 2
    print(f"t = {t:.2f} us  P(excited) = {population:.3f}")

# %% [markdown]
# After one full period $2\pi / \Omega$ the atom is back in its ground state.
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use atomdocs_config::SiteConfig;
    use tempfile::tempdir;

    #[test]
    fn scaffolds_a_buildable_project() {
        let temp = tempdir().unwrap();
        let config = temp.path().join("atomdocs.yml");

        run(&config, false).unwrap();

        let site = SiteConfig::load(&config).unwrap();
        let nav = site.resolve_nav().unwrap();
        assert_eq!(nav.pages().len(), 2);
    }

    #[test]
    fn keeps_existing_files_without_yes() {
        let temp = tempdir().unwrap();
        let config = temp.path().join("atomdocs.yml");
        fs::write(&config, "site_name: Mine\n").unwrap();

        run(&config, false).unwrap();
        assert_eq!(fs::read_to_string(&config).unwrap(), "site_name: Mine\n");

        run(&config, true).unwrap();
        assert_eq!(fs::read_to_string(&config).unwrap(), DEFAULT_CONFIG);
    }
}
