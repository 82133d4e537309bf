//! atomdocs CLI - documentation sites with executed Python examples.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "atomdocs")]
#[command(about = "Documentation site builder for executable Python examples")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to atomdocs.yml config file
    #[arg(short, long, default_value = "atomdocs.yml", global = true)]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize documentation in current project
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },

    /// Build the documentation site
    Build {
        /// Output directory (defaults to site_dir from the config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip minification
        #[arg(long)]
        no_minify: bool,
    },

    /// Validate configuration and navigation without executing anything
    Check,

    /// Preview the built site
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Serve the existing site without building first
        #[arg(long)]
        no_build: bool,

        /// Rebuild when sources change
        #[arg(short, long)]
        watch: bool,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },

    /// Build and publish a version into the versioned site
    Deploy {
        /// Version name (defaults to the package version)
        version: Option<String>,

        /// Alias to point at this version, may be repeated
        #[arg(short, long = "alias")]
        aliases: Vec<String>,

        /// Title shown in the version selector
        #[arg(short, long)]
        title: Option<String>,

        /// Redirect the site root to this version
        #[arg(long)]
        set_default: bool,
    },

    /// List deployed versions
    Versions,

    /// Remove a deployed version
    Delete {
        version: String,
    },

    /// Redirect the site root to a version or alias
    SetDefault {
        version: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Commands::Init { yes } => {
            commands::init::run(&cli.config, yes)?;
        }
        Commands::Build { output, no_minify } => {
            let minify = if no_minify { Some(false) } else { None };
            commands::build::run(&cli.config, output, minify).await?;
        }
        Commands::Check => {
            commands::check::run(&cli.config)?;
        }
        Commands::Serve {
            port,
            no_build,
            watch,
            no_open,
        } => {
            commands::serve::run(&cli.config, port, !no_build, watch, !no_open).await?;
        }
        Commands::Deploy {
            version,
            aliases,
            title,
            set_default,
        } => {
            commands::deploy::run(&cli.config, version, aliases, title, set_default).await?;
        }
        Commands::Versions => {
            commands::versions::list(&cli.config)?;
        }
        Commands::Delete { version } => {
            commands::versions::delete(&cli.config, &version)?;
        }
        Commands::SetDefault { version } => {
            commands::versions::set_default(&cli.config, &version)?;
        }
    }

    Ok(())
}
