//! Static site generator for atomdocs documentation.
//!
//! Builds a documentation site from markdown pages and executed example
//! scripts, and lays out versioned deployments of it.

pub mod apiref;
pub mod assets;
pub mod builder;
pub mod render;
pub mod staging;
pub mod templates;
pub mod versions;

pub use builder::{BuildConfig, BuildError, BuildResult, StaticBuilder};
pub use versions::{Deployer, VersionEntry, VersionRecord};
