//! Preview server for atomdocs sites.
//!
//! Serves the built site over HTTP and, when asked, watches the sources and
//! rebuilds the site when they change.

pub mod server;
pub mod watcher;

pub use server::{PreviewConfig, PreviewServer, RebuildFn, ServerError};
pub use watcher::{FileWatcher, WatchEvent};
