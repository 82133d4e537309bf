//! Preview server implementation.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::sync::mpsc;
use tower_http::services::ServeDir;

use atomdocs_static::{BuildError, BuildResult};

use crate::watcher::{FileWatcher, WatchEvent};

/// How long to wait for a burst of writes to settle before rebuilding.
const SETTLE: Duration = Duration::from_millis(150);

/// Rebuilds the site. Runs on a blocking thread.
pub type RebuildFn = Arc<dyn Fn() -> Result<BuildResult, BuildError> + Send + Sync>;

/// Configuration for the preview server.
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Built site to serve
    pub site_dir: PathBuf,

    /// Sources whose changes trigger a rebuild
    pub watch_paths: Vec<PathBuf>,

    /// Port to listen on
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Open browser on start
    pub open: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            site_dir: PathBuf::from("site"),
            watch_paths: vec![PathBuf::from("docs")],
            port: 8000,
            host: "127.0.0.1".to_string(),
            open: true,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid listen address {0}")]
    InvalidAddress(String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),

    #[error("File watch error: {0}")]
    WatchError(String),
}

/// Preview server.
pub struct PreviewServer {
    config: PreviewConfig,
    rebuild: Option<RebuildFn>,
}

impl PreviewServer {
    /// Create a server that only serves the built site.
    pub fn new(config: PreviewConfig) -> Self {
        Self {
            config,
            rebuild: None,
        }
    }

    /// Rebuild with `rebuild` whenever a watched path changes.
    pub fn with_rebuild(mut self, rebuild: RebuildFn) -> Self {
        self.rebuild = Some(rebuild);
        self
    }

    /// The socket address the server listens on.
    pub fn address(&self) -> Result<SocketAddr, ServerError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        addr.parse().map_err(|_| ServerError::InvalidAddress(addr))
    }

    /// Router serving the site directory, `index.html` for directory URLs.
    pub fn router(&self) -> Router {
        Router::new().fallback_service(
            ServeDir::new(&self.config.site_dir).append_index_html_on_directories(true),
        )
    }

    /// Start the preview server.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr = self.address()?;

        if let Some(rebuild) = self.rebuild.clone() {
            let (watcher, rx) =
                FileWatcher::new(&self.config.watch_paths, &[self.config.site_dir.clone()])
                    .map_err(|e| ServerError::WatchError(e.to_string()))?;

            tokio::spawn(async move {
                rebuild_on_change(rx, rebuild).await;
                // Keep watcher alive
                drop(watcher);
            });
        }

        let app = self.router();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        tracing::info!(
            "Serving {} at http://{}",
            self.config.site_dir.display(),
            addr
        );

        if self.config.open {
            let url = format!("http://{}", addr);
            if let Err(e) = open::that(&url) {
                tracing::warn!("Failed to open browser: {}", e);
            }
        }

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        Ok(())
    }
}

/// Run one rebuild per burst of watch events. A rebuild runs to completion
/// before the next burst is read, so rebuilds never overlap.
async fn rebuild_on_change(mut rx: mpsc::Receiver<WatchEvent>, rebuild: RebuildFn) {
    while let Some(event) = rx.recv().await {
        tracing::info!("Changed: {}", event.path().display());

        tokio::time::sleep(SETTLE).await;
        while let Ok(event) = rx.try_recv() {
            tracing::debug!("Changed: {}", event.path().display());
        }

        let rebuild = Arc::clone(&rebuild);
        match tokio::task::spawn_blocking(move || rebuild()).await {
            Ok(Ok(result)) => tracing::info!(
                "Rebuilt {} pages in {}ms",
                result.pages,
                result.duration_ms
            ),
            Ok(Err(e)) => tracing::error!("Rebuild failed, still serving the previous site: {}", e),
            Err(e) => tracing::error!("Rebuild task failed: {}", e),
        }
    }
}
