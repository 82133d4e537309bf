//! File watching for rebuild-on-change.

use std::path::{Path, PathBuf};
use std::sync::mpsc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

/// Events emitted by the file watcher.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// A page or example script was modified
    SourceModified(PathBuf),

    /// The site configuration or package manifest was modified
    ConfigModified(PathBuf),

    /// File was created
    Created(PathBuf),

    /// File was deleted
    Deleted(PathBuf),

    /// Generic modification
    Modified(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::SourceModified(p)
            | WatchEvent::ConfigModified(p)
            | WatchEvent::Created(p)
            | WatchEvent::Deleted(p)
            | WatchEvent::Modified(p) => p,
        }
    }
}

/// File watcher for detecting changes.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Create a new file watcher for the given paths. Paths that do not exist
    /// are skipped; paths under any of `ignored` never produce events.
    ///
    /// Returns the watcher and a channel to receive events.
    pub fn new(
        paths: &[PathBuf],
        ignored: &[PathBuf],
    ) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), std::io::Error> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(std::io::Error::other)?;

        for path in paths {
            if path.exists() {
                let mode = if path.is_dir() {
                    RecursiveMode::Recursive
                } else {
                    RecursiveMode::NonRecursive
                };
                watcher.watch(path, mode).map_err(std::io::Error::other)?;
                tracing::debug!("Watching {}", path.display());
            }
        }

        let ignored = ignored.to_vec();
        std::thread::spawn(move || {
            while let Ok(event) = sync_rx.recv() {
                for path in event.paths {
                    if is_ignored(&path, &ignored) {
                        continue;
                    }
                    if let Some(e) = classify_event(&path, &event.kind) {
                        if async_tx.blocking_send(e).is_err() {
                            return;
                        }
                    }
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

/// Editor swap files, bytecode caches and build output never trigger rebuilds.
fn is_ignored(path: &Path, ignored: &[PathBuf]) -> bool {
    if ignored.iter().any(|dir| path.starts_with(dir)) {
        return true;
    }

    path.components().any(|c| {
        let name = c.as_os_str().to_string_lossy();
        name == "__pycache__" || name == ".ipynb_checkpoints" || name.starts_with(".atomdocs-")
    }) || path
        .file_name()
        .map(|n| {
            let n = n.to_string_lossy();
            n.ends_with('~') || n.ends_with(".swp") || n.starts_with(".#")
        })
        .unwrap_or(false)
}

/// Classify a notify event into a WatchEvent.
fn classify_event(path: &Path, kind: &notify::EventKind) -> Option<WatchEvent> {
    use notify::EventKind;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match kind {
        EventKind::Create(_) => Some(WatchEvent::Created(path.to_path_buf())),
        EventKind::Remove(_) => Some(WatchEvent::Deleted(path.to_path_buf())),
        EventKind::Modify(_) => match ext {
            "md" | "py" => Some(WatchEvent::SourceModified(path.to_path_buf())),
            "yml" | "yaml" | "toml" => Some(WatchEvent::ConfigModified(path.to_path_buf())),
            _ => Some(WatchEvent::Modified(path.to_path_buf())),
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, ModifyKind};
    use notify::EventKind;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn classifies_changes_by_extension() {
        let modify = EventKind::Modify(ModifyKind::Data(DataChange::Content));

        assert_eq!(
            classify_event(Path::new("docs/examples/example-1-rabi.py"), &modify),
            Some(WatchEvent::SourceModified(PathBuf::from(
                "docs/examples/example-1-rabi.py"
            )))
        );
        assert_eq!(
            classify_event(Path::new("atomdocs.yml"), &modify),
            Some(WatchEvent::ConfigModified(PathBuf::from("atomdocs.yml")))
        );
        assert_eq!(
            classify_event(Path::new("docs/assets/logo.png"), &EventKind::Create(CreateKind::File)),
            Some(WatchEvent::Created(PathBuf::from("docs/assets/logo.png")))
        );
        assert_eq!(classify_event(Path::new("docs/index.md"), &EventKind::Any), None);
    }

    #[test]
    fn ignores_output_and_scratch_files() {
        let ignored = vec![PathBuf::from("/project/site")];

        assert!(is_ignored(Path::new("/project/site/index.html"), &ignored));
        assert!(is_ignored(
            Path::new("/project/.atomdocs-staging-abc/index.html"),
            &ignored
        ));
        assert!(is_ignored(
            Path::new("/project/docs/examples/__pycache__/x.pyc"),
            &ignored
        ));
        assert!(is_ignored(Path::new("/project/docs/.index.md.swp"), &ignored));
        assert!(!is_ignored(Path::new("/project/docs/index.md"), &ignored));
    }

    #[tokio::test]
    async fn watches_file_changes() {
        let temp = tempdir().unwrap();
        let test_file = temp.path().join("index.md");

        let (watcher, mut rx) = FileWatcher::new(&[temp.path().to_path_buf()], &[]).unwrap();

        // Give inotify time to set up
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::write(&test_file, "# Created").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(3), rx.recv()).await;

        drop(watcher);

        assert!(event.is_ok(), "timeout waiting for file watch event");
        assert!(event.unwrap().is_some(), "channel should not be closed");
    }
}
