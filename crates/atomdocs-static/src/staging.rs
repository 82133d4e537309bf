//! Staged output.
//!
//! A build writes into a temporary sibling of its output directory. The
//! staged tree replaces the output only on [`StagingDir::commit`]; dropping
//! an uncommitted stage deletes it and leaves the previous output untouched.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::builder::BuildError;

pub struct StagingDir {
    dir: TempDir,
    target: PathBuf,
}

impl StagingDir {
    /// Create a stage for `target` in the same parent directory, so the final
    /// swap is a rename on one filesystem.
    pub fn new(target: &Path) -> Result<Self, BuildError> {
        let parent = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        fs::create_dir_all(parent).map_err(|e| {
            BuildError::WriteError(format!("{}: {}", parent.display(), e))
        })?;

        let dir = tempfile::Builder::new()
            .prefix(".atomdocs-staging-")
            .tempdir_in(parent)
            .map_err(|e| BuildError::WriteError(format!("{}: {}", parent.display(), e)))?;

        tracing::debug!("Staging {} in {}", target.display(), dir.path().display());

        Ok(Self {
            dir,
            target: target.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Replace the target with the staged tree.
    pub fn commit(self) -> Result<PathBuf, BuildError> {
        let write_error = |path: &Path, e: std::io::Error| {
            BuildError::WriteError(format!("{}: {}", path.display(), e))
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(self.dir.path(), fs::Permissions::from_mode(0o755))
                .map_err(|e| write_error(self.dir.path(), e))?;
        }

        let target = self.target;
        if target.exists() && !target.is_dir() {
            return Err(BuildError::WriteError(format!(
                "{} exists and is not a directory",
                target.display()
            )));
        }

        if !target.exists() {
            let staged = self.dir.into_path();
            fs::rename(&staged, &target).map_err(|e| {
                let _ = fs::remove_dir_all(&staged);
                write_error(&target, e)
            })?;
            return Ok(target);
        }

        // The previous tree moves into a scratch directory that is removed on drop
        let parent = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let trash = tempfile::Builder::new()
            .prefix(".atomdocs-previous-")
            .tempdir_in(parent)
            .map_err(|e| write_error(parent, e))?;
        let previous = trash.path().join("site");

        fs::rename(&target, &previous).map_err(|e| write_error(&target, e))?;

        let staged = self.dir.into_path();
        if let Err(e) = fs::rename(&staged, &target) {
            let _ = fs::rename(&previous, &target);
            let _ = fs::remove_dir_all(&staged);
            return Err(write_error(&target, e));
        }

        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn commit_creates_target() {
        let temp = tempdir().unwrap();
        let target = temp.path().join("site");

        let stage = StagingDir::new(&target).unwrap();
        fs::write(stage.path().join("index.html"), "new").unwrap();
        stage.commit().unwrap();

        assert_eq!(fs::read_to_string(target.join("index.html")).unwrap(), "new");
    }

    #[test]
    fn commit_replaces_previous_output() {
        let temp = tempdir().unwrap();
        let target = temp.path().join("site");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("stale.html"), "old").unwrap();

        let stage = StagingDir::new(&target).unwrap();
        fs::write(stage.path().join("index.html"), "new").unwrap();
        stage.commit().unwrap();

        assert!(target.join("index.html").exists());
        assert!(!target.join("stale.html").exists());
        // Only the committed site remains next to it
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }

    #[test]
    fn dropped_stage_leaves_output_untouched() {
        let temp = tempdir().unwrap();
        let target = temp.path().join("site");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("index.html"), "old").unwrap();

        {
            let stage = StagingDir::new(&target).unwrap();
            fs::write(stage.path().join("index.html"), "partial").unwrap();
        }

        assert_eq!(fs::read_to_string(target.join("index.html")).unwrap(), "old");
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }
}
