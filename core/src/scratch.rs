use crate::error::{DsuError, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Temporary directory shared by every task of one run.
///
/// The configured root may be shared with other runs or hold unrelated
/// files, so each run works in its own `run-*` subdirectory. It is created
/// on first use and only that subdirectory is removed on teardown.
#[derive(Debug)]
pub struct ScratchArea {
    root: PathBuf,
    run: OnceCell<TempDir>,
}

impl ScratchArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            run: OnceCell::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// This run's directory, if it has been created.
    pub fn path(&self) -> Option<&Path> {
        self.run.get().map(TempDir::path)
    }

    /// Creates the run directory once; later calls are free.
    pub async fn ensure(&self) -> Result<&Path> {
        let run = self
            .run
            .get_or_try_init(|| async {
                let unavailable = |err: std::io::Error| DsuError::Config {
                    message: format!("cannot create scratch area in '{}': {}", self.root.display(), err),
                };
                tokio::fs::create_dir_all(&self.root).await.map_err(unavailable)?;
                let run = tempfile::Builder::new()
                    .prefix("run-")
                    .tempdir_in(&self.root)
                    .map_err(unavailable)?;
                debug!(path = %run.path().display(), "scratch area ready");
                Ok::<TempDir, DsuError>(run)
            })
            .await?;
        Ok(run.path())
    }

    /// Removes this run's directory. Failures are logged, never returned.
    pub async fn teardown(&self) {
        let Some(run) = self.run.get() else {
            return;
        };
        match tokio::fs::remove_dir_all(run.path()).await {
            Ok(()) => debug!(path = %run.path().display(), "scratch area removed"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!(path = %run.path().display(), error = %err, "failed to remove scratch area"),
        }
    }
}
