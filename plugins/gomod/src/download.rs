use crate::executor::Executor;
use async_trait::async_trait;
use dsu_core::plugin::Materializer;
use dsu_core::types::Ecosystem;
use dsu_core::{DsuError, Result, ScratchArea};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const UNKNOWN_DEPENDENCY: &str = "not a known dependency";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ModuleDownload {
    #[serde(default)]
    dir: Option<PathBuf>,
    #[serde(default)]
    error: Option<String>,
}

/// Fetches modules into the Go module cache, falling back to a git clone in
/// the scratch area for modules the proxy does not know.
pub struct GoModMaterializer {
    go: Executor,
    git: Executor,
    project_dir: PathBuf,
    scratch: Arc<ScratchArea>,
}

impl GoModMaterializer {
    pub fn new(go: Executor, project_dir: PathBuf, scratch: Arc<ScratchArea>) -> Self {
        Self {
            go,
            git: Executor::new("git"),
            project_dir,
            scratch,
        }
    }

    async fn mod_download(&self, coordinate: &str) -> Result<PathBuf> {
        let output = self
            .go
            .output(Some(&self.project_dir), &["mod", "download", "-json", coordinate])
            .await?;

        let download: ModuleDownload = if output.stdout.iter().all(u8::is_ascii_whitespace) {
            ModuleDownload::default()
        } else {
            serde_json::from_slice(&output.stdout).map_err(|err| DsuError::fetch(coordinate, err))?
        };

        if let Some(reason) = download.error {
            return Err(DsuError::fetch(coordinate, reason));
        }
        if output.has_error() {
            return Err(DsuError::fetch(coordinate, output.diagnostics()));
        }
        download
            .dir
            .ok_or_else(|| DsuError::fetch(coordinate, "go mod download reported no directory"))
    }

    async fn git_clone(&self, coordinate: &str) -> Result<PathBuf> {
        let (path, version) = split_coordinate(coordinate);
        let scratch = self.scratch.ensure().await?;
        let target = scratch.join(clone_dir_name(coordinate));
        if self.accessible(&target).await {
            return Ok(target);
        }

        let url = format!("https://{}", repository_path(path));
        let target_arg = target.to_string_lossy().into_owned();
        let tag = version.map(|v| v.trim_end_matches("+incompatible"));
        let mut args = vec!["clone", "--quiet", "--depth", "1"];
        if let Some(tag) = tag {
            args.extend(["--branch", tag]);
        }
        args.extend([url.as_str(), target_arg.as_str()]);

        info!(%url, target = %target.display(), "cloning module repository");
        self.git
            .run(None, &args)
            .await
            .map_err(|err| DsuError::fetch(coordinate, err))?;
        Ok(target)
    }
}

#[async_trait]
impl Materializer for GoModMaterializer {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Go
    }

    async fn resolve(&self, coordinate: &str) -> Result<PathBuf> {
        if coordinate.is_empty() {
            return Err(DsuError::fetch(coordinate, "empty module path"));
        }

        if let Some(scratch) = self.scratch.path() {
            let clone = scratch.join(clone_dir_name(coordinate));
            if self.accessible(&clone).await {
                return Ok(clone);
            }
        }

        match self.mod_download(coordinate).await {
            Ok(dir) => {
                debug!(coordinate, dir = %dir.display(), "module downloaded");
                Ok(dir)
            }
            Err(err) if err.to_string().contains(UNKNOWN_DEPENDENCY) => {
                debug!(coordinate, "module unknown to the proxy, cloning instead");
                self.git_clone(coordinate).await
            }
            Err(err) => Err(err),
        }
    }
}

fn split_coordinate(coordinate: &str) -> (&str, Option<&str>) {
    match coordinate.rsplit_once('@') {
        Some((path, version)) if !version.is_empty() => (path, Some(version)),
        Some((path, _)) => (path, None),
        None => (coordinate, None),
    }
}

/// Repository of a module path: a `/vN` major-version directory is not part
/// of the repository URL.
fn repository_path(path: &str) -> &str {
    if let Some((repo, tail)) = path.rsplit_once('/') {
        if tail.len() > 1 && tail.starts_with('v') && tail[1..].chars().all(|c| c.is_ascii_digit()) {
            return repo;
        }
    }
    path
}

fn clone_dir_name(coordinate: &str) -> String {
    coordinate.replace('+', "_").replace('/', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_split_coordinate() {
        assert_eq!(split_coordinate("example.com/a@v1.2.0"), ("example.com/a", Some("v1.2.0")));
        assert_eq!(split_coordinate("example.com/a"), ("example.com/a", None));
        assert_eq!(split_coordinate("example.com/a@"), ("example.com/a", None));
    }

    #[test]
    fn test_repository_path() {
        assert_eq!(repository_path("github.com/org/mod/v2"), "github.com/org/mod");
        assert_eq!(repository_path("github.com/org/mod"), "github.com/org/mod");
        assert_eq!(repository_path("gopkg.in/yaml.v3"), "gopkg.in/yaml.v3");
    }

    #[test]
    fn test_clone_dir_name() {
        assert_eq!(
            clone_dir_name("github.com/org/mod@v2.0.0+incompatible"),
            "github.com_org_mod@v2.0.0_incompatible"
        );
    }

    #[tokio::test]
    async fn test_existing_clone_is_reused() {
        let base = TempDir::new().unwrap();
        let scratch = Arc::new(ScratchArea::new(base.path().join("scratch")));
        let clone = scratch.ensure().await.unwrap().join(clone_dir_name("example.com/a@v1.0.0"));
        std::fs::create_dir_all(&clone).unwrap();

        let materializer = GoModMaterializer::new(
            Executor::new("dsu-definitely-not-installed"),
            base.path().to_path_buf(),
            scratch,
        );
        let dir = materializer.resolve("example.com/a@v1.0.0").await.unwrap();
        assert_eq!(dir, clone);
    }

    #[tokio::test]
    async fn test_missing_toolchain_is_an_error() {
        let base = TempDir::new().unwrap();
        let materializer = GoModMaterializer::new(
            Executor::new("dsu-definitely-not-installed"),
            base.path().to_path_buf(),
            Arc::new(ScratchArea::new(base.path().join("scratch"))),
        );
        assert!(materializer.resolve("example.com/a@v1.0.0").await.is_err());
    }
}
