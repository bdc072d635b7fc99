use crate::executor::Executor;
use async_trait::async_trait;
use dsu_core::plugin::{ChildLister, DependencyLister};
use dsu_core::types::{decode_dependencies, Dependency, Ecosystem, ListFilter};
use dsu_core::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// `go list -m -json all` over the project's module.
pub struct GoModLister {
    go: Executor,
    project_dir: PathBuf,
}

impl GoModLister {
    pub fn new(go: Executor, project_dir: PathBuf) -> Self {
        Self { go, project_dir }
    }
}

#[async_trait]
impl DependencyLister for GoModLister {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Go
    }

    async fn list(&self, direct_only: bool, with_update_only: bool) -> Result<Vec<Dependency>> {
        let args: &[&str] = if with_update_only {
            &["list", "-u", "-m", "-mod=mod", "-json", "all"]
        } else {
            &["list", "-m", "-mod=mod", "-json", "all"]
        };
        let stdout = self.go.run(Some(&self.project_dir), args).await?;
        let dependencies = decode_dependencies(&stdout, ListFilter::new(direct_only, with_update_only))?;
        debug!(
            project = %self.project_dir.display(),
            count = dependencies.len(),
            "listed project dependencies"
        );
        Ok(dependencies)
    }
}

/// Lists every module required by an already materialized module.
pub struct GoModChildLister {
    go: Executor,
}

impl GoModChildLister {
    pub fn new(go: Executor) -> Self {
        Self { go }
    }
}

#[async_trait]
impl ChildLister for GoModChildLister {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Go
    }

    async fn list_children(&self, directory: &Path) -> Result<Vec<Dependency>> {
        if !directory.join("go.mod").is_file() {
            debug!(dir = %directory.display(), "no go.mod, treating as leaf");
            return Ok(Vec::new());
        }
        let stdout = self
            .go
            .run(Some(directory), &["list", "-m", "-mod=mod", "-json", "all"])
            .await?;
        decode_dependencies(&stdout, ListFilter::new(false, false))
    }
}
