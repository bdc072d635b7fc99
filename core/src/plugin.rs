use crate::error::{DsuError, Result};
use crate::types::{Dependency, Ecosystem, License, LicenseType, Vulnerability};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Lists the project's dependencies as reported by the build toolchain.
#[async_trait]
pub trait DependencyLister: Send + Sync {
    fn ecosystem(&self) -> Ecosystem;

    async fn list(&self, direct_only: bool, with_update_only: bool) -> Result<Vec<Dependency>>;
}

/// Lists one level of the dependency tree rooted at a materialized module.
#[async_trait]
pub trait ChildLister: Send + Sync {
    fn ecosystem(&self) -> Ecosystem;

    async fn list_children(&self, directory: &Path) -> Result<Vec<Dependency>>;
}

/// Makes a dependency's source available on disk.
#[async_trait]
pub trait Materializer: Send + Sync {
    fn ecosystem(&self) -> Ecosystem;

    /// Resolves `path@version` to a local directory. Resolving an already
    /// available coordinate must not fetch it again.
    async fn resolve(&self, coordinate: &str) -> Result<PathBuf>;

    async fn accessible(&self, directory: &Path) -> bool {
        tokio::fs::metadata(directory)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }
}

#[async_trait]
pub trait LicenseFinder: Send + Sync {
    /// Hash and path of the license file in `directory`; a default
    /// `License` when none is found.
    async fn find(&self, directory: &Path) -> License;
}

#[async_trait]
pub trait LicenseIdentifier: Send + Sync {
    /// Name and category of a found license, `None` when unidentifiable.
    async fn identify(&self, license: &License) -> Option<(String, LicenseType)>;
}

#[async_trait]
pub trait VulnerabilityLookup: Send + Sync {
    /// Known vulnerabilities of `path@version`. Quota exhaustion is reported
    /// as `DsuError::RateLimited`.
    async fn lookup(&self, coordinate: &str) -> Result<Vec<Vulnerability>>;
}

pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;
    fn ecosystem(&self) -> Ecosystem;

    fn create_lister(&self) -> Option<Arc<dyn DependencyLister>> { None }
    fn create_child_lister(&self) -> Option<Arc<dyn ChildLister>> { None }
    fn create_materializer(&self) -> Option<Arc<dyn Materializer>> { None }
    fn create_license_finder(&self) -> Option<Arc<dyn LicenseFinder>> { None }
    fn create_license_identifier(&self) -> Option<Arc<dyn LicenseIdentifier>> { None }
    fn create_vulnerability_lookup(&self) -> Option<Arc<dyn VulnerabilityLookup>> { None }
}

/// Every collaborator the engine needs for one ecosystem.
#[derive(Clone)]
pub struct Toolchain {
    pub lister: Arc<dyn DependencyLister>,
    pub children: Arc<dyn ChildLister>,
    pub materializer: Arc<dyn Materializer>,
    pub license_finder: Arc<dyn LicenseFinder>,
    pub license_identifier: Arc<dyn LicenseIdentifier>,
    pub vulnerabilities: Arc<dyn VulnerabilityLookup>,
}

pub struct PluginRegistry {
    plugins: Vec<(Ecosystem, Box<dyn Plugin>)>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    pub fn register_plugin<P: Plugin + 'static>(&mut self, plugin: P) {
        tracing::debug!(plugin = plugin.name(), ecosystem = %plugin.ecosystem(), "registered plugin");
        self.plugins.push((plugin.ecosystem(), Box::new(plugin)));
    }

    pub fn ecosystems(&self) -> Vec<Ecosystem> {
        self.plugins.iter().map(|(e, _)| *e).collect()
    }

    pub fn get_plugin(&self, ecosystem: &Ecosystem) -> Option<&dyn Plugin> {
        self.plugins
            .iter()
            .find(|(e, _)| e == ecosystem)
            .map(|(_, p)| p.as_ref())
    }

    pub fn toolchain(&self, ecosystem: Ecosystem) -> Result<Toolchain> {
        let plugin = self.get_plugin(&ecosystem).ok_or_else(|| missing("plugin", ecosystem))?;

        let vulnerabilities = plugin
            .create_vulnerability_lookup()
            .ok_or_else(|| missing("vulnerability lookup", ecosystem))?;

        Ok(Toolchain {
            lister: plugin.create_lister().ok_or_else(|| missing("dependency lister", ecosystem))?,
            children: plugin.create_child_lister().ok_or_else(|| missing("child lister", ecosystem))?,
            materializer: plugin.create_materializer().ok_or_else(|| missing("materializer", ecosystem))?,
            license_finder: plugin.create_license_finder().ok_or_else(|| missing("license finder", ecosystem))?,
            license_identifier: plugin
                .create_license_identifier()
                .ok_or_else(|| missing("license identifier", ecosystem))?,
            vulnerabilities,
        })
    }
}

fn missing(collaborator: &'static str, ecosystem: Ecosystem) -> DsuError {
    DsuError::MissingCollaborator {
        collaborator,
        ecosystem: ecosystem.to_string(),
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
