use crate::download::GoModMaterializer;
use crate::executor::Executor;
use crate::license::{LicenseFileFinder, TextLicenseIdentifier};
use crate::lister::{GoModChildLister, GoModLister};
use dsu_core::plugin::{
    ChildLister, DependencyLister, LicenseFinder, LicenseIdentifier, Materializer, VulnerabilityLookup,
};
use dsu_core::types::Ecosystem;
use dsu_core::{CacheManager, OsvClient, ScratchArea};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

pub struct GoModPlugin {
    project_dir: PathBuf,
    go: Executor,
    scratch: Arc<ScratchArea>,
    osv_url: String,
    cache: Option<CacheManager>,
}

impl GoModPlugin {
    pub fn new(project_dir: PathBuf, scratch: Arc<ScratchArea>) -> Self {
        Self {
            project_dir,
            go: Executor::new("go"),
            scratch,
            osv_url: dsu_core::osv::DEFAULT_OSV_URL.to_string(),
            cache: None,
        }
    }

    pub fn with_go_binary(mut self, binary: impl Into<String>) -> Self {
        self.go = Executor::new(binary);
        self
    }

    pub fn with_osv_url(mut self, url: impl Into<String>) -> Self {
        self.osv_url = url.into();
        self
    }

    pub fn with_cache(mut self, cache: CacheManager) -> Self {
        self.cache = Some(cache);
        self
    }
}

impl dsu_core::Plugin for GoModPlugin {
    fn name(&self) -> &'static str {
        "gomod"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Go
    }

    fn create_lister(&self) -> Option<Arc<dyn DependencyLister>> {
        Some(Arc::new(GoModLister::new(self.go.clone(), self.project_dir.clone())))
    }

    fn create_child_lister(&self) -> Option<Arc<dyn ChildLister>> {
        Some(Arc::new(GoModChildLister::new(self.go.clone())))
    }

    fn create_materializer(&self) -> Option<Arc<dyn Materializer>> {
        Some(Arc::new(GoModMaterializer::new(
            self.go.clone(),
            self.project_dir.clone(),
            self.scratch.clone(),
        )))
    }

    fn create_license_finder(&self) -> Option<Arc<dyn LicenseFinder>> {
        Some(Arc::new(LicenseFileFinder::new()))
    }

    fn create_license_identifier(&self) -> Option<Arc<dyn LicenseIdentifier>> {
        Some(Arc::new(TextLicenseIdentifier::new()))
    }

    fn create_vulnerability_lookup(&self) -> Option<Arc<dyn VulnerabilityLookup>> {
        let client = match OsvClient::new(&self.osv_url, Ecosystem::Go) {
            Ok(client) => client,
            Err(err) => {
                warn!(error = %err, "cannot create OSV client");
                return None;
            }
        };
        let client = match &self.cache {
            Some(cache) => client.with_cache(cache.clone()),
            None => client,
        };
        Some(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsu_core::PluginRegistry;
    use tempfile::TempDir;

    #[test]
    fn test_registry_assembles_toolchain() {
        let dir = TempDir::new().unwrap();
        let scratch = Arc::new(ScratchArea::new(dir.path().join("scratch")));
        let mut registry = PluginRegistry::new();
        registry.register_plugin(
            GoModPlugin::new(dir.path().to_path_buf(), scratch)
                .with_go_binary("go1.22")
                .with_osv_url("http://localhost:9"),
        );

        let toolchain = registry.toolchain(Ecosystem::Go).unwrap();
        assert_eq!(toolchain.lister.ecosystem(), Ecosystem::Go);
        assert_eq!(toolchain.materializer.ecosystem(), Ecosystem::Go);
        assert_eq!(registry.get_plugin(&Ecosystem::Go).unwrap().name(), "gomod");
    }
}
