use crate::display;
use crate::progress::{spinner, BarProgress};
use clap::Args;
use dsu_core::{Config, Ecosystem, PluginRegistry, Scheduler, ScratchArea, Toolchain};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(feature = "gomod")]
use dsu_plugin_gomod::GoModPlugin;

#[derive(Args)]
pub struct Preview {
    #[arg(short, long, help = "Go project directory")]
    pub path: Option<PathBuf>,
    #[arg(short, long, help = "Output in JSON format")]
    pub json: bool,
}

impl Preview {
    pub async fn run(&self, config: &Config) -> anyhow::Result<()> {
        let session = Session::open(config, self.path.as_deref())?;

        let listing = spinner("Listing available updates", !self.json);
        let dependencies = session.toolchain.lister.list(true, true).await;
        listing.finish_and_clear();
        let dependencies = dependencies?;

        let progress = Arc::new(BarProgress::new("Analyzing updates", !self.json));
        let report = session.scheduler(progress).analyze_all(dependencies).await?;

        if self.json {
            println!("{}", report.to_json()?);
        } else {
            display::print_preview(&report);
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct Analyze {
    #[arg(short, long, help = "Go project directory")]
    pub path: Option<PathBuf>,
    #[arg(short, long, help = "Output in JSON format")]
    pub json: bool,
}

impl Analyze {
    pub async fn run(&self, config: &Config) -> anyhow::Result<()> {
        let session = Session::open(config, self.path.as_deref())?;

        let listing = spinner("Listing direct dependencies", !self.json);
        let dependencies = session.toolchain.lister.list(true, false).await;
        listing.finish_and_clear();
        let dependencies = dependencies?;

        let progress = Arc::new(BarProgress::new("Analyzing dependencies", !self.json));
        let report = session.scheduler(progress).survey_all(dependencies).await?;

        if self.json {
            println!("{}", report.to_json()?);
        } else {
            display::print_inventory(&report);
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct ShowConfig {
    #[arg(long, help = "Print the JSON schema of the configuration file")]
    pub schema: bool,
}

impl ShowConfig {
    pub fn run(&self, config: &Config) -> anyhow::Result<()> {
        let value = if self.schema {
            Config::json_schema()
        } else {
            serde_json::to_value(config)?
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        Ok(())
    }
}

/// Everything one command needs to analyze a project.
struct Session {
    toolchain: Toolchain,
    scratch: Arc<ScratchArea>,
    concurrency: usize,
}

impl Session {
    fn open(config: &Config, path: Option<&Path>) -> anyhow::Result<Self> {
        let project_dir = path.unwrap_or_else(|| Path::new(".")).to_path_buf();
        if !project_dir.exists() {
            anyhow::bail!("Path does not exist: {}", project_dir.display());
        }
        if !project_dir.join("go.mod").is_file() {
            anyhow::bail!("No go.mod found in {}", project_dir.display());
        }

        let scratch = Arc::new(ScratchArea::new(config.scratch_dir.clone()));
        let registry = build_registry(config, project_dir, scratch.clone());
        Ok(Self {
            toolchain: registry.toolchain(Ecosystem::Go)?,
            scratch,
            concurrency: config.concurrency,
        })
    }

    fn scheduler(&self, progress: Arc<BarProgress>) -> Scheduler {
        Scheduler::new(self.toolchain.clone(), self.scratch.clone())
            .with_concurrency(self.concurrency)
            .with_progress(progress)
    }
}

#[cfg_attr(not(feature = "gomod"), allow(unused_variables))]
fn build_registry(config: &Config, project_dir: PathBuf, scratch: Arc<ScratchArea>) -> PluginRegistry {
    #[allow(unused_mut)]
    let mut registry = PluginRegistry::new();

    #[cfg(feature = "gomod")]
    {
        let mut plugin = GoModPlugin::new(project_dir, scratch)
            .with_go_binary(config.go_binary.clone())
            .with_osv_url(config.osv_url.clone());
        if config.cache.enabled {
            plugin = plugin.with_cache(
                dsu_core::CacheManager::new(config.cache.dir.clone()).with_ttl(config.cache.ttl()),
            );
        }
        registry.register_plugin(plugin);
    }

    registry
}
