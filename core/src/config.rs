//! Run configuration: YAML file, then `DSU_*` environment variables, then
//! command-line flags (applied by the caller).

use crate::error::{DsuError, Result};
use crate::osv::DEFAULT_OSV_URL;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAMES: &[&str] = &["dsu.yaml", "dsu.yml", ".dsu.yaml", ".dsu.yml"];
const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Maximum number of dependencies analyzed at the same time.
    #[schemars(range(min = 1))]
    pub concurrency: usize,

    /// Base URL of the OSV API.
    pub osv_url: String,

    /// Shared scratch area for sources fetched outside the module cache.
    pub scratch_dir: PathBuf,

    pub cache: CacheConfig,

    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Go toolchain executable.
    pub go_binary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    pub ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: 8,
            osv_url: DEFAULT_OSV_URL.to_string(),
            scratch_dir: std::env::temp_dir().join("dsu"),
            cache: CacheConfig::default(),
            log_level: "warn".to_string(),
            go_binary: "go".to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("dsu"),
            ttl_secs: 24 * 60 * 60,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Config {
    /// Explicit file if given, else the first known file name in `project_dir`.
    pub fn discover(explicit: Option<&Path>, project_dir: &Path) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| project_dir.join(name))
            .find(|path| path.is_file())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|err| DsuError::Config {
            message: format!("cannot read '{}': {}", path.display(), err),
        })?;
        Self::from_yaml(&content, Some(path))
    }

    pub fn from_yaml(content: &str, file: Option<&Path>) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|source| DsuError::Yaml {
            file: file.map(Path::to_path_buf).unwrap_or_default(),
            source,
        })
    }

    /// Defaults, overlaid by the discovered file and the environment.
    pub fn load(explicit: Option<&Path>, project_dir: &Path) -> Result<Self> {
        let mut config = match Self::discover(explicit, project_dir) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading configuration file");
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = var("DSU_CONCURRENCY") {
            self.concurrency = raw.trim().parse().map_err(|_| DsuError::Config {
                message: format!("DSU_CONCURRENCY must be a positive integer, got '{}'", raw),
            })?;
        }
        if let Some(url) = var("DSU_OSV_URL") {
            self.osv_url = url;
        }
        if let Some(dir) = var("DSU_SCRATCH_DIR") {
            self.scratch_dir = PathBuf::from(dir);
        }
        if let Some(dir) = var("DSU_CACHE_DIR") {
            self.cache.dir = PathBuf::from(dir);
        }
        if let Some(level) = var("DSU_LOG") {
            self.log_level = level;
        }
        Ok(())
    }

    /// Collects every problem instead of stopping at the first.
    pub fn validate(&self, file: Option<&Path>) -> Result<()> {
        let mut errors = Vec::new();

        if self.concurrency == 0 {
            errors.push("concurrency must be at least 1".to_string());
        }
        if !(self.osv_url.starts_with("http://") || self.osv_url.starts_with("https://")) {
            errors.push(format!("osv_url '{}' is not an http(s) URL", self.osv_url));
        }
        if self.scratch_dir.as_os_str().is_empty() {
            errors.push("scratch_dir is empty".to_string());
        }
        if self.cache.enabled && self.cache.dir.as_os_str().is_empty() {
            errors.push("cache.dir is empty while the cache is enabled".to_string());
        }
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            errors.push(format!(
                "log_level '{}' is not one of {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            ));
        }
        if self.go_binary.trim().is_empty() {
            errors.push("go_binary is empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DsuError::Validation {
                file: file.map(Path::to_path_buf),
                errors,
            })
        }
    }

    pub fn json_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(Config)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.osv_url, "https://api.osv.dev");
        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl(), Duration::from_secs(86_400));
        config.validate(None).unwrap();
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml("concurrency: 2\ncache:\n  enabled: false\n", None).unwrap();
        assert_eq!(config.concurrency, 2);
        assert!(!config.cache.enabled);
        assert_eq!(config.go_binary, "go");
        assert_eq!(Config::from_yaml("", None).unwrap(), Config::default());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = Config::from_yaml("concurency: 2\n", Some(Path::new("dsu.yaml"))).unwrap_err();
        assert!(matches!(err, DsuError::Yaml { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("DSU_CONCURRENCY", "3"),
            ("DSU_OSV_URL", "http://localhost:8080"),
            ("DSU_SCRATCH_DIR", "/scratch"),
            ("DSU_LOG", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.osv_url, "http://localhost:8080");
        assert_eq!(config.scratch_dir, PathBuf::from("/scratch"));
        assert_eq!(config.log_level, "debug");

        let err = config
            .apply_env(|key| (key == "DSU_CONCURRENCY").then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, DsuError::Config { .. }));
    }

    #[test]
    fn test_validate_lists_every_problem() {
        let config = Config {
            concurrency: 0,
            osv_url: "ftp://osv".to_string(),
            log_level: "loud".to_string(),
            ..Config::default()
        };
        match config.validate(None).unwrap_err() {
            DsuError::Validation { errors, .. } => assert_eq!(errors.len(), 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_discover_in_project_dir() {
        let dir = TempDir::new().unwrap();
        assert_eq!(Config::discover(None, dir.path()), None);

        std::fs::write(dir.path().join(".dsu.yaml"), "concurrency: 4\n").unwrap();
        let config = Config::load(None, dir.path()).unwrap();
        assert_eq!(config.concurrency, 4);
    }

    #[test]
    fn test_schema_names_fields() {
        let schema = Config::json_schema();
        let properties = &schema["properties"];
        assert!(properties.get("concurrency").is_some());
        assert!(properties.get("go_binary").is_some());
    }
}
