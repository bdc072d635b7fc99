use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;

const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache read error for '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache write error for '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt cache entry '{}': {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cache serialization error: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl From<CacheError> for crate::error::DsuError {
    fn from(err: CacheError) -> Self {
        crate::error::DsuError::Cache {
            message: err.to_string(),
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::UNIX_EPOCH.elapsed().unwrap_or_default().as_secs()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: u64,
    pub ttl_seconds: u64,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, ttl_seconds: u64) -> Self {
        Self {
            data,
            timestamp: now_secs(),
            ttl_seconds,
        }
    }

    /// A zero TTL disables caching.
    pub fn is_expired(&self) -> bool {
        self.ttl_seconds == 0 || now_secs() > self.timestamp + self.ttl_seconds
    }

    pub fn into_data(self) -> T {
        self.data
    }
}

/// JSON files under `<base>/<namespace>/<key>.json`.
#[derive(Clone, Debug)]
pub struct CacheManager {
    base_path: PathBuf,
    default_ttl: Duration,
}

impl CacheManager {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            default_ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn path_for(&self, namespace: &str, key: &str) -> PathBuf {
        self.base_path
            .join(namespace)
            .join(format!("{}.json", sanitize_cache_key(key)))
    }

    /// Unexpired entry for `key`, `None` when absent or stale.
    pub fn get<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Result<Option<T>, CacheError> {
        let path = self.path_for(namespace, key);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|source| CacheError::Read {
            path: path.clone(),
            source,
        })?;
        let entry: CacheEntry<T> =
            serde_json::from_str(&content).map_err(|source| CacheError::Corrupt { path, source })?;

        if entry.is_expired() {
            return Ok(None);
        }
        Ok(Some(entry.into_data()))
    }

    pub fn set<T: Serialize>(&self, namespace: &str, key: &str, data: &T) -> Result<(), CacheError> {
        let path = self.path_for(namespace, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| CacheError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let entry = CacheEntry::new(data, self.default_ttl.as_secs());
        let content = serde_json::to_string_pretty(&entry).map_err(CacheError::Serialize)?;
        fs::write(&path, content).map_err(|source| CacheError::Write { path, source })
    }

    pub fn clear(&self, namespace: &str) -> Result<(), CacheError> {
        let dir = self.base_path.join(namespace);
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|source| CacheError::Write { path: dir, source })?;
        }
        Ok(())
    }

    /// Removes expired entries; unreadable files are left alone.
    pub fn clean_expired(&self, namespace: &str) -> Result<usize, CacheError> {
        let dir = self.base_path.join(namespace);
        if !dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        let entries = fs::read_dir(&dir).map_err(|source| CacheError::Read {
            path: dir.clone(),
            source,
        })?;
        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            let Ok(cached) = serde_json::from_str::<CacheEntry<serde_json::Value>>(&content) else {
                continue;
            };
            if cached.is_expired() {
                fs::remove_file(&path).map_err(|source| CacheError::Write { path, source })?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

pub fn sanitize_cache_key(key: &str) -> String {
    key.replace(['/', '@'], "-")
        .replace([':', ' '], "_")
        .to_lowercase()
}
