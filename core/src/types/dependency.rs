use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::license::License;
use super::vulnerability::VulnerabilitySet;

/// One node of a dependency tree: an external package at one version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub path: String,
    /// Empty for local or replaced dependencies.
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub indirect: bool,
    /// Local materialized location, unset until resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    #[serde(default)]
    pub license: License,
    #[serde(default, skip_serializing_if = "VulnerabilitySet::is_empty")]
    pub vulnerabilities: VulnerabilitySet,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Box<Dependency>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace: Option<Box<Dependency>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_versions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolchain_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<PathBuf>,
    /// Loading error reported by the build toolchain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Dependency {
    pub fn new(path: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    pub fn with_update(mut self, update: Dependency) -> Self {
        self.update = Some(Box::new(update));
        self
    }

    pub fn has_update(&self) -> bool {
        self.update.is_some()
    }

    /// Path with a trailing major-version suffix removed, so that
    /// `gopkg.in/yaml.v2` and `gopkg.in/yaml.v3` (or `example.com/mod/v2`)
    /// align as the same node.
    pub fn cleaned_path(&self) -> &str {
        strip_major_suffix(&self.path)
    }

    /// `path@version`, or just the path when there is no version.
    pub fn coordinate(&self) -> String {
        if self.version.is_empty() {
            self.path.clone()
        } else {
            format!("{}@{}", self.path, self.version)
        }
    }

    /// The (current, proposed) pair to compare. A replacement that itself
    /// carries an update is authoritative over the original entry.
    pub fn update_pair(&self) -> Option<(&Dependency, &Dependency)> {
        if let Some(replace) = self.replace.as_deref() {
            if let Some(update) = replace.update.as_deref() {
                return Some((replace, update));
            }
        }
        self.update.as_deref().map(|update| (self, update))
    }

    pub fn update_coordinate(&self) -> Option<String> {
        self.update_pair().map(|(_, update)| update.coordinate())
    }

    /// Copy used by findings: keeps identity, license and vulnerabilities
    /// but drops the subtree and update links.
    pub fn snapshot(&self) -> Dependency {
        Dependency {
            dependencies: Vec::new(),
            update: None,
            replace: None,
            available_versions: Vec::new(),
            ..self.clone()
        }
    }
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.coordinate())
    }
}

fn strip_major_suffix(path: &str) -> &str {
    for separator in ['.', '/'] {
        if let Some(idx) = path.rfind(separator) {
            let tail = &path[idx + 1..];
            let is_major = tail.len() > 1
                && tail.starts_with('v')
                && tail[1..].chars().all(|c| c.is_ascii_digit());
            if is_major && idx > 0 {
                return &path[..idx];
            }
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleaned_path_strips_dot_major_suffix() {
        assert_eq!(Dependency::new("gopkg.in/yaml.v2", "v2.4.0").cleaned_path(), "gopkg.in/yaml");
        assert_eq!(Dependency::new("gopkg.in/yaml.v3", "v3.0.1").cleaned_path(), "gopkg.in/yaml");
    }

    #[test]
    fn test_cleaned_path_strips_slash_major_suffix() {
        assert_eq!(
            Dependency::new("github.com/go-chi/chi/v5", "v5.0.0").cleaned_path(),
            "github.com/go-chi/chi"
        );
    }

    #[test]
    fn test_cleaned_path_keeps_regular_paths() {
        assert_eq!(Dependency::new("github.com/spf13/cobra", "v1.0.0").cleaned_path(), "github.com/spf13/cobra");
        assert_eq!(Dependency::new("example.com/vendor.vbeta", "v1").cleaned_path(), "example.com/vendor.vbeta");
        assert_eq!(Dependency::new("example.com/api/v", "v1").cleaned_path(), "example.com/api/v");
    }

    #[test]
    fn test_coordinate() {
        assert_eq!(Dependency::new("github.com/a/b", "v1.2.3").coordinate(), "github.com/a/b@v1.2.3");
        assert_eq!(Dependency::new("../local", "").coordinate(), "../local");
    }

    #[test]
    fn test_update_pair_prefers_replacement_update() {
        let plain = Dependency::new("a", "v1").with_update(Dependency::new("a", "v2"));
        let (current, proposed) = plain.update_pair().unwrap();
        assert_eq!(current.version, "v1");
        assert_eq!(proposed.version, "v2");

        let mut replaced = plain.clone();
        replaced.replace = Some(Box::new(
            Dependency::new("fork/a", "v1.5").with_update(Dependency::new("fork/a", "v1.6")),
        ));
        let (current, proposed) = replaced.update_pair().unwrap();
        assert_eq!(current.path, "fork/a");
        assert_eq!(proposed.coordinate(), "fork/a@v1.6");
        assert_eq!(replaced.update_coordinate().unwrap(), "fork/a@v1.6");

        assert!(Dependency::new("a", "v1").update_pair().is_none());
    }

    #[test]
    fn test_snapshot_drops_subtree() {
        let mut dep = Dependency::new("a", "v1").with_update(Dependency::new("a", "v2"));
        dep.dependencies.push(Dependency::new("b", "v1"));
        let snap = dep.snapshot();
        assert!(snap.dependencies.is_empty());
        assert!(!snap.has_update());
        assert_eq!(snap.coordinate(), "a@v1");
    }
}
