use semver::Version;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    Major,
    Minor,
    Patch,
    None,
    #[default]
    Unknown,
}

impl UpdateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateType::Major => "major",
            UpdateType::Minor => "minor",
            UpdateType::Patch => "patch",
            UpdateType::None => "none",
            UpdateType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for UpdateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct VersionComparator;

impl VersionComparator {
    /// Parses a Go module version such as `v1.2.3` or `v2.0.0+incompatible`.
    pub fn parse(version: &str) -> Option<Version> {
        let trimmed = version.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let trimmed = trimmed.strip_suffix("+incompatible").unwrap_or(trimmed);
        Version::parse(trimmed).ok()
    }

    pub fn classify_update(current: &str, latest: &str) -> UpdateType {
        match (Self::parse(current), Self::parse(latest)) {
            (Some(c), Some(l)) => {
                if l.major > c.major {
                    UpdateType::Major
                } else if l.major < c.major {
                    UpdateType::None
                } else if l.minor > c.minor {
                    UpdateType::Minor
                } else if l.minor < c.minor {
                    UpdateType::None
                } else if l.patch > c.patch || (l > c && l.pre.is_empty()) {
                    UpdateType::Patch
                } else {
                    UpdateType::None
                }
            }
            _ => UpdateType::Unknown,
        }
    }
}
