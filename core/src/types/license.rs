use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Restrictiveness category of a software license, ordered from least to
/// most restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseType {
    /// Code declared free for any use.
    Unencumbered,
    /// Not even a copyright notice is required.
    Permissive,
    /// Distributions must keep the original notice or advertising clause.
    Notice,
    /// Modifications to the licensed code must be made available.
    Reciprocal,
    /// Shipping the code requires distributing source.
    Restricted,
    /// Must not be used at all.
    Forbidden,
}

impl LicenseType {
    pub const MOST_RESTRICTIVE: LicenseType = LicenseType::Forbidden;

    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseType::Unencumbered => "unencumbered",
            LicenseType::Permissive => "permissive",
            LicenseType::Notice => "notice",
            LicenseType::Reciprocal => "reciprocal",
            LicenseType::Restricted => "restricted",
            LicenseType::Forbidden => "forbidden",
        }
    }
}

impl std::fmt::Display for LicenseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// License file found in a materialized dependency.
///
/// `hash` is a content fingerprint; an empty hash means no license file was
/// found. `name` and `license_type` stay empty until the license has been
/// identified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub license_type: Option<LicenseType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl License {
    pub fn found(&self) -> bool {
        !self.hash.is_empty()
    }

    pub fn is_identified(&self) -> bool {
        self.name.is_some()
    }

    pub fn is_critical(&self) -> bool {
        self.license_type == Some(LicenseType::MOST_RESTRICTIVE)
    }

    /// True when `update` is strictly more restrictive than `self`.
    /// Unknown categories never count as more restrictive.
    pub fn is_tightened_by(&self, update: &License) -> bool {
        match (self.license_type, update.license_type) {
            (Some(current), Some(next)) => next > current,
            _ => false,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(license_type: Option<LicenseType>) -> License {
        License {
            hash: "h".to_string(),
            license_type,
            ..License::default()
        }
    }

    #[test]
    fn test_restrictiveness_order() {
        assert!(LicenseType::Unencumbered < LicenseType::Permissive);
        assert!(LicenseType::Permissive < LicenseType::Notice);
        assert!(LicenseType::Notice < LicenseType::Reciprocal);
        assert!(LicenseType::Reciprocal < LicenseType::Restricted);
        assert!(LicenseType::Restricted < LicenseType::Forbidden);
    }

    #[test]
    fn test_is_tightened_by() {
        let permissive = typed(Some(LicenseType::Permissive));
        let restricted = typed(Some(LicenseType::Restricted));
        assert!(permissive.is_tightened_by(&restricted));
        assert!(!restricted.is_tightened_by(&permissive));
        assert!(!permissive.is_tightened_by(&permissive));
        assert!(!typed(None).is_tightened_by(&restricted));
        assert!(!permissive.is_tightened_by(&typed(None)));
    }

    #[test]
    fn test_found_depends_on_hash() {
        assert!(!License::default().found());
        assert!(typed(None).found());
    }

    #[test]
    fn test_type_serializes_lowercase() {
        let json = serde_json::to_string(&typed(Some(LicenseType::Forbidden))).unwrap();
        assert!(json.contains("\"type\":\"forbidden\""));
    }
}
