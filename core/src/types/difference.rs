use serde::{Deserialize, Serialize};

use super::dependency::Dependency;
use super::vulnerability::{Severity, Vulnerability};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    ModuleFetchError,
    LicenseNotFound,
    LicenseAdded,
    MinorChange,
    NameChanged,
    LessStrict,
    MoreStrict,
    LicenseRemoved,
    NewDependency,
    NewVulnerability,
}

impl DiffKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffKind::ModuleFetchError => "module_fetch_error",
            DiffKind::LicenseNotFound => "license_not_found",
            DiffKind::LicenseAdded => "license_added",
            DiffKind::MinorChange => "minor_change",
            DiffKind::NameChanged => "name_changed",
            DiffKind::LessStrict => "less_strict",
            DiffKind::MoreStrict => "more_strict",
            DiffKind::LicenseRemoved => "license_removed",
            DiffKind::NewDependency => "new_dependency",
            DiffKind::NewVulnerability => "new_vulnerability",
        }
    }
}

/// One reportable finding between a dependency and its proposed update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Difference {
    pub level: Severity,
    pub kind: DiffKind,
    pub dependency: Dependency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_update: Option<Dependency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vulnerability: Option<Vulnerability>,
}

impl Difference {
    pub fn change(level: Severity, kind: DiffKind, current: &Dependency, update: &Dependency) -> Self {
        Self {
            level,
            kind,
            dependency: current.snapshot(),
            dependency_update: Some(update.snapshot()),
            vulnerability: None,
        }
    }

    pub fn single(level: Severity, kind: DiffKind, dependency: &Dependency) -> Self {
        Self {
            level,
            kind,
            dependency: dependency.snapshot(),
            dependency_update: None,
            vulnerability: None,
        }
    }

    pub fn vulnerability(dependency: &Dependency, vulnerability: Vulnerability) -> Self {
        Self {
            level: vulnerability.severity(),
            kind: DiffKind::NewVulnerability,
            dependency: dependency.snapshot(),
            dependency_update: None,
            vulnerability: Some(vulnerability),
        }
    }
}

/// Append-only findings for one top-level dependency's update, in the order
/// the tree walk produced them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    entries: Vec<Difference>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, difference: Difference) {
        self.entries.push(difference);
    }

    pub fn entries(&self) -> &[Difference] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Difference> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum level across entries; Low for an empty ledger.
    pub fn highest_level(&self) -> Severity {
        self.entries
            .iter()
            .map(|d| d.level)
            .max()
            .unwrap_or(Severity::Low)
    }

    pub fn has_fetch_error(&self) -> bool {
        self.entries
            .iter()
            .any(|d| d.kind == DiffKind::ModuleFetchError)
    }

    pub fn count_of(&self, kind: DiffKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a Difference;
    type IntoIter = std::slice::Iter<'a, Difference>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
