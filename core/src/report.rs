use crate::severity::DependencyIndex;
use crate::types::{Dependency, Ledger, Severity};
use crate::version::{UpdateType, VersionComparator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateReport {
    pub timestamp: DateTime<Utc>,

    /// Milliseconds.
    pub elapsed: u64,

    pub summary: UpdateSummary,

    pub entries: Vec<UpdateEntry>,

    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub dependencies_analyzed: usize,
    pub with_findings: usize,
    pub findings: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub fetch_errors: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateEntry {
    pub dependency: Dependency,
    pub coordinate: String,
    pub update_coordinate: String,
    pub update_type: UpdateType,
    pub highest_level: Severity,
    pub ledger: Ledger,
    pub error: Option<String>,
}

impl UpdateEntry {
    pub fn new(dependency: &Dependency, ledger: Ledger, error: Option<String>) -> Self {
        let update_type = dependency
            .update_pair()
            .map(|(current, proposed)| VersionComparator::classify_update(&current.version, &proposed.version))
            .unwrap_or_default();

        Self {
            dependency: dependency.snapshot(),
            coordinate: dependency.coordinate(),
            update_coordinate: dependency.update_coordinate().unwrap_or_default(),
            update_type,
            highest_level: ledger.highest_level(),
            ledger,
            error,
        }
    }
}

impl UpdateReport {
    pub fn new() -> Self {
        Self {
            timestamp: Utc::now(),
            elapsed: 0,
            summary: UpdateSummary::default(),
            entries: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn add_entry(&mut self, entry: UpdateEntry) {
        let summary = &mut self.summary;
        summary.dependencies_analyzed += 1;
        summary.findings += entry.ledger.len();
        if !entry.ledger.is_empty() {
            summary.with_findings += 1;
        }
        if entry.error.is_some() {
            summary.failed += 1;
        }
        for difference in &entry.ledger {
            match difference.level {
                Severity::Low => summary.low += 1,
                Severity::Medium => summary.medium += 1,
                Severity::High => summary.high += 1,
                Severity::Critical => summary.critical += 1,
            }
        }
        summary.fetch_errors += entry.ledger.count_of(crate::types::DiffKind::ModuleFetchError);

        self.entries.push(entry);
    }

    pub fn highest_level(&self) -> Option<Severity> {
        self.entries
            .iter()
            .filter(|e| !e.ledger.is_empty())
            .map(|e| e.highest_level)
            .max()
    }

    pub fn has_critical(&self) -> bool {
        self.summary.critical > 0
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for UpdateReport {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryReport {
    pub timestamp: DateTime<Utc>,

    pub elapsed: u64,

    pub entries: Vec<InventoryEntry>,

    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub dependency: Dependency,
    /// Worst vulnerability tier across the dependency and everything below it.
    pub highest_severity: Option<Severity>,
    pub submodules: usize,
    pub error: Option<String>,
}

impl InventoryEntry {
    pub fn new(dependency: Dependency, error: Option<String>) -> Self {
        let index = DependencyIndex::build(&dependency);
        let highest_severity = dependency
            .vulnerabilities
            .highest_severity()
            .max(index.highest_severity());
        let submodules = index.len();

        Self {
            dependency,
            highest_severity,
            submodules,
            error,
        }
    }
}

impl InventoryReport {
    pub fn new() -> Self {
        Self {
            timestamp: Utc::now(),
            elapsed: 0,
            entries: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn add_entry(&mut self, entry: InventoryEntry) {
        self.entries.push(entry);
    }

    pub fn highest_severity(&self) -> Option<Severity> {
        self.entries.iter().filter_map(|e| e.highest_severity).max()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for InventoryReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiffKind, Difference, Vulnerability};

    fn ledger_of(levels: &[(Severity, DiffKind)]) -> Ledger {
        let dep = Dependency::new("example.com/a", "v1.0.0");
        let mut ledger = Ledger::new();
        for (level, kind) in levels {
            ledger.push(Difference::single(*level, *kind, &dep));
        }
        ledger
    }

    #[test]
    fn test_summary_counts() {
        let dep = Dependency::new("example.com/a", "v1.0.0").with_update(Dependency::new("example.com/a", "v1.1.0"));
        let mut report = UpdateReport::new();
        report.add_entry(UpdateEntry::new(
            &dep,
            ledger_of(&[
                (Severity::High, DiffKind::ModuleFetchError),
                (Severity::Critical, DiffKind::NewDependency),
                (Severity::Low, DiffKind::MinorChange),
            ]),
            None,
        ));
        report.add_entry(UpdateEntry::new(&dep, Ledger::new(), Some("boom".to_string())));

        assert_eq!(
            report.summary,
            UpdateSummary {
                dependencies_analyzed: 2,
                with_findings: 1,
                findings: 3,
                critical: 1,
                high: 1,
                medium: 0,
                low: 1,
                fetch_errors: 1,
                failed: 1,
            }
        );
        assert!(report.has_critical());
        assert_eq!(report.highest_level(), Some(Severity::Critical));

        let entry = &report.entries[0];
        assert_eq!(entry.update_type, UpdateType::Minor);
        assert_eq!(entry.update_coordinate, "example.com/a@v1.1.0");
        assert!(entry.dependency.update.is_none());
    }

    #[test]
    fn test_empty_report_json() {
        let report = UpdateReport::new();
        assert_eq!(report.highest_level(), None);
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["entries"], serde_json::json!([]));
        assert_eq!(json["summary"]["findings"], 0);
    }

    #[test]
    fn test_inventory_entry_aggregates_tree() {
        let mut root = Dependency::new("example.com/root", "v1.0.0");
        let mut child = Dependency::new("example.com/child", "v0.3.0");
        child.vulnerabilities.insert(Vulnerability {
            id: "GO-2023-1000".to_string(),
            title: String::new(),
            reference: String::new(),
            cvss_score: 9.1,
        });
        root.dependencies.push(child);

        let entry = InventoryEntry::new(root, None);
        assert_eq!(entry.submodules, 1);
        assert_eq!(entry.highest_severity, Some(Severity::Critical));
    }
}
