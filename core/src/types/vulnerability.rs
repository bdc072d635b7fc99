use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Four-tier severity shared by findings and vulnerabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Buckets: [0,4) Low, [4,7) Medium, [7,9) High, [9,10] Critical.
    /// Scores above 10 clamp to Critical; negative or NaN scores are Low.
    pub fn from_cvss_score(score: f64) -> Self {
        if score >= 9.0 {
            Severity::Critical
        } else if score >= 7.0 {
            Severity::High
        } else if score >= 4.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub id: String,
    pub title: String,
    pub reference: String,
    pub cvss_score: f64,
}

impl Vulnerability {
    pub fn severity(&self) -> Severity {
        Severity::from_cvss_score(self.cvss_score)
    }
}

/// Vulnerabilities keyed by ID, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VulnerabilitySet(IndexMap<String, Vulnerability>);

impl VulnerabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the first entry when an ID is inserted twice.
    pub fn insert(&mut self, vulnerability: Vulnerability) {
        self.0
            .entry(vulnerability.id.clone())
            .or_insert(vulnerability);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Vulnerability> {
        self.0.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vulnerability> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Worst tier across the set, `None` when empty.
    pub fn highest_severity(&self) -> Option<Severity> {
        self.iter().map(Vulnerability::severity).max()
    }
}

impl FromIterator<Vulnerability> for VulnerabilitySet {
    fn from_iter<I: IntoIterator<Item = Vulnerability>>(iter: I) -> Self {
        let mut set = VulnerabilitySet::new();
        for vulnerability in iter {
            set.insert(vulnerability);
        }
        set
    }
}
