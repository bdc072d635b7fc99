//! Vulnerability scoring and severity aggregation.

use std::collections::HashMap;

use crate::types::{Dependency, Severity};

/// Score of a severity label as used by advisory databases, taken from the
/// middle of the matching CVSS bucket.
pub fn score_from_label(label: &str) -> Option<f64> {
    match label.trim().to_ascii_uppercase().as_str() {
        "LOW" => Some(2.0),
        "MODERATE" | "MEDIUM" => Some(5.5),
        "HIGH" => Some(8.0),
        "CRITICAL" => Some(9.5),
        _ => None,
    }
}

/// Parses either a bare numeric score or a CVSS v3.x vector string.
pub fn parse_score(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if let Ok(score) = raw.parse::<f64>() {
        return Some(score.clamp(0.0, 10.0));
    }
    if raw.starts_with("CVSS:3") {
        return cvss3_base_score(raw);
    }
    None
}

/// CVSS v3.1 base score of a vector such as
/// `CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:H`.
pub fn cvss3_base_score(vector: &str) -> Option<f64> {
    let metrics: HashMap<&str, &str> = vector
        .split('/')
        .skip(1)
        .filter_map(|part| part.split_once(':'))
        .collect();

    let scope_changed = match *metrics.get("S")? {
        "U" => false,
        "C" => true,
        _ => return None,
    };
    let attack_vector = match *metrics.get("AV")? {
        "N" => 0.85,
        "A" => 0.62,
        "L" => 0.55,
        "P" => 0.2,
        _ => return None,
    };
    let attack_complexity = match *metrics.get("AC")? {
        "L" => 0.77,
        "H" => 0.44,
        _ => return None,
    };
    let privileges = match (*metrics.get("PR")?, scope_changed) {
        ("N", _) => 0.85,
        ("L", false) => 0.62,
        ("L", true) => 0.68,
        ("H", false) => 0.27,
        ("H", true) => 0.5,
        _ => return None,
    };
    let interaction = match *metrics.get("UI")? {
        "N" => 0.85,
        "R" => 0.62,
        _ => return None,
    };
    let impact_of = |key: &str| -> Option<f64> {
        match *metrics.get(key)? {
            "H" => Some(0.56),
            "L" => Some(0.22),
            "N" => Some(0.0),
            _ => None,
        }
    };
    let (c, i, a) = (impact_of("C")?, impact_of("I")?, impact_of("A")?);

    let iss = 1.0 - (1.0 - c) * (1.0 - i) * (1.0 - a);
    let impact = if scope_changed {
        7.52 * (iss - 0.029) - 3.25 * (iss - 0.02_f64).powi(15)
    } else {
        6.42 * iss
    };
    if impact <= 0.0 {
        return Some(0.0);
    }

    let exploitability = 8.22 * attack_vector * attack_complexity * privileges * interaction;
    let base = if scope_changed {
        (1.08 * (impact + exploitability)).min(10.0)
    } else {
        (impact + exploitability).min(10.0)
    };
    Some(round_up(base))
}

/// Smallest number with one decimal place that is >= `value`.
fn round_up(value: f64) -> f64 {
    let scaled = (value * 100_000.0).round() as i64;
    if scaled % 10_000 == 0 {
        scaled as f64 / 100_000.0
    } else {
        ((scaled / 10_000) + 1) as f64 / 10.0
    }
}

/// Flat view of every dependency reachable from one root, keyed by cleaned
/// path. The first occurrence of a path wins, so a dependency reached
/// through several parents is only counted once.
#[derive(Debug, Default)]
pub struct DependencyIndex<'a> {
    entries: HashMap<&'a str, &'a Dependency>,
}

impl<'a> DependencyIndex<'a> {
    pub fn build(root: &'a Dependency) -> Self {
        let mut index = DependencyIndex::default();
        let mut pending: Vec<&'a Dependency> = root.dependencies.iter().rev().collect();
        while let Some(dependency) = pending.pop() {
            if index.entries.contains_key(dependency.cleaned_path()) {
                continue;
            }
            index.entries.insert(dependency.cleaned_path(), dependency);
            pending.extend(dependency.dependencies.iter().rev());
        }
        index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, cleaned_path: &str) -> Option<&'a Dependency> {
        self.entries.get(cleaned_path).copied()
    }

    /// Worst vulnerability tier in the index, `None` if nothing is known.
    pub fn highest_severity(&self) -> Option<Severity> {
        let mut highest = None;
        for dependency in self.entries.values() {
            let current = dependency.vulnerabilities.highest_severity();
            if current > highest {
                highest = current;
            }
            if highest == Some(Severity::Critical) {
                break;
            }
        }
        highest
    }
}
