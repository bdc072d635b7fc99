//! License restrictiveness classifier.
//!
//! Rules are evaluated top to bottom and the first match decides. The
//! presence rules only look at content hashes, so they run before a license
//! has been identified; the category rules need `name` and `license_type`
//! and always end in an unconditional fallback.

use crate::types::{DiffKind, License, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Same license content, nothing to report.
    Unchanged,
    Changed(Severity, DiffKind),
}

impl Verdict {
    pub fn finding(self) -> Option<(Severity, DiffKind)> {
        match self {
            Verdict::Unchanged => None,
            Verdict::Changed(level, kind) => Some((level, kind)),
        }
    }
}

struct Rule {
    name: &'static str,
    applies: fn(&License, &License) -> bool,
    verdict: Verdict,
}

const PRESENCE_RULES: &[Rule] = &[
    Rule {
        name: "license_not_found",
        applies: neither_found,
        verdict: Verdict::Changed(Severity::Low, DiffKind::LicenseNotFound),
    },
    Rule {
        name: "same_content",
        applies: same_hash,
        verdict: Verdict::Unchanged,
    },
    Rule {
        name: "license_removed",
        applies: removed,
        verdict: Verdict::Changed(Severity::High, DiffKind::LicenseRemoved),
    },
    Rule {
        name: "license_added",
        applies: added,
        verdict: Verdict::Changed(Severity::High, DiffKind::LicenseAdded),
    },
];

const CATEGORY_RULES: &[Rule] = &[
    Rule {
        name: "minor_change",
        applies: same_name,
        verdict: Verdict::Changed(Severity::Low, DiffKind::MinorChange),
    },
    Rule {
        name: "name_changed",
        applies: same_type_renamed,
        verdict: Verdict::Changed(Severity::Medium, DiffKind::NameChanged),
    },
    Rule {
        name: "less_strict",
        applies: not_tightened,
        verdict: Verdict::Changed(Severity::Low, DiffKind::LessStrict),
    },
    Rule {
        name: "more_strict_critical",
        applies: tightened_to_most_restrictive,
        verdict: Verdict::Changed(Severity::Critical, DiffKind::MoreStrict),
    },
    MORE_STRICT,
];

const MORE_STRICT: Rule = Rule {
    name: "more_strict",
    applies: always,
    verdict: Verdict::Changed(Severity::High, DiffKind::MoreStrict),
};

fn neither_found(old: &License, new: &License) -> bool {
    !old.found() && !new.found()
}

fn same_hash(old: &License, new: &License) -> bool {
    old.hash == new.hash
}

fn removed(old: &License, new: &License) -> bool {
    old.found() && !new.found()
}

fn added(old: &License, new: &License) -> bool {
    !old.found() && new.found()
}

fn same_name(old: &License, new: &License) -> bool {
    old.name == new.name
}

fn same_type_renamed(old: &License, new: &License) -> bool {
    old.license_type == new.license_type && old.name != new.name
}

fn not_tightened(old: &License, new: &License) -> bool {
    !old.is_tightened_by(new)
}

fn tightened_to_most_restrictive(old: &License, new: &License) -> bool {
    old.is_tightened_by(new) && new.is_critical()
}

fn always(_: &License, _: &License) -> bool {
    true
}

fn first_match(rules: &[Rule], old: &License, new: &License) -> Option<(&'static str, Verdict)> {
    rules
        .iter()
        .find(|rule| (rule.applies)(old, new))
        .map(|rule| (rule.name, rule.verdict))
}

/// Hash-only rules. `None` means the outcome depends on the identified
/// license name and category.
pub fn classify_presence(old: &License, new: &License) -> Option<Verdict> {
    first_match(PRESENCE_RULES, old, new).map(|(name, verdict)| {
        tracing::debug!(rule = name, "license presence rule matched");
        verdict
    })
}

/// Name and category rules; expects both licenses found and identified.
pub fn classify_identified(old: &License, new: &License) -> Verdict {
    // CATEGORY_RULES ends with MORE_STRICT, which always applies.
    let (name, verdict) =
        first_match(CATEGORY_RULES, old, new).unwrap_or((MORE_STRICT.name, MORE_STRICT.verdict));
    tracing::debug!(rule = name, "license category rule matched");
    verdict
}

/// Full chain on licenses that are already identified.
pub fn classify(old: &License, new: &License) -> Verdict {
    classify_presence(old, new).unwrap_or_else(|| classify_identified(old, new))
}

/// Level of a dependency that did not exist before the update.
pub fn new_dependency_level(license: &License) -> Severity {
    if license.is_critical() {
        Severity::Critical
    } else {
        Severity::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LicenseType;

    fn license(hash: &str, name: Option<&str>, license_type: Option<LicenseType>) -> License {
        License {
            hash: hash.to_string(),
            name: name.map(str::to_string),
            license_type,
            path: None,
        }
    }

    fn all_licenses() -> Vec<License> {
        let types = [
            None,
            Some(LicenseType::Unencumbered),
            Some(LicenseType::Permissive),
            Some(LicenseType::Notice),
            Some(LicenseType::Reciprocal),
            Some(LicenseType::Restricted),
            Some(LicenseType::Forbidden),
        ];
        let mut licenses = vec![License::default()];
        for hash in ["h1", "h2"] {
            for name in [None, Some("MIT"), Some("GPL-3.0")] {
                for license_type in types {
                    licenses.push(license(hash, name, license_type));
                }
            }
        }
        licenses
    }

    #[test]
    fn test_identical_found_license_has_no_finding() {
        for lic in all_licenses().into_iter().filter(License::found) {
            assert_eq!(classify(&lic, &lic), Verdict::Unchanged);
        }
    }

    #[test]
    fn test_chain_is_total() {
        let licenses = all_licenses();
        for old in &licenses {
            for new in &licenses {
                assert!(first_match(CATEGORY_RULES, old, new).is_some());
            }
        }
        assert_eq!(CATEGORY_RULES.last().map(|rule| rule.name), Some(MORE_STRICT.name));
    }

    #[test]
    fn test_verdict_finding() {
        assert_eq!(Verdict::Unchanged.finding(), None);
        assert_eq!(
            Verdict::Changed(Severity::Medium, DiffKind::NameChanged).finding(),
            Some((Severity::Medium, DiffKind::NameChanged))
        );
    }

    #[test]
    fn test_neither_found() {
        let verdict = classify(&License::default(), &License::default());
        assert_eq!(verdict, Verdict::Changed(Severity::Low, DiffKind::LicenseNotFound));
    }

    #[test]
    fn test_removed_and_added() {
        let found = license("h1", Some("MIT"), Some(LicenseType::Notice));
        assert_eq!(
            classify(&found, &License::default()),
            Verdict::Changed(Severity::High, DiffKind::LicenseRemoved)
        );
        assert_eq!(
            classify(&License::default(), &found),
            Verdict::Changed(Severity::High, DiffKind::LicenseAdded)
        );
    }

    #[test]
    fn test_presence_inconclusive_until_identified() {
        let old = license("h1", None, None);
        let new = license("h2", None, None);
        assert_eq!(classify_presence(&old, &new), None);

        let old = license("h1", Some("MIT"), Some(LicenseType::Notice));
        let new = license("h2", Some("MIT"), Some(LicenseType::Notice));
        assert_eq!(
            classify_identified(&old, &new),
            Verdict::Changed(Severity::Low, DiffKind::MinorChange)
        );
    }

    #[test]
    fn test_name_changed_same_category() {
        let old = license("h1", Some("MIT"), Some(LicenseType::Notice));
        let new = license("h2", Some("BSD-3-Clause"), Some(LicenseType::Notice));
        assert_eq!(classify(&old, &new), Verdict::Changed(Severity::Medium, DiffKind::NameChanged));
    }

    #[test]
    fn test_less_strict() {
        let old = license("h1", Some("GPL-3.0"), Some(LicenseType::Restricted));
        let new = license("h2", Some("MPL-2.0"), Some(LicenseType::Reciprocal));
        assert_eq!(classify(&old, &new), Verdict::Changed(Severity::Low, DiffKind::LessStrict));
    }

    #[test]
    fn test_unknown_category_counts_as_less_strict() {
        let old = license("h1", Some("MIT"), Some(LicenseType::Notice));
        let new = license("h2", Some("Custom"), None);
        assert_eq!(classify(&old, &new), Verdict::Changed(Severity::Low, DiffKind::LessStrict));
    }

    #[test]
    fn test_more_strict_to_forbidden_is_critical() {
        let old = license("h1", Some("Apache-2.0"), Some(LicenseType::Permissive));
        let new = license("h2", Some("WTFPL"), Some(LicenseType::Forbidden));
        assert_eq!(classify(&old, &new), Verdict::Changed(Severity::Critical, DiffKind::MoreStrict));
    }

    #[test]
    fn test_more_strict_fallback_is_high() {
        let old = license("h1", Some("MIT"), Some(LicenseType::Notice));
        let new = license("h2", Some("GPL-3.0"), Some(LicenseType::Restricted));
        assert_eq!(classify(&old, &new), Verdict::Changed(Severity::High, DiffKind::MoreStrict));
    }

    #[test]
    fn test_new_dependency_level() {
        assert_eq!(
            new_dependency_level(&license("h", Some("WTFPL"), Some(LicenseType::Forbidden))),
            Severity::Critical
        );
        assert_eq!(new_dependency_level(&License::default()), Severity::High);
    }
}
