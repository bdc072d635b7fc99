use async_trait::async_trait;
use dsu_core::plugin::{LicenseFinder, LicenseIdentifier};
use dsu_core::types::{License, LicenseType};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;
use walkdir::WalkDir;

const LICENSE_FILE_PREFIXES: &[&str] = &["license", "copying", "copyright", "licence", "unlicense", "copyleft"];

pub struct LicenseFileFinder;

impl LicenseFileFinder {
    pub fn new() -> Self {
        Self
    }

    /// First top-level file, by name, that looks like a license.
    fn license_path(directory: &Path) -> Option<PathBuf> {
        WalkDir::new(directory)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .find(|entry| {
                let name = entry.file_name().to_string_lossy().to_lowercase();
                LICENSE_FILE_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
            })
            .map(|entry| entry.into_path())
    }
}

impl Default for LicenseFileFinder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LicenseFinder for LicenseFileFinder {
    async fn find(&self, directory: &Path) -> License {
        let Some(path) = Self::license_path(directory) else {
            debug!(dir = %directory.display(), "license not found");
            return License::default();
        };

        match tokio::fs::read(&path).await {
            Ok(content) => License {
                hash: format!("{:x}", Sha256::digest(&content)),
                path: Some(path),
                ..License::default()
            },
            Err(err) => {
                debug!(path = %path.display(), error = %err, "license file unreadable");
                License::default()
            }
        }
    }
}

struct Signature {
    name: &'static str,
    pattern: &'static str,
    license_type: LicenseType,
}

// Matched in order against lower-cased text with whitespace collapsed.
const SIGNATURES: &[Signature] = &[
    Signature {
        name: "AGPL-3.0",
        pattern: r"gnu affero general public license",
        license_type: LicenseType::Forbidden,
    },
    Signature {
        name: "WTFPL",
        pattern: r"do what the fuck you want to public license",
        license_type: LicenseType::Forbidden,
    },
    Signature {
        name: "LGPL-3.0",
        pattern: r"gnu lesser general public license version 3\b",
        license_type: LicenseType::Restricted,
    },
    Signature {
        name: "LGPL-2.1",
        pattern: r"gnu (lesser|library) general public license version 2(\.1)?\b",
        license_type: LicenseType::Restricted,
    },
    Signature {
        name: "GPL-3.0",
        pattern: r"gnu general public license version 3\b",
        license_type: LicenseType::Restricted,
    },
    Signature {
        name: "GPL-2.0",
        pattern: r"gnu general public license version 2\b",
        license_type: LicenseType::Restricted,
    },
    Signature {
        name: "MPL-2.0",
        pattern: r"mozilla public license,? version 2\.0",
        license_type: LicenseType::Reciprocal,
    },
    Signature {
        name: "EPL-2.0",
        pattern: r"eclipse public license\s*-?\s*v(ersion)?\s*2\.0",
        license_type: LicenseType::Reciprocal,
    },
    Signature {
        name: "EPL-1.0",
        pattern: r"eclipse public license",
        license_type: LicenseType::Reciprocal,
    },
    Signature {
        name: "Apache-2.0",
        pattern: r"apache license,? version 2\.0",
        license_type: LicenseType::Notice,
    },
    Signature {
        name: "BSD-3-Clause",
        pattern: r"redistribution and use in source and binary forms.*neither the name",
        license_type: LicenseType::Notice,
    },
    Signature {
        name: "BSD-2-Clause",
        pattern: r"redistribution and use in source and binary forms",
        license_type: LicenseType::Notice,
    },
    Signature {
        name: "ISC",
        pattern: r"permission to use, copy, modify, and(/or)? distribute this software for any purpose with or without fee",
        license_type: LicenseType::Notice,
    },
    Signature {
        name: "MIT",
        pattern: r"permission is hereby granted, free of charge",
        license_type: LicenseType::Notice,
    },
    Signature {
        name: "BSL-1.0",
        pattern: r"boost software license",
        license_type: LicenseType::Notice,
    },
    Signature {
        name: "Zlib",
        pattern: r"altered source versions must be plainly marked as such",
        license_type: LicenseType::Notice,
    },
    Signature {
        name: "Unlicense",
        pattern: r"this is free and unencumbered software released into the public domain",
        license_type: LicenseType::Unencumbered,
    },
    Signature {
        name: "CC0-1.0",
        pattern: r"cc0 1\.0 universal",
        license_type: LicenseType::Unencumbered,
    },
];

fn compiled() -> &'static [(Regex, &'static Signature)] {
    static COMPILED: OnceLock<Vec<(Regex, &'static Signature)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        SIGNATURES
            .iter()
            .filter_map(|signature| Regex::new(signature.pattern).ok().map(|re| (re, signature)))
            .collect()
    })
}

/// Names license texts from their wording.
pub struct TextLicenseIdentifier;

impl TextLicenseIdentifier {
    pub fn new() -> Self {
        Self
    }

    pub fn identify_text(text: &str) -> Option<(String, LicenseType)> {
        let normalized = text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        compiled()
            .iter()
            .find(|(re, _)| re.is_match(&normalized))
            .map(|(_, signature)| (signature.name.to_string(), signature.license_type))
    }
}

impl Default for TextLicenseIdentifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LicenseIdentifier for TextLicenseIdentifier {
    async fn identify(&self, license: &License) -> Option<(String, LicenseType)> {
        let path = license.path.as_deref()?;
        let content = match tokio::fs::read(path).await {
            Ok(content) => content,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "license file unreadable");
                return None;
            }
        };
        let identified = Self::identify_text(&String::from_utf8_lossy(&content));
        if identified.is_none() {
            debug!(path = %path.display(), "unknown license text");
        }
        identified
    }
}
