//! Structured records emitted by the build toolchain when listing modules.
//!
//! Field names follow `go list -m -json`: one JSON object per module, objects
//! concatenated without separators other than whitespace.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::dependency::Dependency;
use crate::error::{DsuError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Descriptor {
    #[serde(default)]
    pub main: bool,
    #[serde(default)]
    pub indirect: bool,
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub go_mod: Option<PathBuf>,
    #[serde(default)]
    pub go_version: Option<String>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub versions: Vec<String>,
    #[serde(default)]
    pub error: Option<DescriptorError>,
    #[serde(default)]
    pub replace: Option<Box<Descriptor>>,
    #[serde(default)]
    pub update: Option<Box<Descriptor>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorError {
    #[serde(rename = "Err", default)]
    pub err: String,
}

impl Descriptor {
    pub fn into_dependency(self) -> Dependency {
        Dependency {
            path: self.path,
            version: self.version,
            indirect: self.indirect,
            directory: self.dir.filter(|d| !d.as_os_str().is_empty()),
            dependencies: Vec::new(),
            update: self.update.map(|u| Box::new(u.into_dependency())),
            replace: self.replace.map(|r| Box::new(r.into_dependency())),
            available_versions: self.versions,
            toolchain_version: self.go_version,
            manifest_path: self.go_mod,
            error: self.error.map(|e| e.err),
            ..Dependency::default()
        }
    }
}

/// Which listed records to keep. The main module is never kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Skip records that are only indirectly required.
    pub direct_only: bool,
    /// Skip records without an available update.
    pub with_update_only: bool,
}

impl ListFilter {
    pub fn new(direct_only: bool, with_update_only: bool) -> Self {
        Self {
            direct_only,
            with_update_only,
        }
    }

    fn keeps(&self, descriptor: &Descriptor) -> bool {
        !(descriptor.main
            || (self.direct_only && descriptor.indirect)
            || (self.with_update_only && descriptor.update.is_none()))
    }
}

/// Decodes a stream of descriptors one record at a time. Stops cleanly at
/// end of input; the first malformed record aborts the whole call.
pub fn decode_dependencies(input: &[u8], filter: ListFilter) -> Result<Vec<Dependency>> {
    let stream = serde_json::Deserializer::from_slice(input).into_iter::<Descriptor>();
    let mut dependencies = Vec::new();

    for record in stream {
        let descriptor = record.map_err(|source| DsuError::Decode { source })?;
        if filter.keeps(&descriptor) {
            dependencies.push(descriptor.into_dependency());
        }
    }

    Ok(dependencies)
}
