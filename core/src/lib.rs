//! DSU Core Library
//!
//! Dependency-update differencing: compares every module a proposed update
//! would pull in against what is used today, and reports license and
//! vulnerability changes graded by severity.

pub mod cache;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod osv;
pub mod plugin;
pub mod report;
pub mod scheduler;
pub mod scratch;
pub mod severity;
pub mod survey;
pub mod types;
pub mod version;

pub use types::*;
pub use cache::{CacheError, CacheManager};
pub use classify::{classify, Verdict};
pub use config::{CacheConfig, Config};
pub use engine::Differ;
pub use error::{DsuError, Result};
pub use http::HttpClient;
pub use osv::OsvClient;
pub use plugin::{
    ChildLister, DependencyLister, LicenseFinder, LicenseIdentifier, Materializer, Plugin, PluginRegistry,
    Toolchain, VulnerabilityLookup,
};
pub use report::{InventoryEntry, InventoryReport, UpdateEntry, UpdateReport, UpdateSummary};
pub use scheduler::{NoProgress, ProgressSink, Scheduler};
pub use scratch::ScratchArea;
pub use severity::DependencyIndex;
pub use survey::Surveyor;
pub use version::{UpdateType, VersionComparator};
