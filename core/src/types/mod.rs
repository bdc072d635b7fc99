pub mod dependency;
pub mod descriptor;
pub mod difference;
pub mod ecosystem;
pub mod license;
pub mod vulnerability;

pub use dependency::Dependency;
pub use descriptor::{decode_dependencies, Descriptor, DescriptorError, ListFilter};
pub use difference::{DiffKind, Difference, Ledger};
pub use ecosystem::Ecosystem;
pub use license::{License, LicenseType};
pub use vulnerability::{Severity, Vulnerability, VulnerabilitySet};
