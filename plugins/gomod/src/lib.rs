pub mod download;
pub mod executor;
pub mod license;
pub mod lister;
pub mod plugin;

pub use download::GoModMaterializer;
pub use executor::Executor;
pub use license::{LicenseFileFinder, TextLicenseIdentifier};
pub use lister::{GoModChildLister, GoModLister};
pub use plugin::GoModPlugin;
