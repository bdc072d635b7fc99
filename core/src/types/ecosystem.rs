use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Ord, PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Go,
}

impl Ecosystem {
    /// Ecosystem name as understood by the OSV database.
    pub fn osv_name(&self) -> &'static str {
        match self {
            Ecosystem::Go => "Go",
        }
    }
}

impl std::fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ecosystem::Go => write!(f, "go"),
        }
    }
}
