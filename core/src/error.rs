use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DsuError {
    #[error("Failed to decode dependency descriptor stream: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to fetch '{coordinate}': {reason}")]
    Fetch { coordinate: String, reason: String },

    #[error("Rate limited by {service}: quota exceeded")]
    RateLimited { service: String },

    #[error("Vulnerability lookup failed for '{coordinate}': {reason}")]
    Lookup { coordinate: String, reason: String },

    #[error("Registry error for '{registry}': {source}")]
    Registry {
        registry: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Command '{command}' failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation error in configuration{}:\n{}",
        .file.as_ref().map(|f| format!(" file '{}'", f.display())).unwrap_or_default(),
        .errors.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation {
        file: Option<PathBuf>,
        errors: Vec<String>,
    },

    #[error("Invalid YAML in '{file}': {source}")]
    Yaml {
        file: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("No {collaborator} registered for ecosystem '{ecosystem}'")]
    MissingCollaborator {
        collaborator: &'static str,
        ecosystem: String,
    },
}

impl DsuError {
    /// Exhausted external quota; the whole run has to stop.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, DsuError::RateLimited { .. })
    }

    pub fn fetch(coordinate: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        DsuError::Fetch {
            coordinate: coordinate.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DsuError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_predicate() {
        let err = DsuError::RateLimited {
            service: "osv".to_string(),
        };
        assert!(err.is_rate_limited());
        assert!(!DsuError::fetch("a@v1", "boom").is_rate_limited());
    }

    #[test]
    fn test_validation_message_lists_errors() {
        let err = DsuError::Validation {
            file: Some(PathBuf::from("dsu.yaml")),
            errors: vec!["concurrency must be at least 1".to_string(), "osv_url is empty".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("dsu.yaml"));
        assert!(msg.contains("  - concurrency must be at least 1"));
        assert!(msg.contains("  - osv_url is empty"));
    }
}
