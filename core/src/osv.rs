use crate::cache::CacheManager;
use crate::error::{DsuError, Result};
use crate::http::HttpClient;
use crate::plugin::VulnerabilityLookup;
use crate::severity::{parse_score, score_from_label};
use crate::types::{Ecosystem, Vulnerability};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_OSV_URL: &str = "https://api.osv.dev";

#[derive(Debug, Clone)]
pub struct OsvClient {
    client: HttpClient,
    base_url: String,
    ecosystem: Ecosystem,
}

impl OsvClient {
    pub fn new(base_url: &str, ecosystem: Ecosystem) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            ecosystem,
        })
    }

    pub fn with_cache(mut self, cache: CacheManager) -> Self {
        self.client = self.client.with_cache(cache);
        self
    }

    pub async fn query(&self, query: &OsvQuery) -> Result<Vec<OsvVulnerability>> {
        let key = format!("{}-{}-{}", query.package.ecosystem, query.package.name, query.version);
        let response: OsvResponse = self
            .client
            .post(&format!("{}/v1/query", self.base_url), query, &key)
            .await?;
        Ok(response.vulns)
    }
}

#[async_trait]
impl VulnerabilityLookup for OsvClient {
    async fn lookup(&self, coordinate: &str) -> Result<Vec<Vulnerability>> {
        let query = OsvQuery::for_coordinate(coordinate, self.ecosystem).ok_or_else(|| DsuError::Lookup {
            coordinate: coordinate.to_string(),
            reason: "expected path@version".to_string(),
        })?;

        let vulns = self.query(&query).await.map_err(|err| match err {
            DsuError::Lookup { reason, .. } => DsuError::Lookup {
                coordinate: coordinate.to_string(),
                reason,
            },
            other => other,
        })?;
        debug!(coordinate, count = vulns.len(), "osv lookup");
        Ok(vulns.iter().map(OsvVulnerability::to_vulnerability).collect())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct OsvResponse {
    #[serde(default)]
    vulns: Vec<OsvVulnerability>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OsvQuery {
    pub package: OsvPackage,
    pub version: String,
}

impl OsvQuery {
    /// Query for `path@version`. OSV stores Go versions without the `v`.
    pub fn for_coordinate(coordinate: &str, ecosystem: Ecosystem) -> Option<Self> {
        let (name, version) = coordinate.rsplit_once('@')?;
        if name.is_empty() || version.is_empty() {
            return None;
        }
        Some(Self {
            package: OsvPackage {
                name: name.to_string(),
                ecosystem: ecosystem.osv_name().to_string(),
            },
            version: version.strip_prefix('v').unwrap_or(version).to_string(),
        })
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Deserialize)]
pub struct OsvPackage {
    pub name: String,
    pub ecosystem: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsvVulnerability {
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub severity: Vec<OsvSeverity>,
    #[serde(default)]
    pub database_specific: Option<OsvDatabaseSpecific>,
    #[serde(default)]
    pub references: Vec<OsvReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsvSeverity {
    pub r#type: String,
    pub score: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OsvDatabaseSpecific {
    #[serde(default)]
    pub severity: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsvReference {
    #[serde(default)]
    pub r#type: String,
    pub url: String,
}

impl OsvVulnerability {
    /// Highest parseable score among the severity entries, then the
    /// database's severity label, else 0.0.
    pub fn cvss_score(&self) -> f64 {
        let scored = self
            .severity
            .iter()
            .filter_map(|s| parse_score(&s.score))
            .fold(None, |best: Option<f64>, score| Some(best.map_or(score, |b| b.max(score))));

        scored
            .or_else(|| {
                self.database_specific
                    .as_ref()
                    .and_then(|d| d.severity.as_deref())
                    .and_then(score_from_label)
            })
            .unwrap_or_else(|| {
                debug!(id = %self.id, "no usable severity, scoring 0.0");
                0.0
            })
    }

    pub fn to_vulnerability(&self) -> Vulnerability {
        let title = if self.summary.is_empty() {
            self.details.lines().next().unwrap_or_default().to_string()
        } else {
            self.summary.clone()
        };
        let reference = self
            .references
            .iter()
            .find(|r| r.r#type == "ADVISORY")
            .or_else(|| self.references.first())
            .map(|r| r.url.clone())
            .unwrap_or_else(|| format!("https://osv.dev/vulnerability/{}", self.id));

        Vulnerability {
            id: self.id.clone(),
            title,
            reference,
            cvss_score: self.cvss_score(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;

    #[test]
    fn test_query_strips_v_prefix() {
        let query = OsvQuery::for_coordinate("golang.org/x/net@v0.17.0", Ecosystem::Go).unwrap();
        assert_eq!(query.package.name, "golang.org/x/net");
        assert_eq!(query.package.ecosystem, "Go");
        assert_eq!(query.version, "0.17.0");

        let body = serde_json::to_value(&query).unwrap();
        assert_eq!(body["package"]["name"], "golang.org/x/net");
        assert!(OsvQuery::for_coordinate("no-version", Ecosystem::Go).is_none());
    }

    #[test]
    fn test_response_without_vulns() {
        let response: OsvResponse = serde_json::from_str("{}").unwrap();
        assert!(response.vulns.is_empty());
    }

    #[test]
    fn test_vector_score() {
        let vuln: OsvVulnerability = serde_json::from_value(serde_json::json!({
            "id": "GHSA-qppj-fm5r-hxr3",
            "summary": "HTTP/2 rapid reset",
            "severity": [
                {"type": "CVSS_V3", "score": "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:N/I:N/A:H"}
            ],
            "references": [
                {"type": "WEB", "url": "https://example.com/blog"},
                {"type": "ADVISORY", "url": "https://nvd.nist.gov/vuln/detail/CVE-2023-44487"}
            ]
        }))
        .unwrap();

        let converted = vuln.to_vulnerability();
        assert_eq!(converted.cvss_score, 7.5);
        assert_eq!(converted.severity(), Severity::High);
        assert_eq!(converted.title, "HTTP/2 rapid reset");
        assert_eq!(converted.reference, "https://nvd.nist.gov/vuln/detail/CVE-2023-44487");
    }

    #[test]
    fn test_label_fallback_and_unscored() {
        let labelled: OsvVulnerability = serde_json::from_value(serde_json::json!({
            "id": "GHSA-xxxx",
            "details": "first line\nsecond line",
            "database_specific": {"severity": "MODERATE"}
        }))
        .unwrap();
        let converted = labelled.to_vulnerability();
        assert_eq!(converted.severity(), Severity::Medium);
        assert_eq!(converted.title, "first line");
        assert_eq!(converted.reference, "https://osv.dev/vulnerability/GHSA-xxxx");

        let bare: OsvVulnerability = serde_json::from_value(serde_json::json!({"id": "GO-2022-0001"})).unwrap();
        assert_eq!(bare.cvss_score(), 0.0);
        assert_eq!(bare.to_vulnerability().severity(), Severity::Low);
    }
}
