//! OSV advisory database client
//!
//! One batched `querybatch` call per run resolves which packages have
//! advisories at all; each advisory id is then hydrated with a `vulns/{id}`
//! fetch. A hydration failure degrades that advisory to absent with a
//! warning; only a failed batch query is a run-level error.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::OsvConfig;
use crate::domain::advisory::{Advisory, AffectedPackage, VersionRange};
use crate::domain::dependency::Ecosystem;

/// Errors from the advisory database boundary.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected status {status} from advisory database")]
    Status { status: u16 },

    #[error("Malformed response: {0}")]
    Decode(String),
}

/// One package identifier in a batched query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageQuery {
    pub ecosystem: Ecosystem,
    pub name: String,
}

impl PackageQuery {
    pub fn new(ecosystem: Ecosystem, name: impl Into<String>) -> Self {
        Self {
            ecosystem,
            name: name.into(),
        }
    }
}

/// Batched advisory lookup: `(ecosystem, package)` identifiers in, a
/// per-package advisory list out. Queried fresh every run; caching across
/// runs is an explicit non-goal.
#[async_trait]
pub trait AdvisoryDatabase: Send + Sync {
    async fn query_batch(
        &self,
        queries: &[PackageQuery],
    ) -> Result<HashMap<PackageQuery, Vec<Advisory>>, DatabaseError>;
}

/// HTTP client for the OSV API (https://osv.dev).
pub struct OsvClient {
    client: Client,
    base_url: String,
}

impl OsvClient {
    pub fn new(config: &OsvConfig) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build OSV HTTP client with timeout, using default");
                Client::new()
            });

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_advisory(&self, id: &str) -> Result<Advisory, DatabaseError> {
        let url = format!("{}/v1/vulns/{}", self.base_url, id);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(DatabaseError::Status {
                status: response.status().as_u16(),
            });
        }
        let doc: OsvVulnerability = response.json().await?;
        Ok(doc.into_advisory())
    }
}

#[async_trait]
impl AdvisoryDatabase for OsvClient {
    async fn query_batch(
        &self,
        queries: &[PackageQuery],
    ) -> Result<HashMap<PackageQuery, Vec<Advisory>>, DatabaseError> {
        let mut results: HashMap<PackageQuery, Vec<Advisory>> = HashMap::new();
        if queries.is_empty() {
            return Ok(results);
        }

        let body = OsvBatchRequest {
            queries: queries
                .iter()
                .map(|q| OsvQuery {
                    package: OsvPackageRef {
                        name: q.name.clone(),
                        ecosystem: q.ecosystem.osv_name().to_string(),
                    },
                })
                .collect(),
        };

        let url = format!("{}/v1/querybatch", self.base_url);
        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(DatabaseError::Status {
                status: response.status().as_u16(),
            });
        }

        let batch: OsvBatchResponse = response.json().await?;
        if batch.results.len() != queries.len() {
            return Err(DatabaseError::Decode(format!(
                "querybatch returned {} results for {} queries",
                batch.results.len(),
                queries.len()
            )));
        }

        for (query, result) in queries.iter().zip(batch.results) {
            let mut advisories = Vec::new();
            for stub in result.vulns.unwrap_or_default() {
                // A single failed hydration degrades this package's list,
                // never the whole run.
                match self.fetch_advisory(&stub.id).await {
                    Ok(advisory) => advisories.push(advisory),
                    Err(e) => {
                        warn!(advisory = %stub.id, package = %query.name, error = %e,
                            "Failed to hydrate advisory, skipping");
                    }
                }
            }
            debug!(package = %query.name, count = advisories.len(), "Advisories fetched");
            results.insert(query.clone(), advisories);
        }

        Ok(results)
    }
}

// ── OSV wire format ──────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct OsvBatchRequest {
    queries: Vec<OsvQuery>,
}

#[derive(Debug, Serialize)]
struct OsvQuery {
    package: OsvPackageRef,
}

#[derive(Debug, Serialize, Deserialize)]
struct OsvPackageRef {
    name: String,
    ecosystem: String,
}

#[derive(Debug, Deserialize)]
struct OsvBatchResponse {
    #[serde(default)]
    results: Vec<OsvBatchResult>,
}

#[derive(Debug, Deserialize)]
struct OsvBatchResult {
    #[serde(default)]
    vulns: Option<Vec<OsvVulnStub>>,
}

#[derive(Debug, Deserialize)]
struct OsvVulnStub {
    id: String,
}

#[derive(Debug, Deserialize)]
struct OsvVulnerability {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    affected: Vec<OsvAffected>,
    #[serde(default)]
    references: Vec<OsvReference>,
    #[serde(default)]
    published: Option<DateTime<Utc>>,
    #[serde(default)]
    modified: Option<DateTime<Utc>>,
    #[serde(default)]
    database_specific: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OsvAffected {
    package: OsvPackageRef,
    #[serde(default)]
    versions: Vec<String>,
    #[serde(default)]
    ranges: Vec<OsvRange>,
}

#[derive(Debug, Deserialize)]
struct OsvRange {
    #[serde(default)]
    events: Vec<OsvRangeEvent>,
}

#[derive(Debug, Default, Deserialize)]
struct OsvRangeEvent {
    #[serde(default)]
    introduced: Option<String>,
    #[serde(default)]
    fixed: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OsvReference {
    #[serde(default)]
    url: Option<String>,
}

impl OsvVulnerability {
    fn into_advisory(self) -> Advisory {
        let severity = self
            .database_specific
            .as_ref()
            .and_then(|d| d.get("severity"))
            .and_then(|s| s.as_str())
            .map(|s| s.to_string());

        let affected = self
            .affected
            .into_iter()
            .filter_map(|entry| {
                let ecosystem = match entry.package.ecosystem.as_str() {
                    "npm" => Ecosystem::Npm,
                    "PyPI" => Ecosystem::Python,
                    other => {
                        debug!(ecosystem = other, "Ignoring unsupported OSV ecosystem");
                        return None;
                    }
                };
                let ranges = entry
                    .ranges
                    .into_iter()
                    .map(|range| {
                        let mut collapsed = VersionRange::default();
                        for event in range.events {
                            if event.introduced.is_some() {
                                collapsed.introduced = event.introduced;
                            }
                            if event.fixed.is_some() {
                                collapsed.fixed = event.fixed;
                            }
                        }
                        collapsed
                    })
                    .collect();
                Some(AffectedPackage {
                    ecosystem,
                    package: entry.package.name,
                    versions: entry.versions,
                    ranges,
                })
            })
            .collect();

        Advisory {
            id: self.id,
            summary: self.summary.unwrap_or_default(),
            description: self.details.unwrap_or_default(),
            severity,
            affected,
            references: self.references.into_iter().filter_map(|r| r.url).collect(),
            published: self.published,
            modified: self.modified,
        }
    }
}
