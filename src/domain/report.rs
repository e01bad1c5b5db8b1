//! Triage and analysis report types
//!
//! A run produces exactly one [`AnalysisReport`]. The engine owns it until
//! it is handed to the caller, after which it is read-only.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::advisory::Advisory;
use crate::domain::dependency::Dependency;

/// Five-tier threat classification produced by triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Info => "info",
        }
    }

    /// Parse a tier name case-insensitively.
    pub fn from_str_loose(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" | "moderate" => Some(Self::Medium),
            "low" => Some(Self::Low),
            "info" => Some(Self::Info),
            _ => None,
        }
    }
}

impl std::fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of adjudicating one (advisory, dependency) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageResult {
    pub is_real_threat: bool,
    pub threat_level: ThreatLevel,
    pub impact_summary: String,
    pub recommendation: String,
    /// 0.0..=1.0
    pub confidence: f64,
    pub reasoning: String,
}

/// One triaged advisory/dependency pair. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilityReport {
    pub advisory: Advisory,
    pub dependency: String,
    pub dependency_version: String,
    pub is_real_threat: bool,
    pub threat_level: ThreatLevel,
    pub impact_summary: String,
    pub recommendation: String,
    /// Directness, usage flag, triage confidence and reasoning.
    #[serde(default)]
    pub evidence: BTreeMap<String, serde_json::Value>,
    pub triage_confidence: f64,
}

/// Parameters for one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Locator understood by the injected repository source (URL or path).
    pub locator: String,
    /// Overrides the configured dependency cap when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_dependencies: Option<usize>,
}

impl AnalysisRequest {
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            max_dependencies: None,
        }
    }
}

/// Final immutable report for a run. Assembled exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub report_id: Uuid,
    pub locator: String,
    pub analysis_timestamp: DateTime<Utc>,
    pub dependencies_analyzed: usize,
    pub vulnerabilities_found: usize,
    pub real_threats: usize,
    pub critical_count: usize,
    pub high_count: usize,
    pub medium_count: usize,
    pub low_count: usize,
    pub vulnerability_reports: Vec<VulnerabilityReport>,
    pub dependencies: Vec<Dependency>,
    /// Elapsed wall-clock time for the run, in seconds.
    pub analysis_duration_seconds: f64,
    /// Human-readable error strings accumulated during the run.
    pub errors: Vec<String>,
}

/// Stage machine for a single analysis run.
///
/// ```text
/// Acquiring ─► Extracting ─► Matching ─► Triaging ─► Aggregating ─► Done
///     │            │            │            │             │
///     └────────────┴────────────┴────────────┴─────────────┴──► Failed
/// ```
///
/// `Failed` still yields a Done-shaped report with zero counts and a
/// populated errors list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisStage {
    Acquiring,
    Extracting,
    Matching,
    Triaging,
    Aggregating,
    Done,
    Failed,
}

impl AnalysisStage {
    /// Valid target stages from the current stage.
    pub fn valid_transitions(&self) -> &'static [AnalysisStage] {
        match self {
            Self::Acquiring => &[Self::Extracting, Self::Failed],
            Self::Extracting => &[Self::Matching, Self::Aggregating, Self::Failed],
            Self::Matching => &[Self::Triaging, Self::Failed],
            Self::Triaging => &[Self::Aggregating, Self::Failed],
            Self::Aggregating => &[Self::Done, Self::Failed],
            Self::Done | Self::Failed => &[],
        }
    }

    pub fn can_transition_to(&self, target: AnalysisStage) -> bool {
        self.valid_transitions().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl std::fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Acquiring => "Acquiring",
            Self::Extracting => "Extracting",
            Self::Matching => "Matching",
            Self::Triaging => "Triaging",
            Self::Aggregating => "Aggregating",
            Self::Done => "Done",
            Self::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}
