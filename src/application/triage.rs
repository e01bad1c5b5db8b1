//! Threat adjudication
//!
//! Each (advisory, dependency) candidate is adjudicated by a completion
//! backend, with a deterministic fallback applied whenever the backend
//! fails, times out, or returns unusable output. The adjudicator is
//! total: it always produces a [`TriageResult`] and never raises outward.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::domain::advisory::Advisory;
use crate::domain::dependency::Dependency;
use crate::domain::report::{ThreatLevel, TriageResult};
use crate::infrastructure::llm::{
    CompletionRequest, CompletionService, ResponseParser,
};

/// Reasoning text attached to every fallback verdict, so report readers
/// can tell heuristic verdicts from model verdicts.
pub const FALLBACK_REASONING: &str =
    "Heuristic triage: verdict derived from advisory severity, dependency \
     directness, and source usage because model adjudication was unavailable.";

/// Evidence about a dependency gathered before adjudication.
#[derive(Debug, Clone)]
pub struct TriageContext {
    /// Whether the package name appears in import/require statements.
    pub is_used: bool,
    /// One-paragraph summary of the analyzed repository's dependency shape.
    pub repository_context: String,
}

/// Adjudicates candidates into triage verdicts.
pub struct TriageAdjudicator {
    completion: Arc<dyn CompletionService>,
    config: LlmConfig,
}

impl TriageAdjudicator {
    pub fn new(completion: Arc<dyn CompletionService>, config: LlmConfig) -> Self {
        Self { completion, config }
    }

    /// Adjudicate one candidate pair. Infallible by construction: any
    /// backend failure degrades to the deterministic fallback verdict.
    pub async fn adjudicate(
        &self,
        advisory: &Advisory,
        dependency: &Dependency,
        context: &TriageContext,
    ) -> TriageResult {
        let prompt = build_prompt(advisory, dependency, context);
        let request = CompletionRequest {
            prompt,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let call = self.completion.complete(request);
        let outcome = tokio::time::timeout(self.config.request_timeout(), call).await;

        let content = match outcome {
            Ok(Ok(content)) => content,
            Ok(Err(e)) => {
                warn!(
                    advisory = %advisory.id,
                    dependency = %dependency.name,
                    error = %e,
                    "Completion failed, using fallback triage"
                );
                return fallback_triage(advisory, dependency, context);
            }
            Err(_) => {
                warn!(
                    advisory = %advisory.id,
                    dependency = %dependency.name,
                    timeout_seconds = self.config.request_timeout_seconds,
                    "Completion timed out, using fallback triage"
                );
                return fallback_triage(advisory, dependency, context);
            }
        };

        match ResponseParser::parse_json::<RawVerdict>(&content) {
            Ok(raw) => {
                debug!(
                    advisory = %advisory.id,
                    dependency = %dependency.name,
                    "Model verdict accepted"
                );
                raw.into_result(advisory, dependency, context)
            }
            Err(e) => {
                warn!(
                    advisory = %advisory.id,
                    dependency = %dependency.name,
                    error = %e,
                    "Unparsable completion, using fallback triage"
                );
                fallback_triage(advisory, dependency, context)
            }
        }
    }
}

/// Wire shape the model is asked to produce. Lenient on purpose: every
/// field has a default so partial output still yields a verdict.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(default)]
    is_real_threat: bool,
    #[serde(default)]
    threat_level: String,
    #[serde(default)]
    impact_summary: String,
    #[serde(default)]
    recommendation: String,
    #[serde(default = "default_confidence")]
    confidence: f64,
    #[serde(default)]
    reasoning: String,
}

fn default_confidence() -> f64 {
    0.5
}

impl RawVerdict {
    fn into_result(
        self,
        advisory: &Advisory,
        dependency: &Dependency,
        context: &TriageContext,
    ) -> TriageResult {
        let threat_level = match ThreatLevel::from_str_loose(&self.threat_level) {
            Some(level) => level,
            None => {
                warn!(
                    advisory = %advisory.id,
                    tier = %self.threat_level,
                    "Unrecognized threat tier in verdict, deriving from severity"
                );
                return fallback_triage(advisory, dependency, context);
            }
        };

        TriageResult {
            is_real_threat: self.is_real_threat,
            threat_level,
            impact_summary: self.impact_summary,
            recommendation: self.recommendation,
            confidence: self.confidence.clamp(0.0, 1.0),
            reasoning: self.reasoning,
        }
    }
}

fn build_prompt(advisory: &Advisory, dependency: &Dependency, context: &TriageContext) -> String {
    let description = if advisory.description.trim().is_empty() {
        "No description available"
    } else {
        advisory.description.as_str()
    };
    let severity = advisory.severity.as_deref().unwrap_or("unknown");

    format!(
        "You are a security analyst triaging a dependency vulnerability.\n\
         \n\
         Vulnerability:\n\
         - ID: {id}\n\
         - Summary: {summary}\n\
         - Description: {description}\n\
         - Severity: {severity}\n\
         \n\
         Dependency:\n\
         - Package: {name} ({ecosystem})\n\
         - Version: {version}\n\
         - Direct dependency: {direct}\n\
         - Imported in source code: {used}\n\
         \n\
         Repository context:\n\
         {context}\n\
         \n\
         Decide whether this vulnerability is a real, actionable threat for\n\
         this repository. Respond with a single JSON object:\n\
         {{\n\
           \"is_real_threat\": bool,\n\
           \"threat_level\": \"critical\" | \"high\" | \"medium\" | \"low\" | \"info\",\n\
           \"impact_summary\": string,\n\
           \"recommendation\": string,\n\
           \"confidence\": number between 0 and 1,\n\
           \"reasoning\": string\n\
         }}",
        id = advisory.id,
        summary = advisory.summary,
        description = description,
        severity = severity,
        name = dependency.name,
        ecosystem = dependency.ecosystem,
        version = dependency.version,
        direct = dependency.is_direct,
        used = context.is_used,
        context = context.repository_context,
    )
}

/// Deterministic verdict from advisory severity plus local evidence.
///
/// A pair is a real threat when the dependency is both direct and
/// actually imported by the repository's source. Real threats keep the
/// advisory's severity tier (unknown maps to low); non-threats are
/// demoted one tier (unknown maps to info).
pub fn fallback_triage(
    advisory: &Advisory,
    dependency: &Dependency,
    context: &TriageContext,
) -> TriageResult {
    let is_real_threat = dependency.is_direct && context.is_used;
    let severity = advisory
        .severity
        .as_deref()
        .map(|s| s.trim().to_ascii_lowercase());

    let threat_level = match (severity.as_deref(), is_real_threat) {
        (Some("critical"), true) => ThreatLevel::Critical,
        (Some("critical"), false) => ThreatLevel::High,
        (Some("high"), true) => ThreatLevel::High,
        (Some("high"), false) => ThreatLevel::Medium,
        (Some("medium"), true) | (Some("moderate"), true) => ThreatLevel::Medium,
        (Some("medium"), false) | (Some("moderate"), false) => ThreatLevel::Low,
        (Some("low"), true) => ThreatLevel::Low,
        (Some("low"), false) => ThreatLevel::Info,
        (_, true) => ThreatLevel::Low,
        (_, false) => ThreatLevel::Info,
    };

    let impact_summary = if is_real_threat {
        format!(
            "{} is a direct dependency imported by this repository and is \
             affected by {}.",
            dependency.name, advisory.id
        )
    } else {
        format!(
            "{} is affected by {} but is {} and {} in this repository.",
            dependency.name,
            advisory.id,
            if dependency.is_direct {
                "a direct dependency"
            } else {
                "a transitive dependency"
            },
            if context.is_used {
                "imported"
            } else {
                "not imported"
            },
        )
    };

    let recommendation = format!(
        "Update {} to a version not affected by {}.",
        dependency.name, advisory.id
    );

    TriageResult {
        is_real_threat,
        threat_level,
        impact_summary,
        recommendation,
        confidence: 0.5,
        reasoning: FALLBACK_REASONING.to_string(),
    }
}
