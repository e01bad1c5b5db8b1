//! Analysis engine
//!
//! Orchestrates one run end to end: acquire the tree, extract
//! dependencies, match advisories, triage candidates, aggregate the
//! report. The engine is infallible at its boundary: every run yields an
//! [`AnalysisReport`], with failures normalized into the report's errors
//! list and zeroed counts.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::application::errors::AnalysisError;
use crate::application::matcher::VulnerabilityMatcher;
use crate::application::triage::{TriageAdjudicator, TriageContext};
use crate::config::Config;
use crate::domain::advisory::Advisory;
use crate::domain::dependency::{Dependency, Ecosystem};
use crate::domain::report::{
    AnalysisReport, AnalysisRequest, AnalysisStage, ThreatLevel, TriageResult,
    VulnerabilityReport,
};
use crate::infrastructure::llm::CompletionService;
use crate::infrastructure::osv::AdvisoryDatabase;
use crate::infrastructure::parsers::DependencyExtractor;
use crate::infrastructure::repository::{RepositorySource, SourceError};
use crate::infrastructure::usage::UsageDetector;

/// End-to-end analysis orchestrator.
///
/// All external collaborators are injected behind traits, so the engine
/// itself is deterministic given deterministic collaborators.
pub struct AnalysisEngine {
    source: Arc<dyn RepositorySource>,
    matcher: VulnerabilityMatcher,
    adjudicator: TriageAdjudicator,
    usage: UsageDetector,
    config: Config,
}

impl AnalysisEngine {
    pub fn new(
        source: Arc<dyn RepositorySource>,
        database: Arc<dyn AdvisoryDatabase>,
        completion: Arc<dyn CompletionService>,
        config: Config,
    ) -> Self {
        Self {
            source,
            matcher: VulnerabilityMatcher::new(database),
            adjudicator: TriageAdjudicator::new(completion, config.llm.clone()),
            usage: UsageDetector::new(),
            config,
        }
    }

    /// Run one analysis. Never returns an error: run-level failures
    /// produce a report with zeroed counts and a populated errors list.
    #[instrument(skip(self, request), fields(locator = %request.locator))]
    pub async fn analyze(&self, request: &AnalysisRequest) -> AnalysisReport {
        let started = Instant::now();
        let report_id = Uuid::new_v4();
        info!(%report_id, "Analysis started");

        let mut errors = Vec::new();
        let outcome = self.run(request, &mut errors).await;

        let (dependencies, reports) = match outcome {
            Ok(outcome) => (outcome.dependencies, outcome.reports),
            Err(e) => {
                warn!(error = %e, "Analysis failed, emitting empty report");
                errors.push(e.to_string());
                (Vec::new(), Vec::new())
            }
        };

        let tally = Tally::from_reports(&reports);
        let report = AnalysisReport {
            report_id,
            locator: request.locator.clone(),
            analysis_timestamp: chrono::Utc::now(),
            dependencies_analyzed: dependencies.len(),
            vulnerabilities_found: tally.vulnerabilities,
            real_threats: tally.real_threats,
            critical_count: tally.critical,
            high_count: tally.high,
            medium_count: tally.medium,
            low_count: tally.low,
            vulnerability_reports: reports,
            dependencies,
            analysis_duration_seconds: started.elapsed().as_secs_f64(),
            errors,
        };

        info!(
            %report_id,
            dependencies = report.dependencies_analyzed,
            vulnerabilities = report.vulnerabilities_found,
            real_threats = report.real_threats,
            duration_seconds = report.analysis_duration_seconds,
            "Analysis complete"
        );
        report
    }

    async fn run(
        &self,
        request: &AnalysisRequest,
        errors: &mut Vec<String>,
    ) -> Result<RunOutcome, AnalysisError> {
        let mut stage = AnalysisStage::Acquiring;

        let acquisition = tokio::time::timeout(
            self.config.analysis.acquire_timeout(),
            self.source.acquire(&request.locator),
        )
        .await;
        let checkout = match acquisition {
            Ok(Ok(checkout)) => checkout,
            Ok(Err(e)) => {
                advance(&mut stage, AnalysisStage::Failed);
                return Err(e.into());
            }
            Err(_) => {
                advance(&mut stage, AnalysisStage::Failed);
                return Err(SourceError::Timeout {
                    seconds: self.config.analysis.acquire_timeout_seconds,
                }
                .into());
            }
        };

        advance(&mut stage, AnalysisStage::Extracting);
        let cap = request
            .max_dependencies
            .unwrap_or(self.config.analysis.max_dependencies);
        let extraction = DependencyExtractor::new(cap).extract(checkout.path()).await;
        errors.extend(extraction.errors);
        if extraction.truncated {
            warn!(cap, "Dependency list truncated");
            errors.push(format!("Dependency list truncated to {} entries", cap));
        }
        let dependencies = extraction.dependencies;

        if dependencies.is_empty() {
            advance(&mut stage, AnalysisStage::Aggregating);
            errors.push("No dependencies found in repository".to_string());
            advance(&mut stage, AnalysisStage::Done);
            return Ok(RunOutcome {
                dependencies,
                reports: Vec::new(),
            });
        }

        advance(&mut stage, AnalysisStage::Matching);
        let candidates = match self.matcher.find_candidates(&dependencies).await {
            Ok(candidates) => candidates,
            Err(e) => {
                advance(&mut stage, AnalysisStage::Failed);
                return Err(e.into());
            }
        };
        info!(candidates = candidates.len(), "Matching complete");

        // Usage is scanned once per distinct package, and the whole-tree
        // context summary once per run, before the checkout is released.
        let mut usage_by_package: HashMap<String, bool> = HashMap::new();
        for (_, dep) in &candidates {
            let key = dep.package_key();
            if !usage_by_package.contains_key(&key) {
                let used = self.usage.is_used(dep, checkout.path());
                usage_by_package.insert(key, used);
            }
        }
        let repository_context = summarize_repository(&dependencies, checkout.path());
        drop(checkout);

        advance(&mut stage, AnalysisStage::Triaging);
        let reports = stream::iter(candidates.into_iter().map(|(advisory, dependency)| {
            let context = TriageContext {
                is_used: usage_by_package
                    .get(&dependency.package_key())
                    .copied()
                    .unwrap_or(true),
                repository_context: repository_context.clone(),
            };
            async move {
                let verdict = self
                    .adjudicator
                    .adjudicate(&advisory, &dependency, &context)
                    .await;
                build_report(advisory, dependency, context, verdict)
            }
        }))
        .buffer_unordered(self.config.analysis.triage_concurrency)
        .collect::<Vec<_>>()
        .await;

        advance(&mut stage, AnalysisStage::Aggregating);
        advance(&mut stage, AnalysisStage::Done);
        Ok(RunOutcome {
            dependencies,
            reports,
        })
    }
}

struct RunOutcome {
    dependencies: Vec<Dependency>,
    reports: Vec<VulnerabilityReport>,
}

fn advance(current: &mut AnalysisStage, next: AnalysisStage) {
    if current.can_transition_to(next) {
        info!(from = %current, to = %next, "Stage transition");
        *current = next;
    } else {
        warn!(from = %current, to = %next, "Ignoring invalid stage transition");
    }
}

fn build_report(
    advisory: Advisory,
    dependency: Dependency,
    context: TriageContext,
    verdict: TriageResult,
) -> VulnerabilityReport {
    let mut evidence = std::collections::BTreeMap::new();
    evidence.insert(
        "is_direct".to_string(),
        serde_json::Value::Bool(dependency.is_direct),
    );
    evidence.insert(
        "is_used".to_string(),
        serde_json::Value::Bool(context.is_used),
    );
    if let Some(parent) = &dependency.parent {
        evidence.insert(
            "parent".to_string(),
            serde_json::Value::String(parent.clone()),
        );
    }
    evidence.insert(
        "reasoning".to_string(),
        serde_json::Value::String(verdict.reasoning),
    );
    evidence.insert(
        "confidence".to_string(),
        serde_json::Value::from(verdict.confidence),
    );

    VulnerabilityReport {
        advisory,
        dependency: dependency.name,
        dependency_version: dependency.version,
        is_real_threat: verdict.is_real_threat,
        threat_level: verdict.threat_level,
        impact_summary: verdict.impact_summary,
        recommendation: verdict.recommendation,
        evidence,
        triage_confidence: verdict.confidence,
    }
}

/// Count aggregation over triaged reports. Order-independent: the four
/// tier counters cover critical through low; info-tier reports count as
/// vulnerabilities found but land in no tier counter.
#[derive(Debug, Default, PartialEq, Eq)]
struct Tally {
    vulnerabilities: usize,
    real_threats: usize,
    critical: usize,
    high: usize,
    medium: usize,
    low: usize,
}

impl Tally {
    fn from_reports(reports: &[VulnerabilityReport]) -> Self {
        let mut tally = Self {
            vulnerabilities: reports.len(),
            ..Self::default()
        };
        for report in reports {
            if report.is_real_threat {
                tally.real_threats += 1;
            }
            match report.threat_level {
                ThreatLevel::Critical => tally.critical += 1,
                ThreatLevel::High => tally.high += 1,
                ThreatLevel::Medium => tally.medium += 1,
                ThreatLevel::Low => tally.low += 1,
                ThreatLevel::Info => {}
            }
        }
        tally
    }
}

/// One-paragraph summary of the repository's dependency shape, embedded
/// in every triage prompt for this run.
fn summarize_repository(dependencies: &[Dependency], root: &std::path::Path) -> String {
    let npm = dependencies
        .iter()
        .filter(|d| d.ecosystem == Ecosystem::Npm)
        .count();
    let python = dependencies.len() - npm;
    let direct = dependencies.iter().filter(|d| d.is_direct).count();
    let transitive = dependencies.len() - direct;

    let mut extensions: BTreeSet<String> = BTreeSet::new();
    let known: &[&str] = &["js", "jsx", "ts", "tsx", "py"];
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(ext) = entry.path().extension().and_then(|e| e.to_str()) {
            if known.contains(&ext) {
                extensions.insert(ext.to_string());
            }
        }
    }
    let extension_list = if extensions.is_empty() {
        "none".to_string()
    } else {
        extensions.into_iter().collect::<Vec<_>>().join(", ")
    };

    format!(
        "{} dependencies ({} npm, {} python); {} direct, {} transitive; \
         source file extensions present: {}.",
        dependencies.len(),
        npm,
        python,
        direct,
        transitive,
        extension_list,
    )
}
