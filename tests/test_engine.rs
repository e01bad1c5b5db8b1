//! End-to-end engine runs against scripted collaborators.

mod common;

use std::sync::Arc;

use common::{make_advisory, write_tree, MockAdvisoryDatabase, MockCompletionService};
use vulnsift::config::Config;
use vulnsift::domain::dependency::Ecosystem;
use vulnsift::domain::report::{AnalysisRequest, ThreatLevel};
use vulnsift::infrastructure::repository::LocalPathSource;
use vulnsift::AnalysisEngine;

fn engine(
    database: MockAdvisoryDatabase,
    completion: MockCompletionService,
) -> AnalysisEngine {
    AnalysisEngine::new(
        Arc::new(LocalPathSource::new()),
        Arc::new(database),
        Arc::new(completion),
        Config::default(),
    )
}

async fn analyze_dir(engine: &AnalysisEngine, dir: &tempfile::TempDir) -> vulnsift::AnalysisReport {
    let request = AnalysisRequest::new(dir.path().to_str().unwrap());
    engine.analyze(&request).await
}

#[tokio::test]
async fn test_empty_repository_short_circuits() {
    let dir = write_tree(&[("README.md", "nothing to see")]);
    let engine = engine(
        MockAdvisoryDatabase::empty(),
        MockCompletionService::unavailable(),
    );

    let report = analyze_dir(&engine, &dir).await;

    assert_eq!(report.dependencies_analyzed, 0);
    assert_eq!(report.vulnerabilities_found, 0);
    assert_eq!(report.real_threats, 0);
    assert!(report
        .errors
        .iter()
        .any(|e| e == "No dependencies found in repository"));
}

#[tokio::test]
async fn test_fallback_keeps_severity_for_used_direct_dependency() {
    let dir = write_tree(&[
        (
            "package.json",
            r#"{ "dependencies": { "left-pad": "1.0.0" } }"#,
        ),
        ("src/index.js", "const pad = require('left-pad');\n"),
    ]);
    let database = MockAdvisoryDatabase::with_advisory(
        Ecosystem::Npm,
        "left-pad",
        make_advisory("GHSA-pad-0001", "high", Ecosystem::Npm, "left-pad", "1.0.1"),
    );
    let engine = engine(database, MockCompletionService::unavailable());

    let report = analyze_dir(&engine, &dir).await;

    assert_eq!(report.dependencies_analyzed, 1);
    assert_eq!(report.vulnerabilities_found, 1);
    assert_eq!(report.real_threats, 1);
    assert_eq!(report.high_count, 1);

    let vuln = &report.vulnerability_reports[0];
    assert_eq!(vuln.advisory.id, "GHSA-pad-0001");
    assert_eq!(vuln.dependency, "left-pad");
    assert!(vuln.is_real_threat);
    assert_eq!(vuln.threat_level, ThreatLevel::High);
    assert_eq!(vuln.evidence["is_used"], serde_json::Value::Bool(true));
}

#[tokio::test]
async fn test_fallback_demotes_unused_dependency() {
    // Same manifest, but no source file references the package.
    let dir = write_tree(&[(
        "package.json",
        r#"{ "dependencies": { "left-pad": "1.0.0" } }"#,
    )]);
    let database = MockAdvisoryDatabase::with_advisory(
        Ecosystem::Npm,
        "left-pad",
        make_advisory("GHSA-pad-0001", "high", Ecosystem::Npm, "left-pad", "1.0.1"),
    );
    let engine = engine(database, MockCompletionService::unavailable());

    let report = analyze_dir(&engine, &dir).await;

    assert_eq!(report.vulnerabilities_found, 1);
    assert_eq!(report.real_threats, 0);
    let vuln = &report.vulnerability_reports[0];
    assert!(!vuln.is_real_threat);
    assert_eq!(vuln.threat_level, ThreatLevel::Medium);
    assert_eq!(report.medium_count, 1);
    assert_eq!(report.high_count, 0);
}

#[tokio::test]
async fn test_model_verdict_is_used_when_parsable() {
    let dir = write_tree(&[
        (
            "package.json",
            r#"{ "dependencies": { "left-pad": "1.0.0" } }"#,
        ),
        ("src/index.js", "const pad = require('left-pad');\n"),
    ]);
    let database = MockAdvisoryDatabase::with_advisory(
        Ecosystem::Npm,
        "left-pad",
        make_advisory("GHSA-pad-0001", "high", Ecosystem::Npm, "left-pad", "1.0.1"),
    );
    let completion = MockCompletionService::canned(
        r#"{
            "is_real_threat": false,
            "threat_level": "info",
            "impact_summary": "Not reachable",
            "recommendation": "No action needed",
            "confidence": 0.9,
            "reasoning": "The vulnerable function is never invoked."
        }"#,
    );
    let engine = engine(database, completion);

    let report = analyze_dir(&engine, &dir).await;

    assert_eq!(report.vulnerabilities_found, 1);
    assert_eq!(report.real_threats, 0);
    let vuln = &report.vulnerability_reports[0];
    assert_eq!(vuln.threat_level, ThreatLevel::Info);
    assert_eq!(vuln.impact_summary, "Not reachable");
    assert_eq!(vuln.triage_confidence, 0.9);
    // Info-tier verdicts count as found but fill no tier counter.
    assert_eq!(
        report.critical_count + report.high_count + report.medium_count + report.low_count,
        0
    );
}

#[tokio::test]
async fn test_garbage_completion_falls_back() {
    let dir = write_tree(&[
        (
            "package.json",
            r#"{ "dependencies": { "left-pad": "1.0.0" } }"#,
        ),
        ("src/index.js", "const pad = require('left-pad');\n"),
    ]);
    let database = MockAdvisoryDatabase::with_advisory(
        Ecosystem::Npm,
        "left-pad",
        make_advisory("GHSA-pad-0001", "critical", Ecosystem::Npm, "left-pad", "1.0.1"),
    );
    let engine = engine(database, MockCompletionService::garbage());

    let report = analyze_dir(&engine, &dir).await;

    assert_eq!(report.vulnerabilities_found, 1);
    let vuln = &report.vulnerability_reports[0];
    assert!(vuln.is_real_threat);
    assert_eq!(vuln.threat_level, ThreatLevel::Critical);
    assert_eq!(vuln.triage_confidence, 0.5);
}

#[tokio::test]
async fn test_prompt_carries_advisory_and_repository_context() {
    let dir = write_tree(&[
        (
            "package.json",
            r#"{ "dependencies": { "left-pad": "1.0.0" } }"#,
        ),
        ("src/index.js", "const pad = require('left-pad');\n"),
    ]);
    let database = MockAdvisoryDatabase::with_advisory(
        Ecosystem::Npm,
        "left-pad",
        make_advisory("GHSA-pad-0001", "high", Ecosystem::Npm, "left-pad", "1.0.1"),
    );
    let completion = Arc::new(MockCompletionService::garbage());
    let engine = AnalysisEngine::new(
        Arc::new(LocalPathSource::new()),
        Arc::new(database),
        completion.clone(),
        Config::default(),
    );

    let request = AnalysisRequest::new(dir.path().to_str().unwrap());
    let _ = engine.analyze(&request).await;

    let prompts = completion.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    let prompt = &prompts[0];
    assert!(prompt.contains("GHSA-pad-0001"));
    assert!(prompt.contains("left-pad"));
    assert!(prompt.contains("Imported in source code: true"));
    assert!(prompt.contains("1 dependencies (1 npm, 0 python)"));
}

#[tokio::test]
async fn test_patched_version_produces_no_report() {
    let dir = write_tree(&[(
        "package.json",
        r#"{ "dependencies": { "left-pad": "1.0.1" } }"#,
    )]);
    let database = MockAdvisoryDatabase::with_advisory(
        Ecosystem::Npm,
        "left-pad",
        make_advisory("GHSA-pad-0001", "high", Ecosystem::Npm, "left-pad", "1.0.1"),
    );
    let engine = engine(database, MockCompletionService::unavailable());

    let report = analyze_dir(&engine, &dir).await;

    assert_eq!(report.dependencies_analyzed, 1);
    assert_eq!(report.vulnerabilities_found, 0);
    assert!(report.vulnerability_reports.is_empty());
}

#[tokio::test]
async fn test_request_cap_truncates_deterministically() {
    let dir = write_tree(&[(
        "requirements.txt",
        "alpha==1.0\nbeta==2.0\ngamma==3.0\n",
    )]);
    let engine = engine(
        MockAdvisoryDatabase::empty(),
        MockCompletionService::unavailable(),
    );

    let mut request = AnalysisRequest::new(dir.path().to_str().unwrap());
    request.max_dependencies = Some(2);
    let report = engine.analyze(&request).await;

    assert_eq!(report.dependencies_analyzed, 2);
    let names: Vec<&str> = report.dependencies.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta"]);
    assert!(report.errors.iter().any(|e| e.contains("truncated")));
}

#[tokio::test]
async fn test_acquisition_failure_yields_failed_report() {
    let engine = engine(
        MockAdvisoryDatabase::empty(),
        MockCompletionService::unavailable(),
    );

    let request = AnalysisRequest::new("/definitely/not/a/repository");
    let report = engine.analyze(&request).await;

    assert_eq!(report.dependencies_analyzed, 0);
    assert_eq!(report.vulnerabilities_found, 0);
    assert!(report
        .errors
        .iter()
        .any(|e| e.contains("Repository acquisition failed")));
}

#[tokio::test]
async fn test_database_failure_yields_failed_report() {
    let dir = write_tree(&[(
        "package.json",
        r#"{ "dependencies": { "left-pad": "1.0.0" } }"#,
    )]);
    let engine = engine(
        MockAdvisoryDatabase::failing(),
        MockCompletionService::unavailable(),
    );

    let report = analyze_dir(&engine, &dir).await;

    assert_eq!(report.vulnerabilities_found, 0);
    assert!(report
        .errors
        .iter()
        .any(|e| e.contains("Advisory database unavailable")));
}

#[tokio::test]
async fn test_malformed_manifest_error_reaches_report() {
    let dir = write_tree(&[
        ("package.json", "{ not json"),
        ("requirements.txt", "requests==2.25.0\n"),
    ]);
    let engine = engine(
        MockAdvisoryDatabase::empty(),
        MockCompletionService::unavailable(),
    );

    let report = analyze_dir(&engine, &dir).await;

    // The healthy file is still analyzed.
    assert_eq!(report.dependencies_analyzed, 1);
    assert!(report
        .errors
        .iter()
        .any(|e| e.contains("Failed to parse package.json")));
}

#[tokio::test]
async fn test_mixed_ecosystem_run() {
    let dir = write_tree(&[
        (
            "package.json",
            r#"{ "dependencies": { "left-pad": "1.0.0" } }"#,
        ),
        ("requirements.txt", "requests==2.20.0\n"),
        ("src/index.js", "const pad = require('left-pad');\n"),
        ("main.py", "import requests\n"),
    ]);
    // Only left-pad carries an advisory; requests resolves to an empty list.
    let database = MockAdvisoryDatabase::with_advisory(
        Ecosystem::Npm,
        "left-pad",
        make_advisory("GHSA-pad-0001", "high", Ecosystem::Npm, "left-pad", "1.0.1"),
    );
    let engine = engine(database, MockCompletionService::unavailable());

    let report = analyze_dir(&engine, &dir).await;

    assert_eq!(report.dependencies_analyzed, 2);
    assert_eq!(report.vulnerabilities_found, 1);
    assert_eq!(report.vulnerability_reports[0].dependency, "left-pad");
}
