//! Vulnsift — dependency vulnerability analysis with LLM-assisted triage.
//!
//! The crate ingests a checked-out source tree, extracts its declared
//! dependencies (npm and Python ecosystems), matches them against OSV
//! advisories, and classifies every (advisory, dependency) pair as a real
//! or non-real threat. Classification goes through an LLM-backed
//! adjudicator with a deterministic rule-based fallback, so a run always
//! produces a complete report even when the completion service is down.
//!
//! Layering follows domain / application / infrastructure:
//! - [`domain`] holds the entities and value objects,
//! - [`application`] holds the engine, matcher, and adjudicator,
//! - [`infrastructure`] holds parsers and the external-service clients.
//!
//! Network transports (repository acquisition, advisory database,
//! completion provider) are injected behind traits; see
//! [`infrastructure::repository::RepositorySource`],
//! [`infrastructure::osv::AdvisoryDatabase`], and
//! [`infrastructure::llm::CompletionService`].

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;

pub use application::engine::AnalysisEngine;
pub use application::errors::{AnalysisError, ParseError};
pub use application::matcher::VulnerabilityMatcher;
pub use application::triage::TriageAdjudicator;
pub use config::Config;
pub use domain::advisory::{Advisory, AffectedPackage, VersionRange};
pub use domain::dependency::{Dependency, Ecosystem};
pub use domain::report::{
    AnalysisReport, AnalysisRequest, AnalysisStage, ThreatLevel, TriageResult,
    VulnerabilityReport,
};
pub use domain::version::Version;
