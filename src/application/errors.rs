//! Error taxonomy for the analysis pipeline
//!
//! Errors are normalized at the engine boundary: manifest parse failures
//! degrade to skipped files, database failures degrade per package where
//! possible, and triage failures are absorbed entirely by the fallback.
//! Callers only ever see error strings inside the report.

use crate::infrastructure::osv::DatabaseError;
use crate::infrastructure::repository::SourceError;

/// Failure while parsing a single manifest/lock file.
///
/// Always scoped to one file: the extractor records it and moves on.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Missing field: {field}")]
    MissingField { field: String },
}

/// Run-level failure caught at the top of the engine.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Repository acquisition failed: {0}")]
    Source(#[from] SourceError),

    #[error("Advisory database unavailable: {0}")]
    Database(#[from] DatabaseError),
}

// Completion failures never surface here: the adjudicator's fallback
// contract absorbs them before they can cross the engine boundary.
