//! Application services: matching, triage, and the run orchestrator

pub mod engine;
pub mod errors;
pub mod matcher;
pub mod triage;
