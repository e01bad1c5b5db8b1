//! Domain entities and value objects

pub mod advisory;
pub mod dependency;
pub mod report;
pub mod version;
