//! External-facing adapters: parsers, scanners, and service clients

pub mod llm;
pub mod osv;
pub mod parsers;
pub mod repository;
pub mod store;
pub mod usage;
