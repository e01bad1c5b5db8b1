//! Traits for manifest/lock file parsers

use async_trait::async_trait;

use crate::application::errors::ParseError;
use crate::domain::dependency::{Dependency, Ecosystem};

/// Trait for parsing one manifest or lock file into a dependency list.
#[async_trait]
pub trait ManifestParser: Send + Sync {
    /// Check if this parser supports the given filename.
    fn supports_file(&self, filename: &str) -> bool;

    /// Parse the file content into normalized dependencies.
    async fn parse_file(&self, content: &str) -> Result<Vec<Dependency>, ParseError>;

    /// Ecosystem this parser handles.
    fn ecosystem(&self) -> Ecosystem;

    /// Priority among parsers claiming the same filename (higher wins).
    fn priority(&self) -> u8 {
        0
    }
}

/// Factory resolving filenames to the highest-priority supporting parser.
pub struct ParserFactory {
    parsers: Vec<Box<dyn ManifestParser>>,
}

impl ParserFactory {
    pub fn new() -> Self {
        Self {
            parsers: vec![
                Box::new(super::npm::NpmManifestParser::new()),
                Box::new(super::npm::NpmLockParser::new()),
                Box::new(super::python::RequirementsTxtParser::new()),
                Box::new(super::python::PyProjectTomlParser::new()),
            ],
        }
    }

    /// Highest-priority parser supporting `filename`, if any.
    pub fn create_parser(&self, filename: &str) -> Option<&dyn ManifestParser> {
        self.parsers
            .iter()
            .filter(|parser| parser.supports_file(filename))
            .max_by_key(|parser| parser.priority())
            .map(|parser| parser.as_ref())
    }

    /// Whether any parser recognizes the filename.
    pub fn is_supported(&self, filename: &str) -> bool {
        self.parsers
            .iter()
            .any(|parser| parser.supports_file(filename))
    }
}

impl Default for ParserFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_resolves_known_manifests() {
        let factory = ParserFactory::new();
        for filename in [
            "package.json",
            "package-lock.json",
            "requirements.txt",
            "pyproject.toml",
        ] {
            let parser = factory.create_parser(filename);
            assert!(parser.is_some(), "no parser for {}", filename);
        }
        assert!(factory.create_parser("Gemfile").is_none());
        assert!(!factory.is_supported("build.gradle"));
    }

    #[test]
    fn test_lock_parser_outranks_manifest_for_its_own_file() {
        let factory = ParserFactory::new();
        let parser = factory.create_parser("package-lock.json").unwrap();
        assert_eq!(parser.ecosystem(), Ecosystem::Npm);
        assert!(parser.priority() > 0);
    }
}
