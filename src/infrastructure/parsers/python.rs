//! Python ecosystem parsers
//!
//! `requirements.txt` is one spec per non-comment line; the name/version
//! split tests operators in a fixed precedence order. `pyproject.toml`
//! extraction covers the poetry dependency tables, where an entry is
//! either a bare version string or a table with a `version` field.

use async_trait::async_trait;

use super::traits::ManifestParser;
use crate::application::errors::ParseError;
use crate::domain::dependency::{Dependency, Ecosystem};

/// Operator precedence for requirement lines. Order matters: two-character
/// operators must be tested before the bare `=` catch-all.
const REQUIREMENT_OPERATORS: &[&str] = &["==", ">=", "<=", "!=", "~=", "="];

/// Split a single requirement line into (name, version spec).
///
/// Trailing comments are stripped first; a line without any recognized
/// operator maps to the wildcard version `*`.
fn split_requirement_line(line: &str) -> Option<(String, String)> {
    let line = line.split('#').next().unwrap_or("").trim();
    if line.is_empty() {
        return None;
    }

    for op in REQUIREMENT_OPERATORS {
        if let Some(idx) = line.find(op) {
            let name = line[..idx].trim();
            let version = line[idx + op.len()..].trim();
            if name.is_empty() {
                return None;
            }
            return Some((name.to_string(), version.to_string()));
        }
    }

    Some((line.to_string(), "*".to_string()))
}

/// Parser for requirements.txt files.
pub struct RequirementsTxtParser;

impl RequirementsTxtParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RequirementsTxtParser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ManifestParser for RequirementsTxtParser {
    fn supports_file(&self, filename: &str) -> bool {
        filename == "requirements.txt"
    }

    async fn parse_file(&self, content: &str) -> Result<Vec<Dependency>, ParseError> {
        let mut dependencies = Vec::new();
        for line in content.lines() {
            if let Some((name, version)) = split_requirement_line(line) {
                dependencies.push(
                    Dependency::direct(name, version, Ecosystem::Python)
                        .with_metadata("source", "requirements.txt"),
                );
            }
        }
        Ok(dependencies)
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Python
    }

    fn priority(&self) -> u8 {
        10
    }
}

/// Parser for pyproject.toml files (poetry dependency tables).
pub struct PyProjectTomlParser;

impl PyProjectTomlParser {
    pub fn new() -> Self {
        Self
    }

    fn collect_table(
        poetry: &toml::Value,
        table_name: &str,
        out: &mut Vec<Dependency>,
    ) {
        if let Some(table) = poetry.get(table_name).and_then(|t| t.as_table()) {
            for (name, spec) in table {
                let version = match spec {
                    toml::Value::String(s) => s.clone(),
                    toml::Value::Table(t) => t
                        .get("version")
                        .and_then(|v| v.as_str())
                        .unwrap_or("*")
                        .to_string(),
                    _ => "*".to_string(),
                };
                out.push(
                    Dependency::direct(name.clone(), version, Ecosystem::Python)
                        .with_metadata("source", "pyproject.toml")
                        .with_metadata("table", table_name),
                );
            }
        }
    }
}

impl Default for PyProjectTomlParser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ManifestParser for PyProjectTomlParser {
    fn supports_file(&self, filename: &str) -> bool {
        filename == "pyproject.toml"
    }

    async fn parse_file(&self, content: &str) -> Result<Vec<Dependency>, ParseError> {
        let value: toml::Value = toml::from_str(content)?;
        let mut dependencies = Vec::new();

        if let Some(poetry) = value.get("tool").and_then(|t| t.get("poetry")) {
            Self::collect_table(poetry, "dependencies", &mut dependencies);
            Self::collect_table(poetry, "dev-dependencies", &mut dependencies);
        }

        Ok(dependencies)
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Python
    }

    fn priority(&self) -> u8 {
        8
    }
}
