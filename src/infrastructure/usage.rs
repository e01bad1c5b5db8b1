//! Heuristic usage detection
//!
//! Answers "is this dependency referenced anywhere in source?" with a
//! textual scan: ecosystem-specific import patterns matched
//! case-insensitively against whole files whose extension belongs to the
//! ecosystem. Dynamic imports, aliasing, and re-exports can produce false
//! negatives; the triage fallback accounts for that by treating the flag
//! as one signal among several.

use std::path::Path;

use regex::RegexBuilder;
use tracing::debug;
use walkdir::WalkDir;

use crate::domain::dependency::{Dependency, Ecosystem};

/// Textual import scanner for a checked-out tree.
pub struct UsageDetector;

impl UsageDetector {
    pub fn new() -> Self {
        Self
    }

    /// True when any import pattern for the dependency matches any
    /// qualifying file under `root`. False when nothing matches or no
    /// qualifying file exists.
    pub fn is_used(&self, dependency: &Dependency, root: &Path) -> bool {
        let patterns = Self::import_patterns(dependency);
        if patterns.is_empty() {
            return false;
        }
        let extensions = dependency.ecosystem.source_extensions();

        for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let matches_extension = entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| extensions.contains(&ext))
                .unwrap_or(false);
            if !matches_extension {
                continue;
            }

            // Binary or unreadable files are silently skipped.
            let content = match std::fs::read_to_string(entry.path()) {
                Ok(content) => content,
                Err(_) => continue,
            };

            if patterns.iter().any(|p| p.is_match(&content)) {
                debug!(
                    dependency = %dependency.name,
                    file = %entry.path().display(),
                    "Dependency reference found"
                );
                return true;
            }
        }

        false
    }

    fn import_patterns(dependency: &Dependency) -> Vec<regex::Regex> {
        let name = regex::escape(&dependency.name);
        let raw = match dependency.ecosystem {
            Ecosystem::Npm => vec![
                format!(r#"import.*['"]{}['"]"#, name),
                format!(r#"require\(['"]{}['"]\)"#, name),
                format!(r#"from ['"]{}['"]"#, name),
            ],
            Ecosystem::Python => vec![
                format!(r"import {}", name),
                format!(r"from {} import", name),
                format!(r"import {} as", name),
            ],
        };

        raw.iter()
            .filter_map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .ok()
            })
            .collect()
    }
}

impl Default for UsageDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(path, content).unwrap();
        }
        dir
    }

    #[test]
    fn test_npm_require_detected() {
        let dir = tree(&[("src/index.js", "const pad = require('left-pad');\n")]);
        let dep = Dependency::direct("left-pad", "1.0.0", Ecosystem::Npm);
        assert!(UsageDetector::new().is_used(&dep, dir.path()));
    }

    #[test]
    fn test_npm_es_import_detected_case_insensitively() {
        let dir = tree(&[("app.ts", "IMPORT express FROM 'EXPRESS';\n")]);
        let dep = Dependency::direct("express", "4.17.1", Ecosystem::Npm);
        assert!(UsageDetector::new().is_used(&dep, dir.path()));
    }

    #[test]
    fn test_python_from_import_detected() {
        let dir = tree(&[("main.py", "from requests import get\n")]);
        let dep = Dependency::direct("requests", "2.25.0", Ecosystem::Python);
        assert!(UsageDetector::new().is_used(&dep, dir.path()));
    }

    #[test]
    fn test_wrong_extension_not_scanned() {
        // Python dep mentioned only in a .js file: not a qualifying file.
        let dir = tree(&[("note.js", "import requests\n")]);
        let dep = Dependency::direct("requests", "2.25.0", Ecosystem::Python);
        assert!(!UsageDetector::new().is_used(&dep, dir.path()));
    }

    #[test]
    fn test_unreferenced_dependency_is_unused() {
        let dir = tree(&[("src/index.js", "console.log('hello');\n")]);
        let dep = Dependency::direct("left-pad", "1.0.0", Ecosystem::Npm);
        assert!(!UsageDetector::new().is_used(&dep, dir.path()));
    }

    #[test]
    fn test_empty_tree_is_unused() {
        let dir = tempfile::tempdir().unwrap();
        let dep = Dependency::direct("left-pad", "1.0.0", Ecosystem::Npm);
        assert!(!UsageDetector::new().is_used(&dep, dir.path()));
    }

    #[test]
    fn test_regex_metacharacters_in_name_are_escaped() {
        let dir = tree(&[("app.js", "const x = require('@scope/pkg.js');\n")]);
        let dep = Dependency::direct("@scope/pkg.js", "1.0.0", Ecosystem::Npm);
        assert!(UsageDetector::new().is_used(&dep, dir.path()));

        // The dot must not act as a wildcard.
        let other = Dependency::direct("@scope/pkgXjs", "1.0.0", Ecosystem::Npm);
        assert!(!UsageDetector::new().is_used(&other, dir.path()));
    }
}
