//! Node.js ecosystem parsers
//!
//! `package.json` yields direct dependencies with their declared range
//! strings. `package-lock.json` yields every resolved node in the nested
//! dependency tree with exact versions; the extractor reconciles the two,
//! letting lock-resolved versions overwrite manifest ranges.

use async_trait::async_trait;
use serde_json::Value;

use super::traits::ManifestParser;
use crate::application::errors::ParseError;
use crate::domain::dependency::{Dependency, Ecosystem};

/// Parser for package.json files.
pub struct NpmManifestParser;

impl NpmManifestParser {
    pub fn new() -> Self {
        Self
    }

    fn collect_section(json: &Value, section: &str, out: &mut Vec<Dependency>) {
        if let Some(deps) = json.get(section).and_then(|d| d.as_object()) {
            for (name, version_value) in deps {
                let version = version_value.as_str().unwrap_or("*");
                out.push(
                    Dependency::direct(name.clone(), version, Ecosystem::Npm)
                        .with_metadata("source", "package.json"),
                );
            }
        }
    }
}

impl Default for NpmManifestParser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ManifestParser for NpmManifestParser {
    fn supports_file(&self, filename: &str) -> bool {
        filename == "package.json"
    }

    async fn parse_file(&self, content: &str) -> Result<Vec<Dependency>, ParseError> {
        let json: Value = serde_json::from_str(content)?;
        let mut dependencies = Vec::new();
        Self::collect_section(&json, "dependencies", &mut dependencies);
        Self::collect_section(&json, "devDependencies", &mut dependencies);
        Ok(dependencies)
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Npm
    }

    fn priority(&self) -> u8 {
        10
    }
}

/// Parser for package-lock.json files.
///
/// Walks the nested `dependencies` structure depth-first with an explicit
/// stack, so adversarially deep lock files cannot blow the call stack.
/// Every node becomes a transitive dependency attributed to its nearest
/// enclosing package; the first occurrence of a name fixes its position
/// in discovery order, later occurrences overwrite version and metadata
/// in place.
pub struct NpmLockParser;

impl NpmLockParser {
    pub fn new() -> Self {
        Self
    }

    fn walk_lock_tree(root: &Value) -> Vec<Dependency> {
        let mut ordered: Vec<Dependency> = Vec::new();
        let mut index: std::collections::HashMap<String, usize> =
            std::collections::HashMap::new();

        // (parent name, node map) frames; children pushed in reverse so the
        // traversal visits them in source order.
        let mut stack: Vec<(Option<String>, &serde_json::Map<String, Value>)> = Vec::new();
        if let Some(deps) = root.get("dependencies").and_then(|d| d.as_object()) {
            stack.push((None, deps));
        }

        while let Some((parent, deps)) = stack.pop() {
            let mut nested: Vec<(Option<String>, &serde_json::Map<String, Value>)> = Vec::new();

            for (name, info) in deps {
                let version = match info.get("version").and_then(|v| v.as_str()) {
                    Some(v) => v,
                    None => continue,
                };

                let mut dep = Dependency::transitive(
                    name.clone(),
                    version,
                    Ecosystem::Npm,
                    parent.clone(),
                )
                .with_metadata("source", "package-lock.json");
                if let Some(integrity) = info.get("integrity").and_then(|v| v.as_str()) {
                    dep = dep.with_metadata("integrity", integrity);
                }
                if let Some(resolved) = info.get("resolved").and_then(|v| v.as_str()) {
                    dep = dep.with_metadata("resolved", resolved);
                }

                match index.get(name) {
                    Some(&pos) => ordered[pos] = dep,
                    None => {
                        index.insert(name.clone(), ordered.len());
                        ordered.push(dep);
                    }
                }

                if let Some(children) = info.get("dependencies").and_then(|d| d.as_object()) {
                    nested.push((Some(name.clone()), children));
                }
            }

            for frame in nested.into_iter().rev() {
                stack.push(frame);
            }
        }

        ordered
    }
}

impl Default for NpmLockParser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ManifestParser for NpmLockParser {
    fn supports_file(&self, filename: &str) -> bool {
        filename == "package-lock.json"
    }

    async fn parse_file(&self, content: &str) -> Result<Vec<Dependency>, ParseError> {
        let json: Value = serde_json::from_str(content)?;
        Ok(Self::walk_lock_tree(&json))
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Npm
    }

    fn priority(&self) -> u8 {
        15 // exact versions beat manifest ranges
    }
}
