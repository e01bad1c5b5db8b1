//! Dependency entity and ecosystem value object

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Package ecosystem a dependency belongs to
///
/// Each ecosystem has its own manifest/lock conventions and its own
/// source-file extensions for usage scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    /// JavaScript/Node.js packages (package.json, package-lock.json)
    Npm,
    /// Python packages (requirements.txt, pyproject.toml)
    Python,
}

impl Ecosystem {
    /// Name used by the OSV advisory database for this ecosystem.
    pub fn osv_name(&self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Python => "PyPI",
        }
    }

    /// Source-file extensions scanned when checking whether a dependency
    /// is referenced in code.
    pub fn source_extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Npm => &["js", "jsx", "ts", "tsx"],
            Self::Python => &["py"],
        }
    }
}

impl std::fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Npm => write!(f, "npm"),
            Self::Python => write!(f, "python"),
        }
    }
}

/// A declared software dependency discovered during extraction.
///
/// `(ecosystem, name)` is the natural identity key: when both a manifest
/// and its lock file name the same package, the lock-resolved exact
/// version overwrites the manifest's range string. After extraction the
/// entity is not mutated again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    /// Raw spec string from the manifest, possibly overwritten with a
    /// lock-resolved exact version during reconciliation.
    pub version: String,
    pub ecosystem: Ecosystem,
    pub is_direct: bool,
    /// Name of the nearest enclosing package that pulled this one in.
    /// `None` for direct dependencies. A non-owning back-reference.
    pub parent: Option<String>,
    /// Free-form provenance, e.g. source file, integrity hash.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Dependency {
    pub fn direct(
        name: impl Into<String>,
        version: impl Into<String>,
        ecosystem: Ecosystem,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ecosystem,
            is_direct: true,
            parent: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn transitive(
        name: impl Into<String>,
        version: impl Into<String>,
        ecosystem: Ecosystem,
        parent: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ecosystem,
            is_direct: false,
            parent,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Identity key for package-level grouping and reconciliation.
    pub fn package_key(&self) -> String {
        format!("{}:{}", self.ecosystem, self.name)
    }
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{} ({})", self.name, self.version, self.ecosystem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_key() {
        let dep = Dependency::direct("left-pad", "1.0.0", Ecosystem::Npm);
        assert_eq!(dep.package_key(), "npm:left-pad");

        let dep = Dependency::direct("requests", "2.25.0", Ecosystem::Python);
        assert_eq!(dep.package_key(), "python:requests");
    }

    #[test]
    fn test_osv_names() {
        assert_eq!(Ecosystem::Npm.osv_name(), "npm");
        assert_eq!(Ecosystem::Python.osv_name(), "PyPI");
    }

    #[test]
    fn test_transitive_carries_parent() {
        let dep = Dependency::transitive(
            "accepts",
            "1.3.7",
            Ecosystem::Npm,
            Some("express".to_string()),
        );
        assert!(!dep.is_direct);
        assert_eq!(dep.parent.as_deref(), Some("express"));
    }
}
