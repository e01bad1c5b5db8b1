//! Advisory entities from the vulnerability database
//!
//! Advisories are immutable once fetched; the matcher only reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::dependency::Ecosystem;

/// A half-open affected range: `introduced <= v < fixed`.
///
/// A missing `introduced` means "from the first release"; a missing
/// `fixed` means no patched release is known yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub introduced: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed: Option<String>,
}

impl VersionRange {
    pub fn below(fixed: impl Into<String>) -> Self {
        Self {
            introduced: None,
            fixed: Some(fixed.into()),
        }
    }
}

/// One package affected by an advisory, scoped to an ecosystem and
/// carrying either an enumerated version list, bounded ranges, or both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedPackage {
    pub ecosystem: Ecosystem,
    pub package: String,
    /// Explicitly enumerated affected versions.
    #[serde(default)]
    pub versions: Vec<String>,
    /// Bounded affected ranges.
    #[serde(default)]
    pub ranges: Vec<VersionRange>,
}

/// A vulnerability advisory as returned by the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    /// Raw severity tier as published (e.g. "HIGH", "moderate"). Free
    /// text; normalization happens at triage time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default)]
    pub affected: Vec<AffectedPackage>,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl Advisory {
    /// Affected entries scoped to the given ecosystem and package name.
    pub fn affected_entries_for<'a>(
        &'a self,
        ecosystem: Ecosystem,
        package: &'a str,
    ) -> impl Iterator<Item = &'a AffectedPackage> {
        self.affected
            .iter()
            .filter(move |entry| entry.ecosystem == ecosystem && entry.package == package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Advisory {
        Advisory {
            id: "GHSA-xxxx".to_string(),
            summary: "Prototype pollution".to_string(),
            description: String::new(),
            severity: Some("high".to_string()),
            affected: vec![
                AffectedPackage {
                    ecosystem: Ecosystem::Npm,
                    package: "left-pad".to_string(),
                    versions: vec![],
                    ranges: vec![VersionRange::below("1.0.1")],
                },
                AffectedPackage {
                    ecosystem: Ecosystem::Python,
                    package: "left-pad".to_string(),
                    versions: vec![],
                    ranges: vec![],
                },
            ],
            references: vec![],
            published: None,
            modified: None,
        }
    }

    #[test]
    fn test_affected_entries_scoped_by_ecosystem_and_name() {
        let advisory = sample();
        let npm: Vec<_> = advisory
            .affected_entries_for(Ecosystem::Npm, "left-pad")
            .collect();
        assert_eq!(npm.len(), 1);
        assert_eq!(npm[0].ranges[0].fixed.as_deref(), Some("1.0.1"));

        let none: Vec<_> = advisory
            .affected_entries_for(Ecosystem::Npm, "right-pad")
            .collect();
        assert!(none.is_empty());
    }
}
