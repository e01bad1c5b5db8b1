//! Vulnerability matching
//!
//! Groups the dependency list into distinct package identifiers, issues
//! one batched advisory query, and filters the cartesian candidates
//! through the version-affects predicate. The predicate fails open: an
//! unparsable dependency version is always treated as affected, so
//! ambiguous data never silently hides risk.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::advisory::{Advisory, AffectedPackage};
use crate::domain::dependency::Dependency;
use crate::domain::version::Version;
use crate::infrastructure::osv::{AdvisoryDatabase, DatabaseError, PackageQuery};

/// Produces (advisory, dependency) candidate pairs for triage.
///
/// A dependency may recur across multiple advisories and an advisory may
/// recur across multiple affected dependency instances (e.g. a direct and
/// a transitive copy at different versions).
pub struct VulnerabilityMatcher {
    database: Arc<dyn AdvisoryDatabase>,
}

impl VulnerabilityMatcher {
    pub fn new(database: Arc<dyn AdvisoryDatabase>) -> Self {
        Self { database }
    }

    /// Query advisories for every distinct package and keep the pairs
    /// whose version-affects predicate holds.
    pub async fn find_candidates(
        &self,
        dependencies: &[Dependency],
    ) -> Result<Vec<(Advisory, Dependency)>, DatabaseError> {
        let mut queries: Vec<PackageQuery> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for dep in dependencies {
            if seen.insert(dep.package_key()) {
                queries.push(PackageQuery::new(dep.ecosystem, dep.name.clone()));
            }
        }

        let advisories_by_package = self.database.query_batch(&queries).await?;
        info!(
            packages = queries.len(),
            packages_with_advisories = advisories_by_package
                .values()
                .filter(|v| !v.is_empty())
                .count(),
            "Advisory query complete"
        );

        let mut candidates = Vec::new();
        for dep in dependencies {
            let query = PackageQuery::new(dep.ecosystem, dep.name.clone());
            let advisories = match advisories_by_package.get(&query) {
                Some(list) => list,
                None => continue,
            };
            for advisory in advisories {
                if version_affects(advisory, dep) {
                    candidates.push((advisory.clone(), dep.clone()));
                }
            }
        }

        Ok(candidates)
    }
}

/// Version-affects predicate for one (advisory, dependency) pair.
///
/// Restricted to affected entries matching the dependency's ecosystem and
/// package name. Within a matching entry, a version is affected when it
/// appears in the enumerated list or falls inside a declared range
/// (`introduced <= v < fixed`, missing bounds open). An unparsable
/// dependency version is always affected (fail-open).
pub fn version_affects(advisory: &Advisory, dependency: &Dependency) -> bool {
    let mut entries = advisory
        .affected_entries_for(dependency.ecosystem, &dependency.name)
        .peekable();
    if entries.peek().is_none() {
        return false;
    }

    let version = match Version::parse_lenient(&dependency.version) {
        Ok(version) => version,
        Err(_) => {
            warn!(
                dependency = %dependency.name,
                version = %dependency.version,
                advisory = %advisory.id,
                "Unparsable dependency version, treating as affected"
            );
            return true;
        }
    };

    entries.any(|entry| entry_affects(entry, &version, &dependency.version))
}

fn entry_affects(entry: &AffectedPackage, version: &Version, raw: &str) -> bool {
    for listed in &entry.versions {
        match Version::parse(listed) {
            Ok(listed_version) => {
                if &listed_version == version {
                    return true;
                }
            }
            // Unparsable advisory entry: fall back to exact text match.
            Err(_) => {
                if listed.trim() == raw.trim() {
                    return true;
                }
            }
        }
    }

    for range in &entry.ranges {
        let above_introduced = match range.introduced.as_deref() {
            None => true,
            Some(introduced) => match Version::parse(introduced) {
                Ok(lower) => version >= &lower,
                Err(_) => true, // unreadable lower bound: assume open
            },
        };
        if !above_introduced {
            continue;
        }
        let below_fixed = match range.fixed.as_deref() {
            None => true,
            Some(fixed) => match Version::parse(fixed) {
                Ok(upper) => version < &upper,
                Err(_) => true, // unreadable upper bound: fail open
            },
        };
        if below_fixed {
            return true;
        }
    }

    false
}
