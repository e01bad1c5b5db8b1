//! Dependency extraction from a checked-out tree
//!
//! The extractor probes the tree root for known manifest files, parses
//! each through [`ManifestParser`] implementations, reconciles lock data
//! against manifest declarations, and applies the configured dependency
//! cap. A malformed file skips that file only; the error is recorded and
//! extraction continues.

pub mod npm;
pub mod python;
pub mod traits;

pub use traits::{ManifestParser, ParserFactory};

use std::path::Path;

use tracing::{debug, warn};

use crate::domain::dependency::Dependency;

/// Manifest filenames probed at the tree root, in discovery order.
/// The lock file is listed right after its manifest so reconciliation
/// sees direct declarations first.
const MANIFEST_FILES: &[&str] = &[
    "package.json",
    "package-lock.json",
    "requirements.txt",
    "pyproject.toml",
];

/// Outcome of an extraction pass.
#[derive(Debug, Default)]
pub struct ExtractionResult {
    pub dependencies: Vec<Dependency>,
    /// Human-readable per-file failures; never fatal.
    pub errors: Vec<String>,
    /// True when the dependency cap cut the list short.
    pub truncated: bool,
}

/// Parses manifest/lock artifacts under a tree root into a normalized
/// dependency list.
pub struct DependencyExtractor {
    factory: ParserFactory,
    max_dependencies: usize,
}

impl DependencyExtractor {
    pub fn new(max_dependencies: usize) -> Self {
        Self {
            factory: ParserFactory::new(),
            max_dependencies,
        }
    }

    /// Extract all dependencies found at `root`.
    ///
    /// The returned list never exceeds the configured cap; truncation is
    /// deterministic and keeps the first entries in discovery order.
    pub async fn extract(&self, root: &Path) -> ExtractionResult {
        let mut result = ExtractionResult::default();

        for filename in MANIFEST_FILES {
            let path = root.join(filename);
            if !path.is_file() {
                continue;
            }

            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    warn!(file = filename, error = %e, "Failed to read manifest");
                    result
                        .errors
                        .push(format!("Failed to read {}: {}", filename, e));
                    continue;
                }
            };

            let parser = match self.factory.create_parser(filename) {
                Some(parser) => parser,
                None => continue,
            };

            match parser.parse_file(&content).await {
                Ok(parsed) => {
                    debug!(file = filename, count = parsed.len(), "Parsed manifest");
                    if *filename == "package-lock.json" {
                        Self::reconcile_lock(&mut result.dependencies, parsed);
                    } else {
                        result.dependencies.extend(parsed);
                    }
                }
                Err(e) => {
                    warn!(file = filename, error = %e, "Skipping unparsable manifest");
                    result
                        .errors
                        .push(format!("Failed to parse {}: {}", filename, e));
                }
            }
        }

        if result.dependencies.len() > self.max_dependencies {
            result.dependencies.truncate(self.max_dependencies);
            result.truncated = true;
        }

        result
    }

    /// Fold lock-file nodes into the dependency list.
    ///
    /// A lock node matching an existing `(ecosystem, name)` key overwrites
    /// that entry's version with the lock-resolved exact version and merges
    /// its metadata; anything else is appended as a transitive dependency
    /// with its parent attribution intact.
    fn reconcile_lock(dependencies: &mut Vec<Dependency>, lock_nodes: Vec<Dependency>) {
        for node in lock_nodes {
            let key = node.package_key();
            match dependencies.iter_mut().find(|d| d.package_key() == key) {
                Some(existing) => {
                    existing.version = node.version;
                    existing.metadata.extend(node.metadata);
                }
                None => dependencies.push(node),
            }
        }
    }
}
