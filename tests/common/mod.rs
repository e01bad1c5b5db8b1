//! Shared test doubles and fixtures for integration tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use vulnsift::domain::advisory::{Advisory, AffectedPackage, VersionRange};
use vulnsift::domain::dependency::Ecosystem;
use vulnsift::infrastructure::llm::{CompletionError, CompletionRequest, CompletionService};
use vulnsift::infrastructure::osv::{AdvisoryDatabase, DatabaseError, PackageQuery};

/// Advisory database backed by a fixed map. Unknown packages resolve to
/// an empty advisory list, like the real client.
pub struct MockAdvisoryDatabase {
    advisories: HashMap<PackageQuery, Vec<Advisory>>,
    fail: bool,
}

impl MockAdvisoryDatabase {
    pub fn empty() -> Self {
        Self {
            advisories: HashMap::new(),
            fail: false,
        }
    }

    pub fn with_advisory(ecosystem: Ecosystem, package: &str, advisory: Advisory) -> Self {
        let mut db = Self::empty();
        db.advisories
            .insert(PackageQuery::new(ecosystem, package), vec![advisory]);
        db
    }

    pub fn failing() -> Self {
        Self {
            advisories: HashMap::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl AdvisoryDatabase for MockAdvisoryDatabase {
    async fn query_batch(
        &self,
        queries: &[PackageQuery],
    ) -> Result<HashMap<PackageQuery, Vec<Advisory>>, DatabaseError> {
        if self.fail {
            return Err(DatabaseError::Status { status: 503 });
        }
        let mut results = HashMap::new();
        for query in queries {
            let advisories = self.advisories.get(query).cloned().unwrap_or_default();
            results.insert(query.clone(), advisories);
        }
        Ok(results)
    }
}

/// Completion backend with scripted behavior. Records every prompt it
/// receives so tests can assert on prompt content.
pub struct MockCompletionService {
    behavior: CompletionBehavior,
    pub prompts: Mutex<Vec<String>>,
}

pub enum CompletionBehavior {
    /// Return the same text for every call.
    Canned(String),
    /// Return text with no JSON in it.
    Garbage,
    /// Fail every call.
    Unavailable,
}

impl MockCompletionService {
    pub fn canned(text: impl Into<String>) -> Self {
        Self {
            behavior: CompletionBehavior::Canned(text.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn garbage() -> Self {
        Self {
            behavior: CompletionBehavior::Garbage,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            behavior: CompletionBehavior::Unavailable,
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CompletionService for MockCompletionService {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        self.prompts.lock().unwrap().push(request.prompt);
        match &self.behavior {
            CompletionBehavior::Canned(text) => Ok(text.clone()),
            CompletionBehavior::Garbage => Ok("I cannot answer in JSON, sorry.".to_string()),
            CompletionBehavior::Unavailable => Err(CompletionError::Status { status: 503 }),
        }
    }
}

/// An advisory affecting all versions of `package` below `fixed`.
pub fn make_advisory(id: &str, severity: &str, ecosystem: Ecosystem, package: &str, fixed: &str) -> Advisory {
    Advisory {
        id: id.to_string(),
        summary: format!("Vulnerability in {}", package),
        description: String::new(),
        severity: Some(severity.to_string()),
        affected: vec![AffectedPackage {
            ecosystem,
            package: package.to_string(),
            versions: vec![],
            ranges: vec![VersionRange::below(fixed)],
        }],
        references: vec![],
        published: None,
        modified: None,
    }
}

/// Materialize a source tree in a temporary directory.
pub fn write_tree(files: &[(&str, &str)]) -> tempfile::TempDir {
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
