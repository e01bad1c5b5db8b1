//! Repository source boundary
//!
//! Acquiring a source tree (clone, download, copy) is an external
//! collaborator concern; the engine only depends on the
//! [`RepositorySource`] trait and on the RAII [`Checkout`] guard that
//! guarantees release on every exit path.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::TempDir;
use tracing::debug;

/// Errors emitted while acquiring a source tree.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Invalid repository locator: {0}")]
    InvalidLocator(String),

    #[error("Repository acquisition timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Repository access denied: {0}")]
    Access(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A checked-out source tree held for the duration of one run.
///
/// When the checkout owns a temporary directory, dropping the guard
/// deletes it; a borrowed checkout points at a caller-owned path and
/// deletes nothing.
#[derive(Debug)]
pub struct Checkout {
    path: PathBuf,
    _guard: Option<TempDir>,
}

impl Checkout {
    /// A checkout backed by a temporary directory that is removed when
    /// the checkout is dropped.
    pub fn owned(guard: TempDir) -> Self {
        Self {
            path: guard.path().to_path_buf(),
            _guard: Some(guard),
        }
    }

    /// A checkout pointing at an existing caller-owned tree.
    pub fn borrowed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _guard: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Capability that turns a locator into a filesystem tree.
#[async_trait]
pub trait RepositorySource: Send + Sync {
    /// Acquire the tree behind `locator`. Implementations are expected to
    /// finish within the engine's acquisition timeout; the engine aborts
    /// and releases on expiry.
    async fn acquire(&self, locator: &str) -> Result<Checkout, SourceError>;
}

/// Source for trees already present on the local filesystem.
///
/// Useful for embedding and for tests; validates that the locator names
/// an existing directory before handing out a borrowed checkout.
pub struct LocalPathSource;

impl LocalPathSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalPathSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RepositorySource for LocalPathSource {
    async fn acquire(&self, locator: &str) -> Result<Checkout, SourceError> {
        if locator.is_empty() || locator.contains("://") {
            return Err(SourceError::InvalidLocator(locator.to_string()));
        }

        let path = PathBuf::from(locator);
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|_| SourceError::Access(format!("{} does not exist", locator)))?;
        if !metadata.is_dir() {
            return Err(SourceError::InvalidLocator(format!(
                "{} is not a directory",
                locator
            )));
        }

        debug!(path = %path.display(), "Acquired local checkout");
        Ok(Checkout::borrowed(path))
    }
}
