//! Report store boundary
//!
//! Persistence of finished reports is owned by the embedding application,
//! not the engine: the engine returns its report and the boundary layer
//! decides whether to keep it. The trait is deliberately small.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::report::AnalysisReport;

/// Store failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Report not found: {0}")]
    NotFound(Uuid),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Externally-owned report storage injected at the boundary.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn put(&self, report: AnalysisReport) -> Result<(), StoreError>;
    async fn get(&self, id: Uuid) -> Result<AnalysisReport, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
    async fn list(&self) -> Result<Vec<Uuid>, StoreError>;
}

/// In-memory store, mostly for embedding in tests and small deployments.
#[derive(Default)]
pub struct InMemoryReportStore {
    reports: RwLock<HashMap<Uuid, AnalysisReport>>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn put(&self, report: AnalysisReport) -> Result<(), StoreError> {
        self.reports.write().await.insert(report.report_id, report);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<AnalysisReport, StoreError> {
        self.reports
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        match self.reports.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn list(&self) -> Result<Vec<Uuid>, StoreError> {
        Ok(self.reports.read().await.keys().copied().collect())
    }
}
