//! Where consolidation reports go.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use triad_types::ConsolidationReport;

use crate::error::{ConsolidationError, ConsolidationResult};

/// Durable destination for consolidation reports.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Persist one report. Either the report is fully stored or nothing is.
    async fn persist(&self, report: &ConsolidationReport) -> ConsolidationResult<()>;

    /// All stored reports, oldest first.
    async fn history(&self) -> ConsolidationResult<Vec<ConsolidationReport>>;

    async fn latest(&self) -> ConsolidationResult<Option<ConsolidationReport>> {
        Ok(self.history().await?.pop())
    }
}

/// Reports kept by [`JsonReportFile`] unless configured otherwise.
pub const DEFAULT_REPORT_RETENTION: usize = 500;

/// Report history kept as a JSON array in one file.
///
/// Each persist rewrites the whole file through a synced sibling `.tmp`
/// and a rename, so a crash mid-write leaves the previous history intact.
/// Only the newest `retention` reports are kept.
pub struct JsonReportFile {
    path: PathBuf,
    retention: usize,
    write_lock: Mutex<()>,
}

impl JsonReportFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            retention: DEFAULT_REPORT_RETENTION,
            write_lock: Mutex::new(()),
        }
    }

    /// Keep at most `retention` reports (at least one).
    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    async fn read_all(&self) -> ConsolidationResult<Vec<ConsolidationReport>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(Vec::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ReportSink for JsonReportFile {
    async fn persist(&self, report: &ConsolidationReport) -> ConsolidationResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut history = self.read_all().await?;
        history.push(report.clone());
        if history.len() > self.retention {
            let dropped = history.len() - self.retention;
            history.drain(..dropped);
            debug!(dropped, retention = self.retention, "Dropped oldest consolidation reports");
        }
        let json = serde_json::to_vec_pretty(&history)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp_path = self.path.with_extension("tmp");
        let mut tmp = tokio::fs::File::create(&tmp_path).await?;
        tmp.write_all(&json).await?;
        tmp.sync_all().await?;
        drop(tmp);
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    async fn history(&self) -> ConsolidationResult<Vec<ConsolidationReport>> {
        self.read_all().await
    }
}

/// In-memory report sink (for testing).
#[derive(Default)]
pub struct InMemoryReports {
    reports: Mutex<Vec<ConsolidationReport>>,
    fail_writes: std::sync::atomic::AtomicBool,
}

impl InMemoryReports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent persists fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }
}

#[async_trait]
impl ReportSink for InMemoryReports {
    async fn persist(&self, report: &ConsolidationReport) -> ConsolidationResult<()> {
        if self.fail_writes.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(ConsolidationError::ReportSink(
                "report sink rejected write".into(),
            ));
        }
        self.reports.lock().await.push(report.clone());
        Ok(())
    }

    async fn history(&self) -> ConsolidationResult<Vec<ConsolidationReport>> {
        Ok(self.reports.lock().await.clone())
    }
}
