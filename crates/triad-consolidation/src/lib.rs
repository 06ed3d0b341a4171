//! # triad-consolidation
//!
//! Periodic, out-of-band consolidation of alignment state.
//!
//! Each run executes three ordered stages:
//!
//! 1. **Validation**: read record counts from the embedding and concept
//!    stores; unreadable or negative counts mark the run degraded
//! 2. **Cleanup**: pluggable pruning stage, a no-op unless enabled
//! 3. **Reconciliation**: snapshot every profile, aggregate alignment
//!    statistics and persist a [`ConsolidationReport`](triad_types::ConsolidationReport)
//!
//! Runs are observation-only: profiles are read, never rewritten. The
//! [`ConsolidationScheduler`] drives runs on a timer (default every six
//! hours) and on demand, and survives failed runs.

#![deny(unsafe_code)]

pub mod cleanup;
pub mod collaborators;
pub mod consolidator;
pub mod error;
pub mod reports;
pub mod scheduler;

pub use cleanup::{AgeBasedCleanup, CleanupOutcome, CleanupStage, NoopCleanup};
pub use collaborators::{FixedCounter, PrunableStore, RecordCounter, UnavailableCounter};
pub use consolidator::{ConsolidationStage, Consolidator, ValidationOutcome};
pub use error::{ConsolidationError, ConsolidationResult};
pub use reports::{InMemoryReports, JsonReportFile, ReportSink, DEFAULT_REPORT_RETENTION};
pub use scheduler::{ConsolidationScheduler, RunOutcome, SchedulerStatus, DEFAULT_INTERVAL};
