//! Consolidation scheduler
//!
//! Runs the consolidator on a fixed interval and on demand. Runs never
//! overlap: scheduled ticks, background triggers and synchronous
//! `run_now` calls all queue on one run lock. A failed run is logged and
//! the loop carries on; the next tick is the retry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::time::{interval_at, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use triad_types::ConsolidationReport;

use crate::consolidator::Consolidator;
use crate::error::{ConsolidationError, ConsolidationResult};

/// Default interval between scheduled runs (6 hours).
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

/// How the most recent run ended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum RunOutcome {
    Succeeded {
        run_id: Uuid,
        degraded: bool,
        duration_ms: u64,
    },
    Failed {
        error: String,
        duration_ms: u64,
    },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Succeeded { .. })
    }
}

/// Point-in-time scheduler status.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub running: bool,
    pub last_run: Option<DateTime<Utc>>,
    /// Completed runs, successful or not.
    pub run_count: u64,
    pub next_run: Option<DateTime<Utc>>,
    pub last_outcome: Option<RunOutcome>,
}

/// Scheduler state
pub struct ConsolidationScheduler {
    consolidator: Arc<Consolidator>,
    interval: Duration,
    run_lock: Mutex<()>,
    status: RwLock<SchedulerStatus>,
    trigger_tx: mpsc::Sender<()>,
    shutdown_tx: watch::Sender<bool>,
}

impl ConsolidationScheduler {
    /// Create a scheduler; start its loop with [`ConsolidationScheduler::start`].
    pub fn new(
        consolidator: Arc<Consolidator>,
        interval: Duration,
    ) -> ConsolidationResult<(Arc<Self>, mpsc::Receiver<()>)> {
        if interval.is_zero() {
            return Err(ConsolidationError::InvalidConfig(
                "consolidation interval must be non-zero".into(),
            ));
        }

        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let (shutdown_tx, _) = watch::channel(false);

        let scheduler = Arc::new(Self {
            consolidator,
            interval,
            run_lock: Mutex::new(()),
            status: RwLock::new(SchedulerStatus::default()),
            trigger_tx,
            shutdown_tx,
        });
        Ok((scheduler, trigger_rx))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn status(&self) -> SchedulerStatus {
        self.status.read().await.clone()
    }

    /// Run once, now, and wait for the result.
    pub async fn run_now(&self) -> ConsolidationResult<(ConsolidationReport, Duration)> {
        let _guard = self.run_lock.lock().await;
        let started = Instant::now();
        let result = self.consolidator.run().await;
        let elapsed = started.elapsed();
        let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        let outcome = match &result {
            Ok(report) => RunOutcome::Succeeded {
                run_id: report.run_id,
                degraded: report.validation.is_degraded(),
                duration_ms,
            },
            Err(e) => RunOutcome::Failed {
                error: e.to_string(),
                duration_ms,
            },
        };

        {
            let mut status = self.status.write().await;
            status.last_run = Some(Utc::now());
            status.run_count += 1;
            status.last_outcome = Some(outcome);
        }

        result.map(|report| (report, elapsed))
    }

    /// Ask the background loop for a run without waiting for it.
    ///
    /// Never blocks. Requests made while one is already queued fold into
    /// it, and requests are dropped once the loop has exited.
    pub fn trigger(&self) {
        match self.trigger_tx.try_send(()) {
            Ok(()) => {}
            Err(TrySendError::Full(())) => debug!("Consolidation run already pending"),
            Err(TrySendError::Closed(())) => {
                warn!("Consolidation scheduler not running; trigger dropped")
            }
        }
    }

    /// Run the scheduling loop until [`ConsolidationScheduler::stop`].
    pub async fn start(self: Arc<Self>, mut trigger_rx: mpsc::Receiver<()>) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if *shutdown_rx.borrow() {
            return;
        }

        let mut ticker = interval_at(tokio::time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        {
            let mut status = self.status.write().await;
            status.running = true;
            status.next_run = next_run_after(self.interval);
        }
        info!(interval_secs = self.interval.as_secs(), "Consolidation scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_logged("scheduled").await;
                    self.status.write().await.next_run = next_run_after(self.interval);
                }
                Some(_) = trigger_rx.recv() => {
                    self.run_logged("triggered").await;
                }
                _ = shutdown_rx.changed() => break,
                else => break,
            }
        }

        {
            let mut status = self.status.write().await;
            status.running = false;
            status.next_run = None;
        }
        info!("Consolidation scheduler stopped");
    }

    /// Stop the loop. An in-flight run finishes first.
    pub fn stop(&self) {
        self.shutdown_tx.send_replace(true);
    }

    async fn run_logged(&self, cause: &str) {
        match self.run_now().await {
            Ok((report, elapsed)) => info!(
                cause,
                run_id = %report.run_id,
                elapsed_ms = elapsed.as_millis() as u64,
                "Consolidation run succeeded"
            ),
            Err(e) => error!(cause, error = %e, "Consolidation run failed"),
        }
    }
}

fn next_run_after(interval: Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(interval)
        .ok()
        .and_then(|d| Utc::now().checked_add_signed(d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::FixedCounter;
    use crate::reports::{InMemoryReports, ReportSink};
    use triad_alignment::{AlignmentStore, InMemoryProfileStore};
    use triad_types::MoodVector;

    async fn fixture() -> (Arc<Consolidator>, Arc<InMemoryReports>) {
        let store = Arc::new(InMemoryProfileStore::in_memory());
        store
            .apply_accepted("alice", &MoodVector::uniform(), 0.9)
            .await
            .unwrap();
        let sink = Arc::new(InMemoryReports::new());
        let consolidator = Consolidator::new(
            store,
            Arc::new(FixedCounter::new("embeddings", 1)),
            Arc::new(FixedCounter::new("concepts", 1)),
            sink.clone(),
        );
        (Arc::new(consolidator), sink)
    }

    #[tokio::test]
    async fn zero_interval_rejected() {
        let (consolidator, _) = fixture().await;
        assert!(ConsolidationScheduler::new(consolidator, Duration::ZERO).is_err());
    }

    #[tokio::test]
    async fn run_now_returns_report_and_duration() {
        let (consolidator, sink) = fixture().await;
        let (scheduler, _rx) = ConsolidationScheduler::new(consolidator, DEFAULT_INTERVAL).unwrap();

        let (report, elapsed) = scheduler.run_now().await.unwrap();
        assert_eq!(report.total_users, 1);
        assert!(elapsed < Duration::from_secs(5));

        let status = scheduler.status().await;
        assert_eq!(status.run_count, 1);
        assert!(status.last_run.is_some());
        assert!(!status.running);
        assert!(status.last_outcome.unwrap().is_success());
        assert_eq!(sink.history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_run_is_recorded() {
        let (consolidator, sink) = fixture().await;
        sink.fail_writes(true);
        let (scheduler, _rx) = ConsolidationScheduler::new(consolidator, DEFAULT_INTERVAL).unwrap();

        assert!(scheduler.run_now().await.is_err());
        let status = scheduler.status().await;
        assert_eq!(status.run_count, 1);
        assert!(matches!(status.last_outcome, Some(RunOutcome::Failed { .. })));
    }

    #[tokio::test]
    async fn loop_runs_on_interval_and_stops() {
        let (consolidator, sink) = fixture().await;
        let (scheduler, rx) =
            ConsolidationScheduler::new(consolidator, Duration::from_millis(40)).unwrap();

        let handle = tokio::spawn(scheduler.clone().start(rx));
        tokio::time::sleep(Duration::from_millis(300)).await;

        let status = scheduler.status().await;
        assert!(status.running);
        assert!(status.next_run.is_some());
        assert!(status.run_count >= 2);

        scheduler.stop();
        handle.await.unwrap();
        assert!(!scheduler.status().await.running);
        assert!(sink.history().await.unwrap().len() >= 2);
    }

    #[tokio::test]
    async fn trigger_runs_without_waiting_for_tick() {
        let (consolidator, sink) = fixture().await;
        let (scheduler, rx) = ConsolidationScheduler::new(consolidator, DEFAULT_INTERVAL).unwrap();

        let handle = tokio::spawn(scheduler.clone().start(rx));
        scheduler.trigger();
        for _ in 0..50 {
            if scheduler.status().await.run_count > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(scheduler.status().await.run_count, 1);
        assert_eq!(sink.history().await.unwrap().len(), 1);

        scheduler.stop();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn queued_triggers_fold_into_one_run() {
        let (consolidator, sink) = fixture().await;
        let (scheduler, rx) = ConsolidationScheduler::new(consolidator, DEFAULT_INTERVAL).unwrap();

        let burst = tokio::time::timeout(Duration::from_millis(200), async {
            for _ in 0..20 {
                scheduler.trigger();
            }
        })
        .await;
        assert!(burst.is_ok());

        let handle = tokio::spawn(scheduler.clone().start(rx));
        for _ in 0..50 {
            if scheduler.status().await.run_count > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(scheduler.status().await.run_count, 1);
        assert_eq!(sink.history().await.unwrap().len(), 1);

        scheduler.stop();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn trigger_after_loop_exit_returns() {
        let (consolidator, sink) = fixture().await;
        let (scheduler, rx) = ConsolidationScheduler::new(consolidator, DEFAULT_INTERVAL).unwrap();
        drop(rx);

        for _ in 0..20 {
            scheduler.trigger();
        }
        assert_eq!(scheduler.status().await.run_count, 0);
        assert!(sink.history().await.unwrap().is_empty());
    }

    #[test]
    fn status_serializes_camel_case() {
        let status = SchedulerStatus {
            running: true,
            run_count: 3,
            ..Default::default()
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["runCount"], 3);
        assert!(json["lastRun"].is_null());
    }
}
