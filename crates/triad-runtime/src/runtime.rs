//! Assembles the pipeline and the consolidation scheduler from config.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use triad_alignment::{JsonLinesProfileFile, JsonProfileStore};
use triad_compliance::ComplianceEngine;
use triad_consolidation::{
    AgeBasedCleanup, CleanupStage, ConsolidationScheduler, Consolidator, JsonReportFile,
    NoopCleanup, PrunableStore, RecordCounter, UnavailableCounter,
};
use triad_policy::PolicyRuleSet;
use triad_types::ConsolidationReport;

use crate::config::TriadConfig;
use crate::error::RuntimeResult;
use crate::pipeline::{Analyzers, HealthSummary, InputUnit, Pipeline, PipelineResponse};

/// Analyzer-owned stores that consolidation validates and may prune.
#[derive(Clone)]
pub struct Collaborators {
    pub embeddings: Arc<dyn RecordCounter>,
    pub concepts: Arc<dyn RecordCounter>,
    /// Pruned by the cleanup stage when it is enabled.
    pub prunable: Vec<Arc<dyn PrunableStore>>,
}

impl Collaborators {
    /// No collaborator stores wired; validation reports every run degraded.
    pub fn unavailable() -> Self {
        Self {
            embeddings: Arc::new(UnavailableCounter::new("embeddings")),
            concepts: Arc::new(UnavailableCounter::new("concepts")),
            prunable: Vec::new(),
        }
    }
}

/// A fully wired Triad process.
pub struct TriadRuntime {
    config: TriadConfig,
    pipeline: Arc<Pipeline>,
    store: Arc<JsonProfileStore>,
    scheduler: Arc<ConsolidationScheduler>,
    trigger_rx: Mutex<Option<mpsc::Receiver<()>>>,
    scheduler_task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for TriadRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriadRuntime").finish_non_exhaustive()
    }
}

impl TriadRuntime {
    /// Build every component. A missing or malformed rule set, an
    /// unreadable profile file or invalid settings stop startup here.
    pub fn build(
        config: TriadConfig,
        analyzers: Analyzers,
        collaborators: Collaborators,
    ) -> RuntimeResult<Self> {
        config.validate()?;

        let rules = PolicyRuleSet::load(&config.policy.rules_path)?;
        let compliance = ComplianceEngine::from_rule_set(&rules);

        let store = Arc::new(JsonProfileStore::open(JsonLinesProfileFile::new(
            &config.alignment.profiles_path,
        ))?);

        let pipeline = Pipeline::new(analyzers, compliance, config.fusion, store.clone())?
            .with_collaborators(
                collaborators.embeddings.clone(),
                collaborators.concepts.clone(),
            )
            .with_analyzer_timeout(config.pipeline.analyzer_timeout());

        let cleanup: Arc<dyn CleanupStage> = if config.consolidation.cleanup_enabled {
            Arc::new(AgeBasedCleanup::new(
                collaborators.prunable,
                config.consolidation.cleanup_max_age(),
            )?)
        } else {
            Arc::new(NoopCleanup)
        };
        let consolidator = Consolidator::new(
            store.clone(),
            collaborators.embeddings,
            collaborators.concepts,
            Arc::new(
                JsonReportFile::new(&config.consolidation.report_path)
                    .with_retention(config.consolidation.report_retention),
            ),
        )
        .with_cleanup(cleanup);

        let (scheduler, trigger_rx) =
            ConsolidationScheduler::new(Arc::new(consolidator), config.consolidation.interval())?;

        info!(
            policy_version = %rules.version,
            profiles_path = %config.alignment.profiles_path.display(),
            interval_secs = config.consolidation.interval_secs,
            cleanup_enabled = config.consolidation.cleanup_enabled,
            "Triad runtime assembled"
        );

        Ok(Self {
            config,
            pipeline: Arc::new(pipeline),
            store,
            scheduler,
            trigger_rx: Mutex::new(Some(trigger_rx)),
            scheduler_task: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &TriadConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    pub fn store(&self) -> &Arc<JsonProfileStore> {
        &self.store
    }

    pub fn scheduler(&self) -> &Arc<ConsolidationScheduler> {
        &self.scheduler
    }

    pub async fn process(&self, input: InputUnit) -> RuntimeResult<PipelineResponse> {
        self.pipeline.process(input).await
    }

    pub async fn health(&self) -> HealthSummary {
        self.pipeline.health().await
    }

    /// Spawn the consolidation loop. Later calls are no-ops.
    pub async fn start(&self) {
        let Some(rx) = self.trigger_rx.lock().await.take() else {
            warn!("Consolidation scheduler already started");
            return;
        };
        let handle = tokio::spawn(self.scheduler.clone().start(rx));
        *self.scheduler_task.lock().await = Some(handle);
    }

    /// Run consolidation now and wait for its report.
    pub async fn consolidate_now(&self) -> RuntimeResult<ConsolidationReport> {
        let (report, _) = self.scheduler.run_now().await?;
        Ok(report)
    }

    /// Stop the scheduler, letting an in-flight run finish.
    pub async fn shutdown(&self) {
        self.scheduler.stop();
        if let Some(handle) = self.scheduler_task.lock().await.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Consolidation scheduler task ended abnormally");
            }
        }
        info!("Triad runtime stopped");
    }
}
