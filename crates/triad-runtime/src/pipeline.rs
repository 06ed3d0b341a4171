//! End-to-end handling of one input unit.
//!
//! ```text
//!   emotion ─┐
//!   linguistic ─┼─► (barrier) ─► compliance ─► fusion ─► alignment store
//!   interaction ─┘
//! ```
//!
//! The three analyzers run concurrently, each under its own timeout. Any
//! analyzer failure fails the input unit before anything is evaluated, as
//! does an emotional record that fails validation or an interaction record
//! filed under another user.
//! Nothing is persisted until an accepted result reaches
//! [`AlignmentStore::apply_accepted`], so dropping a `process` future
//! earlier has no side effects.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use triad_alignment::AlignmentStore;
use triad_compliance::ComplianceEngine;
use triad_consolidation::{RecordCounter, UnavailableCounter};
use triad_fusion::{FusionEngine, FusionWeights, WeightFeedback};
use triad_types::{
    AlignmentProfile, EmotionalRecord, FusionResult, InteractionRecord, MoodVector, Violation,
    Warning,
};

use crate::analyzers::{AnalyzerError, EmotionAnalyzer, InteractionRecorder, LinguisticAnalyzer};
use crate::error::{AnalyzerFailure, AnalyzerKind, RuntimeError, RuntimeResult};
use crate::renderer::{AcknowledgementRenderer, ResponseRenderer};

/// Default per-analyzer timeout.
pub const DEFAULT_ANALYZER_TIMEOUT: Duration = Duration::from_secs(5);

/// One unit of user input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputUnit {
    pub text: String,
    pub user_id: String,
    /// Assigned a fresh UUID when absent.
    #[serde(default)]
    pub session_id: Option<String>,
}

impl InputUnit {
    pub fn new(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            user_id: user_id.into(),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// What the request layer gets back, accepted or not.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResponse {
    pub accepted: bool,
    pub coherence: f64,
    pub mood_vector_snapshot: MoodVector,
    pub alignment_score: f64,
    pub interaction_count: u64,
    pub violations: Vec<Violation>,
    pub warnings: Vec<Warning>,
    pub virtues_present: Vec<String>,
    pub rendered_response: String,
    pub session_id: String,
    pub user_id: String,
}

impl PipelineResponse {
    fn new(result: FusionResult, profile: &AlignmentProfile, session_id: String) -> Self {
        Self {
            accepted: result.accepted,
            coherence: result.coherence,
            mood_vector_snapshot: profile.mood_vector,
            alignment_score: profile.alignment_score,
            interaction_count: profile.interaction_count,
            violations: result.verdict.violations,
            warnings: result.verdict.warnings,
            virtues_present: result.verdict.virtues_present,
            rendered_response: result.rendered_response,
            session_id,
            user_id: profile.user_id.clone(),
        }
    }
}

/// Counts from the stores around the pipeline. `None` means unreadable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSummary {
    pub embedding_count: Option<u64>,
    pub concept_count: Option<u64>,
    pub profile_count: Option<usize>,
    pub policy_version: String,
}

/// The three external analyzers.
#[derive(Clone)]
pub struct Analyzers {
    pub emotion: Arc<dyn EmotionAnalyzer>,
    pub linguistic: Arc<dyn LinguisticAnalyzer>,
    pub interaction: Arc<dyn InteractionRecorder>,
}

/// Analyzers → compliance → fusion → alignment.
pub struct Pipeline {
    analyzers: Analyzers,
    compliance: ComplianceEngine,
    fusion: RwLock<FusionEngine>,
    store: Arc<dyn AlignmentStore>,
    renderer: Arc<dyn ResponseRenderer>,
    embeddings: Arc<dyn RecordCounter>,
    concepts: Arc<dyn RecordCounter>,
    analyzer_timeout: Duration,
}

impl Pipeline {
    /// Fails if `weights` are not a valid fusion weighting.
    pub fn new(
        analyzers: Analyzers,
        compliance: ComplianceEngine,
        weights: FusionWeights,
        store: Arc<dyn AlignmentStore>,
    ) -> RuntimeResult<Self> {
        Ok(Self {
            analyzers,
            compliance,
            fusion: RwLock::new(FusionEngine::new(weights)?),
            store,
            renderer: Arc::new(AcknowledgementRenderer),
            embeddings: Arc::new(UnavailableCounter::new("embeddings")),
            concepts: Arc::new(UnavailableCounter::new("concepts")),
            analyzer_timeout: DEFAULT_ANALYZER_TIMEOUT,
        })
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ResponseRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Stores reported by [`Pipeline::health`].
    pub fn with_collaborators(
        mut self,
        embeddings: Arc<dyn RecordCounter>,
        concepts: Arc<dyn RecordCounter>,
    ) -> Self {
        self.embeddings = embeddings;
        self.concepts = concepts;
        self
    }

    pub fn with_analyzer_timeout(mut self, timeout: Duration) -> Self {
        self.analyzer_timeout = timeout;
        self
    }

    pub fn compliance(&self) -> &ComplianceEngine {
        &self.compliance
    }

    pub fn store(&self) -> &Arc<dyn AlignmentStore> {
        &self.store
    }

    pub async fn weights(&self) -> FusionWeights {
        *self.fusion.read().await.weights()
    }

    /// Nudge the fusion weights; later inputs use the new weights.
    pub async fn adjust_weights(&self, feedback: &WeightFeedback) -> FusionWeights {
        self.fusion.write().await.apply_feedback(feedback)
    }

    /// Process one input unit.
    ///
    /// A rejection is an `Ok` response with `accepted == false` and the
    /// stored profile untouched. Errors mean an analyzer failed or the
    /// accepted update could not be persisted.
    pub async fn process(&self, input: InputUnit) -> RuntimeResult<PipelineResponse> {
        if input.user_id.trim().is_empty() {
            return Err(RuntimeError::InvalidInput("user id must not be empty".into()));
        }
        let session_id = input
            .session_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let user_id = input.user_id;
        let text = input.text;

        debug!(user_id = %user_id, session_id = %session_id, "Analyzing input");
        let timeout = self.analyzer_timeout;
        let (emotional, linguistic, interaction) = tokio::try_join!(
            bounded(
                AnalyzerKind::Emotion,
                timeout,
                self.analyzers.emotion.analyze(&text)
            ),
            bounded(
                AnalyzerKind::Linguistic,
                timeout,
                self.analyzers.linguistic.analyze(&text)
            ),
            bounded(
                AnalyzerKind::Interaction,
                timeout,
                self.analyzers.interaction.record(&user_id, &session_id, &text)
            ),
        )
        .inspect_err(|e| warn!(user_id = %user_id, error = %e, "Analyzer failed"))?;
        check_records(&user_id, &emotional, &interaction).inspect_err(
            |e| warn!(user_id = %user_id, error = %e, "Analyzer returned an invalid record"),
        )?;

        let verdict = self.compliance.evaluate(&linguistic, &emotional);
        let result = self
            .fusion
            .read()
            .await
            .fuse(emotional, linguistic, interaction, verdict);

        if result.accepted {
            let rendered = self.renderer.render(&text, &result);
            let profile = self
                .store
                .apply_accepted(&user_id, &result.emotional.mood, result.coherence)
                .await?;
            return Ok(PipelineResponse::new(
                result.with_rendered_response(rendered),
                &profile,
                session_id,
            ));
        }

        info!(
            user_id = %user_id,
            violations = result.verdict.violations.len(),
            "Input rejected; profile unchanged"
        );
        let profile = self
            .store
            .peek(&user_id)
            .await?
            .unwrap_or_else(|| AlignmentProfile::new(user_id.clone(), Utc::now()));
        Ok(PipelineResponse::new(result, &profile, session_id))
    }

    pub async fn health(&self) -> HealthSummary {
        let profile_count = match self.store.len().await {
            Ok(n) => Some(n),
            Err(e) => {
                warn!(error = %e, "Profile count unavailable");
                None
            }
        };
        HealthSummary {
            embedding_count: read_count(self.embeddings.as_ref()).await,
            concept_count: read_count(self.concepts.as_ref()).await,
            profile_count,
            policy_version: self.compliance.policy().version.clone(),
        }
    }
}

async fn bounded<T, F>(kind: AnalyzerKind, timeout: Duration, call: F) -> Result<T, AnalyzerFailure>
where
    F: Future<Output = Result<T, AnalyzerError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(record)) => Ok(record),
        Ok(Err(e)) => Err(AnalyzerFailure::Failed {
            analyzer: kind,
            reason: e.to_string(),
        }),
        Err(_) => Err(AnalyzerFailure::TimedOut {
            analyzer: kind,
            timeout,
        }),
    }
}

fn check_records(
    user_id: &str,
    emotional: &EmotionalRecord,
    interaction: &InteractionRecord,
) -> Result<(), AnalyzerFailure> {
    emotional.validate().map_err(|e| AnalyzerFailure::Failed {
        analyzer: AnalyzerKind::Emotion,
        reason: e.to_string(),
    })?;
    if interaction.user_id != user_id {
        return Err(AnalyzerFailure::Failed {
            analyzer: AnalyzerKind::Interaction,
            reason: format!(
                "interaction recorded for '{}' instead of '{user_id}'",
                interaction.user_id
            ),
        });
    }
    Ok(())
}

async fn read_count(counter: &dyn RecordCounter) -> Option<u64> {
    match counter.record_count().await {
        Ok(n) => u64::try_from(n).ok(),
        Err(e) => {
            warn!(store = counter.name(), error = %e, "Record count unavailable");
            None
        }
    }
}
