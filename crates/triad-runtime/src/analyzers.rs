//! Contracts for the three external analyzers.
//!
//! Analyzer internals are out of scope; the pipeline only awaits their
//! records. Any error they return fails the input unit that caused it.

use async_trait::async_trait;

use triad_types::{EmotionalRecord, InteractionRecord, LinguisticRecord};

/// Error type analyzers report with.
pub type AnalyzerError = Box<dyn std::error::Error + Send + Sync>;

/// Emotion classifier.
#[async_trait]
pub trait EmotionAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<EmotionalRecord, AnalyzerError>;
}

/// Linguistic analyzer: concepts, relationships and pattern matches.
#[async_trait]
pub trait LinguisticAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<LinguisticRecord, AnalyzerError>;
}

/// Interaction-history recorder.
#[async_trait]
pub trait InteractionRecorder: Send + Sync {
    async fn record(
        &self,
        user_id: &str,
        session_id: &str,
        text: &str,
    ) -> Result<InteractionRecord, AnalyzerError>;
}
