use serde::{Deserialize, Serialize};

use crate::records::{EmotionalRecord, InteractionRecord, LinguisticRecord};
use crate::verdict::ComplianceVerdict;

/// Fused output for one input unit.
///
/// `accepted` always mirrors `verdict.compliant`. Rejected results carry
/// `coherence = 0.0` and must never reach the alignment store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionResult {
    pub coherence: f64,
    pub accepted: bool,
    pub emotional: EmotionalRecord,
    pub linguistic: LinguisticRecord,
    pub interaction: InteractionRecord,
    pub verdict: ComplianceVerdict,
    /// Free-text reply; filled in by the caller, never interpreted here.
    #[serde(default)]
    pub rendered_response: String,
}

impl FusionResult {
    pub fn user_id(&self) -> &str {
        &self.interaction.user_id
    }

    pub fn with_rendered_response(mut self, response: impl Into<String>) -> Self {
        self.rendered_response = response.into();
        self
    }
}
