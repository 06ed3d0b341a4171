//! Coherence scoring and the ethical gate.
//!
//! ```text
//! emotional   = clamp(dominant intensity, 0, 1)
//! linguistic  = 0.5 · richness + 0.5 · extraction
//!   richness   = min(1, tokens/20 · posVariety/5)
//!   extraction = min(1, (concepts + entities)/10)
//! interaction = 1.0 if logged else 0.5
//! coherence   = clamp(Σ wᵢ · componentᵢ, 0, 1)
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use triad_types::{
    ComplianceVerdict, EmotionalRecord, FusionResult, InteractionRecord, LinguisticRecord,
};

use crate::error::FusionOutcome;
use crate::weights::{FusionWeights, WeightFeedback};

const RICHNESS_TOKEN_SCALE: f64 = 20.0;
const RICHNESS_POS_SCALE: f64 = 5.0;
const EXTRACTION_SCALE: f64 = 10.0;
const INTERACTION_LOGGED: f64 = 1.0;
const INTERACTION_UNLOGGED: f64 = 0.5;

/// Per-component scores behind one coherence value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CoherenceBreakdown {
    pub emotional: f64,
    pub richness: f64,
    pub extraction: f64,
    pub linguistic: f64,
    pub interaction: f64,
    pub coherence: f64,
}

impl CoherenceBreakdown {
    pub fn compute(
        emotional: &EmotionalRecord,
        linguistic: &LinguisticRecord,
        interaction: &InteractionRecord,
        weights: &FusionWeights,
    ) -> Self {
        let emotional_score = emotional.dominant_intensity();

        let tokens = f64::from(linguistic.stats.token_count);
        let variety = linguistic.stats.pos_variety() as f64;
        let richness =
            ((tokens / RICHNESS_TOKEN_SCALE) * (variety / RICHNESS_POS_SCALE)).min(1.0);

        let extracted = (linguistic.concept_count() + linguistic.entity_count()) as f64;
        let extraction = (extracted / EXTRACTION_SCALE).min(1.0);

        let linguistic_score = 0.5 * richness + 0.5 * extraction;
        let interaction_score = if interaction.logged_successfully {
            INTERACTION_LOGGED
        } else {
            INTERACTION_UNLOGGED
        };

        let coherence = (weights.emotional * emotional_score
            + weights.linguistic * linguistic_score
            + weights.interaction * interaction_score)
            .clamp(0.0, 1.0);

        Self {
            emotional: emotional_score,
            richness,
            extraction,
            linguistic: linguistic_score,
            interaction: interaction_score,
            coherence,
        }
    }
}

/// Combines analyzer records and a verdict into a [`FusionResult`].
#[derive(Clone, Debug, Default)]
pub struct FusionEngine {
    weights: FusionWeights,
}

impl FusionEngine {
    /// Weights must be non-negative and sum to 1.
    pub fn new(weights: FusionWeights) -> FusionOutcome<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &FusionWeights {
        &self.weights
    }

    /// Nudge the weights and return the renormalised set.
    pub fn apply_feedback(&mut self, feedback: &WeightFeedback) -> FusionWeights {
        self.weights.apply_feedback(feedback);
        self.weights
    }

    /// Fuse one input unit. A non-compliant verdict yields a rejected
    /// result with coherence 0.0.
    pub fn fuse(
        &self,
        emotional: EmotionalRecord,
        linguistic: LinguisticRecord,
        interaction: InteractionRecord,
        verdict: ComplianceVerdict,
    ) -> FusionResult {
        if !verdict.compliant {
            warn!(
                user_id = %interaction.user_id,
                session_id = %interaction.session_id,
                violations = verdict.violations.len(),
                "Input rejected by ethical gate"
            );
            return FusionResult {
                coherence: 0.0,
                accepted: false,
                emotional,
                linguistic,
                interaction,
                verdict,
                rendered_response: String::new(),
            };
        }

        let breakdown =
            CoherenceBreakdown::compute(&emotional, &linguistic, &interaction, &self.weights);
        debug!(
            user_id = %interaction.user_id,
            coherence = breakdown.coherence,
            emotional = breakdown.emotional,
            linguistic = breakdown.linguistic,
            interaction = breakdown.interaction,
            "Fusion complete"
        );

        FusionResult {
            coherence: breakdown.coherence,
            accepted: true,
            emotional,
            linguistic,
            interaction,
            verdict,
            rendered_response: String::new(),
        }
    }
}

/// Fuse with explicit weights.
pub fn fuse(
    emotional: EmotionalRecord,
    linguistic: LinguisticRecord,
    interaction: InteractionRecord,
    verdict: ComplianceVerdict,
    weights: &FusionWeights,
) -> FusionOutcome<FusionResult> {
    Ok(FusionEngine::new(*weights)?.fuse(emotional, linguistic, interaction, verdict))
}
