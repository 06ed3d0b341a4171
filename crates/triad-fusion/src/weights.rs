use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{FusionError, FusionOutcome};

/// Tolerance on the weight sum.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Step applied per unit of feedback.
pub const FEEDBACK_LEARNING_RATE: f64 = 0.05;

/// Bounds each weight is clamped to before renormalising.
pub const MIN_WEIGHT: f64 = 0.1;
pub const MAX_WEIGHT: f64 = 0.6;

/// Per-component weights of the coherence sum. Must sum to 1.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub emotional: f64,
    pub linguistic: f64,
    pub interaction: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            emotional: 1.0 / 3.0,
            linguistic: 1.0 / 3.0,
            interaction: 1.0 / 3.0,
        }
    }
}

/// Performance feedback per component. Absent components keep their weight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightFeedback {
    #[serde(default)]
    pub emotional: Option<f64>,
    #[serde(default)]
    pub linguistic: Option<f64>,
    #[serde(default)]
    pub interaction: Option<f64>,
}

impl FusionWeights {
    pub fn new(emotional: f64, linguistic: f64, interaction: f64) -> FusionOutcome<Self> {
        let weights = Self {
            emotional,
            linguistic,
            interaction,
        };
        weights.validate()?;
        Ok(weights)
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.emotional, self.linguistic, self.interaction]
    }

    pub fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }

    pub fn validate(&self) -> FusionOutcome<()> {
        if let Some(w) = self
            .as_array()
            .into_iter()
            .find(|w| !w.is_finite() || *w < 0.0)
        {
            return Err(FusionError::InvalidWeights(format!(
                "weight {w} is negative or not finite"
            )));
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(FusionError::InvalidWeights(format!(
                "weights sum to {sum}, expected 1.0"
            )));
        }
        Ok(())
    }

    /// Nudge weights by `feedback × 0.05`, clamp each adjusted weight to
    /// `[0.1, 0.6]`, then renormalise to sum 1.
    pub fn apply_feedback(&mut self, feedback: &WeightFeedback) {
        let adjust = |weight: &mut f64, signal: Option<f64>| {
            if let Some(signal) = signal.filter(|s| s.is_finite()) {
                *weight = (*weight + signal * FEEDBACK_LEARNING_RATE).clamp(MIN_WEIGHT, MAX_WEIGHT);
            }
        };
        adjust(&mut self.emotional, feedback.emotional);
        adjust(&mut self.linguistic, feedback.linguistic);
        adjust(&mut self.interaction, feedback.interaction);

        let total = self.sum();
        if total > 0.0 {
            self.emotional /= total;
            self.linguistic /= total;
            self.interaction /= total;
        }

        info!(
            emotional = self.emotional,
            linguistic = self.linguistic,
            interaction = self.interaction,
            "Fusion weights updated"
        );
    }
}
