//! Per-user alignment profiles.
//!
//! A profile is created lazily on first contact, evolves by exponential
//! moving average on every accepted interaction, and is never deleted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mood::MoodVector;

/// Alignment score given to a freshly created profile.
pub const NEUTRAL_ALIGNMENT: f64 = 0.5;

/// Weight retained on the previous value by each EMA step (α = 0.1).
pub const EMA_RETAIN: f64 = 0.9;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentProfile {
    pub user_id: String,
    pub mood_vector: MoodVector,
    pub alignment_score: f64,
    pub interaction_count: u64,
    /// Free-form user preferences; never touched by the EMA update.
    #[serde(default)]
    pub preferences: BTreeMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

impl AlignmentProfile {
    /// A neutral profile: uniform mood, alignment 0.5, no interactions.
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            mood_vector: MoodVector::uniform(),
            alignment_score: NEUTRAL_ALIGNMENT,
            interaction_count: 0,
            preferences: BTreeMap::new(),
            created_at: now,
            last_updated_at: now,
        }
    }

    /// Apply one accepted interaction.
    ///
    /// ```text
    /// mood      = normalize(0.9 · mood + 0.1 · input)
    /// alignment = clamp(0.9 · alignment + 0.1 · coherence, 0, 1)
    /// ```
    pub fn absorb(&mut self, input_mood: &MoodVector, coherence: f64, now: DateTime<Utc>) {
        self.mood_vector = self.mood_vector.blend(input_mood, EMA_RETAIN);

        let coherence = if coherence.is_finite() {
            coherence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.alignment_score =
            (EMA_RETAIN * self.alignment_score + (1.0 - EMA_RETAIN) * coherence).clamp(0.0, 1.0);

        self.interaction_count += 1;
        self.last_updated_at = now;
    }
}

/// Aggregate statistics over a set of profiles.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentStats {
    pub total_users: usize,
    pub mean_alignment: f64,
    pub min_alignment: f64,
    pub max_alignment: f64,
    pub total_interactions: u64,
}

impl AlignmentStats {
    /// Compute statistics; an empty input yields all zeros.
    pub fn from_profiles<'a, I>(profiles: I) -> Self
    where
        I: IntoIterator<Item = &'a AlignmentProfile>,
    {
        let mut stats = AlignmentStats {
            min_alignment: f64::INFINITY,
            max_alignment: f64::NEG_INFINITY,
            ..Default::default()
        };
        let mut sum = 0.0;

        for p in profiles {
            stats.total_users += 1;
            stats.total_interactions += p.interaction_count;
            sum += p.alignment_score;
            stats.min_alignment = stats.min_alignment.min(p.alignment_score);
            stats.max_alignment = stats.max_alignment.max(p.alignment_score);
        }

        if stats.total_users == 0 {
            return AlignmentStats::default();
        }
        stats.mean_alignment = sum / stats.total_users as f64;
        stats
    }
}
