//! Analyzer output records.
//!
//! These are produced by external analyzers and consumed read-only by the
//! policy and fusion layers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{TypesError, TypesResult};
use crate::mood::MoodVector;

/// Pattern-match set holding analyzer-detected harm phrases.
pub const PATTERN_HARM_INDICATORS: &str = "harm-indicators";
/// Pattern-match set holding analyzer-detected virtue phrases.
pub const PATTERN_VIRTUE_INDICATORS: &str = "virtue-indicators";
/// Pattern-match set holding analyzer-detected imperative forms.
pub const PATTERN_COMMAND_FORMS: &str = "command-forms";

/// An extracted concept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concept {
    pub surface_form: String,
    pub lemma: String,
    pub part_of_speech: String,
    /// Named-entity type, when the concept is a named entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
}

impl Concept {
    /// A plain (non-entity) concept whose surface form equals its lemma.
    pub fn new(lemma: impl Into<String>, part_of_speech: impl Into<String>) -> Self {
        let lemma = lemma.into();
        Self {
            surface_form: lemma.clone(),
            lemma,
            part_of_speech: part_of_speech.into(),
            entity_type: None,
        }
    }

    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn is_entity(&self) -> bool {
        self.entity_type.is_some()
    }
}

/// A subject–predicate–object relationship from dependency parsing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub subject: String,
    pub predicate_lemma: String,
    pub object: String,
    pub dependency_kind: String,
}

impl Relationship {
    pub fn new(
        subject: impl Into<String>,
        predicate_lemma: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate_lemma: predicate_lemma.into(),
            object: object.into(),
            dependency_kind: "nsubj-dobj".into(),
        }
    }

    pub fn triple(&self) -> (&str, &str, &str) {
        (&self.subject, &self.predicate_lemma, &self.object)
    }
}

/// Aggregate statistics over the analyzed text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinguisticStats {
    pub token_count: u32,
    pub sentence_count: u32,
    /// Part-of-speech tag → occurrence count.
    #[serde(default)]
    pub pos_histogram: BTreeMap<String, u32>,
}

impl LinguisticStats {
    /// Number of distinct part-of-speech tags seen.
    pub fn pos_variety(&self) -> usize {
        self.pos_histogram.len()
    }
}

/// Output of the linguistic analyzer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinguisticRecord {
    /// The analyzed input text, passed through for substring checks.
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub concepts: Vec<Concept>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    /// Named pattern sets (e.g. `harm-indicators`) → matched phrases.
    #[serde(default)]
    pub pattern_matches: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub stats: LinguisticStats,
}

impl LinguisticRecord {
    pub fn concept_count(&self) -> usize {
        self.concepts.len()
    }

    pub fn entity_count(&self) -> usize {
        self.concepts.iter().filter(|c| c.is_entity()).count()
    }

    /// Matches recorded under a pattern set; empty if the set is absent.
    pub fn pattern(&self, name: &str) -> &[String] {
        self.pattern_matches
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Dominant label of a record with no scores.
pub const NEUTRAL_EMOTION: &str = "neutral";

/// Output of the emotion analyzer.
///
/// Deserializing runs [`EmotionalRecord::validate`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "UncheckedEmotionalRecord")]
pub struct EmotionalRecord {
    /// Emotion label → intensity in `[0, 1]`.
    pub scores: BTreeMap<String, f64>,
    pub dominant: String,
    pub mood: MoodVector,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UncheckedEmotionalRecord {
    scores: BTreeMap<String, f64>,
    dominant: String,
    mood: MoodVector,
}

impl TryFrom<UncheckedEmotionalRecord> for EmotionalRecord {
    type Error = TypesError;

    fn try_from(raw: UncheckedEmotionalRecord) -> Result<Self, Self::Error> {
        let record = Self {
            scores: raw.scores,
            dominant: raw.dominant,
            mood: raw.mood,
        };
        record.validate()?;
        Ok(record)
    }
}

fn check_scores(scores: &BTreeMap<String, f64>) -> TypesResult<()> {
    for (label, value) in scores {
        if !(0.0..=1.0).contains(value) {
            return Err(TypesError::ScoreOutOfRange {
                label: label.clone(),
                value: *value,
            });
        }
    }
    Ok(())
}

impl EmotionalRecord {
    /// Build a record from raw scores; the dominant label is the highest
    /// score and the mood vector is projected from all scores.
    ///
    /// An empty score map yields a `neutral` record.
    pub fn from_scores(scores: BTreeMap<String, f64>) -> TypesResult<Self> {
        check_scores(&scores)?;

        let dominant = scores
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(label, _)| label.clone())
            .unwrap_or_else(|| NEUTRAL_EMOTION.to_string());
        let mood = MoodVector::from_emotion_scores(&scores);

        Ok(Self {
            scores,
            dominant,
            mood,
        })
    }

    /// Check a record built elsewhere: every score in `[0, 1]`, a dominant
    /// label that is scored (or `neutral` with no scores) and a unit mood.
    pub fn validate(&self) -> TypesResult<()> {
        check_scores(&self.scores)?;
        let dominant_known = if self.scores.is_empty() {
            self.dominant == NEUTRAL_EMOTION
        } else {
            self.scores.contains_key(&self.dominant)
        };
        if !dominant_known {
            return Err(TypesError::UnknownDominant {
                label: self.dominant.clone(),
            });
        }
        if !self.mood.is_unit() {
            return Err(TypesError::NonUnitMood {
                norm: self.mood.norm(),
            });
        }
        Ok(())
    }

    /// Intensity of the dominant label, clamped to `[0, 1]`.
    pub fn dominant_intensity(&self) -> f64 {
        self.score(&self.dominant).clamp(0.0, 1.0)
    }

    /// Score for a label, `0.0` if absent or not finite.
    pub fn score(&self, label: &str) -> f64 {
        match self.scores.get(label) {
            Some(v) if v.is_finite() => *v,
            _ => 0.0,
        }
    }
}

/// Output of the interaction-history recorder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    pub session_id: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub logged_successfully: bool,
}
