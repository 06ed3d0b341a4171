//! Seven-band mood vectors.
//!
//! A mood vector summarises emotional tone on the red → violet spectrum.
//! Vectors stored on profiles are always unit length; blending renormalises
//! and keeps the previous vector when the blend degenerates to zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{TypesError, TypesResult};

/// Number of components in every mood vector.
pub const MOOD_DIMENSIONS: usize = 7;

/// Tolerance used when checking unit length.
pub const UNIT_NORM_TOLERANCE: f64 = 1e-6;

/// The colour bands of a mood vector, in component order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoodBand {
    /// Intense, urgent emotions
    Red,
    /// Warm, enthusiastic emotions
    Orange,
    /// Joyful, bright emotions
    Yellow,
    /// Balanced, growing emotions
    Green,
    /// Calm, trustful emotions
    Blue,
    /// Introspective, heavy emotions
    Indigo,
    /// Imaginative, surprising emotions
    Violet,
}

impl MoodBand {
    pub const ALL: [MoodBand; MOOD_DIMENSIONS] = [
        MoodBand::Red,
        MoodBand::Orange,
        MoodBand::Yellow,
        MoodBand::Green,
        MoodBand::Blue,
        MoodBand::Indigo,
        MoodBand::Violet,
    ];

    pub fn index(&self) -> usize {
        match self {
            MoodBand::Red => 0,
            MoodBand::Orange => 1,
            MoodBand::Yellow => 2,
            MoodBand::Green => 3,
            MoodBand::Blue => 4,
            MoodBand::Indigo => 5,
            MoodBand::Violet => 6,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MoodBand::Red => "red",
            MoodBand::Orange => "orange",
            MoodBand::Yellow => "yellow",
            MoodBand::Green => "green",
            MoodBand::Blue => "blue",
            MoodBand::Indigo => "indigo",
            MoodBand::Violet => "violet",
        }
    }
}

/// Emotion label → (band, contribution weight).
const EMOTION_BANDS: &[(&str, MoodBand, f64)] = &[
    ("anger", MoodBand::Red, 0.8),
    ("annoyance", MoodBand::Red, 0.5),
    ("desire", MoodBand::Red, 0.6),
    ("excitement", MoodBand::Red, 0.7),
    ("disapproval", MoodBand::Red, 0.4),
    ("amusement", MoodBand::Orange, 0.7),
    ("optimism", MoodBand::Orange, 0.8),
    ("caring", MoodBand::Orange, 0.6),
    ("joy", MoodBand::Yellow, 0.9),
    ("admiration", MoodBand::Yellow, 0.7),
    ("gratitude", MoodBand::Yellow, 0.8),
    ("pride", MoodBand::Yellow, 0.7),
    ("relief", MoodBand::Yellow, 0.6),
    ("realization", MoodBand::Green, 0.6),
    ("approval", MoodBand::Green, 0.7),
    ("curiosity", MoodBand::Green, 0.5),
    ("neutral", MoodBand::Blue, 0.6),
    ("confusion", MoodBand::Indigo, 0.5),
    ("disappointment", MoodBand::Indigo, 0.6),
    ("sadness", MoodBand::Indigo, 0.8),
    ("grief", MoodBand::Indigo, 0.9),
    ("nervousness", MoodBand::Indigo, 0.6),
    ("fear", MoodBand::Indigo, 0.7),
    ("remorse", MoodBand::Indigo, 0.7),
    ("disgust", MoodBand::Indigo, 0.6),
    ("surprise", MoodBand::Violet, 0.7),
    ("love", MoodBand::Violet, 0.9),
    ("embarrassment", MoodBand::Violet, 0.5),
];

/// A fixed-dimensionality mood vector.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct MoodVector([f64; MOOD_DIMENSIONS]);

impl MoodVector {
    /// The neutral seed: every band equal, unit length.
    pub fn uniform() -> Self {
        let c = 1.0 / (MOOD_DIMENSIONS as f64).sqrt();
        Self([c; MOOD_DIMENSIONS])
    }

    pub fn from_array(components: [f64; MOOD_DIMENSIONS]) -> TypesResult<Self> {
        for (index, value) in components.iter().enumerate() {
            if !value.is_finite() {
                return Err(TypesError::NonFiniteComponent {
                    index,
                    value: *value,
                });
            }
        }
        Ok(Self(components))
    }

    pub fn from_slice(components: &[f64]) -> TypesResult<Self> {
        let array = <[f64; MOOD_DIMENSIONS]>::try_from(components).map_err(|_| {
            TypesError::MoodDimension {
                expected: MOOD_DIMENSIONS,
                actual: components.len(),
            }
        })?;
        Self::from_array(array)
    }

    /// Project label → intensity scores onto the seven bands.
    ///
    /// Unknown labels are ignored. If nothing maps, the uniform vector is
    /// returned.
    pub fn from_emotion_scores(scores: &BTreeMap<String, f64>) -> Self {
        let mut bands = [0.0; MOOD_DIMENSIONS];
        for (label, score) in scores {
            if !score.is_finite() {
                continue;
            }
            let label = label.to_lowercase();
            if let Some((_, band, weight)) = EMOTION_BANDS.iter().find(|(l, _, _)| *l == label) {
                bands[band.index()] += score.clamp(0.0, 1.0) * weight;
            }
        }
        Self(bands).normalized().unwrap_or_else(Self::uniform)
    }

    pub fn components(&self) -> &[f64; MOOD_DIMENSIONS] {
        &self.0
    }

    pub fn band(&self, band: MoodBand) -> f64 {
        self.0[band.index()]
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        self.0.iter().map(|c| c * c).sum::<f64>().sqrt()
    }

    pub fn is_unit(&self) -> bool {
        (self.norm() - 1.0).abs() < UNIT_NORM_TOLERANCE
    }

    /// Unit-length copy, or `None` when the norm is zero or not finite.
    pub fn normalized(&self) -> Option<Self> {
        let norm = self.norm();
        if norm == 0.0 || !norm.is_finite() {
            return None;
        }
        let mut out = self.0;
        for c in out.iter_mut() {
            *c /= norm;
        }
        Some(Self(out))
    }

    /// Exponential moving average towards `input`, renormalised.
    ///
    /// `retain` is the weight kept on `self`. A degenerate (zero-norm) blend
    /// keeps `self` unchanged.
    pub fn blend(&self, input: &MoodVector, retain: f64) -> Self {
        let mut mixed = [0.0; MOOD_DIMENSIONS];
        for (i, slot) in mixed.iter_mut().enumerate() {
            *slot = retain * self.0[i] + (1.0 - retain) * input.0[i];
        }
        Self(mixed).normalized().unwrap_or(*self)
    }
}

impl Default for MoodVector {
    fn default() -> Self {
        Self::uniform()
    }
}

impl TryFrom<Vec<f64>> for MoodVector {
    type Error = TypesError;

    fn try_from(value: Vec<f64>) -> Result<Self, Self::Error> {
        Self::from_slice(&value)
    }
}

impl From<MoodVector> for Vec<f64> {
    fn from(value: MoodVector) -> Self {
        value.0.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(l, s)| (l.to_string(), *s)).collect()
    }

    #[test]
    fn uniform_is_unit_length() {
        let v = MoodVector::uniform();
        assert!(v.is_unit());
        assert!((v.band(MoodBand::Red) - v.band(MoodBand::Violet)).abs() < f64::EPSILON);
    }

    #[test]
    fn from_slice_rejects_wrong_dimension() {
        let err = MoodVector::from_slice(&[1.0, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            TypesError::MoodDimension {
                expected: 7,
                actual: 2
            }
        ));
    }

    #[test]
    fn from_array_rejects_nan() {
        let mut c = [0.0; MOOD_DIMENSIONS];
        c[3] = f64::NAN;
        assert!(MoodVector::from_array(c).is_err());
    }

    #[test]
    fn anger_projects_onto_red() {
        let v = MoodVector::from_emotion_scores(&scores(&[("anger", 0.9)]));
        assert!(v.is_unit());
        assert!((v.band(MoodBand::Red) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn mixed_emotions_spread_across_bands() {
        let v = MoodVector::from_emotion_scores(&scores(&[("joy", 0.5), ("sadness", 0.5)]));
        assert!(v.band(MoodBand::Yellow) > 0.0);
        assert!(v.band(MoodBand::Indigo) > 0.0);
        assert_eq!(v.band(MoodBand::Red), 0.0);
        assert!(v.is_unit());
    }

    #[test]
    fn unknown_labels_fall_back_to_uniform() {
        let v = MoodVector::from_emotion_scores(&scores(&[("bewilderment", 0.7)]));
        assert_eq!(v, MoodVector::uniform());
    }

    #[test]
    fn blend_retains_previous_on_degenerate_input() {
        let old = MoodVector::from_emotion_scores(&scores(&[("joy", 0.8)]));
        let zero = MoodVector::from_array([0.0; MOOD_DIMENSIONS]).unwrap();

        let blended = old.blend(&zero, 0.0);
        assert_eq!(blended, old);
    }

    #[test]
    fn blend_moves_towards_input() {
        let mut red = [0.0; MOOD_DIMENSIONS];
        red[0] = 1.0;
        let mut blue = [0.0; MOOD_DIMENSIONS];
        blue[4] = 1.0;
        let old = MoodVector::from_array(red).unwrap();
        let input = MoodVector::from_array(blue).unwrap();

        let blended = old.blend(&input, 0.9);
        assert!(blended.is_unit());
        assert!(blended.band(MoodBand::Red) > blended.band(MoodBand::Blue));
        assert!(blended.band(MoodBand::Blue) > 0.0);
    }

    #[test]
    fn serde_as_plain_list() {
        let v = MoodVector::uniform();
        let json = serde_json::to_string(&v).unwrap();
        assert!(json.starts_with('['));
        let back: MoodVector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);

        let short: Result<MoodVector, _> = serde_json::from_str("[1.0, 0.0]");
        assert!(short.is_err());
    }
}
