//! Rule-set file model and loading.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PolicyConfigError, PolicyResult};

/// A loaded, versioned policy rule set.
///
/// Field names are snake_case on disk; camelCase aliases are accepted.
/// `relationship_patterns` and `linguistic_patterns` belong to the external
/// linguistic analyzer and are carried through untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyRuleSet {
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, alias = "prohibitedConcepts")]
    pub prohibited_concepts: Vec<String>,

    #[serde(default, alias = "requiredVirtues")]
    pub required_virtues: Vec<String>,

    /// Emotion label → warning threshold. `null` entries are skipped at
    /// compile time.
    #[serde(default, alias = "emotionWarningThresholds")]
    pub emotion_warning_thresholds: BTreeMap<String, Option<f64>>,

    #[serde(default, alias = "relationshipPatterns")]
    pub relationship_patterns: serde_json::Value,

    #[serde(default, alias = "linguisticPatterns")]
    pub linguistic_patterns: serde_json::Value,

    /// Named ethical weights; metadata only.
    #[serde(default, alias = "ethicalWeights")]
    pub ethical_weights: BTreeMap<String, f64>,
}

impl PolicyRuleSet {
    /// Load and validate a rule set from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> PolicyResult<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|source| PolicyConfigError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;
        let rules = Self::from_json_str(&contents)?;

        info!(
            path = %path.display(),
            version = %rules.version,
            prohibited = rules.prohibited_concepts.len(),
            virtues = rules.required_virtues.len(),
            thresholds = rules.emotion_warning_thresholds.len(),
            "Loaded policy rule set"
        );
        Ok(rules)
    }

    pub fn from_json_str(contents: &str) -> PolicyResult<Self> {
        let rules: PolicyRuleSet = serde_json::from_str(contents)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Structural validation. Entry-level problems are not errors here;
    /// they are skipped during compilation.
    pub fn validate(&self) -> PolicyResult<()> {
        if self.version.trim().is_empty() {
            return Err(PolicyConfigError::Invalid(
                "version must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// The built-in baseline rule set.
    pub fn default_rules() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            version: "1.0".into(),
            description: Some("Default policy rules".into()),
            prohibited_concepts: strings(&["violence", "harm", "deception", "theft", "abuse"]),
            required_virtues: strings(&["temperance", "prudence", "justice", "fortitude"]),
            emotion_warning_thresholds: BTreeMap::new(),
            relationship_patterns: serde_json::Value::Null,
            linguistic_patterns: serde_json::Value::Null,
            ethical_weights: [("truthfulness", 1.0), ("compassion", 0.9), ("wisdom", 0.8)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}
