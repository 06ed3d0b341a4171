//! Typed rules compiled from a [`PolicyRuleSet`].
//!
//! Compilation normalises terms (trimmed, lowercased), drops duplicates and
//! skips malformed entries. Skipped entries are logged and kept on the
//! compiled policy so callers can surface them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ruleset::PolicyRuleSet;

/// Rule category, used to route rules to their check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    Lexical,
    Relationship,
    EmotionThreshold,
    Virtue,
}

/// A prohibited term matched against concept lemmas.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexicalRule {
    pub term: String,
}

/// A prohibited term matched against relationship predicates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRule {
    pub term: String,
}

/// A score ceiling above which an emotion raises a warning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmotionThresholdRule {
    pub label: String,
    pub threshold: f64,
}

/// A virtue whose presence is recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtueRule {
    pub virtue: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Rule {
    Lexical(LexicalRule),
    Relationship(RelationshipRule),
    EmotionThreshold(EmotionThresholdRule),
    Virtue(VirtueRule),
}

impl Rule {
    pub fn kind(&self) -> RuleKind {
        match self {
            Rule::Lexical(_) => RuleKind::Lexical,
            Rule::Relationship(_) => RuleKind::Relationship,
            Rule::EmotionThreshold(_) => RuleKind::EmotionThreshold,
            Rule::Virtue(_) => RuleKind::Virtue,
        }
    }
}

/// A rule-set entry that could not be compiled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub field: String,
    pub entry: String,
    pub reason: String,
}

/// Rules ready for evaluation, in rule-set order within each kind.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledPolicy {
    pub version: String,
    rules: Vec<Rule>,
    skipped: Vec<SkippedEntry>,
}

impl CompiledPolicy {
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn skipped(&self) -> &[SkippedEntry] {
        &self.skipped
    }

    pub fn count(&self, kind: RuleKind) -> usize {
        self.rules.iter().filter(|r| r.kind() == kind).count()
    }

    pub fn lexical(&self) -> impl Iterator<Item = &LexicalRule> {
        self.rules.iter().filter_map(|r| match r {
            Rule::Lexical(rule) => Some(rule),
            _ => None,
        })
    }

    pub fn relationship(&self) -> impl Iterator<Item = &RelationshipRule> {
        self.rules.iter().filter_map(|r| match r {
            Rule::Relationship(rule) => Some(rule),
            _ => None,
        })
    }

    /// Threshold rules in ascending label order.
    pub fn emotion_thresholds(&self) -> impl Iterator<Item = &EmotionThresholdRule> {
        self.rules.iter().filter_map(|r| match r {
            Rule::EmotionThreshold(rule) => Some(rule),
            _ => None,
        })
    }

    pub fn virtues(&self) -> impl Iterator<Item = &VirtueRule> {
        self.rules.iter().filter_map(|r| match r {
            Rule::Virtue(rule) => Some(rule),
            _ => None,
        })
    }
}

impl PolicyRuleSet {
    /// Compile into typed rules, skipping malformed entries.
    pub fn compile(&self) -> CompiledPolicy {
        let mut rules = Vec::new();
        let mut skipped = Vec::new();

        let prohibited = normalise_terms("prohibited_concepts", &self.prohibited_concepts, &mut skipped);
        rules.extend(
            prohibited
                .iter()
                .map(|term| Rule::Lexical(LexicalRule { term: term.clone() })),
        );
        rules.extend(
            prohibited
                .into_iter()
                .map(|term| Rule::Relationship(RelationshipRule { term })),
        );

        for (label, threshold) in &self.emotion_warning_thresholds {
            let label = label.trim();
            let reason = match threshold {
                _ if label.is_empty() => Some("empty emotion label".to_string()),
                None => Some("missing threshold".to_string()),
                Some(t) if !t.is_finite() || !(0.0..=1.0).contains(t) => {
                    Some(format!("threshold {t} outside 0.0..=1.0"))
                }
                Some(_) => None,
            };
            match (reason, threshold) {
                (None, Some(t)) => rules.push(Rule::EmotionThreshold(EmotionThresholdRule {
                    label: label.to_string(),
                    threshold: *t,
                })),
                (reason, _) => skipped.push(SkippedEntry {
                    field: "emotion_warning_thresholds".into(),
                    entry: label.to_string(),
                    reason: reason.unwrap_or_else(|| "missing threshold".into()),
                }),
            }
        }

        rules.extend(
            normalise_terms("required_virtues", &self.required_virtues, &mut skipped)
                .into_iter()
                .map(|virtue| Rule::Virtue(VirtueRule { virtue })),
        );

        for entry in &skipped {
            warn!(
                field = %entry.field,
                entry = %entry.entry,
                reason = %entry.reason,
                "Skipping malformed rule-set entry"
            );
        }

        let compiled = CompiledPolicy {
            version: self.version.clone(),
            rules,
            skipped,
        };
        info!(
            version = %compiled.version,
            lexical = compiled.count(RuleKind::Lexical),
            thresholds = compiled.count(RuleKind::EmotionThreshold),
            virtues = compiled.count(RuleKind::Virtue),
            skipped = compiled.skipped.len(),
            "Compiled policy rules"
        );
        compiled
    }
}

/// Trim, lowercase and de-duplicate, recording blank entries as skipped.
fn normalise_terms(field: &str, terms: &[String], skipped: &mut Vec<SkippedEntry>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for raw in terms {
        let term = raw.trim().to_lowercase();
        if term.is_empty() {
            skipped.push(SkippedEntry {
                field: field.to_string(),
                entry: raw.clone(),
                reason: "empty term".into(),
            });
            continue;
        }
        if !seen.insert(term.clone()) {
            debug!(field, term = %term, "Dropping duplicate rule term");
            continue;
        }
        out.push(term);
    }
    out
}
