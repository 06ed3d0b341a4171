//! The five compliance checks.
//!
//! Each check reads the compiled rules of its kind and appends to the
//! shared [`Findings`]. Checks never fail; they only find things.

use triad_policy::CompiledPolicy;
use triad_types::{
    EmotionalRecord, LinguisticRecord, Severity, Violation, ViolationKind, Warning, WarningKind,
    PATTERN_HARM_INDICATORS,
};

use crate::matcher::{LemmaMatch, LemmaRelation};

/// Excess over a threshold at which an emotion warning becomes high severity.
pub const HIGH_SEVERITY_EXCESS: f64 = 0.15;

const EXCESS_EPSILON: f64 = 1e-9;

/// Accumulated output of the checks, in evaluation order.
#[derive(Debug, Default)]
pub struct Findings {
    pub violations: Vec<Violation>,
    pub warnings: Vec<Warning>,
    pub virtues: Vec<String>,
}

/// Read-only input shared by every check.
#[derive(Clone, Copy)]
pub struct CheckContext<'a> {
    pub policy: &'a CompiledPolicy,
    pub matcher: &'a dyn LemmaRelation,
    pub linguistic: &'a LinguisticRecord,
    pub emotional: &'a EmotionalRecord,
}

/// First exact match wins; otherwise the first root match, if any.
fn match_terms<'r>(
    matcher: &dyn LemmaRelation,
    lemma: &str,
    terms: &[&'r str],
) -> Option<(&'r str, LemmaMatch)> {
    let mut root = None;
    for &term in terms {
        match matcher.relate(lemma, term) {
            LemmaMatch::Exact => return Some((term, LemmaMatch::Exact)),
            LemmaMatch::None => {}
            found if root.is_none() => root = Some((term, found)),
            _ => {}
        }
    }
    root
}

pub fn lexical_prohibition(ctx: CheckContext<'_>, findings: &mut Findings) {
    let terms: Vec<&str> = ctx.policy.lexical().map(|r| r.term.as_str()).collect();
    for concept in &ctx.linguistic.concepts {
        let lemma = concept.lemma.trim().to_lowercase();
        let Some((term, found)) = match_terms(ctx.matcher, &lemma, &terms) else {
            continue;
        };
        let violation = match found {
            LemmaMatch::Exact => Violation {
                kind: ViolationKind::ProhibitedConcept,
                matched_rule: term.to_string(),
                severity: Severity::High,
                evidence: vec![concept.lemma.clone()],
            },
            LemmaMatch::Root {
                lemma_root,
                rule_root,
            } => Violation {
                kind: ViolationKind::ProhibitedConceptRoot,
                matched_rule: term.to_string(),
                severity: Severity::Medium,
                evidence: vec![lemma_root, rule_root],
            },
            LemmaMatch::None => continue,
        };
        findings.violations.push(violation);
    }
}

pub fn relationship_prohibition(ctx: CheckContext<'_>, findings: &mut Findings) {
    let terms: Vec<&str> = ctx.policy.relationship().map(|r| r.term.as_str()).collect();
    for rel in &ctx.linguistic.relationships {
        let predicate = rel.predicate_lemma.trim().to_lowercase();
        if let Some((term, _)) = match_terms(ctx.matcher, &predicate, &terms) {
            findings.violations.push(Violation {
                kind: ViolationKind::ProhibitedRelationship,
                matched_rule: term.to_string(),
                severity: Severity::High,
                evidence: vec![
                    rel.subject.clone(),
                    rel.predicate_lemma.clone(),
                    rel.object.clone(),
                ],
            });
        }
    }
}

pub fn harm_pattern(ctx: CheckContext<'_>, findings: &mut Findings) {
    for hit in ctx.linguistic.pattern(PATTERN_HARM_INDICATORS) {
        findings.violations.push(Violation {
            kind: ViolationKind::HarmPattern,
            matched_rule: PATTERN_HARM_INDICATORS.to_string(),
            severity: Severity::High,
            evidence: vec![hit.clone()],
        });
    }
}

pub fn virtue_detection(ctx: CheckContext<'_>, findings: &mut Findings) {
    let text = ctx.linguistic.text.to_lowercase();
    let lemmas: Vec<String> = ctx
        .linguistic
        .concepts
        .iter()
        .map(|c| c.lemma.trim().to_lowercase())
        .collect();

    for rule in ctx.policy.virtues() {
        let present = text.contains(&rule.virtue) || lemmas.iter().any(|l| *l == rule.virtue);
        if present && !findings.virtues.contains(&rule.virtue) {
            findings.virtues.push(rule.virtue.clone());
        }
    }
}

pub fn emotion_threshold(ctx: CheckContext<'_>, findings: &mut Findings) {
    for rule in ctx.policy.emotion_thresholds() {
        let measured = ctx.emotional.score(&rule.label);
        if measured <= rule.threshold {
            continue;
        }
        let severity = if measured - rule.threshold + EXCESS_EPSILON >= HIGH_SEVERITY_EXCESS {
            Severity::High
        } else {
            Severity::Medium
        };
        findings.warnings.push(Warning {
            kind: WarningKind::EmotionThresholdExceeded,
            evidence: rule.label.clone(),
            severity,
            measured: Some(measured),
            threshold: Some(rule.threshold),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::RootPrefixMatcher;
    use std::collections::BTreeMap;
    use triad_policy::PolicyRuleSet;
    use triad_types::{Concept, Relationship};

    fn policy(json: &str) -> CompiledPolicy {
        PolicyRuleSet::from_json_str(json).unwrap().compile()
    }

    fn run(
        check: fn(CheckContext<'_>, &mut Findings),
        policy: &CompiledPolicy,
        linguistic: &LinguisticRecord,
        emotional: &EmotionalRecord,
    ) -> Findings {
        let mut findings = Findings::default();
        check(
            CheckContext {
                policy,
                matcher: &RootPrefixMatcher,
                linguistic,
                emotional,
            },
            &mut findings,
        );
        findings
    }

    fn neutral() -> EmotionalRecord {
        EmotionalRecord::from_scores(BTreeMap::new()).unwrap()
    }

    #[test]
    fn exact_match_preferred_over_earlier_root_match() {
        let policy = policy(r#"{"version": "1", "prohibited_concepts": ["deception", "deceive"]}"#);
        let linguistic = LinguisticRecord {
            concepts: vec![Concept::new("Deceive", "VERB")],
            ..Default::default()
        };
        let findings = run(lexical_prohibition, &policy, &linguistic, &neutral());
        assert_eq!(findings.violations.len(), 1);
        assert_eq!(findings.violations[0].kind, ViolationKind::ProhibitedConcept);
        assert_eq!(findings.violations[0].matched_rule, "deceive");
    }

    #[test]
    fn root_match_records_both_prefixes() {
        let policy = policy(r#"{"version": "1", "prohibited_concepts": ["deception"]}"#);
        let linguistic = LinguisticRecord {
            concepts: vec![Concept::new("deceive", "VERB")],
            ..Default::default()
        };
        let findings = run(lexical_prohibition, &policy, &linguistic, &neutral());
        let v = &findings.violations[0];
        assert_eq!(v.kind, ViolationKind::ProhibitedConceptRoot);
        assert_eq!(v.severity, Severity::Medium);
        assert_eq!(v.evidence, vec!["dece".to_string(), "dece".to_string()]);
    }

    #[test]
    fn relationship_predicate_root_match() {
        let policy = policy(r#"{"version": "1", "prohibited_concepts": ["manipulation"]}"#);
        let linguistic = LinguisticRecord {
            relationships: vec![Relationship::new("he", "manipulate", "her")],
            ..Default::default()
        };
        let findings = run(relationship_prohibition, &policy, &linguistic, &neutral());
        assert_eq!(findings.violations.len(), 1);
        assert_eq!(
            findings.violations[0].kind,
            ViolationKind::ProhibitedRelationship
        );
    }

    #[test]
    fn each_harm_indicator_is_a_violation() {
        let policy = policy(r#"{"version": "1"}"#);
        let mut linguistic = LinguisticRecord::default();
        linguistic.pattern_matches.insert(
            PATTERN_HARM_INDICATORS.into(),
            vec!["kill".into(), "destroy".into()],
        );
        let findings = run(harm_pattern, &policy, &linguistic, &neutral());
        assert_eq!(findings.violations.len(), 2);
        assert_eq!(findings.violations[1].evidence, vec!["destroy".to_string()]);
    }

    #[test]
    fn virtue_found_by_lemma_or_substring() {
        let policy = policy(
            r#"{"version": "1", "required_virtues": ["justice", "prudence", "temperance"]}"#,
        );
        let linguistic = LinguisticRecord {
            text: "Acting with PRUDENCE matters".into(),
            concepts: vec![Concept::new("justice", "NOUN")],
            ..Default::default()
        };
        let findings = run(virtue_detection, &policy, &linguistic, &neutral());
        assert_eq!(findings.virtues, vec!["justice", "prudence"]);
    }

    #[test]
    fn warning_severity_scales_with_excess() {
        let policy = policy(
            r#"{"version": "1", "emotion_warning_thresholds": {"anger": 0.5, "fear": 0.7, "joy": 0.9}}"#,
        );
        let scores: BTreeMap<String, f64> = [("anger", 0.9), ("fear", 0.75), ("joy", 0.9)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let emotional = EmotionalRecord::from_scores(scores).unwrap();
        let findings = run(
            emotion_threshold,
            &policy,
            &LinguisticRecord::default(),
            &emotional,
        );
        // joy equals its threshold and is not exceeded
        assert_eq!(findings.warnings.len(), 2);
        assert_eq!(findings.warnings[0].evidence, "anger");
        assert_eq!(findings.warnings[0].severity, Severity::High);
        assert_eq!(findings.warnings[1].evidence, "fear");
        assert_eq!(findings.warnings[1].severity, Severity::Medium);
    }
}
