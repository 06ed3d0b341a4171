use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use triad_policy::{CompiledPolicy, PolicyRuleSet};
use triad_types::{ComplianceVerdict, EmotionalRecord, LinguisticRecord};

use crate::checks::{self, CheckContext, Findings};
use crate::matcher::{LemmaRelation, RootPrefixMatcher};

/// The five checks, in evaluation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckStage {
    LexicalProhibition,
    RelationshipProhibition,
    HarmPattern,
    VirtueDetection,
    EmotionThreshold,
}

impl CheckStage {
    pub const ALL: [CheckStage; 5] = [
        CheckStage::LexicalProhibition,
        CheckStage::RelationshipProhibition,
        CheckStage::HarmPattern,
        CheckStage::VirtueDetection,
        CheckStage::EmotionThreshold,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            CheckStage::LexicalProhibition => "lexical-prohibition",
            CheckStage::RelationshipProhibition => "relationship-prohibition",
            CheckStage::HarmPattern => "harm-pattern",
            CheckStage::VirtueDetection => "virtue-detection",
            CheckStage::EmotionThreshold => "emotion-threshold",
        }
    }

    fn handler(&self) -> fn(CheckContext<'_>, &mut Findings) {
        match self {
            CheckStage::LexicalProhibition => checks::lexical_prohibition,
            CheckStage::RelationshipProhibition => checks::relationship_prohibition,
            CheckStage::HarmPattern => checks::harm_pattern,
            CheckStage::VirtueDetection => checks::virtue_detection,
            CheckStage::EmotionThreshold => checks::emotion_threshold,
        }
    }
}

/// Stateless policy evaluator over a compiled rule set.
///
/// All five checks always run; a violation never hides later warnings or
/// virtues. Evaluation is pure and safe to share across tasks.
#[derive(Clone)]
pub struct ComplianceEngine {
    policy: Arc<CompiledPolicy>,
    matcher: Arc<dyn LemmaRelation>,
}

impl ComplianceEngine {
    pub fn new(policy: CompiledPolicy) -> Self {
        Self {
            policy: Arc::new(policy),
            matcher: Arc::new(RootPrefixMatcher),
        }
    }

    pub fn from_rule_set(rule_set: &PolicyRuleSet) -> Self {
        Self::new(rule_set.compile())
    }

    /// Swap the lemma relatedness predicate, e.g. for a real lemmatizer.
    pub fn with_matcher(mut self, matcher: Arc<dyn LemmaRelation>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn policy(&self) -> &CompiledPolicy {
        &self.policy
    }

    pub fn evaluate(
        &self,
        linguistic: &LinguisticRecord,
        emotional: &EmotionalRecord,
    ) -> ComplianceVerdict {
        let ctx = CheckContext {
            policy: &self.policy,
            matcher: self.matcher.as_ref(),
            linguistic,
            emotional,
        };

        let mut findings = Findings::default();
        for stage in CheckStage::ALL {
            stage.handler()(ctx, &mut findings);
        }

        let verdict = ComplianceVerdict::new(findings.violations, findings.warnings, findings.virtues);
        debug!(
            policy_version = %self.policy.version,
            compliant = verdict.compliant,
            violations = verdict.violations.len(),
            warnings = verdict.warnings.len(),
            virtues = verdict.virtues_present.len(),
            "Compliance evaluated"
        );
        verdict
    }

    /// Run a single check in isolation.
    pub fn evaluate_stage(
        &self,
        stage: CheckStage,
        linguistic: &LinguisticRecord,
        emotional: &EmotionalRecord,
    ) -> ComplianceVerdict {
        let mut findings = Findings::default();
        stage.handler()(
            CheckContext {
                policy: &self.policy,
                matcher: self.matcher.as_ref(),
                linguistic,
                emotional,
            },
            &mut findings,
        );
        ComplianceVerdict::new(findings.violations, findings.warnings, findings.virtues)
    }
}

impl std::fmt::Debug for ComplianceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComplianceEngine")
            .field("policy_version", &self.policy.version)
            .field("rules", &self.policy.rules().len())
            .finish()
    }
}

/// One-shot evaluation against an uncompiled rule set.
pub fn evaluate(
    linguistic: &LinguisticRecord,
    emotional: &EmotionalRecord,
    rule_set: &PolicyRuleSet,
) -> ComplianceVerdict {
    ComplianceEngine::from_rule_set(rule_set).evaluate(linguistic, emotional)
}
