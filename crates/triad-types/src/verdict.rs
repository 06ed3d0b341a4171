use serde::{Deserialize, Serialize};

/// Severity attached to violations and warnings.
///
/// Recorded as metadata only; nothing in the pipeline branches on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Kinds of policy violation, in evaluation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    /// A concept lemma equals a prohibited term.
    ProhibitedConcept,
    /// A concept lemma shares a truncated root with a prohibited term.
    ProhibitedConceptRoot,
    /// A relationship predicate matches a prohibited term.
    ProhibitedRelationship,
    /// The analyzer flagged a harm pattern.
    HarmPattern,
}

impl ViolationKind {
    pub fn as_str(&self) -> &str {
        match self {
            ViolationKind::ProhibitedConcept => "prohibited-concept",
            ViolationKind::ProhibitedConceptRoot => "prohibited-concept-root",
            ViolationKind::ProhibitedRelationship => "prohibited-relationship",
            ViolationKind::HarmPattern => "harm-pattern",
        }
    }
}

/// Kinds of non-blocking warning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    EmotionThresholdExceeded,
}

impl WarningKind {
    pub fn as_str(&self) -> &str {
        match self {
            WarningKind::EmotionThresholdExceeded => "emotion-threshold-exceeded",
        }
    }
}

/// A blocking policy violation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub kind: ViolationKind,
    /// The rule term (or pattern set) that matched.
    pub matched_rule: String,
    pub severity: Severity,
    /// What in the input triggered the match.
    pub evidence: Vec<String>,
}

/// A non-blocking observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub kind: WarningKind,
    pub evidence: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

/// The structured outcome of a policy evaluation.
///
/// `compliant` is derived from `violations`; warnings never affect it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceVerdict {
    pub compliant: bool,
    pub violations: Vec<Violation>,
    pub warnings: Vec<Warning>,
    pub virtues_present: Vec<String>,
}

impl ComplianceVerdict {
    pub fn new(violations: Vec<Violation>, warnings: Vec<Warning>, virtues: Vec<String>) -> Self {
        Self {
            compliant: violations.is_empty(),
            violations,
            warnings,
            virtues_present: virtues,
        }
    }

    /// A verdict with nothing to report.
    pub fn clean() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new())
    }

    pub fn violations_of(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.kind == kind)
    }

    pub fn highest_severity(&self) -> Option<Severity> {
        self.violations.iter().map(|v| v.severity).max()
    }
}
