//! # triad-policy
//!
//! Versioned policy rule sets for the compliance engine.
//!
//! A rule set file names prohibited concepts, required virtues and per-emotion
//! warning thresholds. It is loaded once at startup; an unreadable or
//! structurally invalid file is fatal. Individual malformed entries are
//! skipped with a logged note so that one bad line never blocks evaluation.
//!
//! Loaded rule sets are compiled into tagged [`Rule`] variants:
//!
//! - **Lexical**: prohibited term matched against concept lemmas
//! - **Relationship**: prohibited term matched against relationship predicates
//! - **EmotionThreshold**: per-label score ceiling that raises a warning
//! - **Virtue**: required virtue detected in text or concepts

pub mod error;
pub mod rules;
pub mod ruleset;

pub use error::{PolicyConfigError, PolicyResult};
pub use rules::{
    CompiledPolicy, EmotionThresholdRule, LexicalRule, RelationshipRule, Rule, RuleKind,
    SkippedEntry, VirtueRule,
};
pub use ruleset::PolicyRuleSet;
