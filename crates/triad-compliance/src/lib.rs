//! # triad-compliance
//!
//! Mechanical policy evaluation for one unit of input.
//!
//! `evaluate(linguistic, emotional, rules) → ComplianceVerdict` is
//! deterministic and free of I/O. Five checks run in a fixed order and are
//! never short-circuited:
//!
//! 1. **Lexical prohibition**: concept lemmas vs prohibited terms
//! 2. **Relationship prohibition**: relationship predicates vs prohibited terms
//! 3. **Harm pattern**: pre-computed `harm-indicators` matches
//! 4. **Virtue detection**: required virtues found in text or lemmas
//! 5. **Emotion threshold**: scores above configured ceilings (warnings only)
//!
//! A verdict is compliant iff checks 1–3 found nothing. Rejection is an
//! ordinary outcome carried in the verdict, not an error.

#![deny(unsafe_code)]

pub mod checks;
pub mod engine;
pub mod matcher;

pub use checks::{Findings, HIGH_SEVERITY_EXCESS};
pub use engine::{evaluate, CheckStage, ComplianceEngine};
pub use matcher::{LemmaMatch, LemmaRelation, RootPrefixMatcher};
