//! # triad-types
//!
//! Shared data model for the Triad pipeline.
//!
//! Three independent analyzers each describe one unit of user input:
//!
//! - **EmotionalRecord**: label → intensity scores, a dominant label and a
//!   seven-band mood vector
//! - **LinguisticRecord**: concepts, relationships, pre-computed pattern
//!   matches and aggregate statistics
//! - **InteractionRecord**: who/when/where the input arrived and whether it
//!   was logged
//!
//! The policy layer turns those into a [`ComplianceVerdict`], fusion turns
//! everything into a [`FusionResult`], and accepted results evolve a durable
//! per-user [`AlignmentProfile`].
//!
//! ```text
//!   records ──► ComplianceVerdict ──► FusionResult ──► AlignmentProfile
//!                                                          │
//!                                   ConsolidationReport ◄──┘ (periodic)
//! ```

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod fusion;
pub mod mood;
pub mod profile;
pub mod records;
pub mod report;
pub mod verdict;

pub use error::{TypesError, TypesResult};
pub use fusion::FusionResult;
pub use mood::{MoodBand, MoodVector, MOOD_DIMENSIONS, UNIT_NORM_TOLERANCE};
pub use profile::{AlignmentProfile, AlignmentStats, EMA_RETAIN, NEUTRAL_ALIGNMENT};
pub use records::{
    Concept, EmotionalRecord, InteractionRecord, LinguisticRecord, LinguisticStats, Relationship,
    NEUTRAL_EMOTION, PATTERN_COMMAND_FORMS, PATTERN_HARM_INDICATORS, PATTERN_VIRTUE_INDICATORS,
};
pub use report::{ConsolidationReport, ValidationStatus};
pub use verdict::{ComplianceVerdict, Severity, Violation, ViolationKind, Warning, WarningKind};
