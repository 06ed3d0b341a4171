//! # triad-fusion
//!
//! The fusion engine: one coherence score per input unit, and the single
//! ethical checkpoint of the pipeline.
//!
//! Fusion runs only after all three analyzers and the compliance engine
//! have produced output. A non-compliant verdict short-circuits into a
//! rejected [`FusionResult`](triad_types::FusionResult) with coherence 0.0;
//! callers must not apply rejected results to alignment state.
//!
//! Weights start as equal thirds and can be nudged by performance feedback
//! ([`FusionWeights::apply_feedback`]).

#![deny(unsafe_code)]

pub mod engine;
pub mod error;
pub mod weights;

pub use engine::{fuse, CoherenceBreakdown, FusionEngine};
pub use error::{FusionError, FusionOutcome};
pub use weights::{FusionWeights, WeightFeedback, FEEDBACK_LEARNING_RATE};
