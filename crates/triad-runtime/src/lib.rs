//! # triad-runtime
//!
//! Wires the Triad subsystems into one process:
//!
//! - **Pipeline**: concurrent analyzer calls behind a barrier, then
//!   compliance, fusion and the alignment update for one input unit
//! - **TriadRuntime**: builds the pipeline, profile store and consolidation
//!   scheduler from a [`TriadConfig`]
//! - **Configuration**: layered defaults, file and `TRIAD_` environment
//! - **Telemetry**: `tracing` subscriber bootstrap
//!
//! Analyzer internals stay outside; they plug in through
//! [`EmotionAnalyzer`], [`LinguisticAnalyzer`] and [`InteractionRecorder`].

#![deny(unsafe_code)]

pub mod analyzers;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod renderer;
pub mod runtime;
pub mod telemetry;

pub use analyzers::{AnalyzerError, EmotionAnalyzer, InteractionRecorder, LinguisticAnalyzer};
pub use crate::config::{
    AlignmentConfig, ConsolidationConfig, LoggingConfig, PipelineConfig, PolicyConfig, TriadConfig,
};
pub use error::{AnalyzerFailure, AnalyzerKind, RuntimeError, RuntimeResult};
pub use pipeline::{
    Analyzers, HealthSummary, InputUnit, Pipeline, PipelineResponse, DEFAULT_ANALYZER_TIMEOUT,
};
pub use renderer::{AcknowledgementRenderer, ResponseRenderer, ECHO_LIMIT};
pub use runtime::{Collaborators, TriadRuntime};
