//! Services layer for tutor-tune
//!
//! Reasoning engine integration and the prompt format it speaks.

pub mod llm;
pub mod prompt;

pub use llm::{LlmConfig, LlmService, PredictRequest, ReasoningEngine};
