//! Prompt program optimization
//!
//! - [`program`]: the compiled program value type
//! - [`evaluate`]: mean composite score over examples
//! - [`bootstrap`]: bootstrap few-shot compile
//! - [`runner`]: the per-signature pipeline and full runs

pub mod bootstrap;
pub mod evaluate;
pub mod program;
pub mod runner;

pub use bootstrap::{compile, Provenance};
pub use evaluate::{evaluate, EvaluationReport};
pub use program::{Demo, PromptProgram};
pub use runner::{Optimizer, RunReport, RunRequest, Stage};
