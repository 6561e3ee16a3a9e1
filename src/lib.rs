//! tutor-tune - Feedback-Driven Prompt Optimization for Tutoring Agents
//!
//! Mines thumbs-up/thumbs-down feedback recorded against tutoring
//! conversations and uses it to compile better few-shot prompt programs for
//! three reasoning tasks:
//! - Maths problem solving
//! - Concept explanation
//! - Diagnosis of mistakes in student work
//!
//! # Architecture
//!
//! - **Storage**: feedback and conversation history (LibSQL)
//! - **Data**: turns feedback plus context into training examples
//! - **Metrics**: composite score of feedback, explanation quality and understanding
//! - **Signatures**: typed task contracts and the chain-of-thought module
//! - **Services**: reasoning engine client and prompt format
//! - **Optimizer**: evaluation, bootstrap few-shot compile and the run pipeline
//! - **Artifacts**: versioned JSON output of each run
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tutor_tune_core::{
//!     AgentType, LibsqlFeedbackStore, LlmConfig, LlmService, Optimizer, OptimizerConfig,
//!     RunRequest,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = OptimizerConfig::load(None)?;
//!     let store = LibsqlFeedbackStore::from_credentials(&config.store_credentials()?).await?;
//!     let engine = LlmService::new(LlmConfig::from_settings(&config.llm, "api-key"))?;
//!
//!     let optimizer = Optimizer::new(AgentType::Sage, Arc::new(store), Arc::new(engine), config);
//!     let report = optimizer.run(&RunRequest::all(false)).await?;
//!     for line in report.summary_lines() {
//!         println!("{}", line);
//!     }
//!     Ok(())
//! }
//! ```

pub mod artifacts;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod optimizer;
pub mod services;
pub mod signatures;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use artifacts::{Artifact, ArtifactStore, OptimizationResult, SignatureStatus};
pub use config::OptimizerConfig;
pub use error::{Result, TutorError};
pub use optimizer::{Optimizer, RunReport, RunRequest};
pub use services::{LlmConfig, LlmService, ReasoningEngine};
pub use signatures::{ChainOfThought, SignatureKind, TaskModule};
pub use storage::{
    libsql::{ConnectionMode, LibsqlFeedbackStore},
    FeedbackQuery, FeedbackStore,
};
pub use types::{AgentType, FeedbackId, FeedbackRecord, MessageRecord, Rating, Role};
