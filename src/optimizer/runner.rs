//! Optimization orchestrator
//!
//! Per signature: load data, evaluate the unmodified module, compile, evaluate
//! the compiled program, and extract the optimized prompts. A run then persists every
//! result as one artifact and, unless it is a dry run, marks the agent's
//! unprocessed feedback as consumed. Marking only happens after the artifact
//! has been written.

use super::bootstrap::compile;
use super::evaluate::evaluate;
use super::program::PromptProgram;
use crate::artifacts::{
    Artifact, ArtifactStore, OptimizationResult, OptimizedPrompts, SavedArtifact, ScoreDelta,
};
use crate::config::OptimizerConfig;
use crate::data::ExampleLoader;
use crate::error::Result;
use crate::metrics;
use crate::services::llm::ReasoningEngine;
use crate::signatures::{ChainOfThought, SignatureKind, TaskModule};
use crate::storage::{FeedbackQuery, FeedbackStore};
use crate::types::AgentType;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Per-signature pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    LoadData,
    Skipped,
    BaselineEval,
    Compile,
    CompileError,
    PostEval,
    Extract,
    Persist,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Init => "INIT",
            Stage::LoadData => "LOAD_DATA",
            Stage::Skipped => "SKIPPED",
            Stage::BaselineEval => "BASELINE_EVAL",
            Stage::Compile => "COMPILE",
            Stage::CompileError => "COMPILE_ERROR",
            Stage::PostEval => "POST_EVAL",
            Stage::Extract => "EXTRACT",
            Stage::Persist => "PERSIST",
            Stage::Done => "DONE",
        };
        f.write_str(name)
    }
}

fn enter(kind: SignatureKind, stage: Stage) {
    info!("[{}] {}", kind, stage);
}

/// What to optimize and whether to consume feedback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub signatures: Vec<SignatureKind>,
    pub dry_run: bool,
}

impl RunRequest {
    pub fn all(dry_run: bool) -> Self {
        Self {
            signatures: SignatureKind::all().to_vec(),
            dry_run,
        }
    }
}

/// Outcome of a full run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub results: BTreeMap<SignatureKind, OptimizationResult>,
    pub saved: SavedArtifact,
    /// Records marked processed; `None` on a dry run
    pub marked: Option<usize>,
}

impl RunReport {
    pub fn summary_lines(&self) -> Vec<String> {
        self.results.values().map(|r| r.summary_line()).collect()
    }
}

/// Optimizes one agent's signatures against its feedback
pub struct Optimizer {
    agent_type: AgentType,
    store: Arc<dyn FeedbackStore>,
    engine: Arc<dyn ReasoningEngine>,
    artifacts: ArtifactStore,
    config: OptimizerConfig,
}

impl Optimizer {
    pub fn new(
        agent_type: AgentType,
        store: Arc<dyn FeedbackStore>,
        engine: Arc<dyn ReasoningEngine>,
        config: OptimizerConfig,
    ) -> Self {
        let artifacts = ArtifactStore::new(&config.optimizer.output_dir);
        Self {
            agent_type,
            store,
            engine,
            artifacts,
            config,
        }
    }

    pub fn agent_type(&self) -> AgentType {
        self.agent_type
    }

    pub fn model(&self) -> &str {
        &self.config.llm.model
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Run the whole pipeline for one signature
    ///
    /// Never fails: data, compile and evaluation problems become a skipped or
    /// error result.
    pub async fn optimize_signature(&self, kind: SignatureKind) -> OptimizationResult {
        let settings = &self.config.optimizer;
        enter(kind, Stage::Init);
        let module = ChainOfThought::new(kind, self.engine.clone());
        let loader = ExampleLoader::new(self.store.clone(), self.agent_type);

        enter(kind, Stage::LoadData);
        let train = match loader.load_training_examples(kind, settings).await {
            Ok(examples) => examples,
            Err(e) => {
                error!("[{}] Failed to load training data: {}", kind, e);
                return OptimizationResult::failed(kind, e.to_string(), None, 0);
            }
        };
        let eval = match loader.load_evaluation_examples(kind, settings).await {
            Ok(examples) => examples,
            Err(e) => {
                error!("[{}] Failed to load evaluation data: {}", kind, e);
                return OptimizationResult::failed(kind, e.to_string(), None, train.len());
            }
        };

        if train.len() < settings.min_training_examples {
            enter(kind, Stage::Skipped);
            warn!(
                "Insufficient training data for {}: {} examples",
                kind,
                train.len()
            );
            return OptimizationResult::skipped(kind, train.len());
        }

        let eval_sample = &eval[..eval.len().min(settings.eval_sample_size)];
        let baseline = PromptProgram::default();

        enter(kind, Stage::BaselineEval);
        let before = evaluate(&module, &baseline, eval_sample, metrics::composite).await;
        info!(
            "[{}] Baseline score {:.3} over {} examples ({} failed)",
            kind, before.score, before.evaluated, before.failures
        );

        enter(kind, Stage::Compile);
        let trainset = &train[..train.len().min(settings.compile_trainset_size)];
        let compiled = match compile(
            &module,
            &baseline,
            trainset,
            metrics::composite,
            &self.config.bootstrap,
        )
        .await
        {
            Ok((program, _provenance)) => program,
            Err(e) => {
                enter(kind, Stage::CompileError);
                error!("[{}] Optimization failed: {}", kind, e);
                return OptimizationResult::failed(
                    kind,
                    e.to_string(),
                    Some(before.score),
                    train.len(),
                );
            }
        };

        enter(kind, Stage::PostEval);
        let after = evaluate(&module, &compiled, eval_sample, metrics::composite).await;
        let delta = ScoreDelta::new(before.score, after.score);
        info!(
            "[{}] Optimization complete: {:.3} -> {:.3} ({:+.1}%)",
            kind, delta.before, delta.after, delta.improvement_pct
        );

        enter(kind, Stage::Extract);
        let prompts =
            OptimizedPrompts::extract(module.spec(), &compiled, settings.stored_demo_limit);
        OptimizationResult::success(kind, delta, train.len(), prompts)
    }

    /// Optimize `kinds` in order; one signature's failure does not stop the rest
    pub async fn optimize(
        &self,
        kinds: &[SignatureKind],
    ) -> BTreeMap<SignatureKind, OptimizationResult> {
        let mut results = BTreeMap::new();
        for &kind in kinds {
            info!("Optimizing: {}", kind);
            let result = self.optimize_signature(kind).await;
            results.insert(kind, result);
        }
        results
    }

    pub async fn optimize_all(&self) -> BTreeMap<SignatureKind, OptimizationResult> {
        self.optimize(&SignatureKind::all()).await
    }

    /// Write the artifact for `results`
    pub async fn save_results(
        &self,
        results: &BTreeMap<SignatureKind, OptimizationResult>,
    ) -> Result<SavedArtifact> {
        let artifact = Artifact::new(self.agent_type, self.model(), results.clone());
        self.artifacts.save(&artifact).await
    }

    /// Mark every unprocessed record in the training window as consumed
    ///
    /// Loads `mark_page_size` records at a time until a short page comes back.
    pub async fn mark_feedback_processed(&self) -> Result<usize> {
        let settings = &self.config.optimizer;
        let page_size = settings.mark_page_size.max(1);
        let query = FeedbackQuery::new(self.agent_type)
            .processed(false)
            .since_days(settings.train_since_days)
            .limit(page_size);

        let mut marked = 0;
        loop {
            let feedback = self.store.load_feedback(&query).await?;
            if feedback.is_empty() {
                break;
            }
            let ids: Vec<_> = feedback.iter().map(|f| f.id).collect();
            let count = self.store.mark_processed(&ids).await?;
            debug!("Marked page of {} feedback records", count);
            marked += count;
            if feedback.len() < page_size || count == 0 {
                break;
            }
        }

        if marked == 0 {
            info!("No unprocessed feedback to mark for {}", self.agent_type);
        }
        Ok(marked)
    }

    /// Optimize, persist, then consume feedback
    ///
    /// A persistence failure aborts before any feedback is marked.
    pub async fn run(&self, request: &RunRequest) -> Result<RunReport> {
        info!(
            "Starting optimization for {} with {} ({} signatures{})",
            self.agent_type,
            self.model(),
            request.signatures.len(),
            if request.dry_run { ", dry run" } else { "" }
        );

        let results = self.optimize(&request.signatures).await;

        info!("[{}] {}", self.agent_type, Stage::Persist);
        let saved = self.save_results(&results).await?;

        let marked = if request.dry_run {
            info!("Dry run: feedback left unprocessed");
            None
        } else {
            Some(self.mark_feedback_processed().await?)
        };
        info!("[{}] {}", self.agent_type, Stage::Done);

        let report = RunReport {
            results,
            saved,
            marked,
        };
        info!("OPTIMIZATION SUMMARY");
        for line in report.summary_lines() {
            info!("  {}", line);
        }
        Ok(report)
    }
}
