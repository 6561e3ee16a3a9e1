//! Builds examples from stored feedback and its conversation context

use super::example::{Example, FeedbackScore};
use crate::config::OptimizerSettings;
use crate::error::Result;
use crate::signatures::{ConceptRequest, MathsProblem, SignatureKind, StudentWork};
use crate::storage::{FeedbackQuery, FeedbackStore};
use crate::types::{AgentType, FeedbackWithContext, MessageRecord, Rating, Role};
use std::sync::Arc;
use tracing::{debug, info};

const DEFAULT_LEVEL: &str = "GCSE";
const DEFAULT_SUBJECT: &str = "general";

/// Loads signature-shaped examples for one agent
pub struct ExampleLoader {
    store: Arc<dyn FeedbackStore>,
    agent_type: AgentType,
}

impl ExampleLoader {
    pub fn new(store: Arc<dyn FeedbackStore>, agent_type: AgentType) -> Self {
        Self { store, agent_type }
    }

    /// All rated exchanges in the training window, newest first
    pub async fn load_training_examples(
        &self,
        kind: SignatureKind,
        settings: &OptimizerSettings,
    ) -> Result<Vec<Example>> {
        let query = FeedbackQuery::new(self.agent_type)
            .since_days(settings.train_since_days)
            .limit(settings.train_limit);
        let examples = self.load(kind, &query).await?;
        info!(
            "Loaded {} {} training examples for {}",
            examples.len(),
            kind,
            self.agent_type
        );
        Ok(examples)
    }

    /// Positively rated exchanges in the evaluation window, newest first
    pub async fn load_evaluation_examples(
        &self,
        kind: SignatureKind,
        settings: &OptimizerSettings,
    ) -> Result<Vec<Example>> {
        let query = FeedbackQuery::new(self.agent_type)
            .rating(Rating::ThumbsUp)
            .since_days(settings.eval_since_days)
            .limit(settings.eval_limit);
        let examples = self.load(kind, &query).await?;
        info!(
            "Loaded {} {} evaluation examples for {}",
            examples.len(),
            kind,
            self.agent_type
        );
        Ok(examples)
    }

    async fn load(&self, kind: SignatureKind, query: &FeedbackQuery) -> Result<Vec<Example>> {
        let records = self.store.load_with_context(query).await?;
        let total = records.len();
        let examples: Vec<Example> = records
            .iter()
            .filter_map(|item| build_example(kind, item))
            .collect();

        if examples.len() < total {
            debug!(
                "Discarded {} feedback records with no user turn",
                total - examples.len()
            );
        }
        Ok(examples)
    }
}

/// Reshape one rated exchange into `kind`'s inputs
///
/// Returns `None` when the conversation has no user turn to use as input.
pub fn build_example(kind: SignatureKind, item: &FeedbackWithContext) -> Option<Example> {
    let mut messages: Vec<&MessageRecord> = item.messages.iter().collect();
    messages.sort_by_key(|m| m.timestamp);

    let user_turn = last_turn(&messages, Role::User).filter(|t| !t.trim().is_empty())?;
    let assistant_turn = last_turn(&messages, Role::Assistant).unwrap_or_default();

    let context = &item.record.context;
    let level = context.level.as_deref().unwrap_or(DEFAULT_LEVEL);
    let subject = context.subject.as_deref().unwrap_or(DEFAULT_SUBJECT);

    let inputs = match kind {
        SignatureKind::Maths => MathsProblem::new(user_turn, level)
            .with_topic(context.topic.as_deref().unwrap_or(DEFAULT_SUBJECT))
            .into_fields(),
        SignatureKind::Explain => ConceptRequest::new(user_turn, subject, level).into_fields(),
        SignatureKind::Diagnose => StudentWork::new(
            user_turn,
            context.problem.as_deref().unwrap_or_default(),
            subject,
            level,
        )
        .into_fields(),
    };

    let mut example = Example::new(inputs)
        .with_feedback_id(item.record.id)
        .with_feedback(FeedbackScore::new(
            item.record.rating,
            item.record.rating_value,
        ));
    if !assistant_turn.trim().is_empty() {
        example = example.with_expected(assistant_turn);
    }
    Some(example)
}

fn last_turn(messages: &[&MessageRecord], role: Role) -> Option<String> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == role)
        .map(|m| m.content.clone())
}
