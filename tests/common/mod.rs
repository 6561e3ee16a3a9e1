//! Common test utilities and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tutor_tune_core::{
    error::{Result, TutorError},
    services::PredictRequest,
    signatures::{FieldMap, REASONING_FIELD},
    AgentType, ConnectionMode, FeedbackRecord, FeedbackStore, LibsqlFeedbackStore, MessageRecord,
    OptimizerConfig, Rating, ReasoningEngine, Role,
};

/// Inputs containing this text make the scripted engine fail
pub const FAIL_MARKER: &str = "FAIL";

/// Deterministic stand-in for the reasoning engine
///
/// Fills every declared output with a short stepwise answer. When the program
/// carries demos the answer gains encouragement and misconception cues, so a
/// compiled program scores higher than the bare one.
#[derive(Default)]
pub struct ScriptedEngine {
    calls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReasoningEngine for ScriptedEngine {
    async fn predict(&self, request: PredictRequest) -> Result<FieldMap> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if request.inputs.values().any(|v| v.contains(FAIL_MARKER)) {
            return Err(TutorError::LlmApi("scripted failure".to_string()));
        }

        let subject = request
            .signature
            .inputs
            .first()
            .and_then(|field| request.inputs.get(field.name))
            .cloned()
            .unwrap_or_default();

        let mut fields = FieldMap::new();
        fields.insert(
            REASONING_FIELD.to_string(),
            format!("Break down: {}", subject),
        );
        for field in request.signature.outputs {
            let mut text = format!(
                "First, consider the {} for {}. For example, try a simpler case.",
                field.name, subject
            );
            if !request.program.demos.is_empty() {
                text.push_str(
                    " Well done! Remember when you learned this? \
                     Students often mix up the signs, so be careful.",
                );
            }
            fields.insert(field.name.to_string(), text);
        }
        Ok(fields)
    }
}

/// Create a LibSQL feedback store backed by a temp file
pub async fn create_test_store() -> Arc<LibsqlFeedbackStore> {
    let path = format!("/tmp/tutor_tune_test_{}.db", uuid::Uuid::new_v4());
    let store = LibsqlFeedbackStore::new(ConnectionMode::Local(path))
        .await
        .expect("Failed to create test store");
    Arc::new(store)
}

/// One rated exchange to seed
#[derive(Debug, Clone)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
    pub rating: Rating,
    pub value: Option<u8>,
    pub age_days: i64,
}

impl Exchange {
    pub fn new(question: impl Into<String>, rating: Rating) -> Self {
        Self {
            question: question.into(),
            answer: "Let's work through it together.".to_string(),
            rating,
            value: None,
            age_days: 1,
        }
    }

    pub fn value(mut self, value: u8) -> Self {
        self.value = Some(value);
        self
    }

    pub fn age_days(mut self, days: i64) -> Self {
        self.age_days = days;
        self
    }
}

/// Write a session (user turn then assistant turn) and its feedback record
pub async fn seed_exchange(store: &LibsqlFeedbackStore, agent: AgentType, exchange: &Exchange) {
    let at = Utc::now() - Duration::days(exchange.age_days);
    let session = uuid::Uuid::new_v4().to_string();

    store
        .append_message(
            agent,
            &MessageRecord::new(&session, Role::User, &exchange.question, at),
        )
        .await
        .expect("Failed to seed user turn");
    store
        .append_message(
            agent,
            &MessageRecord::new(
                &session,
                Role::Assistant,
                &exchange.answer,
                at + Duration::seconds(5),
            ),
        )
        .await
        .expect("Failed to seed assistant turn");

    let mut record = FeedbackRecord::new(agent, exchange.rating)
        .with_session(&session)
        .with_created_at(at + Duration::seconds(10));
    if let Some(value) = exchange.value {
        record = record.with_rating_value(value);
    }
    store
        .record_feedback(&record)
        .await
        .expect("Failed to seed feedback");
}

/// Seed `count` recent exchanges with the given rating
pub async fn seed_recent(store: &LibsqlFeedbackStore, agent: AgentType, count: usize, rating: Rating) {
    for i in 0..count {
        let exchange = Exchange::new(format!("What is {} + {}?", i, i + 1), rating);
        seed_exchange(store, agent, &exchange).await;
    }
}

/// The standard data set: 15 recent rated exchanges (12 up, 3 down) and 5
/// older top-rated ones that only fall inside the evaluation window
pub async fn seed_standard(store: &LibsqlFeedbackStore, agent: AgentType) {
    seed_recent(store, agent, 12, Rating::ThumbsUp).await;
    seed_recent(store, agent, 3, Rating::ThumbsDown).await;
    for i in 0..5 {
        let exchange = Exchange::new(format!("Solve {}x = {}", i + 2, (i + 2) * 3), Rating::ThumbsUp)
            .value(5)
            .age_days(60);
        seed_exchange(store, agent, &exchange).await;
    }
}

/// Default config writing artifacts under `output_dir`
pub fn test_config(output_dir: &Path) -> OptimizerConfig {
    let mut config = OptimizerConfig::default();
    config.optimizer.output_dir = output_dir.to_path_buf();
    config
}
