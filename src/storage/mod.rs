//! Storage layer for feedback and conversation records
//!
//! The optimizer reads rated exchanges through [`FeedbackStore`] and, after a
//! successful run, flips their processed flag. The store handle is owned by the
//! caller and passed in explicitly; there is no process-wide client.

pub mod libsql;

use crate::error::Result;
use crate::types::{
    AgentType, FeedbackId, FeedbackRecord, FeedbackWithContext, MessageRecord, Rating,
};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Messages fetched when the feedback points at a specific message
pub const ANCHORED_CONTEXT_LIMIT: usize = 10;

/// Messages fetched when only the session is known
pub const RECENT_CONTEXT_LIMIT: usize = 5;

/// Filter for feedback lookups
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackQuery {
    pub agent_type: AgentType,
    pub rating: Option<Rating>,
    pub processed: Option<bool>,
    /// Trailing window, in days, ending now
    pub since_days: i64,
    pub limit: usize,
}

impl FeedbackQuery {
    pub fn new(agent_type: AgentType) -> Self {
        Self {
            agent_type,
            rating: None,
            processed: None,
            since_days: 30,
            limit: 1000,
        }
    }

    pub fn rating(mut self, rating: Rating) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn processed(mut self, processed: bool) -> Self {
        self.processed = Some(processed);
        self
    }

    pub fn since_days(mut self, days: i64) -> Self {
        self.since_days = days;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Which slice of a session to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageWindow {
    /// The first N turns of the session
    Earliest(usize),
    /// The last N turns of the session
    Latest(usize),
}

/// Feedback store operations
///
/// Implementations return messages in ascending timestamp order regardless of
/// the window requested.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Load feedback records, newest first
    async fn load_feedback(&self, query: &FeedbackQuery) -> Result<Vec<FeedbackRecord>>;

    /// Load turns of one session
    async fn session_messages(
        &self,
        agent_type: AgentType,
        session_id: &str,
        window: MessageWindow,
    ) -> Result<Vec<MessageRecord>>;

    /// Mark records processed; returns how many ids matched
    ///
    /// Already-processed records keep their original processed_at.
    async fn mark_processed(&self, ids: &[FeedbackId]) -> Result<usize>;

    /// Persist a new feedback record
    async fn record_feedback(&self, record: &FeedbackRecord) -> Result<()>;

    /// Persist a conversation turn
    async fn append_message(&self, agent_type: AgentType, message: &MessageRecord) -> Result<()>;

    /// Number of unprocessed records for an agent
    async fn count_unprocessed(&self, agent_type: AgentType) -> Result<usize>;

    /// Load feedback and attach the surrounding conversation
    ///
    /// A failed message lookup leaves that record with no messages instead of
    /// failing the batch.
    async fn load_with_context(&self, query: &FeedbackQuery) -> Result<Vec<FeedbackWithContext>> {
        let records = self.load_feedback(query).await?;
        let mut enriched = Vec::with_capacity(records.len());

        for record in records {
            let messages = match record.session_id.as_deref() {
                Some(session_id) => {
                    let window = if record.message_id.is_some() {
                        MessageWindow::Earliest(ANCHORED_CONTEXT_LIMIT)
                    } else {
                        MessageWindow::Latest(RECENT_CONTEXT_LIMIT)
                    };

                    match self
                        .session_messages(record.agent_type, session_id, window)
                        .await
                    {
                        Ok(messages) => messages,
                        Err(e) => {
                            warn!(
                                "Failed to load context for feedback {} (session {}): {}",
                                record.id, session_id, e
                            );
                            Vec::new()
                        }
                    }
                }
                None => Vec::new(),
            };

            enriched.push(FeedbackWithContext { record, messages });
        }

        debug!("Loaded {} feedback records with context", enriched.len());
        Ok(enriched)
    }
}
