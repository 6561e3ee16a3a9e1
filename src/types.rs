//! Core data types for the tutor-tune pipeline
//!
//! Feedback records and conversation turns as they come out of the feedback
//! store. These are written by the serving system and read (and, for the
//! processed flag, updated) by the optimizer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::TutorError;

/// Unique identifier for feedback records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedbackId(pub Uuid);

impl FeedbackId {
    /// Create a new random feedback ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a feedback ID from a string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for FeedbackId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FeedbackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tutoring agent whose feedback is being mined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    /// Subject tutor
    Sage,
    /// Help assistant
    Lexi,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Sage => "sage",
            AgentType::Lexi => "lexi",
        }
    }

    /// Table holding this agent's conversation turns
    pub fn message_table(&self) -> &'static str {
        match self {
            AgentType::Sage => "sage_messages",
            AgentType::Lexi => "lexi_messages",
        }
    }

    pub fn all() -> [AgentType; 2] {
        [AgentType::Sage, AgentType::Lexi]
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = TutorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sage" => Ok(AgentType::Sage),
            "lexi" => Ok(AgentType::Lexi),
            other => Err(TutorError::InvalidInput(format!(
                "Unknown agent type: {}",
                other
            ))),
        }
    }
}

/// Binary user reaction to a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    ThumbsUp,
    ThumbsDown,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::ThumbsUp => "thumbs_up",
            Rating::ThumbsDown => "thumbs_down",
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Rating::ThumbsUp)
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rating {
    type Err = TutorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "thumbs_up" => Ok(Rating::ThumbsUp),
            "thumbs_down" => Ok(Rating::ThumbsDown),
            other => Err(TutorError::InvalidInput(format!("Unknown rating: {}", other))),
        }
    }
}

/// Free-form context captured alongside a rating
///
/// The serving system stores whatever it knows about the exchange; the
/// optimizer only reads the well-known keys and keeps the rest untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    /// Original problem statement (diagnosis feedback)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A single thumbs up/down reaction, optionally with a 1-5 rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: FeedbackId,
    pub agent_type: AgentType,
    pub session_id: Option<String>,
    pub message_id: Option<String>,
    pub rating: Rating,

    /// Optional ordinal rating, 1-5
    pub rating_value: Option<u8>,

    #[serde(default)]
    pub context: FeedbackContext,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl FeedbackRecord {
    /// New unprocessed record stamped with the current time
    pub fn new(agent_type: AgentType, rating: Rating) -> Self {
        Self {
            id: FeedbackId::new(),
            agent_type,
            session_id: None,
            message_id: None,
            rating,
            rating_value: None,
            context: FeedbackContext::default(),
            processed: false,
            created_at: Utc::now(),
            processed_at: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_message(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// Attach a 1-5 rating; out-of-range values are clamped
    pub fn with_rating_value(mut self, value: u8) -> Self {
        self.rating_value = Some(value.clamp(1, 5));
        self
    }

    pub fn with_context(mut self, context: FeedbackContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl FromStr for Role {
    type Err = TutorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => Err(TutorError::InvalidInput(format!("Unknown role: {}", other))),
        }
    }
}

/// One turn of a tutoring session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl MessageRecord {
    pub fn new(
        session_id: impl Into<String>,
        role: Role,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            role,
            content: content.into(),
            timestamp,
        }
    }
}

/// Feedback joined with the conversation turns around it
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackWithContext {
    pub record: FeedbackRecord,
    pub messages: Vec<MessageRecord>,
}
