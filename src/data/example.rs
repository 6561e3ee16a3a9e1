//! Training and evaluation examples

use crate::signatures::FieldMap;
use crate::types::{FeedbackId, Rating};
use serde::{Deserialize, Serialize};

/// The rating a user gave the original response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackScore {
    pub rating: Rating,
    /// Optional 1-5 value
    pub value: Option<u8>,
}

impl FeedbackScore {
    pub fn new(rating: Rating, value: Option<u8>) -> Self {
        Self { rating, value }
    }

    /// `value / 5` when a value exists, otherwise 1.0 or 0.0 by rating
    pub fn score(&self) -> f64 {
        match self.value {
            Some(value) => f64::from(value.min(5)) / 5.0,
            None if self.rating.is_positive() => 1.0,
            None => 0.0,
        }
    }
}

/// A rated exchange reshaped into one signature's input fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_id: Option<FeedbackId>,
    pub inputs: FieldMap,
    /// The assistant response that was rated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackScore>,
}

impl Example {
    pub fn new(inputs: FieldMap) -> Self {
        Self {
            feedback_id: None,
            inputs,
            expected: None,
            feedback: None,
        }
    }

    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn with_feedback(mut self, feedback: FeedbackScore) -> Self {
        self.feedback = Some(feedback);
        self
    }

    pub fn with_feedback_id(mut self, id: FeedbackId) -> Self {
        self.feedback_id = Some(id);
        self
    }

    /// Expected answer, ignoring blank text
    pub fn expected_text(&self) -> Option<&str> {
        self.expected
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Score of the attached rating, if any
    pub fn feedback_score(&self) -> Option<f64> {
        self.feedback.map(|f| f.score())
    }
}
