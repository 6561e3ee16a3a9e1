//! Tutoring quality metrics
//!
//! Pure scoring functions over an (example, prediction) pair. Every score is
//! in [0.0, 1.0]. The composite score is the single value the optimizer
//! maximizes:
//!
//! ```text
//! composite = 0.5 * feedback + 0.3 * explanation_quality + 0.2 * understanding
//! ```

use crate::data::Example;
use crate::signatures::Prediction;
use serde::{Deserialize, Serialize};

pub const FEEDBACK_WEIGHT: f64 = 0.5;
pub const EXPLANATION_WEIGHT: f64 = 0.3;
pub const UNDERSTANDING_WEIGHT: f64 = 0.2;

/// Score when there is nothing to compare against
const NEUTRAL_SCORE: f64 = 0.5;

const STEP_MARKERS: &[&str] = &[
    "step 1", "step 2", "first", "then", "next", "finally", "1.", "2.",
];
const EXAMPLE_MARKERS: &[&str] = &["for example", "for instance", "such as", "e.g.", "like this"];
const SCAFFOLD_MARKERS: &[&str] = &["remember", "think about", "consider", "notice", "key point"];
const GIVEAWAY_MARKERS: &[&str] = &["the answer is", "answer:", "= answer"];

const ENCOURAGEMENT_MARKERS: &[&str] = &[
    "well done",
    "good",
    "great",
    "excellent",
    "you're on the right track",
    "nice work",
    "keep going",
    "you've got this",
];
const PRIOR_KNOWLEDGE_MARKERS: &[&str] = &[
    "you learned",
    "remember when",
    "as you know",
    "building on",
    "using what you know",
    "from before",
];
const MISCONCEPTION_MARKERS: &[&str] = &[
    "common mistake",
    "be careful",
    "don't confuse",
    "misconception",
    "students often",
    "watch out for",
];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// How well the prediction matches what users liked
///
/// Uses the attached rating when there is one. Otherwise falls back to
/// lexical overlap with the expected answer, and to a neutral 0.5 when
/// there is no expected answer either.
pub fn feedback_score(example: &Example, prediction: &Prediction) -> f64 {
    if let Some(score) = example.feedback_score() {
        return score;
    }

    let expected = match example.expected_text() {
        Some(expected) => expected.to_lowercase(),
        None => return NEUTRAL_SCORE,
    };
    let actual = prediction.primary_text().to_lowercase();

    if actual.contains(&expected) {
        1.0
    } else if expected
        .split_whitespace()
        .take(5)
        .any(|word| actual.contains(word))
    {
        0.5
    } else {
        0.0
    }
}

/// Structure and pedagogy of the primary text, five checks
pub fn explanation_quality(prediction: &Prediction) -> f64 {
    let text = prediction.primary_text();
    let lower = text.to_lowercase();
    let mut passed = 0.0;

    if contains_any(&lower, STEP_MARKERS) {
        passed += 1.0;
    }
    if contains_any(&lower, EXAMPLE_MARKERS) {
        passed += 1.0;
    }

    let words = text.split_whitespace().count();
    if (50..=500).contains(&words) {
        passed += 1.0;
    } else if (30..=600).contains(&words) {
        passed += 0.5;
    }

    if contains_any(&lower, SCAFFOLD_MARKERS) {
        passed += 1.0;
    }
    if !contains_any(&lower, GIVEAWAY_MARKERS) {
        passed += 1.0;
    }

    passed / 5.0
}

/// Whether the response promotes understanding, four checks
pub fn understanding_score(prediction: &Prediction) -> f64 {
    let text = prediction.understanding_text();
    let lower = text.to_lowercase();

    let checks = [
        text.contains('?'),
        contains_any(&lower, ENCOURAGEMENT_MARKERS),
        contains_any(&lower, PRIOR_KNOWLEDGE_MARKERS),
        contains_any(&lower, MISCONCEPTION_MARKERS),
    ];

    checks.iter().filter(|passed| **passed).count() as f64 / 4.0
}

/// Component scores and their weighted total
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricBreakdown {
    pub feedback: f64,
    pub explanation: f64,
    pub understanding: f64,
    pub composite: f64,
}

impl MetricBreakdown {
    pub fn from_components(feedback: f64, explanation: f64, understanding: f64) -> Self {
        Self {
            feedback,
            explanation,
            understanding,
            composite: (FEEDBACK_WEIGHT * feedback
                + EXPLANATION_WEIGHT * explanation
                + UNDERSTANDING_WEIGHT * understanding)
                .clamp(0.0, 1.0),
        }
    }
}

pub fn breakdown(example: &Example, prediction: &Prediction) -> MetricBreakdown {
    MetricBreakdown::from_components(
        feedback_score(example, prediction),
        explanation_quality(prediction),
        understanding_score(prediction),
    )
}

/// The optimization target
pub fn composite(example: &Example, prediction: &Prediction) -> f64 {
    breakdown(example, prediction).composite
}

/// Signature of the scoring function handed to compile and evaluate
pub type MetricFn = fn(&Example, &Prediction) -> f64;
