//! Maths Solver: step-by-step worked solutions adapted to the student's level

use super::{FieldMap, FieldSpec, SignatureKind, SignatureSpec};
use crate::error::Result;
use serde::{Deserialize, Serialize};

pub static MATHS_SOLVER: SignatureSpec = SignatureSpec {
    kind: SignatureKind::Maths,
    name: "MathsSolver",
    predictor: "solver",
    instructions: "Solve a mathematical problem with clear, educational explanations.\n\n\
The solution should:\n\
- Break down the problem into manageable steps\n\
- Explain the reasoning behind each step\n\
- Use appropriate mathematical notation\n\
- Adapt to the student's level (GCSE, A-Level, University)\n\
- Include verification of the answer",
    inputs: &[
        FieldSpec::required(
            "problem",
            "The mathematical problem to solve. May include context about what the student is struggling with.",
        ),
        FieldSpec::required(
            "level",
            "Student's level: 'GCSE', 'A-Level', 'University', or 'Other'",
        ),
        FieldSpec::optional(
            "topic",
            "Mathematical topic (e.g., 'algebra', 'calculus', 'geometry', 'statistics')",
            "general",
        ),
        FieldSpec::optional(
            "student_context",
            "Additional context about the student's understanding, previous attempts, or specific difficulties",
            "",
        ),
    ],
    outputs: &[
        FieldSpec::required(
            "solution",
            "Step-by-step solution with clear explanations for each step",
        ),
        FieldSpec::required(
            "key_concepts",
            "List of key mathematical concepts used in this solution",
        ),
        FieldSpec::required(
            "common_mistakes",
            "Common mistakes students make with this type of problem",
        ),
        FieldSpec::required(
            "follow_up",
            "Suggested follow-up question or practice problem",
        ),
    ],
};

/// Inputs to the maths solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathsProblem {
    pub problem: String,
    pub level: String,
    pub topic: String,
    pub student_context: String,
}

impl MathsProblem {
    pub fn new(problem: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            problem: problem.into(),
            level: level.into(),
            topic: "general".to_string(),
            student_context: String::new(),
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn into_fields(self) -> FieldMap {
        FieldMap::from([
            ("problem".to_string(), self.problem),
            ("level".to_string(), self.level),
            ("topic".to_string(), self.topic),
            ("student_context".to_string(), self.student_context),
        ])
    }
}

/// Outputs of the maths solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathsSolution {
    pub solution: String,
    pub key_concepts: String,
    pub common_mistakes: String,
    pub follow_up: String,
}

impl MathsSolution {
    pub fn from_fields(raw: &FieldMap) -> Result<Self> {
        let mut fields = MATHS_SOLVER.extract_outputs(raw)?;
        let mut take = |name: &str| fields.remove(name).unwrap_or_default();
        Ok(Self {
            solution: take("solution"),
            key_concepts: take("key_concepts"),
            common_mistakes: take("common_mistakes"),
            follow_up: take("follow_up"),
        })
    }

    pub fn to_fields(&self) -> FieldMap {
        FieldMap::from([
            ("solution".to_string(), self.solution.clone()),
            ("key_concepts".to_string(), self.key_concepts.clone()),
            ("common_mistakes".to_string(), self.common_mistakes.clone()),
            ("follow_up".to_string(), self.follow_up.clone()),
        ])
    }
}
