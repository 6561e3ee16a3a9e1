//! Explain Concept: level-appropriate explanations with examples and checks

use super::{FieldMap, FieldSpec, SignatureKind, SignatureSpec};
use crate::error::Result;
use serde::{Deserialize, Serialize};

pub static EXPLAIN_CONCEPT: SignatureSpec = SignatureSpec {
    kind: SignatureKind::Explain,
    name: "ExplainConcept",
    predictor: "explainer",
    instructions: "Explain an educational concept clearly and engagingly.\n\n\
The explanation should:\n\
- Use appropriate language for the student's level\n\
- Include concrete examples and analogies\n\
- Build on prerequisite knowledge\n\
- Address common misconceptions\n\
- Provide visual descriptions where helpful",
    inputs: &[
        FieldSpec::required(
            "concept",
            "The concept to explain (e.g., 'photosynthesis', 'quadratic equations', 'metaphors')",
        ),
        FieldSpec::required(
            "subject",
            "Subject area: 'maths', 'english', 'science', or 'general'",
        ),
        FieldSpec::required(
            "level",
            "Student's level: 'GCSE', 'A-Level', 'University', or 'Other'",
        ),
        FieldSpec::optional(
            "learning_style",
            "Preferred learning style: 'visual', 'auditory', 'kinesthetic', or 'mixed'",
            "mixed",
        ),
        FieldSpec::optional(
            "prior_knowledge",
            "What the student already knows about this topic",
            "",
        ),
    ],
    outputs: &[
        FieldSpec::required(
            "explanation",
            "Clear, engaging explanation of the concept appropriate for the student's level",
        ),
        FieldSpec::required(
            "examples",
            "2-3 concrete examples that illustrate the concept",
        ),
        FieldSpec::required("analogies", "Real-world analogies to help understanding"),
        FieldSpec::required(
            "misconceptions",
            "Common misconceptions about this concept and how to avoid them",
        ),
        FieldSpec::required(
            "check_understanding",
            "Questions to check if the student has understood the concept",
        ),
    ],
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptRequest {
    pub concept: String,
    pub subject: String,
    pub level: String,
    pub learning_style: String,
    pub prior_knowledge: String,
}

impl ConceptRequest {
    pub fn new(
        concept: impl Into<String>,
        subject: impl Into<String>,
        level: impl Into<String>,
    ) -> Self {
        Self {
            concept: concept.into(),
            subject: subject.into(),
            level: level.into(),
            learning_style: "mixed".to_string(),
            prior_knowledge: String::new(),
        }
    }

    pub fn into_fields(self) -> FieldMap {
        FieldMap::from([
            ("concept".to_string(), self.concept),
            ("subject".to_string(), self.subject),
            ("level".to_string(), self.level),
            ("learning_style".to_string(), self.learning_style),
            ("prior_knowledge".to_string(), self.prior_knowledge),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptExplanation {
    pub explanation: String,
    pub examples: String,
    pub analogies: String,
    pub misconceptions: String,
    pub check_understanding: String,
}

impl ConceptExplanation {
    pub fn from_fields(raw: &FieldMap) -> Result<Self> {
        let mut fields = EXPLAIN_CONCEPT.extract_outputs(raw)?;
        let mut take = |name: &str| fields.remove(name).unwrap_or_default();
        Ok(Self {
            explanation: take("explanation"),
            examples: take("examples"),
            analogies: take("analogies"),
            misconceptions: take("misconceptions"),
            check_understanding: take("check_understanding"),
        })
    }

    pub fn to_fields(&self) -> FieldMap {
        FieldMap::from([
            ("explanation".to_string(), self.explanation.clone()),
            ("examples".to_string(), self.examples.clone()),
            ("analogies".to_string(), self.analogies.clone()),
            ("misconceptions".to_string(), self.misconceptions.clone()),
            (
                "check_understanding".to_string(),
                self.check_understanding.clone(),
            ),
        ])
    }
}
