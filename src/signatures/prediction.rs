//! Structured predictions, one variant per signature

use super::{
    ConceptExplanation, ErrorDiagnosis, FieldMap, MathsSolution, SignatureKind, REASONING_FIELD,
};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Output of one task module call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signature", rename_all = "snake_case")]
pub enum Prediction {
    Maths {
        reasoning: String,
        #[serde(flatten)]
        output: MathsSolution,
    },
    Explain {
        reasoning: String,
        #[serde(flatten)]
        output: ConceptExplanation,
    },
    Diagnose {
        reasoning: String,
        #[serde(flatten)]
        output: ErrorDiagnosis,
    },
}

/// Fields that carry understanding-promoting content
const UNDERSTANDING_FIELDS: &[&str] = &[
    "explanation",
    "solution",
    "check_understanding",
    "encouragement",
    "next_steps",
];

impl Prediction {
    /// Build a prediction from raw engine fields
    ///
    /// Every declared output must be present. A missing `reasoning` field is
    /// tolerated and left empty.
    pub fn from_fields(kind: SignatureKind, raw: &FieldMap) -> Result<Self> {
        let reasoning = raw
            .get(REASONING_FIELD)
            .map(|r| r.trim().to_string())
            .unwrap_or_default();

        Ok(match kind {
            SignatureKind::Maths => Prediction::Maths {
                reasoning,
                output: MathsSolution::from_fields(raw)?,
            },
            SignatureKind::Explain => Prediction::Explain {
                reasoning,
                output: ConceptExplanation::from_fields(raw)?,
            },
            SignatureKind::Diagnose => Prediction::Diagnose {
                reasoning,
                output: ErrorDiagnosis::from_fields(raw)?,
            },
        })
    }

    pub fn kind(&self) -> SignatureKind {
        match self {
            Prediction::Maths { .. } => SignatureKind::Maths,
            Prediction::Explain { .. } => SignatureKind::Explain,
            Prediction::Diagnose { .. } => SignatureKind::Diagnose,
        }
    }

    pub fn reasoning(&self) -> &str {
        match self {
            Prediction::Maths { reasoning, .. }
            | Prediction::Explain { reasoning, .. }
            | Prediction::Diagnose { reasoning, .. } => reasoning,
        }
    }

    /// Declared outputs, without the reasoning
    pub fn output_fields(&self) -> FieldMap {
        match self {
            Prediction::Maths { output, .. } => output.to_fields(),
            Prediction::Explain { output, .. } => output.to_fields(),
            Prediction::Diagnose { output, .. } => output.to_fields(),
        }
    }

    /// Text judged for explanation quality and lexical overlap
    ///
    /// Explanation for explain, solution for maths, every output (in declared
    /// order) for diagnose.
    pub fn primary_text(&self) -> String {
        match self {
            Prediction::Maths { output, .. } => output.solution.clone(),
            Prediction::Explain { output, .. } => output.explanation.clone(),
            Prediction::Diagnose { .. } => self.all_text(),
        }
    }

    /// Concatenation of the understanding-bearing outputs
    pub fn understanding_text(&self) -> String {
        let fields = self.output_fields();
        let parts: Vec<&str> = UNDERSTANDING_FIELDS
            .iter()
            .filter_map(|name| fields.get(*name).map(String::as_str))
            .collect();

        if parts.is_empty() {
            self.all_text()
        } else {
            parts.join(" ")
        }
    }

    fn all_text(&self) -> String {
        let fields = self.output_fields();
        self.kind()
            .spec()
            .output_names()
            .filter_map(|name| fields.get(name).map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
