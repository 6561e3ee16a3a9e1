//! Prompt programs: instructions plus few-shot demonstrations

use crate::data::Example;
use crate::signatures::{FieldMap, Prediction, SignatureSpec};
use serde::{Deserialize, Serialize};

/// A demonstration shown to the engine before the real inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demo {
    pub inputs: FieldMap,
    pub outputs: FieldMap,
    /// True when the outputs were produced by the engine during compile,
    /// false when they are the labeled answer from a rated conversation
    #[serde(default)]
    pub augmented: bool,
}

impl Demo {
    /// Demo from a successful compile-time run
    pub fn bootstrapped(inputs: FieldMap, prediction: &Prediction) -> Self {
        let mut outputs = prediction.output_fields();
        if !prediction.reasoning().is_empty() {
            outputs.insert(
                crate::signatures::REASONING_FIELD.to_string(),
                prediction.reasoning().to_string(),
            );
        }
        Self {
            inputs,
            outputs,
            augmented: true,
        }
    }

    /// Demo from an example's recorded answer; `None` when there is no answer
    pub fn labeled(spec: &SignatureSpec, example: &Example) -> Option<Self> {
        let expected = example.expected_text()?;
        let inputs = spec.resolve_inputs(&example.inputs).ok()?;
        Some(Self {
            inputs,
            outputs: FieldMap::from([(spec.primary_output().to_string(), expected.to_string())]),
            augmented: false,
        })
    }
}

/// Instructions and demos for one predictor
///
/// An empty program runs the signature's own instructions with no demos.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptProgram {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default)]
    pub demos: Vec<Demo>,
}

impl PromptProgram {
    pub fn with_demos(demos: Vec<Demo>) -> Self {
        Self {
            instructions: None,
            demos,
        }
    }

    /// Instructions in effect for `spec`
    pub fn effective_instructions<'a>(&'a self, spec: &'a SignatureSpec) -> &'a str {
        self.instructions.as_deref().unwrap_or(spec.instructions)
    }

    pub fn bootstrapped_count(&self) -> usize {
        self.demos.iter().filter(|d| d.augmented).count()
    }

    pub fn labeled_count(&self) -> usize {
        self.demos.iter().filter(|d| !d.augmented).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Example, FeedbackScore};
    use crate::signatures::{MathsProblem, MATHS_SOLVER};
    use crate::types::Rating;

    #[test]
    fn test_labeled_demo_uses_primary_output() {
        let example = Example::new(MathsProblem::new("2 + 2", "GCSE").into_fields())
            .with_expected("It is 4")
            .with_feedback(FeedbackScore::new(Rating::ThumbsUp, None));

        let demo = Demo::labeled(&MATHS_SOLVER, &example).unwrap();
        assert!(!demo.augmented);
        assert_eq!(demo.outputs["solution"], "It is 4");
    }

    #[test]
    fn test_labeled_demo_requires_answer() {
        let example = Example::new(MathsProblem::new("2 + 2", "GCSE").into_fields()).with_expected("  ");
        assert!(Demo::labeled(&MATHS_SOLVER, &example).is_none());
    }

    #[test]
    fn test_default_program_uses_signature_instructions() {
        let program = PromptProgram::default();
        assert_eq!(
            program.effective_instructions(&MATHS_SOLVER),
            MATHS_SOLVER.instructions
        );
        assert_eq!(program.bootstrapped_count() + program.labeled_count(), 0);
    }
}
