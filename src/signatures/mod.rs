//! Task signatures
//!
//! Each tutoring task is a typed contract: named input fields (some with
//! defaults), named output fields, and instruction text. A [`TaskModule`]
//! wraps one reasoning-engine call for a signature and turns the raw field map
//! into a typed [`Prediction`].

pub mod diagnose_error;
pub mod explain_concept;
pub mod maths_solver;
pub mod prediction;

pub use diagnose_error::{ErrorDiagnosis, StudentWork, DIAGNOSE_ERROR};
pub use explain_concept::{ConceptExplanation, ConceptRequest, EXPLAIN_CONCEPT};
pub use maths_solver::{MathsProblem, MathsSolution, MATHS_SOLVER};
pub use prediction::Prediction;

use crate::error::{Result, TutorError};
use crate::optimizer::program::PromptProgram;
use crate::services::llm::{PredictRequest, ReasoningEngine};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Field name to value, ordered by name
pub type FieldMap = BTreeMap<String, String>;

/// Extra output the chain-of-thought strategy asks for before the declared outputs
pub const REASONING_FIELD: &str = "reasoning";

/// One named input or output field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub desc: &'static str,
    /// Inputs with a default are optional; outputs never have one
    pub default: Option<&'static str>,
}

impl FieldSpec {
    pub const fn required(name: &'static str, desc: &'static str) -> Self {
        Self {
            name,
            desc,
            default: None,
        }
    }

    pub const fn optional(name: &'static str, desc: &'static str, default: &'static str) -> Self {
        Self {
            name,
            desc,
            default: Some(default),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Static description of a tutoring task
#[derive(Debug)]
pub struct SignatureSpec {
    pub kind: SignatureKind,
    /// Signature type name, e.g. "MathsSolver"
    pub name: &'static str,
    /// Name of the predictor wrapping this signature inside its module
    pub predictor: &'static str,
    pub instructions: &'static str,
    pub inputs: &'static [FieldSpec],
    pub outputs: &'static [FieldSpec],
}

impl SignatureSpec {
    /// Fill defaults and reject inputs missing a required field
    ///
    /// Unknown keys are dropped so demos and prompts only carry declared fields.
    pub fn resolve_inputs(&self, given: &FieldMap) -> Result<FieldMap> {
        let mut resolved = FieldMap::new();
        for field in self.inputs {
            match (given.get(field.name), field.default) {
                (Some(value), _) => {
                    resolved.insert(field.name.to_string(), value.clone());
                }
                (None, Some(default)) => {
                    resolved.insert(field.name.to_string(), default.to_string());
                }
                (None, None) => {
                    return Err(TutorError::InvalidInput(format!(
                        "{} requires input field '{}'",
                        self.name, field.name
                    )));
                }
            }
        }
        Ok(resolved)
    }

    /// Pull every declared output out of a raw engine response
    pub fn extract_outputs(&self, raw: &FieldMap) -> Result<FieldMap> {
        self.outputs
            .iter()
            .map(|field| {
                raw.get(field.name)
                    .map(|value| (field.name.to_string(), value.trim().to_string()))
                    .ok_or_else(|| {
                        TutorError::MissingField(format!("{}.{}", self.name, field.name))
                    })
            })
            .collect()
    }

    pub fn output_names(&self) -> impl Iterator<Item = &'static str> {
        self.outputs.iter().map(|f| f.name)
    }

    /// Output field that carries a raw labeled answer
    pub fn primary_output(&self) -> &'static str {
        self.outputs.first().map(|f| f.name).unwrap_or(REASONING_FIELD)
    }
}

/// The three optimizable tutoring tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureKind {
    Maths,
    Explain,
    Diagnose,
}

impl SignatureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureKind::Maths => "maths",
            SignatureKind::Explain => "explain",
            SignatureKind::Diagnose => "diagnose",
        }
    }

    pub fn spec(&self) -> &'static SignatureSpec {
        match self {
            SignatureKind::Maths => &MATHS_SOLVER,
            SignatureKind::Explain => &EXPLAIN_CONCEPT,
            SignatureKind::Diagnose => &DIAGNOSE_ERROR,
        }
    }

    /// Optimization order used by `--signature all`
    pub fn all() -> [SignatureKind; 3] {
        [
            SignatureKind::Maths,
            SignatureKind::Explain,
            SignatureKind::Diagnose,
        ]
    }
}

impl std::fmt::Display for SignatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureKind {
    type Err = TutorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "maths" | "math" => Ok(SignatureKind::Maths),
            "explain" => Ok(SignatureKind::Explain),
            "diagnose" => Ok(SignatureKind::Diagnose),
            other => Err(TutorError::UnknownSignature(other.to_string())),
        }
    }
}

/// A runnable tutoring task
#[async_trait]
pub trait TaskModule: Send + Sync {
    fn spec(&self) -> &'static SignatureSpec;

    /// Run the task once under `program`
    ///
    /// `temperature` overrides the engine default for this call only.
    async fn forward(
        &self,
        program: &PromptProgram,
        inputs: &FieldMap,
        temperature: Option<f32>,
    ) -> Result<Prediction>;
}

/// Chain-of-thought wrapper around one signature
///
/// Asks the engine for a leading `reasoning` field, then the declared outputs.
pub struct ChainOfThought {
    spec: &'static SignatureSpec,
    engine: Arc<dyn ReasoningEngine>,
}

impl ChainOfThought {
    pub fn new(kind: SignatureKind, engine: Arc<dyn ReasoningEngine>) -> Self {
        Self {
            spec: kind.spec(),
            engine,
        }
    }
}

#[async_trait]
impl TaskModule for ChainOfThought {
    fn spec(&self) -> &'static SignatureSpec {
        self.spec
    }

    async fn forward(
        &self,
        program: &PromptProgram,
        inputs: &FieldMap,
        temperature: Option<f32>,
    ) -> Result<Prediction> {
        let inputs = self.spec.resolve_inputs(inputs)?;
        debug!(
            "{}: predicting with {} demos",
            self.spec.predictor,
            program.demos.len()
        );

        let raw = self
            .engine
            .predict(PredictRequest {
                signature: self.spec,
                program: program.clone(),
                inputs,
                temperature,
            })
            .await?;

        Prediction::from_fields(self.spec.kind, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm::MockReasoningEngine;

    fn maths_inputs() -> FieldMap {
        FieldMap::from([
            ("problem".to_string(), "Solve 2x + 3 = 11".to_string()),
            ("level".to_string(), "GCSE".to_string()),
        ])
    }

    #[test]
    fn test_kind_parse_and_predictor_names() {
        assert_eq!("maths".parse::<SignatureKind>().unwrap(), SignatureKind::Maths);
        assert_eq!("Explain".parse::<SignatureKind>().unwrap(), SignatureKind::Explain);
        assert!(matches!(
            "poetry".parse::<SignatureKind>(),
            Err(TutorError::UnknownSignature(_))
        ));

        let predictors: Vec<_> = SignatureKind::all()
            .iter()
            .map(|k| k.spec().predictor)
            .collect();
        assert_eq!(predictors, vec!["solver", "explainer", "diagnoser"]);
    }

    #[test]
    fn test_resolve_inputs_fills_defaults() {
        let resolved = MATHS_SOLVER.resolve_inputs(&maths_inputs()).unwrap();
        assert_eq!(resolved["topic"], "general");
        assert_eq!(resolved["student_context"], "");
        assert_eq!(resolved.len(), 4);
    }

    #[test]
    fn test_resolve_inputs_rejects_missing_required() {
        let mut inputs = maths_inputs();
        inputs.remove("level");
        let err = MATHS_SOLVER.resolve_inputs(&inputs).unwrap_err();
        assert!(matches!(err, TutorError::InvalidInput(msg) if msg.contains("level")));
    }

    #[test]
    fn test_extract_outputs_requires_all_fields() {
        let raw = FieldMap::from([
            ("solution".to_string(), "x = 4".to_string()),
            ("key_concepts".to_string(), "inverse operations".to_string()),
        ]);
        let err = MATHS_SOLVER.extract_outputs(&raw).unwrap_err();
        assert!(matches!(err, TutorError::MissingField(_)));
    }

    #[tokio::test]
    async fn test_chain_of_thought_forwards_resolved_inputs() {
        let mut engine = MockReasoningEngine::new();
        engine
            .expect_predict()
            .withf(|req| {
                req.signature.kind == SignatureKind::Maths
                    && req.inputs.get("topic").map(String::as_str) == Some("general")
                    && req.temperature.is_none()
            })
            .times(1)
            .returning(|_| {
                Ok(FieldMap::from([
                    ("reasoning".to_string(), "Subtract then divide".to_string()),
                    ("solution".to_string(), "First subtract 3, then divide by 2".to_string()),
                    ("key_concepts".to_string(), "linear equations".to_string()),
                    ("common_mistakes".to_string(), "dividing first".to_string()),
                    ("follow_up".to_string(), "Solve 3x - 1 = 8".to_string()),
                ]))
            });

        let module = ChainOfThought::new(SignatureKind::Maths, Arc::new(engine));
        let prediction = module
            .forward(&PromptProgram::default(), &maths_inputs(), None)
            .await
            .unwrap();

        assert_eq!(prediction.kind(), SignatureKind::Maths);
        assert_eq!(prediction.reasoning(), "Subtract then divide");
        assert!(prediction.primary_text().starts_with("First subtract"));
    }

    #[tokio::test]
    async fn test_chain_of_thought_missing_output_is_error() {
        let mut engine = MockReasoningEngine::new();
        engine
            .expect_predict()
            .returning(|_| Ok(FieldMap::from([("reasoning".to_string(), "hmm".to_string())])));

        let module = ChainOfThought::new(SignatureKind::Explain, Arc::new(engine));
        let inputs = FieldMap::from([
            ("concept".to_string(), "photosynthesis".to_string()),
            ("subject".to_string(), "science".to_string()),
            ("level".to_string(), "GCSE".to_string()),
        ]);
        let result = module.forward(&PromptProgram::default(), &inputs, None).await;
        assert!(matches!(result, Err(TutorError::MissingField(_))));
    }
}
