//! Diagnose Error: find the mistake in student work without giving the answer away

use super::{FieldMap, FieldSpec, SignatureKind, SignatureSpec};
use crate::error::Result;
use serde::{Deserialize, Serialize};

pub static DIAGNOSE_ERROR: SignatureSpec = SignatureSpec {
    kind: SignatureKind::Diagnose,
    name: "DiagnoseError",
    predictor: "diagnoser",
    instructions: "Analyze student work to identify errors and provide constructive feedback.\n\n\
The diagnosis should:\n\
- Identify the specific error(s) made\n\
- Explain why the error occurred (misconception, calculation mistake, etc.)\n\
- Provide guidance without giving away the answer\n\
- Suggest specific steps to correct the error\n\
- Build student confidence with encouragement",
    inputs: &[
        FieldSpec::required("student_work", "The student's work or answer to analyze"),
        FieldSpec::optional(
            "expected_answer",
            "The correct answer or expected outcome (optional)",
            "",
        ),
        FieldSpec::required(
            "problem_context",
            "The original problem or task the student was working on",
        ),
        FieldSpec::required(
            "subject",
            "Subject area: 'maths', 'english', 'science', or 'general'",
        ),
        FieldSpec::required(
            "level",
            "Student's level: 'GCSE', 'A-Level', 'University', or 'Other'",
        ),
    ],
    outputs: &[
        FieldSpec::required(
            "error_identified",
            "Clear description of the error(s) found in the student's work",
        ),
        FieldSpec::required(
            "error_type",
            "Classification of error: 'conceptual', 'procedural', 'careless', 'incomplete'",
        ),
        FieldSpec::required(
            "underlying_misconception",
            "The underlying misconception or gap in understanding",
        ),
        FieldSpec::required(
            "corrective_hint",
            "A hint to help the student correct their work without giving the answer",
        ),
        FieldSpec::required(
            "encouragement",
            "Supportive message acknowledging what the student did well",
        ),
        FieldSpec::required(
            "next_steps",
            "Specific steps the student should take to improve",
        ),
    ],
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentWork {
    pub student_work: String,
    pub expected_answer: String,
    pub problem_context: String,
    pub subject: String,
    pub level: String,
}

impl StudentWork {
    pub fn new(
        student_work: impl Into<String>,
        problem_context: impl Into<String>,
        subject: impl Into<String>,
        level: impl Into<String>,
    ) -> Self {
        Self {
            student_work: student_work.into(),
            expected_answer: String::new(),
            problem_context: problem_context.into(),
            subject: subject.into(),
            level: level.into(),
        }
    }

    pub fn into_fields(self) -> FieldMap {
        FieldMap::from([
            ("student_work".to_string(), self.student_work),
            ("expected_answer".to_string(), self.expected_answer),
            ("problem_context".to_string(), self.problem_context),
            ("subject".to_string(), self.subject),
            ("level".to_string(), self.level),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDiagnosis {
    pub error_identified: String,
    pub error_type: String,
    pub underlying_misconception: String,
    pub corrective_hint: String,
    pub encouragement: String,
    pub next_steps: String,
}

impl ErrorDiagnosis {
    pub fn from_fields(raw: &FieldMap) -> Result<Self> {
        let mut fields = DIAGNOSE_ERROR.extract_outputs(raw)?;
        let mut take = |name: &str| fields.remove(name).unwrap_or_default();
        Ok(Self {
            error_identified: take("error_identified"),
            error_type: take("error_type"),
            underlying_misconception: take("underlying_misconception"),
            corrective_hint: take("corrective_hint"),
            encouragement: take("encouragement"),
            next_steps: take("next_steps"),
        })
    }

    pub fn to_fields(&self) -> FieldMap {
        FieldMap::from([
            ("error_identified".to_string(), self.error_identified.clone()),
            ("error_type".to_string(), self.error_type.clone()),
            (
                "underlying_misconception".to_string(),
                self.underlying_misconception.clone(),
            ),
            ("corrective_hint".to_string(), self.corrective_hint.clone()),
            ("encouragement".to_string(), self.encouragement.clone()),
            ("next_steps".to_string(), self.next_steps.clone()),
        ])
    }
}
