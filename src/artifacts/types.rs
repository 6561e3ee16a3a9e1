//! Persisted optimization outcomes

use crate::optimizer::program::{Demo, PromptProgram};
use crate::signatures::{SignatureKind, SignatureSpec, REASONING_FIELD};
use crate::types::AgentType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Artifact format version
pub const ARTIFACT_VERSION: &str = "1.0.0";

/// Outcome of one signature's optimization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    Success,
    Skipped,
    Error,
}

impl SignatureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureStatus::Success => "success",
            SignatureStatus::Skipped => "skipped",
            SignatureStatus::Error => "error",
        }
    }
}

/// Before/after composite scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreDelta {
    pub before: f64,
    pub after: f64,
    pub improvement: f64,
    pub improvement_pct: f64,
}

impl ScoreDelta {
    /// Percentage is relative to the baseline, floored at 0.01
    pub fn new(before: f64, after: f64) -> Self {
        let improvement = after - before;
        Self {
            before,
            after,
            improvement,
            improvement_pct: improvement / before.max(0.01) * 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDoc {
    pub name: String,
    pub desc: String,
}

/// Instructions and field docs for one predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorPrompt {
    pub instructions: Option<String>,
    pub fields: Vec<FieldDoc>,
}

/// Demos plus one entry per predictor name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedPrompts {
    pub demos: Vec<StoredDemo>,
    #[serde(flatten)]
    pub predictors: BTreeMap<String, PredictorPrompt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDemo {
    pub inputs: BTreeMap<String, String>,
    pub outputs: BTreeMap<String, String>,
}

impl OptimizedPrompts {
    /// Snapshot of a compiled program, keeping at most `demo_limit` demos
    pub fn extract(spec: &SignatureSpec, program: &PromptProgram, demo_limit: usize) -> Self {
        let demos = program
            .demos
            .iter()
            .take(demo_limit)
            .map(|Demo { inputs, outputs, .. }| StoredDemo {
                inputs: inputs.clone(),
                outputs: outputs.clone(),
            })
            .collect();

        let reasoning = FieldDoc {
            name: REASONING_FIELD.to_string(),
            desc: "Step-by-step reasoning produced before the outputs".to_string(),
        };
        let fields = spec
            .inputs
            .iter()
            .map(|f| FieldDoc {
                name: f.name.to_string(),
                desc: f.desc.to_string(),
            })
            .chain(std::iter::once(reasoning))
            .chain(spec.outputs.iter().map(|f| FieldDoc {
                name: f.name.to_string(),
                desc: f.desc.to_string(),
            }))
            .collect();

        let predictor = PredictorPrompt {
            instructions: Some(program.effective_instructions(spec).to_string()),
            fields,
        };

        Self {
            demos,
            predictors: BTreeMap::from([(spec.predictor.to_string(), predictor)]),
        }
    }
}

/// Result of optimizing one signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub signature: SignatureKind,
    pub status: SignatureStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ScoreDelta>,
    /// Baseline kept when compile fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_score: Option<f64>,
    #[serde(default)]
    pub samples_used: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimized_prompts: Option<OptimizedPrompts>,
    pub timestamp: DateTime<Utc>,
}

impl OptimizationResult {
    pub fn success(
        signature: SignatureKind,
        metrics: ScoreDelta,
        samples_used: usize,
        optimized_prompts: OptimizedPrompts,
    ) -> Self {
        Self {
            signature,
            status: SignatureStatus::Success,
            reason: None,
            metrics: Some(metrics),
            before_score: None,
            samples_used,
            optimized_prompts: Some(optimized_prompts),
            timestamp: Utc::now(),
        }
    }

    pub fn skipped(signature: SignatureKind, samples: usize) -> Self {
        Self {
            signature,
            status: SignatureStatus::Skipped,
            reason: Some(format!("Insufficient data ({} examples)", samples)),
            metrics: None,
            before_score: None,
            samples_used: samples,
            optimized_prompts: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(
        signature: SignatureKind,
        reason: impl Into<String>,
        before_score: Option<f64>,
        samples_used: usize,
    ) -> Self {
        Self {
            signature,
            status: SignatureStatus::Error,
            reason: Some(reason.into()),
            metrics: None,
            before_score,
            samples_used,
            optimized_prompts: None,
            timestamp: Utc::now(),
        }
    }

    /// One line for the run summary
    pub fn summary_line(&self) -> String {
        match (&self.status, &self.metrics) {
            (SignatureStatus::Success, Some(m)) => format!(
                "{}: {:.3} -> {:.3} ({:+.1}%)",
                self.signature, m.before, m.after, m.improvement_pct
            ),
            _ => format!(
                "{}: {} - {}",
                self.signature,
                self.status.as_str(),
                self.reason.as_deref().unwrap_or("N/A")
            ),
        }
    }
}

/// Everything written for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub agent_type: AgentType,
    pub model: String,
    pub generated_at: DateTime<Utc>,
    pub version: String,
    pub signatures: BTreeMap<SignatureKind, OptimizationResult>,
}

impl Artifact {
    pub fn new(
        agent_type: AgentType,
        model: impl Into<String>,
        signatures: BTreeMap<SignatureKind, OptimizationResult>,
    ) -> Self {
        Self {
            agent_type,
            model: model.into(),
            generated_at: Utc::now(),
            version: ARTIFACT_VERSION.to_string(),
            signatures,
        }
    }
}
