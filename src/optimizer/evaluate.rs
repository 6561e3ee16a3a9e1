//! Mean-metric evaluation of a program over examples

use super::program::PromptProgram;
use crate::data::Example;
use crate::error::TutorError;
use crate::metrics::{self, MetricFn};
use crate::signatures::TaskModule;
use tracing::{debug, warn};

/// Mean score plus how many examples failed outright
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationReport {
    pub score: f64,
    pub evaluated: usize,
    pub failures: usize,
}

/// Score `program` on each example in turn
///
/// A failed prediction scores 0.0 and stays in the denominator. An empty
/// example set scores 0.0.
pub async fn evaluate(
    module: &dyn TaskModule,
    program: &PromptProgram,
    examples: &[Example],
    metric: MetricFn,
) -> EvaluationReport {
    if examples.is_empty() {
        return EvaluationReport {
            score: 0.0,
            evaluated: 0,
            failures: 0,
        };
    }

    let mut total = 0.0;
    let mut failures = 0;

    for (i, example) in examples.iter().enumerate() {
        match module.forward(program, &example.inputs, None).await {
            Ok(prediction) => {
                let score = metric(example, &prediction);
                debug!(
                    "{} example {}: {:?}",
                    module.spec().name,
                    i,
                    metrics::breakdown(example, &prediction)
                );
                total += score;
            }
            Err(e) => {
                let err = TutorError::Evaluation(format!(
                    "{} example {}: {}",
                    module.spec().name,
                    i,
                    e
                ));
                warn!("{}", err);
                failures += 1;
            }
        }
    }

    EvaluationReport {
        score: total / examples.len() as f64,
        evaluated: examples.len(),
        failures,
    }
}
