//! Bootstrap few-shot compilation
//!
//! Runs the module over training examples, keeps runs that score at least the
//! metric threshold as candidates, and takes the highest-scoring candidates as
//! bootstrapped demos. The program is then topped up with labeled demos taken
//! straight from the recorded answers.

use super::program::{Demo, PromptProgram};
use crate::config::BootstrapConfig;
use crate::data::Example;
use crate::error::{Result, TutorError};
use crate::metrics::MetricFn;
use crate::signatures::TaskModule;
use crate::types::FeedbackId;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Sampling temperature for rounds after the first
const RETRY_TEMPERATURE_BASE: f32 = 0.7;
const RETRY_TEMPERATURE_STEP: f32 = 0.05;

/// How a compiled program came about
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub rounds_run: usize,
    pub candidates_tried: usize,
    pub candidate_errors: usize,
    /// Score of each bootstrapped demo, in program order
    pub bootstrapped_scores: Vec<f64>,
    pub labeled: usize,
    /// Feedback records behind the chosen demos
    pub demo_sources: Vec<FeedbackId>,
}

struct Candidate {
    index: usize,
    score: f64,
    demo: Demo,
}

/// Compile `baseline` into a program with demos chosen from `trainset`
///
/// Candidate runs use the baseline program. Every unused example is scored
/// in a round; further rounds only run while the pool is short of
/// `max_bootstrapped_demos`. Errors when the trainset is empty or more than
/// `max_errors` candidate runs fail.
pub async fn compile(
    module: &dyn TaskModule,
    baseline: &PromptProgram,
    trainset: &[Example],
    metric: MetricFn,
    config: &BootstrapConfig,
) -> Result<(PromptProgram, Provenance)> {
    if trainset.is_empty() {
        return Err(TutorError::Compile("Trainset is empty".to_string()));
    }

    let spec = module.spec();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut provenance = Provenance::default();
    let mut pool: Vec<Candidate> = Vec::new();
    let mut used: HashSet<usize> = HashSet::new();

    info!(
        "Compiling {} over {} examples ({} rounds, threshold {})",
        spec.name,
        trainset.len(),
        config.max_rounds,
        config.metric_threshold
    );

    for round in 0..config.max_rounds {
        if pool.len() >= config.max_bootstrapped_demos {
            break;
        }
        provenance.rounds_run += 1;

        let temperature = (round > 0).then(|| {
            (RETRY_TEMPERATURE_BASE + RETRY_TEMPERATURE_STEP * round as f32).min(2.0)
        });

        let mut order: Vec<usize> = (0..trainset.len()).collect();
        order.shuffle(&mut rng);

        for index in order {
            if used.contains(&index) {
                continue;
            }

            let example = &trainset[index];
            provenance.candidates_tried += 1;

            let prediction = match module.forward(baseline, &example.inputs, temperature).await {
                Ok(prediction) => prediction,
                Err(e) => {
                    provenance.candidate_errors += 1;
                    warn!("Candidate {} failed: {}", index, e);
                    if provenance.candidate_errors > config.max_errors {
                        return Err(TutorError::Compile(format!(
                            "Too many candidate failures ({} > {}); last error: {}",
                            provenance.candidate_errors, config.max_errors, e
                        )));
                    }
                    continue;
                }
            };

            let score = metric(example, &prediction);
            debug!("Round {} candidate {} scored {:.3}", round, index, score);
            if score >= config.metric_threshold {
                let inputs = spec.resolve_inputs(&example.inputs)?;
                used.insert(index);
                pool.push(Candidate {
                    index,
                    score,
                    demo: Demo::bootstrapped(inputs, &prediction),
                });
            }
        }
    }

    // Stable: equal scores keep visiting order
    pool.sort_by(|a, b| b.score.total_cmp(&a.score));
    pool.truncate(config.max_bootstrapped_demos);

    let mut demos = Vec::with_capacity(pool.len() + config.max_labeled_demos);
    for candidate in &pool {
        provenance.bootstrapped_scores.push(candidate.score);
        if let Some(id) = trainset[candidate.index].feedback_id {
            provenance.demo_sources.push(id);
        }
        demos.push(candidate.demo.clone());
    }

    let chosen: HashSet<usize> = pool.iter().map(|c| c.index).collect();
    let mut unused: Vec<usize> = (0..trainset.len())
        .filter(|i| !chosen.contains(i))
        .collect();
    unused.sort_by(|a, b| {
        let score = |i: &usize| trainset[*i].feedback_score().unwrap_or(0.0);
        score(b).total_cmp(&score(a))
    });

    for index in unused {
        if provenance.labeled >= config.max_labeled_demos {
            break;
        }
        if let Some(demo) = Demo::labeled(spec, &trainset[index]) {
            demos.push(demo);
            provenance.labeled += 1;
            if let Some(id) = trainset[index].feedback_id {
                provenance.demo_sources.push(id);
            }
        }
    }

    info!(
        "Compiled {}: {} bootstrapped + {} labeled demos ({} candidates, {} errors)",
        spec.name,
        provenance.bootstrapped_scores.len(),
        provenance.labeled,
        provenance.candidates_tried,
        provenance.candidate_errors
    );

    Ok((
        PromptProgram {
            instructions: baseline.instructions.clone(),
            demos,
        },
        provenance,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FeedbackScore;
    use crate::metrics;
    use crate::services::llm::MockReasoningEngine;
    use crate::signatures::{ChainOfThought, FieldMap, MathsProblem, SignatureKind};
    use crate::types::Rating;
    use std::sync::Arc;

    fn solution(text: &str) -> FieldMap {
        FieldMap::from([
            ("reasoning".to_string(), "work it out".to_string()),
            ("solution".to_string(), text.to_string()),
            ("key_concepts".to_string(), String::new()),
            ("common_mistakes".to_string(), String::new()),
            ("follow_up".to_string(), String::new()),
        ])
    }

    fn trainset(n: usize) -> Vec<Example> {
        (0..n)
            .map(|i| {
                let rating = if i % 3 == 0 { Rating::ThumbsDown } else { Rating::ThumbsUp };
                Example::new(MathsProblem::new(format!("problem {}", i), "GCSE").into_fields())
                    .with_expected(format!("answer {}", i))
                    .with_feedback(FeedbackScore::new(rating, None))
                    .with_feedback_id(FeedbackId::new())
            })
            .collect()
    }

    fn echo_engine() -> MockReasoningEngine {
        let mut engine = MockReasoningEngine::new();
        engine
            .expect_predict()
            .returning(|req| Ok(solution(&format!("First, {}", req.inputs["problem"]))));
        engine
    }

    #[tokio::test]
    async fn test_empty_trainset_is_compile_error() {
        let module = ChainOfThought::new(SignatureKind::Maths, Arc::new(echo_engine()));
        let result = compile(
            &module,
            &PromptProgram::default(),
            &[],
            metrics::composite,
            &BootstrapConfig::default(),
        )
        .await;
        assert!(matches!(result, Err(TutorError::Compile(_))));
    }

    #[tokio::test]
    async fn test_demo_caps_are_respected() {
        let module = ChainOfThought::new(SignatureKind::Maths, Arc::new(echo_engine()));
        let config = BootstrapConfig::default();
        let data = trainset(15);

        let (program, provenance) = compile(
            &module,
            &PromptProgram::default(),
            &data,
            metrics::composite,
            &config,
        )
        .await
        .unwrap();

        assert_eq!(program.bootstrapped_count(), config.max_bootstrapped_demos);
        assert_eq!(program.labeled_count(), config.max_labeled_demos);
        assert_eq!(provenance.bootstrapped_scores.len(), 4);
        assert!(provenance
            .bootstrapped_scores
            .iter()
            .all(|s| *s >= config.metric_threshold));
        assert!(provenance
            .bootstrapped_scores
            .windows(2)
            .all(|w| w[0] >= w[1]));
        assert_eq!(provenance.demo_sources.len(), 12);

        // Bootstrapped demos carry the predicted reasoning
        assert!(program.demos[0].outputs.contains_key("reasoning"));
        // Labeled demos put the recorded answer in the primary output
        let labeled = &program.demos[4];
        assert!(!labeled.augmented);
        assert!(labeled.outputs["solution"].starts_with("answer"));
    }

    #[tokio::test]
    async fn test_highest_scoring_candidate_wins() {
        let mut engine = MockReasoningEngine::new();
        engine.expect_predict().returning(|req| {
            let problem = req.inputs["problem"].clone();
            if problem == "problem 9" {
                Ok(solution(
                    "First, think about what x means. For example, try x = 1. \
                     Well done! Remember when you learned inverse operations? \
                     Students often forget to apply them to both sides.",
                ))
            } else {
                Ok(solution(&format!("First, {}", problem)))
            }
        });
        let module = ChainOfThought::new(SignatureKind::Maths, Arc::new(engine));
        let config = BootstrapConfig {
            max_bootstrapped_demos: 1,
            max_labeled_demos: 0,
            ..Default::default()
        };
        let data: Vec<Example> = (0..10)
            .map(|i| {
                Example::new(MathsProblem::new(format!("problem {}", i), "GCSE").into_fields())
                    .with_expected(format!("answer {}", i))
                    .with_feedback(FeedbackScore::new(Rating::ThumbsUp, None))
            })
            .collect();

        let (program, provenance) = compile(
            &module,
            &PromptProgram::default(),
            &data,
            metrics::composite,
            &config,
        )
        .await
        .unwrap();

        assert_eq!(provenance.candidates_tried, 10);
        assert_eq!(program.demos.len(), 1);
        assert_eq!(program.demos[0].inputs["problem"], "problem 9");
        assert!(provenance.bootstrapped_scores[0] > 0.9);
    }

    #[tokio::test]
    async fn test_seed_makes_selection_deterministic() {
        let data = trainset(20);
        let config = BootstrapConfig {
            seed: 7,
            ..Default::default()
        };

        let mut picks = Vec::new();
        for _ in 0..2 {
            let module = ChainOfThought::new(SignatureKind::Maths, Arc::new(echo_engine()));
            let (program, _) = compile(
                &module,
                &PromptProgram::default(),
                &data,
                metrics::composite,
                &config,
            )
            .await
            .unwrap();
            picks.push(program.demos);
        }
        assert_eq!(picks[0], picks[1]);
    }

    #[tokio::test]
    async fn test_too_many_failures_aborts() {
        let mut engine = MockReasoningEngine::new();
        engine
            .expect_predict()
            .returning(|_| Err(TutorError::LlmApi("quota exceeded".to_string())));
        let module = ChainOfThought::new(SignatureKind::Maths, Arc::new(engine));
        let config = BootstrapConfig {
            max_errors: 2,
            ..Default::default()
        };

        let result = compile(
            &module,
            &PromptProgram::default(),
            &trainset(10),
            metrics::composite,
            &config,
        )
        .await;
        assert!(matches!(result, Err(TutorError::Compile(msg)) if msg.contains("quota exceeded")));
    }

    #[tokio::test]
    async fn test_low_scores_fall_back_to_labeled_demos() {
        let module = ChainOfThought::new(SignatureKind::Maths, Arc::new(echo_engine()));
        let config = BootstrapConfig {
            metric_threshold: 1.0,
            max_labeled_demos: 3,
            ..Default::default()
        };
        let data = trainset(10);

        let (program, provenance) = compile(
            &module,
            &PromptProgram::default(),
            &data,
            metrics::composite,
            &config,
        )
        .await
        .unwrap();

        assert_eq!(program.bootstrapped_count(), 0);
        assert_eq!(program.labeled_count(), 3);
        assert_eq!(provenance.candidates_tried, 10);
        // Highest feedback first: thumbs-down examples (every third) come last
        assert!(program.demos.iter().all(|d| {
            let n: usize = d.inputs["problem"]
                .trim_start_matches("problem ")
                .parse()
                .unwrap();
            n % 3 != 0
        }));
    }
}
