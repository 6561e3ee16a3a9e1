//! Evaluation and compile behavior through the public API

mod common;

use common::{ScriptedEngine, FAIL_MARKER};
use std::sync::Arc;
use tutor_tune_core::{
    config::BootstrapConfig,
    data::{Example, FeedbackScore},
    metrics,
    optimizer::{compile, evaluate, PromptProgram},
    signatures::{MathsProblem, SignatureKind},
    ChainOfThought, Rating,
};

fn example(problem: &str) -> Example {
    Example::new(MathsProblem::new(problem, "GCSE").into_fields())
        .with_expected("x = 3")
        .with_feedback(FeedbackScore::new(Rating::ThumbsUp, Some(5)))
}

#[tokio::test]
async fn test_failing_example_counts_as_zero() {
    let module = ChainOfThought::new(SignatureKind::Maths, Arc::new(ScriptedEngine::new()));
    let program = PromptProgram::default();

    let good = vec![example("Solve 2x = 6"), example("Solve 3x = 9")];
    let clean = evaluate(&module, &program, &good, metrics::composite).await;
    assert_eq!(clean.failures, 0);

    let mut mixed = good.clone();
    mixed.insert(1, example(&format!("{} Solve 4x = 12", FAIL_MARKER)));
    let report = evaluate(&module, &program, &mixed, metrics::composite).await;

    assert_eq!(report.evaluated, 3);
    assert_eq!(report.failures, 1);
    assert!((report.score - clean.score * 2.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_compiled_program_beats_baseline() {
    let engine = Arc::new(ScriptedEngine::new());
    let module = ChainOfThought::new(SignatureKind::Maths, engine.clone());
    let trainset: Vec<Example> = (1..=12)
        .map(|i| example(&format!("Solve {}x = {}", i, i * 3)))
        .collect();

    let baseline = PromptProgram::default();
    let (compiled, provenance) = compile(
        &module,
        &baseline,
        &trainset,
        metrics::composite,
        &BootstrapConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(compiled.bootstrapped_count(), 4);
    assert_eq!(compiled.labeled_count(), 8);
    assert_eq!(provenance.rounds_run, 1);

    let before = evaluate(&module, &baseline, &trainset[..5], metrics::composite).await;
    let after = evaluate(&module, &compiled, &trainset[..5], metrics::composite).await;
    assert!(before.score >= 0.5);
    assert!(after.score > before.score);
}
