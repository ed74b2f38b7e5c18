mod common;

use common::*;
use lexrag_application::RefinementController;
use lexrag_core::refinement::{
    CorrectionRecord, RefinementPolicy, RefinementState, Step, Verdict, VerificationStatus,
};
use lexrag_core::session::{CheckpointPhase, DiscardCheckpoints};
use std::sync::Arc;
use std::sync::atomic::Ordering;

struct Harness {
    index: Arc<StaticIndex>,
    generator: Arc<ScriptedGenerator>,
    verifier: Arc<ScriptedVerifier>,
    corrector: Arc<ScriptedCorrector>,
    controller: RefinementController,
}

fn harness(verifier: ScriptedVerifier, threshold: f64, max_iterations: u32) -> Harness {
    let index = Arc::new(StaticIndex::lease());
    let generator = Arc::new(ScriptedGenerator::default());
    let verifier = Arc::new(verifier);
    let corrector = Arc::new(ScriptedCorrector::default());
    let controller = RefinementController::new(
        index.clone(),
        generator.clone(),
        verifier.clone(),
        corrector.clone(),
        RefinementPolicy {
            min_confidence_threshold: threshold,
            max_iterations,
            max_retrieval_docs: 5,
        },
    );
    Harness {
        index,
        generator,
        verifier,
        corrector,
        controller,
    }
}

#[tokio::test]
async fn corrects_until_verified_within_budget() {
    let h = harness(
        ScriptedVerifier::new(vec![
            issue_verdict(0.4, "term length not cited"),
            issue_verdict(0.6, "notice period missing"),
            Verdict::verified(0.9),
        ]),
        0.7,
        3,
    );

    let response = h
        .controller
        .run("How long is the lease?", &DiscardCheckpoints)
        .await
        .unwrap();

    assert_eq!(response.verification_status, VerificationStatus::Verified);
    assert_eq!(response.confidence, 0.9);
    assert_eq!(response.answer, "corrected 2");
    assert_eq!(response.metadata.final_iteration_count, Some(3));
    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.corrector.calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.verifier.calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        response.corrections_made,
        vec![
            CorrectionRecord::Issue("term length not cited".into()),
            CorrectionRecord::CorrectionApplied,
            CorrectionRecord::Issue("notice period missing".into()),
            CorrectionRecord::CorrectionApplied,
        ]
    );
    assert_eq!(response.metadata.total_corrections, Some(4));
}

#[tokio::test]
async fn budget_exhaustion_returns_best_answer() {
    let h = harness(
        ScriptedVerifier::new(vec![issue_verdict(0.3, "a"), issue_verdict(0.3, "b")]),
        0.7,
        2,
    );

    let response = h.controller.run("q", &DiscardCheckpoints).await.unwrap();

    assert_eq!(response.verification_status, VerificationStatus::NeedsCorrection);
    assert_eq!(response.confidence, 0.3);
    assert_eq!(response.metadata.final_iteration_count, Some(2));
    assert_eq!(h.verifier.calls.load(Ordering::SeqCst), 2);
    assert_eq!(response.answer, "corrected 1");
}

#[tokio::test]
async fn clean_pass_needs_one_generation() {
    let h = harness(ScriptedVerifier::always(Verdict::verified(0.95)), 0.7, 3);

    let response = h.controller.run("q", &DiscardCheckpoints).await.unwrap();

    assert_eq!(response.metadata.final_iteration_count, Some(1));
    assert!(response.corrections_made.is_empty());
    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.verifier.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.corrector.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn never_verified_stops_exactly_at_budget() {
    for max_iterations in 1..=5 {
        for threshold in [0.0, 0.5, 1.0] {
            let h = harness(
                ScriptedVerifier::always(Verdict::needs_correction(0.99, vec![])),
                threshold,
                max_iterations,
            );
            let response = h.controller.run("q", &DiscardCheckpoints).await.unwrap();

            let answer_calls = h.generator.calls.load(Ordering::SeqCst)
                + h.corrector.calls.load(Ordering::SeqCst);
            assert_eq!(answer_calls as u32, max_iterations);
            assert_eq!(response.metadata.final_iteration_count, Some(max_iterations));
            assert_eq!(response.verification_status, VerificationStatus::NeedsCorrection);
        }
    }
}

#[tokio::test]
async fn low_confidence_verified_is_corrected() {
    let h = harness(
        ScriptedVerifier::new(vec![Verdict::verified(0.5), Verdict::verified(0.8)]),
        0.7,
        3,
    );
    let response = h.controller.run("q", &DiscardCheckpoints).await.unwrap();

    assert_eq!(h.corrector.calls.load(Ordering::SeqCst), 1);
    assert_eq!(response.confidence, 0.8);
    assert_eq!(response.metadata.final_iteration_count, Some(2));
}

#[tokio::test]
async fn degraded_verdict_forces_correction() {
    let h = harness(ScriptedVerifier::always(Verdict::degraded()), 0.7, 1);
    let response = h.controller.run("q", &DiscardCheckpoints).await.unwrap();

    assert_eq!(response.verification_status, VerificationStatus::NeedsCorrection);
    assert_eq!(response.confidence, 0.5);
    assert_eq!(
        response.corrections_made,
        vec![CorrectionRecord::VerificationParseError]
    );
}

#[tokio::test]
async fn context_is_fixed_after_retrieval() {
    let h = harness(
        ScriptedVerifier::new(vec![issue_verdict(0.2, "x"), issue_verdict(0.2, "y")]),
        0.7,
        3,
    );
    h.controller.run("q", &DiscardCheckpoints).await.unwrap();

    let retrieved = h.generator.contexts.lock().unwrap()[0].clone();
    assert_eq!(retrieved.len(), 3);
    assert!(h.verifier.contexts.lock().unwrap().iter().all(|c| *c == retrieved));
    assert!(h.corrector.contexts.lock().unwrap().iter().all(|c| *c == retrieved));
    assert_eq!(h.index.searches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn corrector_receives_full_log() {
    let h = harness(
        ScriptedVerifier::new(vec![
            issue_verdict(0.2, "first"),
            issue_verdict(0.2, "second"),
            Verdict::verified(0.9),
        ]),
        0.7,
        3,
    );
    h.controller.run("q", &DiscardCheckpoints).await.unwrap();

    let issues = h.corrector.issues.lock().unwrap().clone();
    assert_eq!(issues[0], vec!["first"]);
    assert_eq!(
        issues[1],
        vec!["first", "Answer corrected based on verification", "second"]
    );
}

#[tokio::test]
async fn sources_are_deduplicated_in_response_only() {
    let h = harness(ScriptedVerifier::always(Verdict::verified(1.0)), 0.7, 3);
    let response = h.controller.run("q", &DiscardCheckpoints).await.unwrap();

    assert_eq!(response.sources, vec!["lease.txt", "amendment.txt"]);
    assert_eq!(response.metadata.retrieved_docs, 3);
}

#[tokio::test]
async fn checkpoints_follow_every_verify_and_finalize() {
    let h = harness(
        ScriptedVerifier::new(vec![issue_verdict(0.2, "x"), Verdict::verified(0.9)]),
        0.7,
        3,
    );
    let sink = RecordingSink::default();
    h.controller.run("q", &sink).await.unwrap();

    let phases: Vec<CheckpointPhase> = sink.records.lock().unwrap().iter().map(|(p, _)| *p).collect();
    assert_eq!(
        phases,
        vec![
            CheckpointPhase::Verified,
            CheckpointPhase::Verified,
            CheckpointPhase::Finalized
        ]
    );
    let records = sink.records.lock().unwrap();
    assert!(records[2].1.is_finalized());
    assert_eq!(records[0].1.iteration_count(), 1);
}

#[tokio::test]
async fn empty_index_is_fatal() {
    let generator = Arc::new(ScriptedGenerator::default());
    let controller = RefinementController::new(
        Arc::new(StaticIndex::empty()),
        generator.clone(),
        Arc::new(ScriptedVerifier::always(Verdict::verified(1.0))),
        Arc::new(ScriptedCorrector::default()),
        RefinementPolicy::default(),
    );

    let err = controller.run("q", &DiscardCheckpoints).await.unwrap_err();
    assert!(err.is_index_empty());
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn generator_failure_propagates() {
    let sink = RecordingSink::default();
    let controller = RefinementController::new(
        Arc::new(StaticIndex::lease()),
        Arc::new(FailingGenerator),
        Arc::new(ScriptedVerifier::always(Verdict::verified(1.0))),
        Arc::new(ScriptedCorrector::default()),
        RefinementPolicy::default(),
    );

    let err = controller.run("q", &sink).await.unwrap_err();
    assert!(err.to_string().contains("generating the answer"));
    assert!(sink.records.lock().unwrap().is_empty());
}

#[tokio::test]
async fn resume_starts_at_decision_point() {
    let h = harness(
        ScriptedVerifier::new(vec![issue_verdict(0.2, "x"), Verdict::verified(0.9)]),
        0.7,
        3,
    );
    let state = h.controller.step(Step::Retrieve, &RefinementState::new("q")).await.unwrap();
    let state = h.controller.step(Step::Generate, &state).await.unwrap();
    let state = h.controller.step(Step::Verify, &state).await.unwrap();

    let response = h.controller.resume(state, &DiscardCheckpoints).await.unwrap();

    assert_eq!(h.index.searches.load(Ordering::SeqCst), 1);
    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.corrector.calls.load(Ordering::SeqCst), 1);
    assert_eq!(response.verification_status, VerificationStatus::Verified);
    assert_eq!(response.metadata.final_iteration_count, Some(2));
}

#[tokio::test]
async fn resume_rejects_unverified_state() {
    let h = harness(ScriptedVerifier::always(Verdict::verified(1.0)), 0.7, 3);
    let err = h
        .controller
        .resume(RefinementState::new("q"), &DiscardCheckpoints)
        .await
        .unwrap_err();
    assert!(matches!(err, lexrag_core::LexragError::Internal(_)));
}
