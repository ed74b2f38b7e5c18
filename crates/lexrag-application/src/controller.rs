//! The refinement controller.
//!
//! Drives one query through
//! retrieve → generate → verify → (correct → verify)* → finalize,
//! persisting a checkpoint after every VERIFY and at FINALIZE.

use lexrag_core::corpus::CorpusIndex;
use lexrag_core::error::{LexragError, Result};
use lexrag_core::refinement::transition::{
    apply_correction, apply_generation, apply_retrieval, apply_verdict, finalize,
};
use lexrag_core::refinement::{
    Corrector, Decision, Generator, RagResponse, RefinementPolicy, RefinementState, Step,
    Verifier, decide, next_step,
};
use lexrag_core::session::{CheckpointPhase, CheckpointSink};
use std::sync::Arc;

pub struct RefinementController {
    index: Arc<dyn CorpusIndex>,
    generator: Arc<dyn Generator>,
    verifier: Arc<dyn Verifier>,
    corrector: Arc<dyn Corrector>,
    policy: RefinementPolicy,
}

impl RefinementController {
    pub fn new(
        index: Arc<dyn CorpusIndex>,
        generator: Arc<dyn Generator>,
        verifier: Arc<dyn Verifier>,
        corrector: Arc<dyn Corrector>,
        policy: RefinementPolicy,
    ) -> Self {
        Self {
            index,
            generator,
            verifier,
            corrector,
            policy,
        }
    }

    pub fn policy(&self) -> &RefinementPolicy {
        &self.policy
    }

    /// Answers `question` from a fresh state.
    pub async fn run(&self, question: &str, sink: &dyn CheckpointSink) -> Result<RagResponse> {
        self.drive(RefinementState::new(question), Step::Retrieve, sink)
            .await
    }

    /// Continues from a state checkpointed right after a VERIFY.
    ///
    /// The decision point is re-evaluated; nothing is retrieved or
    /// generated again.
    pub async fn resume(
        &self,
        state: RefinementState,
        sink: &dyn CheckpointSink,
    ) -> Result<RagResponse> {
        if state.is_finalized() || !state.is_retrieved() || state.verifications() == 0 {
            return Err(LexragError::internal(
                "only an unfinished, verified state can be resumed",
            ));
        }

        tracing::info!(
            iteration = state.iteration_count(),
            confidence = state.confidence(),
            status = %state.verification_status(),
            "Resuming from checkpoint"
        );
        let next = next_step(Step::Verify, &state, &self.policy);
        self.drive(state, next, sink).await
    }

    /// Executes a single step against `state` and returns the new state.
    pub async fn step(&self, step: Step, state: &RefinementState) -> Result<RefinementState> {
        let question = state.question();
        match step {
            Step::Retrieve => {
                let chunks = self
                    .index
                    .search(question, self.policy.max_retrieval_docs)
                    .await?;
                apply_retrieval(state, chunks)
            }
            Step::Generate => {
                let answer = self.generator.generate(question, state.context()).await?;
                apply_generation(state, answer)
            }
            Step::Verify => {
                let verdict = self
                    .verifier
                    .verify(question, state.answer(), state.context())
                    .await?;
                if verdict.degraded {
                    tracing::warn!(
                        iteration = state.iteration_count(),
                        confidence = verdict.confidence,
                        "Verifier output was malformed; continuing with a degraded verdict"
                    );
                }
                apply_verdict(state, &verdict)
            }
            Step::Correct => {
                let issues: Vec<String> = state
                    .corrections_made()
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                let answer = self
                    .corrector
                    .correct(question, state.answer(), state.context(), &issues)
                    .await?;
                apply_correction(state, answer)
            }
            Step::Finalize => finalize(state),
        }
    }

    async fn drive(
        &self,
        mut state: RefinementState,
        mut step: Step,
        sink: &dyn CheckpointSink,
    ) -> Result<RagResponse> {
        loop {
            state = match self.step(step, &state).await {
                Ok(next) => next,
                Err(err) => {
                    tracing::error!(
                        step = %step,
                        iteration = state.iteration_count(),
                        error = %err,
                        "Refinement step failed"
                    );
                    return Err(err);
                }
            };

            tracing::info!(
                step = %step,
                iteration = state.iteration_count(),
                confidence = state.confidence(),
                status = %state.verification_status(),
                "Step completed"
            );

            match step {
                Step::Verify => {
                    sink.record(CheckpointPhase::Verified, &state).await?;
                    match decide(&state, &self.policy) {
                        Decision::Correct => tracing::info!(
                            iteration = state.iteration_count(),
                            "Decision: correct"
                        ),
                        Decision::Finalize(reason) => tracing::info!(
                            iteration = state.iteration_count(),
                            reason = %reason,
                            "Decision: finalize"
                        ),
                    }
                }
                Step::Finalize => {
                    sink.record(CheckpointPhase::Finalized, &state).await?;
                    return RagResponse::from_final_state(&state);
                }
                _ => {}
            }

            step = next_step(step, &state, &self.policy);
        }
    }
}
