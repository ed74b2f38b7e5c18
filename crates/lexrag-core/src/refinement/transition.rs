//! Pure state-transition functions and the loop's decision rule.
//!
//! Each transition borrows the current state and returns a new value, so
//! every step can be exercised without a controller or any I/O.

use super::state::{CorrectionRecord, RefinementMetadata, RefinementState};
use super::verdict::Verdict;
use super::VerificationStatus;
use crate::corpus::RetrievedChunk;
use crate::error::{LexragError, Result};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Parameters that bound the refinement loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefinementPolicy {
    pub min_confidence_threshold: f64,
    /// Maximum answer-producing calls (generation + corrections)
    pub max_iterations: u32,
    /// `k` for the retrieval step
    pub max_retrieval_docs: usize,
}

impl Default for RefinementPolicy {
    fn default() -> Self {
        Self {
            min_confidence_threshold: 0.7,
            max_iterations: 3,
            max_retrieval_docs: 5,
        }
    }
}

/// States of the refinement machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Step {
    Retrieve,
    Generate,
    Verify,
    Correct,
    Finalize,
}

/// Outcome of the decision point evaluated after every VERIFY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Correct,
    Finalize(FinalizeReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum FinalizeReason {
    /// Verified with confidence at or above the threshold
    Accepted,
    /// The iteration budget is spent, whatever the status
    IterationBudgetExhausted,
}

/// The decision rule: the iteration budget always wins, then any
/// `NEEDS_CORRECTION` or sub-threshold confidence triggers a correction.
pub fn decide(state: &RefinementState, policy: &RefinementPolicy) -> Decision {
    if state.iteration_count >= policy.max_iterations {
        return Decision::Finalize(FinalizeReason::IterationBudgetExhausted);
    }

    if state.verification_status == VerificationStatus::NeedsCorrection
        || state.confidence < policy.min_confidence_threshold
    {
        return Decision::Correct;
    }

    Decision::Finalize(FinalizeReason::Accepted)
}

/// The state that follows `completed` once it has been applied to `state`.
pub fn next_step(completed: Step, state: &RefinementState, policy: &RefinementPolicy) -> Step {
    match completed {
        Step::Retrieve => Step::Generate,
        Step::Generate | Step::Correct => Step::Verify,
        Step::Verify => match decide(state, policy) {
            Decision::Correct => Step::Correct,
            Decision::Finalize(_) => Step::Finalize,
        },
        Step::Finalize => Step::Finalize,
    }
}

fn ensure_open(state: &RefinementState, step: Step) -> Result<()> {
    if state.finalized {
        return Err(LexragError::internal(format!(
            "cannot apply {step} to a finalized refinement state"
        )));
    }
    Ok(())
}

/// RETRIEVE: sets context, sources and retrieval metadata exactly once.
pub fn apply_retrieval(
    state: &RefinementState,
    chunks: Vec<RetrievedChunk>,
) -> Result<RefinementState> {
    ensure_open(state, Step::Retrieve)?;
    if state.retrieved {
        return Err(LexragError::internal(
            "context was already retrieved for this query",
        ));
    }

    let metadata = RefinementMetadata::from_chunks(&chunks);
    let (context, sources): (Vec<String>, Vec<String>) = chunks
        .into_iter()
        .map(|chunk| (chunk.text, chunk.source_id))
        .unzip();

    Ok(RefinementState {
        context,
        sources,
        retrieved: true,
        metadata,
        ..state.clone()
    })
}

/// GENERATE: stores the draft answer and counts the iteration.
pub fn apply_generation(state: &RefinementState, answer: String) -> Result<RefinementState> {
    ensure_open(state, Step::Generate)?;
    if !state.retrieved {
        return Err(LexragError::internal(
            "generation attempted before retrieval",
        ));
    }

    Ok(RefinementState {
        answer,
        iteration_count: state.iteration_count + 1,
        ..state.clone()
    })
}

/// VERIFY: the only transition that sets status and confidence.
pub fn apply_verdict(state: &RefinementState, verdict: &Verdict) -> Result<RefinementState> {
    ensure_open(state, Step::Verify)?;

    let mut corrections_made = state.corrections_made.clone();
    corrections_made.extend(verdict.findings());

    Ok(RefinementState {
        verification_status: verdict.status,
        confidence: verdict.confidence,
        corrections_made,
        verifications: state.verifications + 1,
        ..state.clone()
    })
}

/// CORRECT: replaces the answer, logs the correction and counts the iteration.
pub fn apply_correction(state: &RefinementState, answer: String) -> Result<RefinementState> {
    ensure_open(state, Step::Correct)?;

    let mut corrections_made = state.corrections_made.clone();
    corrections_made.push(CorrectionRecord::CorrectionApplied);

    Ok(RefinementState {
        answer,
        corrections_made,
        iteration_count: state.iteration_count + 1,
        ..state.clone()
    })
}

/// FINALIZE: records the totals and seals the state.
pub fn finalize(state: &RefinementState) -> Result<RefinementState> {
    ensure_open(state, Step::Finalize)?;

    let metadata = RefinementMetadata {
        final_iteration_count: Some(state.iteration_count),
        total_corrections: Some(state.corrections_made.len()),
        ..state.metadata.clone()
    };

    Ok(RefinementState {
        metadata,
        finalized: true,
        ..state.clone()
    })
}
