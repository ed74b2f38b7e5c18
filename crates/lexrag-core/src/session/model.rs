//! Session domain model.

use crate::refinement::{RagResponse, RefinementState, VerificationStatus};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Session key used when the caller supplies none.
pub const DEFAULT_SESSION_ID: &str = "default";

/// How far the checkpointed state got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CheckpointPhase {
    /// Last fully completed step was VERIFY; the query did not finish
    Verified,
    /// The query reached FINALIZE
    Finalized,
}

/// A refinement state saved at a step boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub phase: CheckpointPhase,
    pub state: RefinementState,
    /// ISO 8601
    pub saved_at: String,
}

impl Checkpoint {
    pub fn new(phase: CheckpointPhase, state: RefinementState) -> Self {
        Self {
            phase,
            state,
            saved_at: Utc::now().to_rfc3339(),
        }
    }

    /// Whether a new query for `question` can pick up from this checkpoint.
    pub fn is_resumable_for(&self, question: &str) -> bool {
        self.phase == CheckpointPhase::Verified && self.state.question() == question
    }
}

/// One completed question/answer pair in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
    pub confidence: f64,
    pub verification_status: VerificationStatus,
    pub iterations: u32,
    /// ISO 8601
    pub completed_at: String,
}

impl Exchange {
    pub fn from_response(question: &str, response: &RagResponse) -> Self {
        Self {
            question: question.to_string(),
            answer: response.answer.clone(),
            confidence: response.confidence,
            verification_status: response.verification_status,
            iterations: response.metadata.final_iteration_count.unwrap_or_default(),
            completed_at: Utc::now().to_rfc3339(),
        }
    }
}

/// A caller-scoped conversation identity.
///
/// Holds at most one checkpoint (the current or most recent query) and the
/// history of completed exchanges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// ISO 8601
    pub created_at: String,
    /// ISO 8601
    pub updated_at: String,
    #[serde(default)]
    pub checkpoint: Option<Checkpoint>,
    #[serde(default)]
    pub history: Vec<Exchange>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: id.into(),
            created_at: now.clone(),
            updated_at: now,
            checkpoint: None,
            history: Vec::new(),
        }
    }

    /// Replaces the checkpoint and bumps `updated_at`.
    pub fn record_checkpoint(&mut self, checkpoint: Checkpoint) {
        self.updated_at = checkpoint.saved_at.clone();
        self.checkpoint = Some(checkpoint);
    }

    pub fn push_exchange(&mut self, exchange: Exchange) {
        self.updated_at = exchange.completed_at.clone();
        self.history.push(exchange);
    }

    /// Checkpoint to resume from when `question` is asked again.
    pub fn resumable_checkpoint(&self, question: &str) -> Option<&Checkpoint> {
        self.checkpoint
            .as_ref()
            .filter(|checkpoint| checkpoint.is_resumable_for(question))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unfinished_matching_checkpoint_is_resumable() {
        let mut session = Session::new("s1");
        assert!(session.resumable_checkpoint("q").is_none());

        session.record_checkpoint(Checkpoint::new(
            CheckpointPhase::Verified,
            RefinementState::new("q"),
        ));
        assert!(session.resumable_checkpoint("q").is_some());
        assert!(session.resumable_checkpoint("other").is_none());

        session.record_checkpoint(Checkpoint::new(
            CheckpointPhase::Finalized,
            RefinementState::new("q"),
        ));
        assert!(session.resumable_checkpoint("q").is_none());
    }

    #[test]
    fn session_round_trips_through_json() {
        let mut session = Session::new("s1");
        session.record_checkpoint(Checkpoint::new(
            CheckpointPhase::Verified,
            RefinementState::new("What law governs?"),
        ));
        let json = serde_json::to_string(&session).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }
}
