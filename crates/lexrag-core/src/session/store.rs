//! Session persistence ports.

use super::model::{CheckpointPhase, Session};
use crate::error::Result;
use crate::refinement::RefinementState;
use async_trait::async_trait;

/// An abstract store for session checkpoints.
///
/// Implementations only guarantee per-call atomicity. Serialising the
/// queries of one session is the caller's job (see the application layer's
/// session gate).
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Finds a session by its ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Session))`: Session found
    /// - `Ok(None)`: Session not found
    async fn get(&self, session_id: &str) -> Result<Option<Session>>;

    /// Inserts or replaces a session.
    async fn put(&self, session: Session) -> Result<()>;

    /// Deletes a session (no-op if it does not exist).
    async fn remove(&self, session_id: &str) -> Result<()>;

    /// Deletes every session.
    async fn clear(&self) -> Result<()>;

    /// Lists stored session IDs, sorted.
    async fn list_ids(&self) -> Result<Vec<String>>;
}

/// Receives step-boundary snapshots from the refinement controller.
#[async_trait]
pub trait CheckpointSink: Send + Sync {
    async fn record(&self, phase: CheckpointPhase, state: &RefinementState) -> Result<()>;
}

/// Sink that drops every checkpoint.
pub struct DiscardCheckpoints;

#[async_trait]
impl CheckpointSink for DiscardCheckpoints {
    async fn record(&self, _phase: CheckpointPhase, _state: &RefinementState) -> Result<()> {
        Ok(())
    }
}
