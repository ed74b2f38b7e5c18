use async_trait::async_trait;
use lexrag_core::error::Result;
use lexrag_core::refinement::{RagResponse, RefinementState};
use lexrag_core::session::{
    Checkpoint, CheckpointPhase, CheckpointSink, Exchange, Session, SessionStore,
};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Writes controller checkpoints into one session of a `SessionStore`.
///
/// A `Finalized` checkpoint also appends the completed exchange to the
/// session history, in the same write.
pub struct SessionCheckpointer {
    store: Arc<dyn SessionStore>,
    session: Mutex<Session>,
}

impl SessionCheckpointer {
    pub fn new(store: Arc<dyn SessionStore>, session: Session) -> Self {
        Self {
            store,
            session: Mutex::new(session),
        }
    }

    /// Current in-memory copy of the session.
    pub async fn snapshot(&self) -> Session {
        self.session.lock().await.clone()
    }
}

#[async_trait]
impl CheckpointSink for SessionCheckpointer {
    async fn record(&self, phase: CheckpointPhase, state: &RefinementState) -> Result<()> {
        let mut session = self.session.lock().await;
        session.record_checkpoint(Checkpoint::new(phase, state.clone()));

        if phase == CheckpointPhase::Finalized {
            let response = RagResponse::from_final_state(state)?;
            session.push_exchange(Exchange::from_response(state.question(), &response));
        }

        self.store.put(session.clone()).await?;
        tracing::debug!(
            session_id = %session.id,
            phase = %phase,
            iteration = state.iteration_count(),
            "Checkpoint saved"
        );
        Ok(())
    }
}
