//! The immutable result handed back to callers.

use super::state::{CorrectionRecord, RefinementMetadata, RefinementState, VerificationStatus};
use crate::error::{LexragError, Result};
use serde::{Deserialize, Serialize};

/// Final answer with its verification trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagResponse {
    pub answer: String,
    pub confidence: f64,
    /// Distinct source identifiers in first-retrieved order
    pub sources: Vec<String>,
    pub corrections_made: Vec<CorrectionRecord>,
    pub verification_status: VerificationStatus,
    pub metadata: RefinementMetadata,
}

impl RagResponse {
    /// Builds the response from a finalized state.
    ///
    /// # Errors
    ///
    /// Returns `LexragError::Internal` if the state never reached FINALIZE.
    pub fn from_final_state(state: &RefinementState) -> Result<Self> {
        if !state.is_finalized() {
            return Err(LexragError::internal(
                "a response can only be built from a finalized state",
            ));
        }

        Ok(Self {
            answer: state.answer().to_string(),
            confidence: state.confidence(),
            sources: dedup_preserving_order(state.sources()),
            corrections_made: state.corrections_made().to_vec(),
            verification_status: state.verification_status(),
            metadata: state.metadata().clone(),
        })
    }

    /// Corrections log rendered as plain strings.
    pub fn corrections_text(&self) -> Vec<String> {
        self.corrections_made.iter().map(ToString::to_string).collect()
    }
}

fn dedup_preserving_order(items: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(item.as_str()))
        .cloned()
        .collect()
}
